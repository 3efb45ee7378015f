//! Core engine — expand → search → normalize → evaluate per route,
//! driven by the polling scheduler.

pub mod expander;
pub mod offers;
pub mod evaluator;
pub mod checker;
pub mod scheduler;
