//! FAREWATCH — airfare price monitor.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod state;
pub mod notify;
pub mod providers;
pub mod engine;
pub mod server;
