//! Status API route handlers.
//!
//! All endpoints return JSON. State is a cloned `SnapshotStore` handle.

use axum::{extract::State, Json};

use crate::state::SnapshotStore;
use crate::types::{RouteSnapshot, TrackerStatus};

/// `GET /` and `GET /status`: the current status document.
pub async fn get_status(State(store): State<SnapshotStore>) -> Json<TrackerStatus> {
    Json(store.status().await)
}

/// `GET /snapshots`: latest snapshot of every checked route.
pub async fn get_snapshots(State(store): State<SnapshotStore>) -> Json<Vec<RouteSnapshot>> {
    Json(store.snapshots().await)
}
