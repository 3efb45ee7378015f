//! Shared tracker state.
//!
//! One store holds the status document and the per-route snapshots.
//! Cloning the store clones a handle to the same state, so the HTTP
//! server and the scheduler observe each other's writes.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::{RouteKey, RouteSnapshot, TrackerStatus};

/// Cheaply cloneable handle to tracker state.
#[derive(Clone)]
pub struct SnapshotStore {
    inner: Arc<Inner>,
}

struct Inner {
    status: RwLock<TrackerStatus>,
    snapshots: RwLock<HashMap<RouteKey, RouteSnapshot>>,
}

impl SnapshotStore {
    pub fn new(status: TrackerStatus) -> Self {
        SnapshotStore {
            inner: Arc::new(Inner {
                status: RwLock::new(status),
                snapshots: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Replace one route's snapshot wholesale. A reader sees either the
    /// previous snapshot or the new one, never a blend.
    pub async fn replace_route(&self, key: RouteKey, snapshot: RouteSnapshot) {
        self.inner.snapshots.write().await.insert(key, snapshot);
    }

    /// All snapshots, in no particular order.
    pub async fn snapshots(&self) -> Vec<RouteSnapshot> {
        self.inner.snapshots.read().await.values().cloned().collect()
    }

    pub async fn status(&self) -> TrackerStatus {
        self.inner.status.read().await.clone()
    }

    /// Apply a mutation to the status document under the write lock.
    pub async fn update_status<F>(&self, f: F)
    where
        F: FnOnce(&mut TrackerStatus),
    {
        let mut guard = self.inner.status.write().await;
        f(&mut guard);
        guard.timestamp = chrono::Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
