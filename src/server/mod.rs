//! Status server — Axum endpoints for the tracker's read-only state.
//!
//! CORS enabled for GET so a monitoring page on another origin can poll.

pub mod routes;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::state::SnapshotStore;

/// Start the status web server.
///
/// This spawns a background task — it doesn't block.
pub fn spawn_status_server(store: SnapshotStore, port: u16) -> Result<()> {
    let app = build_router(store);

    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!(port, "Status server starting on http://localhost:{port}");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind status server port");

        axum::serve(listener, app)
            .await
            .expect("Status server error");
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(store: SnapshotStore) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(routes::get_status))
        .route("/status", get(routes::get_status))
        .route("/snapshots", get(routes::get_snapshots))
        .layer(cors)
        .with_state(store)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
