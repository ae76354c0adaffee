pub mod api;
pub mod error;
pub mod extract;
pub mod lifecycle_bridge;
pub mod logging;
pub mod state;
pub mod static_assets;
pub mod supervisor;
pub mod ws;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full HTTP/WebSocket route table over `state`. Split out of
/// `main` so integration tests can drive the real router without a live
/// server bound to a socket.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api::router())
        .route("/ws", get(ws::ws_handler))
        .fallback(static_assets::static_handler)
        .layer(axum::middleware::from_fn(logging::log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
