//! Per-request access logging: one line per request, `"METHOD PATH STATUS
//! DURATIONms"`, leveled by status class (§6.1).

use std::time::Instant;

use axum::body::Body;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

pub async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis();
    let line = format!("{method} {path} {} {duration_ms}ms", status.as_u16());

    if status.is_server_error() {
        tracing::error!("{line}");
    } else if status.is_client_error() {
        tracing::warn!("{line}");
    } else {
        tracing::info!("{line}");
    }

    response
}
