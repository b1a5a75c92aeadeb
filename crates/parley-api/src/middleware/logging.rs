use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Logs method, path, status and latency of every request
///
/// For streamed responses the latency covers the response head only.
pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();
    if status.is_server_error() {
        tracing::warn!(%method, %path, %status, elapsed_ms, "Request failed");
    } else {
        tracing::info!(%method, %path, %status, elapsed_ms, "Request handled");
    }

    response
}
