use crate::util::logging::standards::events;
use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use nanoid::nanoid;
use std::time::Instant;

fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
}

/// 操作界面会高频轮询的接口，只记 debug
fn is_quiet_path(path: &str) -> bool {
    const QUIET_EXACT: &[&str] = &["/api/health", "/api/status", "/favicon.ico"];
    QUIET_EXACT.contains(&path) || !path.starts_with("/api/")
}

// 统一请求日志中间件
pub async fn request_logging_middleware(mut request: Request, next: Next) -> Response {
    let start_time = Instant::now();
    let request_id = nanoid!(12);
    let method = request.method().clone();
    let uri = request.uri().clone();
    let client_ip = extract_client_ip(request.headers());
    request.extensions_mut().insert(request_id.clone());

    let response = next.run(request).await;
    let duration_ms = start_time.elapsed().as_millis() as u64;
    let status = response.status();
    let quiet_path = is_quiet_path(uri.path());

    if status.is_server_error() {
        tracing::error!(
            target: "http.server",
            event = events::REQUEST_ERROR,
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            status = status.as_u16(),
            duration_ms,
            client_ip = client_ip.as_deref().unwrap_or("unknown")
        );
    } else if status.is_client_error() && !quiet_path {
        tracing::warn!(
            target: "http.server",
            event = events::REQUEST_COMPLETE,
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            status = status.as_u16(),
            duration_ms
        );
    } else if quiet_path {
        tracing::debug!(
            target: "http.server",
            event = events::REQUEST_COMPLETE,
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            status = status.as_u16(),
            duration_ms
        );
    } else {
        tracing::info!(
            target: "http.server",
            event = events::REQUEST_COMPLETE,
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            status = status.as_u16(),
            duration_ms,
            client_ip = client_ip.as_deref().unwrap_or("unknown")
        );
    }

    response
}
