use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::build_info;
use crate::model::ProcessingSnapshot;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime: i64,
    pub timestamp: String,
    pub processing: ProcessingSnapshot,
}

/// 基础健康检查
pub async fn basic_health_check(State(state): State<AppState>) -> Response {
    let status = HealthStatus {
        status: "healthy".to_string(),
        version: build_info::summary(),
        uptime: state.uptime_seconds(),
        timestamp: Utc::now().to_rfc3339(),
        processing: state.coordinator.status(),
    };

    let mut resp = Json(status).into_response();
    resp.headers_mut().insert(
        axum::http::header::CACHE_CONTROL,
        axum::http::HeaderValue::from_static("no-store"),
    );
    resp
}
