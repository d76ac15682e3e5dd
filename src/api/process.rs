//! 处理控制接口：入队、暂停/恢复/取消、状态查询
//!
//! 所有接口只修改协调器状态，立即返回，不等待任何阶段执行。

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::util::processing::ProcessingResult;
use crate::util::{IntoJson, WebResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ProcessQuery {
    #[serde(default)]
    pub reprocess: bool,
}

pub async fn get_status(State(state): State<AppState>) -> Json<WebResult> {
    WebResult::ok(state.coordinator.status()).into_json()
}

pub async fn process_all(
    State(state): State<AppState>,
    Query(query): Query<ProcessQuery>,
) -> ProcessingResult<Json<WebResult>> {
    let outcome = state.coordinator.process_all(query.reprocess)?;
    Ok(WebResult::ok(outcome).into_json())
}

pub async fn process_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<ProcessQuery>,
) -> ProcessingResult<Json<WebResult>> {
    let outcome = state
        .coordinator
        .process_category(&category, query.reprocess)?;
    Ok(WebResult::ok(outcome).into_json())
}

pub async fn process_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<ProcessQuery>,
) -> ProcessingResult<Json<WebResult>> {
    let outcome = state.coordinator.process_file(&file_id, query.reprocess)?;
    Ok(WebResult::ok(outcome).into_json())
}

/// 删除派生产物后重新入队
pub async fn reprocess_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ProcessingResult<Json<WebResult>> {
    info!(file_id = %file_id, "请求重新处理文件");
    let outcome = state.coordinator.process_file(&file_id, true)?;
    Ok(WebResult::ok(outcome).into_json())
}

pub async fn pause(State(state): State<AppState>) -> ProcessingResult<Json<WebResult>> {
    let snapshot = state.coordinator.pause()?;
    Ok(WebResult::ok_with_msg(snapshot, "当前文件完成后暂停").into_json())
}

pub async fn resume(State(state): State<AppState>) -> ProcessingResult<Json<WebResult>> {
    let snapshot = state.coordinator.resume()?;
    Ok(WebResult::ok(snapshot).into_json())
}

pub async fn cancel(State(state): State<AppState>) -> Json<WebResult> {
    let outcome = state.coordinator.cancel();
    WebResult::ok(outcome).into_json()
}
