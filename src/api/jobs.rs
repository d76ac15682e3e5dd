use axum::extract::{Path, State};
use axum::Json;

use crate::util::processing::ProcessingResult;
use crate::util::{IntoJson, WebResult};
use crate::AppState;

/// 任务批次列表（新的在前）
pub async fn list_jobs(State(state): State<AppState>) -> Json<WebResult> {
    WebResult::ok(state.coordinator.jobs()).into_json()
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ProcessingResult<Json<WebResult>> {
    let job = state.coordinator.job(&job_id)?;
    Ok(WebResult::ok(job).into_json())
}
