//! 文档库浏览接口
//!
//! 文件状态每次请求时根据产物目录即时计算。

use axum::extract::{Path, State};
use axum::Json;

use crate::util::processing::ProcessingResult;
use crate::util::{IntoJson, WebResult};
use crate::AppState;

pub async fn list_categories(State(state): State<AppState>) -> ProcessingResult<Json<WebResult>> {
    let summaries = state.library.summaries()?;
    Ok(WebResult::ok(summaries).into_json())
}

pub async fn list_category_files(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ProcessingResult<Json<WebResult>> {
    let files = state.library.list_files(&category)?;
    Ok(WebResult::ok(files).into_json())
}
