use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::model::ProcessingPhase;
use crate::util::{IntoJson, WebResult};

/// 处理协调器错误类型
///
/// 所有错误都不会终止进程：控制面误操作与查询未命中直接返回给调用方，
/// 阶段失败只记录到单个文件。
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("当前没有正在进行的处理任务")]
    NoActiveJob,

    #[error("任务不存在: {0}")]
    UnknownJob(String),

    #[error("文件不存在: {0}")]
    UnknownFile(String),

    #[error("分类不存在: {0}")]
    UnknownCategory(String),

    #[error("无效的分类名称: {0}")]
    InvalidCategory(String),

    #[error("阶段{phase}处理失败 [{file_id}]: {reason}")]
    StageFailure {
        phase: ProcessingPhase,
        file_id: String,
        reason: String,
    },

    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProcessingError::NoActiveJob => StatusCode::CONFLICT,
            ProcessingError::UnknownJob(_)
            | ProcessingError::UnknownFile(_)
            | ProcessingError::UnknownCategory(_) => StatusCode::NOT_FOUND,
            ProcessingError::InvalidCategory(_) => StatusCode::BAD_REQUEST,
            ProcessingError::StageFailure { .. } | ProcessingError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ProcessingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "请求处理失败");
        }
        let body = WebResult::err_with_code(status.as_u16() as u32, self.to_string());
        (status, body.into_json()).into_response()
    }
}

pub type ProcessingResult<T> = Result<T, ProcessingError>;
