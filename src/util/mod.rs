use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub mod config;
pub mod log;
pub mod logging;
pub mod middleware;
pub mod processing;
pub mod task_queue;

/// 统一的接口响应结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebResult {
    pub success: bool,
    #[serde(rename = "errorCode")]
    pub code: u32,
    #[serde(rename = "errorMsg")]
    pub msg: String,
    pub data: Value,
}

impl WebResult {
    pub fn ok(data: impl Serialize) -> Self {
        Self {
            success: true,
            code: 200,
            msg: "".to_string(),
            data: json!(data),
        }
    }

    pub fn ok_with_msg(data: impl Serialize, msg: impl ToString) -> Self {
        Self {
            msg: msg.to_string(),
            ..Self::ok(data)
        }
    }

    pub fn err_with_code(code: u32, msg: impl ToString) -> Self {
        Self {
            success: false,
            code,
            msg: msg.to_string(),
            data: Default::default(),
        }
    }
}

pub trait IntoJson {
    fn into_json(self) -> Json<WebResult>;
}

impl IntoJson for WebResult {
    fn into_json(self) -> Json<WebResult> {
        Json(self)
    }
}
