//! 文档处理调度
//!
//! 控制面通过 [`ProcessingCoordinator`] 提交任务、暂停/恢复/取消；
//! 后台唯一的 Worker 按 FIFO 顺序对每个文件依次执行两个外部阶段。

pub mod coordinator;
pub mod error;
pub mod registry;
pub mod stages;
pub mod worker;

pub use coordinator::ProcessingCoordinator;
pub use error::{ProcessingError, ProcessingResult};
pub use registry::JobRegistry;
pub use stages::{CommandStages, PipelineStages};
pub use worker::spawn_processing_worker;
