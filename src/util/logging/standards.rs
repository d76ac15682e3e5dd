//! Centralised logging metadata (event names, shared keys, etc.).

/// Canonical event names used across the service.
pub mod events {
    /// HTTP request lifecycle.
    pub const REQUEST_COMPLETE: &str = "request.complete";
    pub const REQUEST_ERROR: &str = "request.error";

    /// Control surface operations.
    pub const CONTROL_SUBMIT: &str = "control.submit";
    pub const CONTROL_SUBMIT_EMPTY: &str = "control.submit_empty";
    pub const CONTROL_PAUSE: &str = "control.pause";
    pub const CONTROL_RESUME: &str = "control.resume";
    pub const CONTROL_CANCEL: &str = "control.cancel";
    pub const CONTROL_REJECTED: &str = "control.rejected";

    /// 队列与 Worker。
    pub const QUEUE_ENQUEUE: &str = "queue.enqueue";
    pub const QUEUE_DEQUEUE: &str = "queue.dequeue";
    pub const QUEUE_CLOSED: &str = "queue.closed";
    pub const WORKER_START: &str = "worker.start";
    pub const WORKER_STOP: &str = "worker.stop";
    pub const WORKER_PAUSED: &str = "worker.paused";
    pub const WORKER_DISCARD: &str = "worker.discard";
    pub const WORKER_IDLE: &str = "worker.idle";

    /// Processing pipeline.
    pub const PIPELINE_START: &str = "processing.task_start";
    pub const PIPELINE_STAGE: &str = "processing.stage";
    pub const PIPELINE_COMPLETE: &str = "processing.complete";
    pub const PIPELINE_ERROR: &str = "processing.error";

    /// 文档库。
    pub const LIBRARY_READY: &str = "library.ready";

    /// Server lifecycle.
    pub const SERVER_START: &str = "server.start";
    pub const SERVER_SHUTDOWN: &str = "server.shutdown";

    /// Job bookkeeping.
    pub const JOB_CREATED: &str = "job.created";
    pub const JOB_COMPLETED: &str = "job.completed";
}
