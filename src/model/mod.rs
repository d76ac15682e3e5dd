pub mod job;
pub mod library;
pub mod processing;
pub mod task;

pub use job::{Job, JobStatus};
pub use library::{CategorySummary, FileStatus, SourceFile};
pub use processing::{
    CancelOutcome, ProcessingPhase, ProcessingSnapshot, ProcessingStatus, SubmitOutcome,
};
pub use task::{derive_file_id, ProcessingTask};
