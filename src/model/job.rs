use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 任务批次状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
        }
    }
}

/// 一次提交的任务批次
///
/// `completed` 表示“所有任务都已有结论”，不代表全部成功。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    pub total_files: usize,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    /// 被取消操作丢弃、从未开始处理的文件
    #[serde(default)]
    pub cancelled: Vec<String>,
    pub current_file: Option<String>,
}

impl Job {
    pub fn new(id: String, total_files: usize) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            created_at: Utc::now(),
            finished_at: None,
            total_files,
            completed: Vec::new(),
            failed: Vec::new(),
            cancelled: Vec::new(),
            current_file: None,
        }
    }

    pub fn resolved_count(&self) -> usize {
        self.completed.len() + self.failed.len() + self.cancelled.len()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_count() >= self.total_files
    }
}
