use std::fmt;

use serde::{Serialize, Serializer};

/// 处理协调器的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    #[default]
    Idle,
    Running,
    Paused,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Idle => "idle",
            ProcessingStatus::Running => "running",
            ProcessingStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 当前处理阶段：1 = 源文件 → Markdown，2 = Markdown → 结构化记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingPhase {
    Markup,
    Record,
}

impl ProcessingPhase {
    pub fn number(&self) -> u8 {
        match self {
            ProcessingPhase::Markup => 1,
            ProcessingPhase::Record => 2,
        }
    }
}

impl fmt::Display for ProcessingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl Serialize for ProcessingPhase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.number())
    }
}

/// 处理状态快照（在锁内复制后返回）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingSnapshot {
    pub status: ProcessingStatus,
    pub current_file: Option<String>,
    pub current_job: Option<String>,
    pub current_phase: Option<ProcessingPhase>,
    pub queue_length: usize,
}

/// 提交处理请求的结果
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    /// 没有可入队的文件时不创建任务批次
    pub job_id: Option<String>,
    pub files_queued: usize,
    pub files_skipped: usize,
    pub status: ProcessingStatus,
}

/// 取消操作的结果
#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    pub items_cleared: usize,
    pub status: ProcessingSnapshot,
}
