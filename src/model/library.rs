use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 由派生产物推导出的文件状态
///
/// `Failed` 只出现在汇总标签中，状态判定本身不会产生它：
/// 文件系统只能表达“产物存在与否”，失败记录仅保存在任务批次里。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Markdown,
    Completed,
    Failed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Markdown => "markdown",
            FileStatus::Completed => "completed",
            FileStatus::Failed => "failed",
        }
    }

    /// 未指定重新处理时，只有尚未产出结构化记录的文件可入队
    pub fn is_eligible(&self) -> bool {
        matches!(self, FileStatus::Pending | FileStatus::Markdown)
    }
}

/// 输入目录中的一个源文件
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub id: String,
    pub filename: String,
    pub category: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub sequence: usize,
    /// 派生产物的文件名主干：`{category}-{sequence:03}`
    pub artifact_id: String,
    pub status: FileStatus,
}

/// 分类级别的状态汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub total_files: usize,
    pub pending: usize,
    pub markdown: usize,
    pub completed: usize,
    pub failed: usize,
}

impl CategorySummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, status: FileStatus) {
        self.total_files += 1;
        match status {
            FileStatus::Pending => self.pending += 1,
            FileStatus::Markdown => self.markdown += 1,
            FileStatus::Completed => self.completed += 1,
            FileStatus::Failed => self.failed += 1,
        }
    }
}
