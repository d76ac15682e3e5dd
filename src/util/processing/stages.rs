//! 外部处理阶段接口
//!
//! 阶段1：源文件 → Markdown；阶段2：Markdown → 结构化记录。
//! 两个阶段的具体引擎不在本服务内实现，默认通过配置的外部命令调用。

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::storage::Library;
use crate::util::config::ProcessingConfig;

/// 协调器调用的两个外部阶段
///
/// 返回 `Ok(false)` 或 `Err` 都视为该文件失败；成功时由实现方负责落盘产物。
#[async_trait]
pub trait PipelineStages: Send + Sync {
    async fn convert_to_markup(
        &self,
        source_path: &Path,
        category: &str,
        sequence_hint: usize,
    ) -> Result<bool>;

    async fn generate_record(&self, markup_path: &Path, category: &str) -> Result<bool>;
}

/// 通过外部程序执行阶段
///
/// 参数支持占位符：`{source}` `{category}` `{sequence}` `{markdown}` `{record}`。
/// `{markdown}` 与 `{record}` 展开为 `<category>-<seq>.md` / `.json` 产物路径。
/// 进程退出码为0即视为成功。
pub struct CommandStages {
    convert_command: Vec<String>,
    extract_command: Vec<String>,
    library: Arc<Library>,
}

struct Placeholders<'a> {
    source: &'a Path,
    category: &'a str,
    sequence: Option<usize>,
    markdown: &'a Path,
    record: &'a Path,
}

impl CommandStages {
    pub fn new(
        convert_command: Vec<String>,
        extract_command: Vec<String>,
        library: Arc<Library>,
    ) -> Self {
        Self {
            convert_command,
            extract_command,
            library,
        }
    }

    pub fn from_config(config: &ProcessingConfig, library: Arc<Library>) -> Self {
        Self::new(
            config.convert_command.clone(),
            config.extract_command.clone(),
            library,
        )
    }

    fn render(template: &[String], values: &Placeholders<'_>) -> Vec<String> {
        let sequence = values
            .sequence
            .map(|n| format!("{n:03}"))
            .unwrap_or_default();
        template
            .iter()
            .map(|arg| {
                arg.replace("{source}", &values.source.to_string_lossy())
                    .replace("{category}", values.category)
                    .replace("{sequence}", &sequence)
                    .replace("{markdown}", &values.markdown.to_string_lossy())
                    .replace("{record}", &values.record.to_string_lossy())
            })
            .collect()
    }

    async fn run(stage: &'static str, args: Vec<String>, output: &Path) -> Result<bool> {
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| anyhow!("未配置{}命令", stage))?;

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("创建输出目录失败: {}", parent.display()))?;
        }

        let started = Instant::now();
        let result = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("启动{}命令失败: {}", stage, program))?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if result.status.success() {
            debug!(stage, program = %program, elapsed_ms, "阶段命令执行成功");
            return Ok(true);
        }

        let stderr = String::from_utf8_lossy(&result.stderr);
        let tail: String = stderr
            .lines()
            .rev()
            .take(5)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join(" | ");
        warn!(
            stage,
            program = %program,
            exit_code = ?result.status.code(),
            elapsed_ms,
            stderr = %tail,
            "阶段命令返回失败"
        );
        Ok(false)
    }
}

#[async_trait]
impl PipelineStages for CommandStages {
    async fn convert_to_markup(
        &self,
        source_path: &Path,
        category: &str,
        sequence_hint: usize,
    ) -> Result<bool> {
        let markdown = self.library.markdown_path(category, sequence_hint);
        let record = self.library.record_path(category, sequence_hint);
        let args = Self::render(
            &self.convert_command,
            &Placeholders {
                source: source_path,
                category,
                sequence: Some(sequence_hint),
                markdown: &markdown,
                record: &record,
            },
        );
        Self::run("convert", args, &markdown).await
    }

    async fn generate_record(&self, markup_path: &Path, category: &str) -> Result<bool> {
        if markup_path.file_stem().is_none() {
            return Err(anyhow!("无效的文件路径: {}", markup_path.display()));
        }
        let record = self.library.record_path_for_markup(markup_path, category);
        let args = Self::render(
            &self.extract_command,
            &Placeholders {
                source: markup_path,
                category,
                sequence: None,
                markdown: markup_path,
                record: &record,
            },
        );
        Self::run("extract", args, &record).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn library(dir: &TempDir) -> Arc<Library> {
        let root = dir.path();
        Arc::new(Library::new(
            root.join("input"),
            root.join("markdown"),
            root.join("output"),
            vec!["pdf".to_string()],
        ))
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_command_stages_write_artifacts() {
        let dir = TempDir::new().unwrap();
        let library = library(&dir);
        let stages = CommandStages::new(
            sh("printf '# {category} {sequence}' > '{markdown}'"),
            sh("cat '{markdown}' > '{record}'"),
            Arc::clone(&library),
        );

        let source = library.input_dir().join("Req_1").join("paper.pdf");
        assert!(stages.convert_to_markup(&source, "Req_1", 7).await.unwrap());

        let markdown = library.markdown_path("Req_1", 7);
        assert!(markdown.ends_with("Req_1/Req_1-007.md"));
        assert_eq!(
            std::fs::read_to_string(&markdown).unwrap(),
            "# Req_1 007"
        );

        assert!(stages.generate_record(&markdown, "Req_1").await.unwrap());
        assert!(library.record_path("Req_1", 7).exists());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let dir = TempDir::new().unwrap();
        let stages = CommandStages::new(sh("exit 3"), sh("exit 0"), library(&dir));
        let ok = stages
            .convert_to_markup(Path::new("/tmp/x.pdf"), "Req_1", 1)
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_missing_command_is_error() {
        let dir = TempDir::new().unwrap();
        let stages = CommandStages::new(Vec::new(), Vec::new(), library(&dir));
        assert!(stages
            .generate_record(Path::new("/tmp/x.md"), "Req_1")
            .await
            .is_err());

        let stages = CommandStages::new(
            vec!["/nonexistent/program".to_string()],
            Vec::new(),
            library(&dir),
        );
        assert!(stages
            .convert_to_markup(Path::new("/tmp/x.pdf"), "Req_1", 1)
            .await
            .is_err());
    }
}
