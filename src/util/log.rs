use crate::util::config::{LevelConfig, LoggingConfig};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{filter::EnvFilter, Layer, Registry};

const CRATE_TARGET: &str = "paper_pipeline";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 按配置初始化日志：控制台 + 可选的按天滚动文件
///
/// 返回的 guard 需要在进程存活期间持有，否则文件日志会丢失。
pub fn log_init_with_config(
    file_prefix: &str,
    config: &LoggingConfig,
) -> anyhow::Result<Option<WorkerGuard>> {
    let level_filter = parse_level(&config.level);
    let filter_expression = build_env_filter_expression(level_filter, config.level_config.as_ref());
    let use_json = config.structured.unwrap_or(false);

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(console_layer(use_json, new_filter(&filter_expression, level_filter)));

    let mut guard = None;
    let mut log_dir = None;
    if config.file.enabled {
        let dir = resolve_log_dir(&config.file.directory);
        std::fs::create_dir_all(&dir)?;

        let file_appender = daily(&dir, format!("{}.log", file_prefix));
        let (writer, file_guard) = tracing_appender::non_blocking(file_appender);
        let filter = new_filter(&filter_expression, level_filter);
        let file_layer: BoxedLayer = if use_json {
            layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter)
                .boxed()
        } else {
            layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter)
                .boxed()
        };
        layers.push(file_layer);
        guard = Some(file_guard);
        log_dir = Some(dir);
    }

    Registry::default().with(layers).try_init()?;

    tracing::info!(
        event = "log.init",
        level = %config.level,
        file = log_dir.is_some(),
        directory = ?log_dir,
        rotation = "daily",
        structured = use_json
    );

    if let (Some(dir), Some(retention)) = (&log_dir, config.file.retention_days) {
        if retention > 0 {
            if let Err(e) = cleanup_old_logs(dir, file_prefix, retention) {
                tracing::warn!("清理旧日志失败: {}", e);
            }
        }
    }

    Ok(guard)
}

fn console_layer(use_json: bool, filter: EnvFilter) -> BoxedLayer {
    if use_json {
        layer()
            .json()
            .with_target(false)
            .with_writer(io::stdout)
            .with_filter(filter)
            .boxed()
    } else {
        layer()
            .with_target(false)
            .with_writer(io::stdout)
            .with_filter(filter)
            .boxed()
    }
}

fn new_filter(expression: &str, fallback: LevelFilter) -> EnvFilter {
    EnvFilter::try_new(expression).unwrap_or_else(|_| EnvFilter::new(level_filter_to_str(fallback)))
}

/// 相对路径基于工作目录；从 `bin/` 启动时基于上级目录
fn resolve_log_dir(directory: &str) -> PathBuf {
    let path = Path::new(directory);
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if current_dir.file_name() == Some(std::ffi::OsStr::new("bin")) {
        if let Some(parent) = current_dir.parent() {
            return parent.join(path);
        }
    }
    current_dir.join(path)
}

/// 删除超过保留天数的日志文件（只处理以 `file_prefix` 开头的文件）
pub fn cleanup_old_logs(log_dir: &Path, file_prefix: &str, retention_days: u32) -> anyhow::Result<usize> {
    if !log_dir.exists() {
        tracing::debug!("日志目录不存在: {}", log_dir.display());
        return Ok(0);
    }

    let retention = Duration::from_secs(u64::from(retention_days) * 24 * 60 * 60);
    let Some(cutoff) = SystemTime::now().checked_sub(retention) else {
        return Ok(0);
    };

    let mut deleted_count = 0;
    let mut error_count = 0;

    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        let is_log = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(file_prefix))
            .unwrap_or(false);
        if !is_log {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata.modified().unwrap_or_else(|_| SystemTime::now());
        if modified < cutoff {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    deleted_count += 1;
                    tracing::debug!("已删除过期日志: {}", path.display());
                }
                Err(e) => {
                    error_count += 1;
                    tracing::warn!("删除日志文件失败: {} - {}", path.display(), e);
                }
            }
        }
    }

    if deleted_count > 0 {
        tracing::info!("已清理 {} 个过期日志文件", deleted_count);
    }
    if error_count > 0 {
        tracing::warn!("有 {} 个文件清理失败", error_count);
    }

    Ok(deleted_count)
}

fn parse_level(level: &str) -> LevelFilter {
    match normalize_level_str(level) {
        Some("trace") => LevelFilter::TRACE,
        Some("debug") => LevelFilter::DEBUG,
        Some("warn") => LevelFilter::WARN,
        Some("error") => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

fn build_env_filter_expression(
    default_level: LevelFilter,
    level_config: Option<&LevelConfig>,
) -> String {
    let mut directives = vec![level_filter_to_str(default_level).to_string()];

    if let Some(cfg) = level_config {
        let mut overrides: Vec<_> = cfg.overrides.iter().collect();
        overrides.sort();
        for (target, level_str) in overrides {
            if let Some(level) = normalize_level_str(level_str) {
                directives.push(format!("{}={level}", normalize_directive_target(target)));
            }
        }
    }

    directives.join(",")
}

fn normalize_level_str(level: &str) -> Option<&'static str> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

fn level_filter_to_str(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::OFF => "off",
        LevelFilter::ERROR => "error",
        LevelFilter::WARN => "warn",
        LevelFilter::INFO => "info",
        LevelFilter::DEBUG => "debug",
        LevelFilter::TRACE => "trace",
    }
}

/// `worker` → `paper_pipeline::worker`；`target:tower_http` 原样使用
fn normalize_directive_target(target: &str) -> String {
    if let Some(raw) = target.strip_prefix("target:") {
        raw.to_string()
    } else if target.contains("::") {
        target.to_string()
    } else {
        let path = target.replace('.', "::");
        format!("{CRATE_TARGET}::{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_filter_expression_with_overrides() {
        let cfg = LevelConfig {
            overrides: HashMap::from([
                ("util.processing".to_string(), "DEBUG".to_string()),
                ("target:tower_http".to_string(), "warn".to_string()),
                ("api".to_string(), "loud".to_string()),
            ]),
        };

        let expr = build_env_filter_expression(LevelFilter::INFO, Some(&cfg));
        assert_eq!(
            expr,
            "info,tower_http=warn,paper_pipeline::util::processing=debug"
        );
        assert!(EnvFilter::try_new(&expr).is_ok());
    }

    #[test]
    fn test_parse_level_falls_back_to_info() {
        assert_eq!(parse_level("Debug"), LevelFilter::DEBUG);
        assert_eq!(parse_level("nonsense"), LevelFilter::INFO);
    }

    #[test]
    fn test_cleanup_keeps_recent_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("paper-pipeline.log.2026-01-01"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let deleted = cleanup_old_logs(dir.path(), "paper-pipeline", 7).unwrap();
        assert_eq!(deleted, 0);
        assert!(dir.path().join("paper-pipeline.log.2026-01-01").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_cleanup_missing_dir_is_ok() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            cleanup_old_logs(&dir.path().join("missing"), "paper-pipeline", 7).unwrap(),
            0
        );
    }
}
