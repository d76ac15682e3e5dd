//! 配置管理模块
//! 负责配置文件的查找、加载、验证和日志初始化

use crate::util::config::{Config, ConfigLoader, ConfigValidator, ConfigWriter, ValidationReport};
use crate::util::log::log_init_with_config;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

pub const CONFIG_FILE_NAME: &str = "config.yaml";
const LOG_FILE_PREFIX: &str = "paper-pipeline";

/// 已加载的配置及其来源
pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
    pub report: ValidationReport,
    /// 配置文件不存在，使用了默认模板
    pub generated: bool,
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 加载和验证配置
    ///
    /// 此时日志系统尚未初始化，结果通过 [`ConfigManager::log_report`] 在初始化后输出。
    pub fn load_and_validate() -> Result<LoadedConfig> {
        let path = match std::env::var("PIPELINE_CONFIG") {
            Ok(explicit) if !explicit.trim().is_empty() => PathBuf::from(explicit.trim()),
            _ => Self::find_config_file_path(CONFIG_FILE_NAME),
        };
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Result<LoadedConfig> {
        let (config, generated) = if path.exists() {
            (ConfigLoader::load_with_env_overrides(path)?, false)
        } else {
            let template = ConfigWriter::generate_template();
            // 写入失败不影响使用默认配置启动
            let _ = ConfigWriter::write_yaml_with_dir(&template, path);
            (ConfigLoader::apply_env_overrides(template), true)
        };

        let report = ConfigValidator::validate_all(&config);
        Ok(LoadedConfig {
            config,
            path: path.to_path_buf(),
            report,
            generated,
        })
    }

    /// 初始化日志系统
    pub fn initialize_logging(config: &Config) -> Result<Option<WorkerGuard>> {
        let guard = log_init_with_config(LOG_FILE_PREFIX, &config.logging)?;
        info!("[ok] 日志系统初始化完成");
        Ok(guard)
    }

    /// 输出配置来源与验证结果
    pub fn log_report(loaded: &LoadedConfig) {
        if loaded.generated {
            info!("[note] 配置文件不存在，已生成默认配置: {}", loaded.path.display());
        } else {
            info!("配置文件路径: {}", loaded.path.display());
        }

        let report = &loaded.report;
        for error in &report.errors {
            warn!("  - [error] {}: {}", error.field, error.message);
        }
        for warning in &report.warnings {
            warn!("  - [warn] {}: {}", warning.field, warning.message);
        }
        for item in &report.info {
            info!("  - {}: {}", item.field, item.message);
        }
    }

    /// 查找配置文件路径，适应开发和生产环境
    pub fn find_config_file_path(filename: &str) -> PathBuf {
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        // 当前目录下的 config/
        let config_in_current = current_dir.join("config").join(filename);
        if config_in_current.exists() {
            return config_in_current;
        }

        // 从 bin/ 启动时使用上级目录的 config/
        if let Some(parent) = current_dir.parent() {
            let config_in_parent = parent.join("config").join(filename);
            if config_in_parent.exists() {
                return config_in_parent;
            }
        }

        let dev_path = current_dir.join(filename);
        if dev_path.exists() {
            return dev_path;
        }

        if current_dir.file_name() == Some(std::ffi::OsStr::new("bin")) {
            if let Some(parent) = current_dir.parent() {
                return parent.join("config").join(filename);
            }
        }
        current_dir.join("config").join(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_generates_template() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config").join(CONFIG_FILE_NAME);

        let loaded = ConfigManager::load_from_path(&path).unwrap();
        assert!(loaded.generated);
        assert!(path.exists());
        assert!(!loaded.config.processing.convert_command.is_empty());

        let reloaded = ConfigManager::load_from_path(&path).unwrap();
        assert!(!reloaded.generated);
        assert_eq!(
            reloaded.config.processing.convert_command,
            loaded.config.processing.convert_command
        );
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "server: [unclosed").unwrap();

        assert!(ConfigManager::load_from_path(&path).is_err());
    }
}
