//! 配置加载和管理模块
//! 处理配置文件的读取、写入、环境变量覆盖和默认值生成

use super::types::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从YAML文件读取配置
    pub fn read_yaml(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config = serde_yaml::from_str(&config_str)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        Ok(config)
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(config: Config) -> Config {
        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    /// 按给定的变量来源应用覆盖（便于测试）
    pub fn apply_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
        if let Some(host) = lookup("PIPELINE_HOST") {
            tracing::info!("[ok] 环境变量覆盖服务器地址: {}", host);
            config.server.host = host;
        }

        if let Some(port_str) = lookup("PIPELINE_PORT") {
            match port_str.trim().parse::<u16>() {
                Ok(port) => {
                    config.server.port = port;
                    tracing::info!("[ok] 环境变量覆盖服务器端口: {}", port);
                }
                Err(_) => tracing::warn!("[warn] PIPELINE_PORT 无效: {}", port_str),
            }
        }

        if let Some(data_dir) = lookup("PIPELINE_DATA_DIR") {
            let trimmed = data_dir.trim();
            if trimmed.is_empty() {
                tracing::warn!("[warn] PIPELINE_DATA_DIR 为空，保持配置文件中的目录");
            } else {
                config.library.rebase(trimmed);
                tracing::info!("[ok] 环境变量覆盖数据根目录: {}", trimmed);
            }
        }

        if let Some(level) = lookup("PIPELINE_LOG_LEVEL") {
            config.logging.level = level.trim().to_ascii_lowercase();
            tracing::info!("[ok] 环境变量覆盖日志级别: {}", config.logging.level);
        }

        if let Some(flag) = lookup("PIPELINE_LOG_STRUCTURED") {
            match Self::parse_bool(&flag) {
                Ok(structured) => {
                    config.logging.structured = Some(structured);
                    tracing::info!("[ok] 环境变量覆盖结构化日志: {}", structured);
                }
                Err(()) => {
                    tracing::warn!("[warn] PIPELINE_LOG_STRUCTURED 无法解析为布尔值: {}", flag)
                }
            }
        }

        config
    }

    /// 解析布尔环境变量
    fn parse_bool(value: &str) -> Result<bool, ()> {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Ok(true),
            "false" | "0" | "no" | "n" => Ok(false),
            _ => Err(()),
        }
    }

    /// 配置加载（配置文件 + 环境变量）
    pub fn load_with_env_overrides(path: impl AsRef<Path>) -> Result<Config> {
        let base_config = Self::read_yaml(path)?;
        Ok(Self::apply_env_overrides(base_config))
    }
}

/// 配置写入器
pub struct ConfigWriter;

impl ConfigWriter {
    /// 写入配置到指定路径，确保目录存在
    pub fn write_yaml_with_dir(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("创建配置目录失败: {}", parent.display()))?;
        }

        let yaml_content = serde_yaml::to_string(config)?;
        fs::write(path, yaml_content)
            .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
        Ok(())
    }

    /// 生成配置模板
    pub fn generate_template() -> Config {
        Config {
            processing: ProcessingConfig {
                convert_command: vec![
                    "paper-convert".to_string(),
                    "{source}".to_string(),
                    "--output".to_string(),
                    "{markdown}".to_string(),
                    "--sequence".to_string(),
                    "{sequence}".to_string(),
                ],
                extract_command: vec![
                    "paper-extract".to_string(),
                    "{markdown}".to_string(),
                    "--category".to_string(),
                    "{category}".to_string(),
                    "--output".to_string(),
                    "{record}".to_string(),
                ],
                ..ProcessingConfig::default()
            },
            ..Config::default()
        }
    }
}
