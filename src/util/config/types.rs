//! 配置结构定义模块

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 主配置结构
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// 操作界面静态文件目录，挂载在 `/`
    #[serde(default)]
    pub static_dir: Option<String>,
    /// 退出时等待 Worker 完成当前文件的最长时间
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

/// 文档库目录配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default = "default_input_dir")]
    pub input_dir: String,
    #[serde(default = "default_markdown_dir")]
    pub markdown_dir: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// 识别为源文件的扩展名（不区分大小写）
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            markdown_dir: default_markdown_dir(),
            output_dir: default_output_dir(),
            extensions: default_extensions(),
        }
    }
}

impl LibraryConfig {
    /// 以同一个数据根目录重设三个目录
    pub fn rebase(&mut self, data_dir: &str) {
        let root = data_dir.trim_end_matches('/');
        self.input_dir = format!("{root}/input");
        self.markdown_dir = format!("{root}/markdown");
        self.output_dir = format!("{root}/output");
    }
}

fn default_input_dir() -> String {
    "data/input".to_string()
}

fn default_markdown_dir() -> String {
    "data/markdown".to_string()
}

fn default_output_dir() -> String {
    "data/output".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["pdf".to_string()]
}

/// 处理流程配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// 暂停时 Worker 复查状态的最长间隔（毫秒）
    #[serde(default = "default_pause_poll_interval_ms")]
    pub pause_poll_interval_ms: u64,
    /// 阶段1命令：源文件 → Markdown
    #[serde(default)]
    pub convert_command: Vec<String>,
    /// 阶段2命令：Markdown → 结构化记录
    #[serde(default)]
    pub extract_command: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            pause_poll_interval_ms: default_pause_poll_interval_ms(),
            convert_command: Vec::new(),
            extract_command: Vec::new(),
        }
    }
}

fn default_pause_poll_interval_ms() -> u64 {
    500
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: LogFileConfig,
    /// 是否输出 JSON 结构化日志
    #[serde(default)]
    pub structured: Option<bool>,
    #[serde(default)]
    pub level_config: Option<LevelConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: LogFileConfig::default(),
            structured: Some(false),
            level_config: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// 日志文件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogFileConfig {
    pub enabled: bool,
    pub directory: String,
    pub retention_days: Option<u32>,
}

impl Default for LogFileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: "runtime/logs".to_string(),
            retention_days: Some(7),
        }
    }
}

/// 按 target 覆盖日志级别，例如 `tower_http: debug`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LevelConfig {
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}
