//! 配置验证模块
//! 启动前检查配置，错误会中止启动，警告只记录日志

use super::types::*;
use std::path::Path;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// 配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 全面验证配置
    pub fn validate_all(config: &Config) -> ValidationReport {
        let mut report = ValidationReport::new();

        Self::validate_server_config(&config.server, &mut report);
        Self::validate_library_config(&config.library, &mut report);
        Self::validate_processing_config(&config.processing, &mut report);
        Self::validate_logging_config(&config.logging, &mut report);

        report
    }

    fn validate_server_config(config: &ServerConfig, report: &mut ValidationReport) {
        if config.port == 0 {
            report.add_error("server.port", "无效的端口号: 0");
        }
        if config.host.trim().is_empty() {
            report.add_error("server.host", "监听地址不能为空");
        }
        if let Some(dir) = &config.static_dir {
            if !Path::new(dir).is_dir() {
                report.add_warning(
                    "server.static_dir",
                    &format!("静态文件目录不存在，将不挂载界面: {}", dir),
                );
            }
        }
    }

    fn validate_library_config(config: &LibraryConfig, report: &mut ValidationReport) {
        let dirs = [
            ("library.input_dir", &config.input_dir),
            ("library.markdown_dir", &config.markdown_dir),
            ("library.output_dir", &config.output_dir),
        ];
        for (field, dir) in dirs {
            if dir.trim().is_empty() {
                report.add_error(field, "目录不能为空");
            }
        }

        if config.markdown_dir == config.output_dir
            || config.input_dir == config.markdown_dir
            || config.input_dir == config.output_dir
        {
            report.add_error("library", "输入目录与两个产物目录必须互不相同");
        }

        if config.extensions.is_empty() {
            report.add_error("library.extensions", "至少需要一个源文件扩展名");
        }

        if !Path::new(&config.input_dir).exists() {
            report.add_warning(
                "library.input_dir",
                &format!("输入目录不存在，将自动创建: {}", config.input_dir),
            );
        }
    }

    fn validate_processing_config(config: &ProcessingConfig, report: &mut ValidationReport) {
        if config.pause_poll_interval_ms == 0 {
            report.add_error("processing.pause_poll_interval_ms", "暂停轮询间隔必须大于0");
        }
        if config.convert_command.is_empty() {
            report.add_warning(
                "processing.convert_command",
                "未配置阶段1命令，所有文件都会在阶段1失败",
            );
        }
        if config.extract_command.is_empty() {
            report.add_warning(
                "processing.extract_command",
                "未配置阶段2命令，所有文件都会在阶段2失败",
            );
        }
    }

    fn validate_logging_config(config: &LoggingConfig, report: &mut ValidationReport) {
        if !VALID_LEVELS.contains(&config.level.as_str()) {
            report.add_error("logging.level", &format!("无效的日志级别: {}", config.level));
        }

        if config.file.enabled {
            if config.file.directory.trim().is_empty() {
                report.add_error("logging.file.directory", "日志目录不能为空");
            }
            if config.file.retention_days == Some(0) {
                report.add_warning("logging.file.retention_days", "日志保留天数为0，日志将不会被清理");
            }
        }

        if config.structured == Some(true) {
            report.add_info("logging.structured", "已启用JSON结构化日志");
        }
    }
}

/// 验证报告
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub info: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors.push(ValidationIssue::new(field, message));
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationIssue::new(field, message));
    }

    pub fn add_info(&mut self, field: &str, message: &str) {
        self.info.push(ValidationIssue::new(field, message));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }
}

/// 验证问题
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}
