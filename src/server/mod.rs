//! 服务器模块
//!
//! - 配置管理 (config.rs)
//! - HTTP服务器设置 (http.rs)
//!
//! 使用示例：
//! ```no_run
//! use paper_pipeline::server::ServerBootstrap;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let server = ServerBootstrap::new()?;
//! server.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod http;

pub use config::{ConfigManager, LoadedConfig};
pub use http::{HttpServer, ServerManager};

use crate::build_info;
use crate::util::config::Config;
use crate::util::logging::standards::events;
use crate::util::processing::{spawn_processing_worker, CommandStages, PipelineStages};
use crate::AppState;
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// 服务器引导程序 - 统一的服务器启动入口
pub struct ServerBootstrap {
    config: Config,
    _log_guard: Option<WorkerGuard>,
}

impl ServerBootstrap {
    /// 加载配置、初始化日志并检查配置
    pub fn new() -> Result<Self> {
        let loaded = ConfigManager::load_and_validate()?;
        let log_guard = ConfigManager::initialize_logging(&loaded.config)?;
        ConfigManager::log_report(&loaded);

        if loaded.report.has_errors() {
            return Err(anyhow!(
                "配置验证失败: {} 个错误",
                loaded.report.errors.len()
            ));
        }

        Ok(Self {
            config: loaded.config,
            _log_guard: log_guard,
        })
    }

    /// 启动服务器，阻塞直到收到退出信号且 Worker 退出
    pub async fn start(self) -> Result<()> {
        info!(
            event = events::SERVER_START,
            version = %build_info::summary(),
            address = %self.config.bind_address()
        );

        let app_state = AppState::new(self.config.clone());
        app_state
            .library
            .ensure_directories()
            .context("创建文档库目录失败")?;

        let stages: Arc<dyn PipelineStages> = Arc::new(CommandStages::from_config(
            &self.config.processing,
            Arc::clone(&app_state.library),
        ));
        let worker = spawn_processing_worker(Arc::clone(&app_state.coordinator), stages);

        let coordinator = Arc::clone(&app_state.coordinator);
        let server_result = match ServerManager::create_server(&self.config, app_state).await {
            Ok(server) => ServerManager::start_server(server).await,
            Err(e) => Err(e),
        };

        // 关闭队列，等待 Worker 完成当前文件
        let snapshot = coordinator.status();
        info!(
            event = events::SERVER_SHUTDOWN,
            status = %snapshot.status,
            current_file = ?snapshot.current_file,
            queue_length = snapshot.queue_length
        );
        coordinator.shutdown();

        let grace = Duration::from_secs(self.config.server.shutdown_grace_secs);
        match timeout(grace, worker).await {
            Ok(Ok(())) => info!("[ok] 处理Worker已退出"),
            Ok(Err(e)) => error!("处理Worker异常退出: {}", e),
            Err(_) => warn!(
                "[warn] 等待处理Worker超时（{}秒），当前文件可能未完成",
                grace.as_secs()
            ),
        }

        server_result
    }
}

/// 检查配置并输出验证结果，不启动服务
pub fn check_config() -> Result<bool> {
    let loaded = ConfigManager::load_and_validate()?;
    println!("配置文件: {}", loaded.path.display());
    for error in &loaded.report.errors {
        println!("[error] {}: {}", error.field, error.message);
    }
    for warning in &loaded.report.warnings {
        println!("[warn]  {}: {}", warning.field, warning.message);
    }
    Ok(loaded.report.is_valid())
}

/// 便捷入口
pub async fn start_server() -> Result<()> {
    ServerBootstrap::new()?.start().await
}
