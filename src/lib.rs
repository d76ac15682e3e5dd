use std::sync::Arc;

use chrono::{DateTime, Utc};

pub mod api;
pub mod build_info;
pub mod model;
pub mod server;
pub mod storage;
pub mod util;

use storage::Library;
use util::config::Config;
use util::processing::ProcessingCoordinator;

/// 应用状态结构
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub library: Arc<Library>,
    pub coordinator: Arc<ProcessingCoordinator>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// 按配置创建文档库与协调器（不启动 Worker）
    pub fn new(config: Config) -> Self {
        let library = Arc::new(Library::from_config(&config.library));
        let coordinator = Arc::new(ProcessingCoordinator::from_config(
            Arc::clone(&library),
            &config.processing,
        ));
        Self {
            config: Arc::new(config),
            library,
            coordinator,
            started_at: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
