pub mod jobs;
pub mod library;
pub mod monitoring;
pub mod process;

use std::path::Path;

use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::util::middleware;
use crate::AppState;

/// 创建CORS配置
fn create_cors_layer(default_port: u16) -> CorsLayer {
    // 从环境变量读取允许的域名，默认为本地开发
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| {
        format!("http://localhost:{default_port},http://127.0.0.1:{default_port}")
    });

    info!("[global] CORS配置 - 允许的源: {}", allowed_origins);

    CorsLayer::new()
        .allow_origin(
            allowed_origins
                .split(',')
                .filter_map(|s| match s.trim().parse() {
                    Ok(origin) => Some(origin),
                    Err(e) => {
                        warn!("无效的CORS源: {} - {}", s, e);
                        None
                    }
                })
                .collect::<Vec<_>>(),
        )
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
}

pub fn routes(app_state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/health", get(monitoring::basic_health_check))
        .route("/api/status", get(process::get_status))
        .route("/api/process/all", post(process::process_all))
        .route(
            "/api/process/category/:category",
            post(process::process_category),
        )
        .route("/api/process/file/:file_id", post(process::process_file))
        .route("/api/process/pause", post(process::pause))
        .route("/api/process/resume", post(process::resume))
        .route("/api/process/cancel", post(process::cancel))
        .route("/api/jobs", get(jobs::list_jobs))
        .route("/api/jobs/:job_id", get(jobs::get_job))
        .route("/api/categories", get(library::list_categories))
        .route(
            "/api/categories/:category/files",
            get(library::list_category_files),
        )
        .route("/api/files/:file_id/reprocess", post(process::reprocess_file));

    let cors = create_cors_layer(app_state.config.server.port);

    // 操作界面静态文件（可选）
    let router = match app_state.config.server.static_dir.as_deref() {
        Some(dir) if Path::new(dir).is_dir() => {
            info!("[search] 使用静态文件目录: {}", dir);
            api_routes.fallback_service(ServeDir::new(dir))
        }
        Some(dir) => {
            warn!("[warn] 静态文件目录不存在，不挂载界面: {}", dir);
            api_routes
        }
        None => api_routes,
    };

    router
        .with_state(app_state)
        .layer(from_fn(middleware::request_logging_middleware))
        .layer(cors)
}
