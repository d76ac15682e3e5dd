//! HTTP服务器设置模块
//! 负责创建、启动HTTP服务器以及优雅关闭

use crate::api::routes;
use crate::util::config::Config;
use crate::AppState;
use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tracing::{info, warn};

/// HTTP服务器管理器
pub struct ServerManager;

impl ServerManager {
    /// 创建HTTP服务器
    pub async fn create_server(config: &Config, app_state: AppState) -> Result<HttpServer> {
        let address = config.bind_address();
        info!(
            target: "server.http",
            event = "http.server.bind_start",
            address = %address
        );

        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("端口绑定失败: {}", address))?;
        let local_addr = listener.local_addr()?;

        let app_routes = routes(app_state);

        info!(
            target: "server.http",
            event = "http.server.ready",
            address = %local_addr
        );

        Ok(HttpServer {
            listener,
            app_routes,
            local_addr,
        })
    }

    /// 启动服务器，收到退出信号后停止接收新请求
    pub async fn start_server(server: HttpServer) -> Result<()> {
        info!(
            target: "server.http",
            event = "http.server.start",
            address = %server.local_addr
        );

        axum::serve(server.listener, server.app_routes)
            .with_graceful_shutdown(Self::shutdown_signal())
            .await?;

        info!("HTTP服务器已关闭");
        Ok(())
    }

    /// 优雅关闭信号处理
    async fn shutdown_signal() {
        tokio::select! {
            _ = ctrl_c() => {
                info!(
                    target: "server.http",
                    event = "http.server.signal",
                    signal = "SIGINT"
                );
            }
            _ = Self::wait_for_unix_signal("SIGTERM") => {
                info!(
                    target: "server.http",
                    event = "http.server.signal",
                    signal = "SIGTERM"
                );
            }
            _ = Self::wait_for_unix_signal("SIGHUP") => {
                warn!(
                    target: "server.http",
                    event = "http.server.signal",
                    signal = "SIGHUP",
                    "暂不支持配置重载，准备退出"
                );
            }
        }

        info!(
            target: "server.http",
            event = "http.server.shutdown_begin"
        );
    }

    #[cfg(unix)]
    async fn wait_for_unix_signal(name: &'static str) {
        use tokio::signal::unix::{signal, SignalKind};

        let kind = match name {
            "SIGHUP" => SignalKind::hangup(),
            _ => SignalKind::terminate(),
        };
        match signal(kind) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("注册{}信号失败: {}", name, e);
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(unix))]
    async fn wait_for_unix_signal(_name: &'static str) {
        std::future::pending::<()>().await;
    }
}

/// HTTP服务器实例
pub struct HttpServer {
    listener: TcpListener,
    app_routes: Router,
    local_addr: std::net::SocketAddr,
}

impl HttpServer {
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }
}
