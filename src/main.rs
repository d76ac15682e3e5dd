use std::io::Write;

use paper_pipeline::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        let payload = panic_info.payload();
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s
        } else {
            "Unknown panic payload"
        };

        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "Unknown location".to_string());

        // 阶段内的 panic 会被 Worker 捕获并记为失败，这里只负责记录
        tracing::error!(
            event = "panic.raised",
            location = %location,
            reason = %message,
            thread = std::thread::current().name().unwrap_or("unnamed")
        );
        eprintln!(
            "[PANIC] {} 位置: {} 原因: {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
            location,
            message
        );
        std::io::stderr().flush().ok();
    }));

    let mut args = std::env::args();
    let _ = args.next();

    match args.next().as_deref() {
        Some("check-config") | Some("--check-config") => {
            if server::check_config()? {
                println!("配置检查通过");
                Ok(())
            } else {
                Err(anyhow::anyhow!("配置检查未通过"))
            }
        }
        Some("version") | Some("--version") => {
            println!("{}", paper_pipeline::build_info::summary());
            Ok(())
        }
        _ => server::start_server().await,
    }
}
