mod api;
mod config;
mod error;
mod model;
mod repository;
mod service;
mod util;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_error::ErrorLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, fmt, Layer};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置（日志目录来自配置）
    let config = config::AppConfig::load("config.toml").await?;

    let log_dir = PathBuf::from(&config.server.log_dir);
    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)?;
    }

    // 按日期滚动的日志文件
    let file_appender = tracing_appender::rolling::daily(&log_dir, "app_builder.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_filter(filter.clone());

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(ErrorLayer::default())
        .init();

    tracing::info!("log file: {}/app_builder.log", log_dir.display());

    // 数据库连接池只创建一次，注入到处理器
    let db_pool = repository::database::init_db(&config.database).await?;

    let bind = config.server.bind.clone();
    let app_state = api::AppState::new(config, db_pool)?;
    tracing::debug!("{:?}", app_state);

    let app = api::routes::create_router(app_state);

    let listener = TcpListener::bind(&bind).await?;
    tracing::info!("Server listening on {}", bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("shutdown signal received");
}
