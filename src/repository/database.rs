use std::str::FromStr;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, SqlitePool};
use anyhow::{Context, Result};
use crate::config::DatabaseConfig;

const CREATE_APPS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS apps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    app_id TEXT NOT NULL UNIQUE,
    name TEXT,
    website_url TEXT,
    package_name TEXT NOT NULL UNIQUE,
    notification_email TEXT,
    icon_url TEXT,
    primary_color TEXT NOT NULL,
    theme_mode TEXT NOT NULL,
    navigation BOOLEAN NOT NULL,
    pull_to_refresh BOOLEAN NOT NULL,
    orientation TEXT NOT NULL,
    enable_zoom BOOLEAN NOT NULL,
    keep_awake BOOLEAN NOT NULL,
    open_external_links BOOLEAN NOT NULL,
    build_format TEXT NOT NULL,
    status TEXT NOT NULL,
    config TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

pub async fn init_db(config: &DatabaseConfig) -> Result<SqlitePool> {
    tracing::info!("database url: {}", config.url);

    let options = SqliteConnectOptions::from_str(&config.url)
        .context("Invalid database url")?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    // package_name 的 UNIQUE 约束是并发下判重的最终依据
    pool.execute(CREATE_APPS_TABLE)
        .await
        .context("Failed to create table")?;

    Ok(pool)
}

#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    init_db(&DatabaseConfig {
        url: "sqlite::memory:".into(),
        max_connections: 1,
    })
    .await
    .unwrap()
}
