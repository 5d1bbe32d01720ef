use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use anyhow::{Context, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Supabase,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,
    // supabase
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub service_key: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    // local
    #[serde(default = "default_local_dir")]
    pub dir: String,
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// `owner/name`
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_event_type")]
    pub event_type: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_estimated_time")]
    pub estimated_time: String,
}

fn default_bind() -> String { "0.0.0.0:3000".into() }
fn default_max_body_bytes() -> usize { 5 * 1024 * 1024 }
fn default_log_dir() -> String { "logs".into() }
fn default_database_url() -> String { "sqlite://app_builder.db".into() }
fn default_max_connections() -> u32 { 5 }
fn default_storage_backend() -> StorageBackend { StorageBackend::Supabase }
fn default_bucket() -> String { "app-icons".into() }
fn default_local_dir() -> String { "icons".into() }
fn default_public_base_url() -> String { "http://localhost:3000/icons".into() }
fn default_timeout_secs() -> u64 { 30 }
fn default_api_base() -> String { "https://api.github.com".into() }
fn default_event_type() -> String { "build-app".into() }
fn default_estimated_time() -> String { "5-10 minutes".into() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            log_dir: default_log_dir(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            url: String::new(),
            service_key: String::new(),
            bucket: default_bucket(),
            dir: default_local_dir(),
            public_base_url: default_public_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            repo: String::new(),
            token: String::new(),
            event_type: default_event_type(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { estimated_time: default_estimated_time() }
    }
}

impl AppConfig {
    /// 加载配置：配置文件（可选）→ APP_BUILDER__* 环境变量 → 部署环境中已有的变量
    pub async fn load(path: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("APP_BUILDER").separator("__").try_parsing(true))
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("storage.url", env::var("SUPABASE_URL").ok())?
            .set_override_option("storage.service_key", env::var("SUPABASE_SERVICE_KEY").ok())?
            .set_override_option("dispatch.repo", env::var("GITHUB_REPO").ok())?
            .set_override_option("dispatch.token", env::var("GITHUB_TOKEN").ok())?
            .build()
            .context("Failed to load config")?;

        let app_config: AppConfig = config.try_deserialize()
            .context("Failed to deserialize config")?;

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dispatch.repo.trim().is_empty() {
            anyhow::bail!("dispatch.repo (GITHUB_REPO) must be set");
        }
        if self.dispatch.token.trim().is_empty() {
            anyhow::bail!("dispatch.token (GITHUB_TOKEN) must be set");
        }
        if self.storage.backend == StorageBackend::Supabase
            && (self.storage.url.trim().is_empty() || self.storage.service_key.trim().is_empty())
        {
            anyhow::bail!("storage.url and storage.service_key (SUPABASE_URL / SUPABASE_SERVICE_KEY) must be set for the supabase backend");
        }
        Ok(())
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "sqlite::memory:".into(),
                max_connections: 1,
            },
            storage: StorageConfig {
                backend: StorageBackend::Local,
                ..StorageConfig::default()
            },
            dispatch: DispatchConfig {
                repo: "acme/app-factory".into(),
                token: "test-token".into(),
                ..DispatchConfig::default()
            },
            build: BuildConfig::default(),
        }
    }
}
