use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use crate::config::{StorageBackend, StorageConfig};
use crate::error::{AppError, AppResult};

pub const ICON_CONTENT_TYPE: &str = "image/png";

/// 图标对象的存储 key
pub fn icon_key(app_id: &str) -> String {
    format!("{}/icon.png", app_id)
}

/// 图标存储，按配置选择后端
#[derive(Debug, Clone)]
pub enum IconStorage {
    Supabase(SupabaseStorage),
    Local(LocalStorage),
}

impl IconStorage {
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        match config.backend {
            StorageBackend::Supabase => Ok(IconStorage::Supabase(SupabaseStorage::new(config)?)),
            StorageBackend::Local => Ok(IconStorage::Local(LocalStorage::new(config))),
        }
    }

    /// 上传图标（覆盖同名对象），返回公开访问地址
    pub async fn upload_icon(&self, app_id: &str, data: Vec<u8>) -> AppResult<String> {
        let key = icon_key(app_id);
        match self {
            IconStorage::Supabase(storage) => {
                storage.upload(&key, data, ICON_CONTENT_TYPE).await?;
                Ok(storage.public_url(&key))
            }
            IconStorage::Local(storage) => {
                storage.upload(&key, data).await?;
                Ok(storage.public_url(&key))
            }
        }
    }
}

/// Supabase Storage REST 接口
#[derive(Clone)]
pub struct SupabaseStorage {
    client: reqwest::Client,
    url: String,
    service_key: String,
    bucket: String,
}

impl std::fmt::Debug for SupabaseStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStorage")
            .field("url", &self.url)
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl SupabaseStorage {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build storage http client")?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
            bucket: config.bucket.clone(),
        })
    }

    pub async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> AppResult<()> {
        let endpoint = format!("{}/storage/v1/object/{}/{}", self.url, self.bucket, key);
        tracing::debug!("uploading {} bytes to {}", data.len(), endpoint);

        let response = self.client
            .post(&endpoint)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(data)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("upload request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!("upload returned {}: {}", status, body)));
        }

        Ok(())
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.url, self.bucket, key)
    }
}

/// 本地目录存储，配合 `/icons` 静态路由使用
#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    pub async fn upload(&self, key: &str, data: Vec<u8>) -> AppResult<()> {
        let path = self.dir.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("create {:?}: {}", parent, e)))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("write {:?}: {}", path, e)))?;

        Ok(())
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}
