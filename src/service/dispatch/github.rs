use std::time::Duration;
use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Serialize;
use crate::config::DispatchConfig;
use crate::error::{AppError, AppResult};
use crate::model::build::ClientPayload;

#[derive(Debug, Serialize)]
struct DispatchEvent<'a> {
    event_type: &'a str,
    client_payload: &'a ClientPayload,
}

/// 通过 GitHub repository_dispatch 触发 CI 构建
#[derive(Clone)]
pub struct GithubDispatcher {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    event_type: String,
}

impl std::fmt::Debug for GithubDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubDispatcher")
            .field("endpoint", &self.endpoint)
            .field("event_type", &self.event_type)
            .finish()
    }
}

impl GithubDispatcher {
    pub fn new(config: &DispatchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build dispatch http client")?;

        let endpoint = format!(
            "{}/repos/{}/dispatches",
            config.api_base.trim_end_matches('/'),
            config.repo.trim_matches('/'),
        );

        Ok(Self {
            client,
            endpoint,
            token: config.token.clone(),
            event_type: config.event_type.clone(),
        })
    }

    #[cfg(test)]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 发送一次，不重试；非 2xx 视为失败
    pub async fn dispatch(&self, payload: &ClientPayload) -> AppResult<()> {
        let event = DispatchEvent {
            event_type: &self.event_type,
            client_payload: payload,
        };

        let response = self.client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github.v3+json")
            .header(USER_AGENT, concat!("app_builder/", env!("CARGO_PKG_VERSION")))
            .json(&event)
            .send()
            .await
            .map_err(|e| AppError::Dispatch(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Dispatch(format!("{} responded {}: {}", self.endpoint, status, body)));
        }

        tracing::info!("dispatched {} for {}", self.event_type, payload.app_id);
        Ok(())
    }
}
