use std::sync::Arc;
use anyhow::Result;
use sqlx::SqlitePool;
use crate::config::AppConfig;
use crate::repository::build::BuildRepository;
use crate::service::build::BuildService;
use crate::service::dispatch::GithubDispatcher;
use crate::service::storage::IconStorage;

/// 进程级共享状态，启动时构建一次
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub build_service: Arc<BuildService>,
    pub storage: IconStorage,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &"AppConfig")
            .field("build_service", &self.build_service)
            .finish()
    }
}

impl AppState {
    pub fn new(config: AppConfig, db_pool: SqlitePool) -> Result<Self> {
        let storage = IconStorage::from_config(&config.storage)?;
        let dispatcher = GithubDispatcher::new(&config.dispatch)?;

        let build_service = BuildService::new(
            BuildRepository::new(db_pool),
            storage.clone(),
            dispatcher,
            config.build.estimated_time.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            build_service: Arc::new(build_service),
            storage,
        })
    }
}
