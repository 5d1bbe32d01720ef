use crate::error::{AppError, AppResult};
use crate::model::build::{BuildForm, BuildSubmission, ClientPayload, CreateBuildResponse, NewBuild};
use crate::model::state::BuildStatus;
use crate::repository::build::BuildRepository;
use crate::service::dispatch::GithubDispatcher;
use crate::service::storage::IconStorage;
use crate::util::id::generate_app_id;

/// 处理一次构建申请：校验 → 判重 → 上传图标 → 入库 → 触发 CI → 更新状态
///
/// 各步骤只执行一次，不重试。
pub struct BuildService {
    repo: BuildRepository,
    storage: IconStorage,
    dispatcher: GithubDispatcher,
    estimated_time: String,
}

impl std::fmt::Debug for BuildService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildService")
            .field("repo", &"BuildRepository")
            .field("storage", &self.storage)
            .field("dispatcher", &self.dispatcher)
            .field("estimated_time", &self.estimated_time)
            .finish()
    }
}

impl BuildService {
    pub fn new(
        repo: BuildRepository,
        storage: IconStorage,
        dispatcher: GithubDispatcher,
        estimated_time: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            storage,
            dispatcher,
            estimated_time: estimated_time.into(),
        }
    }

    #[cfg(test)]
    pub fn repo(&self) -> &BuildRepository {
        &self.repo
    }

    pub async fn create_build(&self, form: BuildForm) -> AppResult<CreateBuildResponse> {
        let submission = BuildSubmission::from_form(&form);

        // 包名校验必须在任何 I/O 之前
        let package_name = submission.validated_package_name()?.to_string();

        // 快速判重；并发下以插入时的唯一约束为准
        if self.repo.package_name_exists(&package_name).await? {
            return Err(AppError::DuplicatePackageName);
        }

        let app_id = generate_app_id()?;

        // 图标先上传，结果写入记录；后续失败时不清理已上传的对象
        let icon_url = match form.icon {
            Some(data) => Some(self.storage.upload_icon(&app_id, data).await?),
            None => None,
        };

        let build = NewBuild {
            app_id: app_id.clone(),
            package_name,
            icon_url,
            submission,
        };

        let record = self.repo.create(&build).await?;
        tracing::info!("build {} created for {} (record #{})", app_id, record.package_name, record.id);

        if let Err(e) = self.dispatcher.dispatch(&ClientPayload::from(&build)).await {
            // 尽力回滚为 failed，回滚本身失败只记日志
            if let Err(update_err) = self.repo.update_status(&app_id, BuildStatus::Failed).await {
                tracing::warn!("failed to mark build {} as failed: {}", app_id, update_err);
            }
            return Err(e);
        }

        if let Err(e) = self.repo.update_status(&app_id, BuildStatus::Building).await {
            tracing::warn!("failed to mark build {} as building: {}", app_id, e);
        }

        let email = build.submission.notification_email.as_deref().unwrap_or_default();
        Ok(CreateBuildResponse {
            success: true,
            message: format!(
                "Build started! You will receive an email at {} within {}.",
                email, self.estimated_time
            ),
            app_id,
            estimated_time: self.estimated_time.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use axum::{http::StatusCode, routing::post, Router};
    use crate::config::{DispatchConfig, StorageBackend, StorageConfig};
    use crate::repository::database::memory_pool;
    use crate::util::test_server::{spawn_server, temp_dir};

    struct Fixture {
        service: BuildService,
        dispatches: Arc<AtomicUsize>,
        icon_dir: tempfile::TempDir,
    }

    async fn fixture(dispatch_status: StatusCode) -> Fixture {
        fixture_with_storage(dispatch_status, None).await
    }

    /// storage 为 None 时使用临时目录的本地存储
    async fn fixture_with_storage(dispatch_status: StatusCode, storage: Option<StorageConfig>) -> Fixture {
        let dispatches = Arc::new(AtomicUsize::new(0));
        let counter = dispatches.clone();
        let github = spawn_server(Router::new().route(
            "/repos/:owner/:name/dispatches",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    dispatch_status
                }
            }),
        ))
        .await;

        let icon_dir = temp_dir("service_icons");
        let storage = IconStorage::from_config(&storage.unwrap_or_else(|| StorageConfig {
            backend: StorageBackend::Local,
            dir: icon_dir.path().to_string_lossy().into_owned(),
            public_base_url: "http://cdn.test/icons".into(),
            ..StorageConfig::default()
        }))
        .unwrap();
        let dispatcher = GithubDispatcher::new(&DispatchConfig {
            api_base: github,
            repo: "acme/app-factory".into(),
            token: "ghp_test".into(),
            ..DispatchConfig::default()
        })
        .unwrap();

        Fixture {
            service: BuildService::new(
                BuildRepository::new(memory_pool().await),
                storage,
                dispatcher,
                "5-10 minutes",
            ),
            dispatches,
            icon_dir,
        }
    }

    fn form(package_name: &str, icon: Option<Vec<u8>>) -> BuildForm {
        let mut form = BuildForm::default();
        form.push_field("name", "Shop");
        form.push_field("website_url", "https://shop.example.com");
        form.push_field("package_name", package_name);
        form.push_field("notification_email", "dev@example.com");
        form.icon = icon;
        form
    }

    #[tokio::test]
    async fn successful_build_ends_building() {
        let f = fixture(StatusCode::NO_CONTENT).await;
        let response = f.service.create_build(form("com.example.shop", None)).await.unwrap();

        assert!(response.success);
        assert_eq!(response.estimated_time, "5-10 minutes");
        assert!(response.message.contains("dev@example.com"));
        assert_eq!(f.dispatches.load(Ordering::SeqCst), 1);

        let record = f.service.repo().find_by_app_id(&response.app_id).await.unwrap().unwrap();
        assert_eq!(record.status, BuildStatus::Building);
        assert_eq!(record.icon_url, None);
    }

    #[tokio::test]
    async fn icon_is_stored_under_app_id() {
        let f = fixture(StatusCode::NO_CONTENT).await;
        let response = f.service
            .create_build(form("com.example.shop", Some(vec![0x89, 0x50, 0x4e, 0x47])))
            .await
            .unwrap();

        let record = f.service.repo().find_by_app_id(&response.app_id).await.unwrap().unwrap();
        assert_eq!(
            record.icon_url.as_deref(),
            Some(format!("http://cdn.test/icons/{}/icon.png", response.app_id).as_str())
        );
        assert!(f.icon_dir.path().join(&response.app_id).join("icon.png").exists());
    }

    #[tokio::test]
    async fn invalid_package_name_touches_nothing() {
        let f = fixture(StatusCode::NO_CONTENT).await;
        let err = f.service
            .create_build(form("Com.Example", Some(vec![1])))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidPackageName));
        assert_eq!(f.dispatches.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_dir(f.icon_dir.path()).unwrap().count(), 0);
        assert!(!f.service.repo().package_name_exists("Com.Example").await.unwrap());
    }

    #[tokio::test]
    async fn second_submission_with_same_package_is_rejected() {
        let f = fixture(StatusCode::NO_CONTENT).await;
        f.service.create_build(form("com.example.shop", None)).await.unwrap();

        let err = f.service
            .create_build(form("com.example.shop", Some(vec![1])))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicatePackageName));
        assert_eq!(f.dispatches.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read_dir(f.icon_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn concurrent_duplicates_succeed_once() {
        let f = fixture(StatusCode::NO_CONTENT).await;
        let (a, b) = tokio::join!(
            f.service.create_build(form("com.example.shop", None)),
            f.service.create_build(form("com.example.shop", None)),
        );

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::DuplicatePackageName))));
    }

    #[tokio::test]
    async fn failed_dispatch_marks_record_failed() {
        let f = fixture(StatusCode::UNPROCESSABLE_ENTITY).await;
        let err = f.service.create_build(form("com.example.shop", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Dispatch(_)));

        let status: String = sqlx::query_scalar("SELECT status FROM apps WHERE package_name = ?")
            .bind("com.example.shop")
            .fetch_one(f.service.repo().pool())
            .await
            .unwrap();
        assert_eq!(status, "failed");
    }

    #[tokio::test]
    async fn storage_failure_creates_no_record() {
        let supabase = spawn_server(Router::new().route(
            "/storage/v1/object/*path",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;
        let f = fixture_with_storage(
            StatusCode::NO_CONTENT,
            Some(StorageConfig {
                backend: StorageBackend::Supabase,
                url: supabase,
                service_key: "service-role".into(),
                ..StorageConfig::default()
            }),
        )
        .await;

        let err = f.service
            .create_build(form("com.example.shop", Some(vec![0x89, 0x50, 0x4e, 0x47])))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "Failed to upload app icon");
        assert!(!f.service.repo().package_name_exists("com.example.shop").await.unwrap());
        assert_eq!(f.dispatches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn insert_failure_skips_dispatch() {
        let f = fixture(StatusCode::NO_CONTENT).await;
        sqlx::query(
            "CREATE TRIGGER reject_apps_insert BEFORE INSERT ON apps \
             BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END",
        )
        .execute(f.service.repo().pool())
        .await
        .unwrap();

        let err = f.service
            .create_build(form("com.example.shop", Some(vec![1, 2, 3])))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "Failed to save build request");
        assert_eq!(f.dispatches.load(Ordering::SeqCst), 0);
        assert!(!f.service.repo().package_name_exists("com.example.shop").await.unwrap());
        // 已上传的图标不回收
        assert_eq!(std::fs::read_dir(f.icon_dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn unreachable_dispatch_marks_record_failed() {
        let icon_dir = temp_dir("service_icons");
        let service = BuildService::new(
            BuildRepository::new(memory_pool().await),
            IconStorage::from_config(&StorageConfig {
                backend: StorageBackend::Local,
                dir: icon_dir.path().to_string_lossy().into_owned(),
                ..StorageConfig::default()
            })
            .unwrap(),
            GithubDispatcher::new(&DispatchConfig {
                api_base: "http://127.0.0.1:1".into(),
                repo: "acme/app-factory".into(),
                token: "ghp_test".into(),
                ..DispatchConfig::default()
            })
            .unwrap(),
            "5-10 minutes",
        );

        let err = service.create_build(form("com.example.shop", None)).await.unwrap_err();
        assert_eq!(err.client_message(), "Failed to trigger build");

        let status: String = sqlx::query_scalar("SELECT status FROM apps WHERE package_name = ?")
            .bind("com.example.shop")
            .fetch_one(service.repo().pool())
            .await
            .unwrap();
        assert_eq!(status, "failed");
    }
}
