use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use crate::error::{AppError, AppResult};
use crate::model::build::{BuildOptions, BuildRecord, NewBuild};
use crate::model::state::BuildStatus;
use crate::util::time::format_date_time;

const SELECT_COLUMNS: &str = r#"
  id, app_id, name, website_url, package_name, notification_email, icon_url, primary_color, theme_mode,
  navigation, pull_to_refresh, orientation, enable_zoom, keep_awake, open_external_links, build_format,
  status, config, created_at, updated_at
"#;

const ADD_BUILD: &str = r#"
INSERT INTO apps (
    app_id, name, website_url, package_name, notification_email, icon_url, primary_color, theme_mode,
    navigation, pull_to_refresh, orientation, enable_zoom, keep_awake, open_external_links, build_format,
    status, config, created_at, updated_at
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

// 只允许从 pending 出发，状态不会回退
const UPDATE_STATUS: &str = r#"
UPDATE apps
SET status = ?,
    updated_at = ?
WHERE app_id = ?
  AND status = 'pending'
"#;

#[derive(Clone)]
pub struct BuildRepository {
    pool: SqlitePool,
}

impl BuildRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 包名是否已被占用（插入前的快速检查）
    pub async fn package_name_exists(&self, package_name: &str) -> AppResult<bool> {
        let existing: Option<String> = sqlx::query_scalar(
            "SELECT package_name FROM apps WHERE package_name = ? LIMIT 1"
        )
            .bind(package_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(existing.is_some())
    }

    /// 插入 pending 记录，并在同一条语句中取回完整记录
    ///
    /// 包名唯一约束冲突视为重复提交。
    pub async fn create(&self, build: &NewBuild) -> AppResult<BuildRecord> {
        let submission = &build.submission;
        let options = &submission.options;
        let config = serde_json::to_string(options)
            .map_err(|e| AppError::Internal(e.into()))?;
        let now = format_date_time()?;

        let row = sqlx::query(&format!("{} RETURNING {}", ADD_BUILD, SELECT_COLUMNS))
            .bind(&build.app_id)
            .bind(&submission.name)
            .bind(&submission.website_url)
            .bind(&build.package_name)
            .bind(&submission.notification_email)
            .bind(&build.icon_url)
            .bind(&options.primary_color)
            .bind(&options.theme_mode)
            .bind(options.navigation)
            .bind(options.pull_to_refresh)
            .bind(&options.orientation)
            .bind(options.enable_zoom)
            .bind(options.keep_awake)
            .bind(options.open_external_links)
            .bind(&submission.build_format)
            .bind(BuildStatus::Pending.as_str())
            .bind(&config)
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await
            .map_err(map_insert_error)?;

        row_to_build(&row)
    }

    #[cfg(test)]
    pub async fn find_by_app_id(&self, app_id: &str) -> AppResult<Option<BuildRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM apps WHERE app_id = ?", SELECT_COLUMNS))
            .bind(app_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        row.as_ref().map(row_to_build).transpose()
    }

    /// 更新状态，返回是否有记录被修改
    pub async fn update_status(&self, app_id: &str, status: BuildStatus) -> AppResult<bool> {
        if !BuildStatus::Pending.can_transition_to(status) {
            return Ok(false);
        }

        let now = format_date_time()?;
        let result = sqlx::query(UPDATE_STATUS)
            .bind(status.as_str())
            .bind(&now)
            .bind(app_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_insert_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() && db_err.message().contains("package_name") {
            return AppError::DuplicatePackageName;
        }
    }
    AppError::Database(err)
}

fn row_to_build(row: &SqliteRow) -> AppResult<BuildRecord> {
    let status: String = row.try_get("status")?;
    let status = BuildStatus::from_str(&status)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Unknown build status: {}", status)))?;

    let config: String = row.try_get("config")?;
    let config: BuildOptions = serde_json::from_str(&config)
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(BuildRecord {
        id: row.try_get("id")?,
        app_id: row.try_get("app_id")?,
        name: row.try_get("name")?,
        website_url: row.try_get("website_url")?,
        package_name: row.try_get("package_name")?,
        notification_email: row.try_get("notification_email")?,
        icon_url: row.try_get("icon_url")?,
        primary_color: row.try_get("primary_color")?,
        theme_mode: row.try_get("theme_mode")?,
        navigation: row.try_get("navigation")?,
        pull_to_refresh: row.try_get("pull_to_refresh")?,
        orientation: row.try_get("orientation")?,
        enable_zoom: row.try_get("enable_zoom")?,
        keep_awake: row.try_get("keep_awake")?,
        open_external_links: row.try_get("open_external_links")?,
        build_format: row.try_get("build_format")?,
        status,
        config,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
