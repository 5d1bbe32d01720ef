use std::collections::HashMap;
use std::sync::OnceLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::error::{AppError, AppResult};
use crate::model::state::BuildStatus;

pub const DEFAULT_PRIMARY_COLOR: &str = "#2196F3";
pub const DEFAULT_THEME_MODE: &str = "system";
pub const DEFAULT_ORIENTATION: &str = "auto";
pub const DEFAULT_BUILD_FORMAT: &str = "apk";

/// 表单原始内容：同名字段可能出现多次，文件部分单独存放
#[derive(Debug, Default, Clone)]
pub struct BuildForm {
    pub fields: HashMap<String, Vec<String>>,
    pub icon: Option<Vec<u8>>,
}

impl BuildForm {
    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(name.into()).or_default().push(value.into());
    }

    /// 取第一个值
    pub fn first(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// 取第一个值，为空时使用默认值
    pub fn first_or(&self, name: &str, default: &str) -> String {
        match self.first(name) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => default.to_string(),
        }
    }

    /// 只有严格等于 "true" 才视为开启
    pub fn flag(&self, name: &str) -> bool {
        self.first(name) == Some("true")
    }
}

/// 同时写入记录 `config` 列的构建选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    pub theme_mode: String,
    pub primary_color: String,
    pub navigation: bool,
    pub pull_to_refresh: bool,
    pub orientation: String,
    pub enable_zoom: bool,
    pub keep_awake: bool,
    pub open_external_links: bool,
}

/// 归一化后的构建请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSubmission {
    pub name: Option<String>,
    pub website_url: Option<String>,
    pub package_name: Option<String>,
    pub notification_email: Option<String>,
    pub build_format: String,
    pub options: BuildOptions,
}

impl BuildSubmission {
    pub fn from_form(form: &BuildForm) -> Self {
        let owned = |name: &str| form.first(name).map(str::to_string);

        // 前端提交的是 themeMode
        let theme_mode = match form.first("themeMode") {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => form.first_or("theme_mode", DEFAULT_THEME_MODE),
        };

        Self {
            name: owned("name"),
            website_url: owned("website_url"),
            package_name: owned("package_name"),
            notification_email: owned("notification_email"),
            build_format: form.first_or("build_format", DEFAULT_BUILD_FORMAT),
            options: BuildOptions {
                theme_mode,
                primary_color: form.first_or("primary_color", DEFAULT_PRIMARY_COLOR),
                navigation: form.flag("navigation"),
                pull_to_refresh: form.flag("pull_to_refresh"),
                orientation: form.first_or("orientation", DEFAULT_ORIENTATION),
                enable_zoom: form.flag("enable_zoom"),
                keep_awake: form.flag("keep_awake"),
                open_external_links: form.flag("open_external_links"),
            },
        }
    }

    /// 校验包名格式，返回校验通过的包名
    pub fn validated_package_name(&self) -> AppResult<&str> {
        match self.package_name.as_deref() {
            Some(name) if is_valid_package_name(name) => Ok(name),
            _ => Err(AppError::InvalidPackageName),
        }
    }
}

pub fn is_valid_package_name(name: &str) -> bool {
    static PACKAGE_NAME_PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PACKAGE_NAME_PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)+$").unwrap()
    });
    pattern.is_match(name)
}

/// 待插入的构建记录
#[derive(Debug, Clone)]
pub struct NewBuild {
    pub app_id: String,
    pub package_name: String,
    pub icon_url: Option<String>,
    pub submission: BuildSubmission,
}

/// 数据库中的构建记录
#[derive(Debug, Clone, Serialize)]
pub struct BuildRecord {
    pub id: i64,
    pub app_id: String,
    pub name: Option<String>,
    pub website_url: Option<String>,
    pub package_name: String,
    pub notification_email: Option<String>,
    pub icon_url: Option<String>,
    pub primary_color: String,
    pub theme_mode: String,
    pub navigation: bool,
    pub pull_to_refresh: bool,
    pub orientation: String,
    pub enable_zoom: bool,
    pub keep_awake: bool,
    pub open_external_links: bool,
    pub build_format: String,
    pub status: BuildStatus,
    pub config: BuildOptions,
    pub created_at: String,
    pub updated_at: String,
}

/// repository_dispatch 的 client_payload，流水线无需再查库
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientPayload {
    pub app_id: String,
    pub name: Option<String>,
    pub website_url: Option<String>,
    pub package_name: String,
    pub icon_url: Option<String>,
    pub notification_email: Option<String>,
    pub primary_color: String,
    pub theme_mode: String,
    pub navigation: bool,
    pub pull_to_refresh: bool,
    pub orientation: String,
    pub enable_zoom: bool,
    pub keep_awake: bool,
    pub open_external_links: bool,
    pub build_format: String,
}

impl From<&NewBuild> for ClientPayload {
    fn from(build: &NewBuild) -> Self {
        let submission = &build.submission;
        let options = &submission.options;
        Self {
            app_id: build.app_id.clone(),
            name: submission.name.clone(),
            website_url: submission.website_url.clone(),
            package_name: build.package_name.clone(),
            icon_url: build.icon_url.clone(),
            notification_email: submission.notification_email.clone(),
            primary_color: options.primary_color.clone(),
            theme_mode: options.theme_mode.clone(),
            navigation: options.navigation,
            pull_to_refresh: options.pull_to_refresh,
            orientation: options.orientation.clone(),
            enable_zoom: options.enable_zoom,
            keep_awake: options.keep_awake,
            open_external_links: options.open_external_links,
            build_format: submission.build_format.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBuildResponse {
    pub success: bool,
    pub app_id: String,
    pub message: String,
    pub estimated_time: String,
}
