use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crate::api::AppState;
use crate::error::AppResult;
use crate::model::build::{BuildForm, CreateBuildResponse};

pub const ICON_FIELD: &str = "appIcon";

pub async fn create_build(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<CreateBuildResponse>> {
    let form = read_build_form(multipart?).await?;
    let response = state.build_service.create_build(form).await?;
    Ok(Json(response))
}

pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(serde_json::json!({"error": "Method not allowed"})),
    )
}

/// 读取整个表单；文本字段按出现顺序保留，图标只取第一个文件
async fn read_build_form(mut multipart: Multipart) -> AppResult<BuildForm> {
    let mut form = BuildForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let data = field.bytes().await?;
                // 浏览器未选择文件时会提交一个空文件
                if name == ICON_FIELD && form.icon.is_none() && !(file_name.is_empty() && data.is_empty()) {
                    tracing::debug!("received icon {:?} ({} bytes)", file_name, data.len());
                    form.icon = Some(data.to_vec());
                }
            }
            None => {
                let value = field.text().await?;
                form.push_field(name, value);
            }
        }
    }

    Ok(form)
}
