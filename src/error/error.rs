use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid package name. Use the format: com.company.appname")]
    InvalidPackageName,

    #[error("Package name already exists. Choose a different name.")]
    DuplicatePackageName,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("{0}")]
    Multipart(#[from] MultipartError),

    #[error("{0}")]
    MultipartRejection(#[from] MultipartRejection),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidPackageName | AppError::DuplicatePackageName => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回给客户端的错误文本
    ///
    /// 依赖服务失败时只返回固定文案，详细原因写日志；
    /// 其余未预期错误原样返回底层错误信息（仅适用于可信边界内部署）。
    pub fn client_message(&self) -> String {
        match self {
            AppError::Storage(_) => "Failed to upload app icon".to_string(),
            AppError::Database(_) => "Failed to save build request".to_string(),
            AppError::Dispatch(_) => "Failed to trigger build".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::warn!("request rejected: {}", self);
        }

        (status, Json(serde_json::json!({ "error": self.client_message() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_bad_request() {
        assert_eq!(AppError::InvalidPackageName.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::DuplicatePackageName.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn dependency_failures_hide_details() {
        let err = AppError::Storage("bucket app-icons not found".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "Failed to upload app icon");

        let err = AppError::Dispatch("401 Bad credentials".into());
        assert_eq!(err.client_message(), "Failed to trigger build");

        let err = AppError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.client_message(), "Failed to save build request");
    }

    #[test]
    fn unexpected_errors_pass_raw_text() {
        let err = AppError::Internal(anyhow::anyhow!("boom"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "boom");
    }
}
