use crate::template::{RenderError, TemplateCompileError, TemplateIssue};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// 请求处理错误
#[derive(Debug, Error)]
pub enum AppError {
    #[error("template not found: {}", .path.display())]
    TemplateNotFound { path: PathBuf },

    #[error(transparent)]
    TemplateCompile(#[from] TemplateCompileError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("invalid upload: {0}")]
    Upload(String),

    #[error("rendering did not finish within {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorBody<T: Serialize> {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<T>,
}

/// 渲染失败的固定提示
pub const RENDER_ERROR_MESSAGE: &str = "Template error. Check placeholders.";

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::TemplateNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::TemplateCompile(_)
            | AppError::Render(_)
            | AppError::Io(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            tracing::warn!("Request rejected: {}", self);
        } else {
            tracing::error!("Request failed: {}", self);
        }

        match self {
            AppError::TemplateCompile(err) => {
                for issue in &err.issues {
                    tracing::error!(id = ?issue.id, tag = ?issue.tag, "{}", issue);
                }
                let body = ErrorBody {
                    error: "Template compile error".to_string(),
                    details: Some(err.issues),
                };
                (status, Json(body)).into_response()
            }
            AppError::Render(err) => {
                let mut text = RENDER_ERROR_MESSAGE.to_string();
                for issue in err.issues() {
                    text.push('\n');
                    text.push_str(&issue.to_string());
                }
                if err.issues().is_empty() {
                    text.push('\n');
                    text.push_str(&err.to_string());
                }
                (status, text).into_response()
            }
            AppError::TemplateNotFound { path } => {
                let body = ErrorBody {
                    error: "Template not found".to_string(),
                    details: Some(vec![path.display().to_string()]),
                };
                (status, Json(body)).into_response()
            }
            other => {
                let body: ErrorBody<Vec<TemplateIssue>> = ErrorBody {
                    error: other.to_string(),
                    details: None,
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
