use crate::api::upload::{self, GenerateRequest};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::service::DocumentService;
use crate::template::{DOCX_EXTENSION, DOCX_MIME};
use axum::{
    extract::{Multipart, State},
    http::header,
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service: Arc<DocumentService>,
}

/// 以附件形式返回 DOCX
fn attachment(bytes: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, DOCX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// 首页
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../public/index.html"))
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 下载默认模板
pub async fn download_template(State(state): State<AppState>) -> Result<Response, AppError> {
    let bytes = upload::read_template(&state.config.default_template_path()).await?;
    Ok(attachment(bytes, &format!("template.{}", DOCX_EXTENSION)))
}

/// 上传模板 (可选) 并生成文档
pub async fn generate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let GenerateRequest { form, template } = upload::parse_generate(
        multipart,
        &state.config.storage.upload_dir,
        state.config.default_template_path(),
    )
    .await?;

    let result = match template.read().await {
        Ok(bytes) => state.service.generate(bytes, &form).await,
        Err(e) => Err(e),
    };
    template.cleanup();

    let document = result?;
    Ok(attachment(document, &format!("generated.{}", DOCX_EXTENSION)))
}
