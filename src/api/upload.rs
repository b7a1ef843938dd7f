use crate::error::AppError;
use crate::models::GenerateForm;
use axum::extract::Multipart;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// 上传文件的表单字段名
pub const TEMPLATE_FIELD: &str = "template";

/// 本次请求使用的模板
#[derive(Debug)]
pub enum TemplateSource {
    /// 内置默认模板
    Default(PathBuf),
    /// 临时上传文件, drop 时自动删除
    Uploaded(NamedTempFile),
}

impl TemplateSource {
    pub fn path(&self) -> &Path {
        match self {
            TemplateSource::Default(path) => path,
            TemplateSource::Uploaded(file) => file.path(),
        }
    }

    pub async fn read(&self) -> Result<Vec<u8>, AppError> {
        read_template(self.path()).await
    }

    /// 删除临时上传文件
    pub fn cleanup(self) {
        if let TemplateSource::Uploaded(file) = self {
            let path = file.path().to_path_buf();
            match file.close() {
                Ok(()) => debug!("Removed upload {}", path.display()),
                Err(e) => warn!("Failed to remove upload {}: {}", path.display(), e),
            }
        }
    }
}

/// 读取模板文件, 文件不存在时返回 `TemplateNotFound`
pub async fn read_template(path: &Path) -> Result<Vec<u8>, AppError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::TemplateNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// 把上传内容写入 `upload_dir` 下的临时文件
fn store_upload(upload_dir: &Path, bytes: &[u8]) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("template-")
        .suffix(".docx")
        .tempfile_in(upload_dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

/// 解析后的 `/generate` 请求
#[derive(Debug)]
pub struct GenerateRequest {
    pub form: GenerateForm,
    pub template: TemplateSource,
}

/// 读取 multipart 表单: 可选的 `template` 文件与文本字段
pub async fn parse_generate(
    mut multipart: Multipart,
    upload_dir: &Path,
    default_template: PathBuf,
) -> Result<GenerateRequest, AppError> {
    let mut form = GenerateForm::default();
    let mut upload: Option<NamedTempFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == TEMPLATE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Upload(e.to_string()))?;
            // 未选择文件时浏览器仍会提交一个空的文件字段
            if file_name.is_empty() || bytes.is_empty() {
                continue;
            }
            if upload.is_some() {
                return Err(AppError::Upload(format!(
                    "only one `{}` file is accepted",
                    TEMPLATE_FIELD
                )));
            }
            let size = bytes.len();
            let dir = upload_dir.to_path_buf();
            let file = tokio::task::spawn_blocking(move || store_upload(&dir, &bytes))
                .await
                .map_err(|e| AppError::Internal(format!("upload task failed: {}", e)))??;
            info!(
                "Received template upload {:?} ({} bytes) -> {}",
                file_name,
                size,
                file.path().display()
            );
            upload = Some(file);
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;
        if !form.set(&name, value) {
            debug!("Ignoring form field {:?}", name);
        }
    }

    let template = match upload {
        Some(file) => TemplateSource::Uploaded(file),
        None => TemplateSource::Default(default_template),
    };
    Ok(GenerateRequest { form, template })
}
