pub mod handlers;
pub mod upload;

pub use handlers::{download_template, generate, health_check, index, AppState};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;

/// 构建路由
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.storage.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/download-template", get(download_template))
        .route("/generate", post(generate))
        .layer(ServiceBuilder::new().layer(DefaultBodyLimit::max(body_limit)))
        .with_state(state)
}
