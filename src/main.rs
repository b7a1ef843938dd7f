use docgen_server::{router, service, AppConfig, AppState, DocumentService};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式, 级别由 RUST_LOG 控制
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);

    // 上传目录不存在时创建
    std::fs::create_dir_all(&config.storage.upload_dir)?;
    let default_template = config.default_template_path();
    if !default_template.exists() {
        warn!(
            "Default template {} is missing; requests without an upload will fail",
            default_template.display()
        );
    }

    // 数据来源在启动时确定
    let provider = service::select_provider(config.render.seed);
    let document_service = Arc::new(DocumentService::new(provider, &config.render));
    info!("Data provider: {}", document_service.provider_name());

    let addr = config.listen_addr();
    let state = AppState {
        config: Arc::new(config),
        service: document_service,
    };
    let app = router(state);

    // 启动服务器
    info!("Server listening on http://{}", addr);
    info!("API Endpoints:");
    info!("  GET  /                   - Upload form");
    info!("  GET  /download-template  - Default template");
    info!("  POST /generate           - Fill template and download");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
