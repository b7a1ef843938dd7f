use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 上传目录与默认模板位置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub template_dir: PathBuf,
    pub default_template: String,
    pub max_upload_bytes: usize,
}

/// 数据生成与渲染参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub row_count: usize,
    pub default_vat_rate: f64,
    pub timeout_secs: u64,
    /// 模板解压后的总字节上限
    pub max_uncompressed_bytes: u64,
    /// 内置生成器的随机种子 (仅用于复现)
    pub seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("uploads"),
                template_dir: PathBuf::from("templates"),
                default_template: "default-template.docx".to_string(),
                max_upload_bytes: 10 * 1024 * 1024,
            },
            render: RenderConfig {
                row_count: 5,
                default_vat_rate: 0.12,
                timeout_secs: 30,
                max_uncompressed_bytes: 64 * 1024 * 1024,
                seed: None,
            },
        }
    }
}

impl RenderConfig {
    /// 单次编译加渲染的时限
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 优先级: 环境变量 (`DOCGEN_SERVER__PORT=3000`) > 配置文件 > 默认值。
    /// 配置文件默认为 `docgen.toml`, 可通过 `DOCGEN_CONFIG` 指定。
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = std::env::var("DOCGEN_CONFIG").unwrap_or_else(|_| "docgen.toml".to_string());
        Self::load(
            Some(&file),
            Environment::with_prefix("DOCGEN")
                .prefix_separator("_")
                .separator("__"),
        )
    }

    fn load(file: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let defaults = Config::try_from(&AppConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);
        if let Some(file) = file {
            builder = builder.add_source(File::with_name(file).required(false));
        }
        builder.add_source(env).build()?.try_deserialize()
    }

    /// 默认模板的完整路径
    pub fn default_template_path(&self) -> PathBuf {
        self.storage.template_dir.join(&self.storage.default_template)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
