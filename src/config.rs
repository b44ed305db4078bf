//! 書籍サービス・カテゴリサービスの階層化された設定

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::domain::ReturnPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// 両バイナリで必須。通常は `DATABASE_URL` で与える
    pub url: Option<String>,
    pub max_connections: u32,
}

/// 書籍サービスが呼び出す外部サービス
#[derive(Debug, Deserialize, Clone)]
pub struct ServicesConfig {
    pub author_url: String,
    pub category_url: String,
    pub auth_url: String,
    /// `x-server-key` として送る共有シークレット（カテゴリサービスが要求する）
    pub server_key: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LendingConfig {
    #[serde(default)]
    pub return_policy: ReturnPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub services: ServicesConfig,
    #[serde(default)]
    pub lending: LendingConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 既定値・設定ファイル・環境変数の順に読み込む
    ///
    /// 環境変数は `LIBRARY` プレフィックスと区切り `__` を使う
    /// （例: `LIBRARY__SERVER__PORT=8082`）。`DATABASE_URL` は `database.url` を上書きする。
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 10)?
            .set_default("services.author_url", "http://localhost:8081")?
            .set_default("services.category_url", "http://localhost:8082")?
            .set_default("services.auth_url", "http://localhost:8083")?
            .set_default("services.server_key", "change-this-server-key")?
            .set_default("lending.return_policy", "capped_at_total")?
            .set_default("logging.level", "info")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(
                Environment::with_prefix("LIBRARY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .build()?;

        config.try_deserialize()
    }

    /// バインドする `host:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
