//! Layered application configuration: `crmserver.toml` overlaid with
//! `CRMSERVER_*` environment variables (e.g. `CRMSERVER_SERVER__PORT=8080`).

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::shared::enums::StageOrder;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    /// Comparator used when listing clients. `lexical` preserves the
    /// historic raw-string sort; `pipeline` sorts by stage position.
    #[serde(default)]
    pub stage_order: StageOrder,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/crmserver".to_string())
}

fn default_pool_size() -> u32 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("crmserver.toml"))
            .merge(Env::prefixed("CRMSERVER_").split("__"))
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_any_source() {
        let config: AppConfig = Figment::new().extract().expect("empty config");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.pipeline.stage_order, StageOrder::Lexical);
    }

    #[test]
    fn stage_order_parses_from_toml() {
        let config: AppConfig = Figment::new()
            .merge(Toml::string("[pipeline]\nstage_order = \"pipeline\""))
            .extract()
            .expect("toml config");
        assert_eq!(config.pipeline.stage_order, StageOrder::Pipeline);
    }
}
