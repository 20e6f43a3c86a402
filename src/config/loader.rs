use config::{Config, Environment, File};
use serde::Deserialize;

use crate::config::{AuthConfig, DatabaseConfig, PricesConfig, ServerConfig};
use crate::error::{Error, Result};

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub prices: PricesConfig,
}

impl AppConfig {
    /// Layered load: `config/default.toml`, then an optional per-environment
    /// file, then `COFFER_`-prefixed environment variables
    /// (`COFFER_AUTH__JWT_SECRET` and the like).
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("COFFER").separator("__"))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))
    }
}
