pub mod loader;

use serde::Deserialize;

use crate::prices::ProviderConfig;

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Token lifetime in seconds (default 30 days).
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

fn default_token_ttl() -> u64 {
    30 * 24 * 60 * 60
}

#[derive(Clone, Debug, Deserialize)]
pub struct PricesConfig {
    /// Seconds between refresh cycles.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    pub spot_sources: Vec<ProviderConfig>,
    pub fx_sources: Vec<ProviderConfig>,
}

fn default_refresh_interval() -> u64 {
    300
}
