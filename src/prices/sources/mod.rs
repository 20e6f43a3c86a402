pub mod exchangerate_api;
pub mod frankfurter;
pub mod goldprice;
pub mod metals_api;
pub mod metals_live;
pub mod open_er;

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{Error, Result};
use crate::prices::{FxCandidate, ProviderConfig, SpotCandidate};

/// Upper bound on one provider request, connection setup included.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(8);

/// One metal spot price provider: a single bounded network request parsed
/// into a candidate. No retries here; retry policy lives in the chain.
#[async_trait]
pub trait SpotSource: Send + Sync {
    fn source_id(&self) -> &str;
    async fn fetch(&self, client: &reqwest::Client) -> Result<SpotCandidate>;
}

/// One currency conversion rate provider.
#[async_trait]
pub trait FxSource: Send + Sync {
    fn source_id(&self) -> &str;
    async fn fetch(&self, client: &reqwest::Client) -> Result<FxCandidate>;
}

/// Shared outbound client with the per-request timeout baked in.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| Error::ConfigError(format!("building HTTP client: {}", e)))
}

/// GET `url` and deserialize the JSON body. Every failure mode collapses into
/// one of the three fetch error variants.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(classify)?;
    response.json::<T>().await.map_err(|e| {
        if e.is_timeout() {
            Error::FetchTimeout(FETCH_TIMEOUT)
        } else {
            Error::FetchParseError(e.to_string())
        }
    })
}

fn classify(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::FetchTimeout(FETCH_TIMEOUT)
    } else if e.is_decode() {
        Error::FetchParseError(e.to_string())
    } else {
        Error::FetchNetworkError(e.to_string())
    }
}

/// Instantiate the spot chain members from config, in config order. Unknown
/// or disabled provider ids are skipped, not fatal.
pub fn build_spot_sources(configs: &[ProviderConfig]) -> Vec<Box<dyn SpotSource>> {
    let mut sources: Vec<Box<dyn SpotSource>> = Vec::new();
    for cfg in configs.iter().filter(|c| c.enabled) {
        match cfg.source_id.as_str() {
            metals_api::SOURCE_ID => {
                sources.push(Box::new(metals_api::MetalsApiSource::new(&cfg.url)))
            }
            metals_live::SOURCE_ID => {
                sources.push(Box::new(metals_live::MetalsLiveSource::new(&cfg.url)))
            }
            goldprice::SOURCE_ID => {
                sources.push(Box::new(goldprice::GoldPriceSource::new(&cfg.url)))
            }
            frankfurter::SOURCE_ID => {
                sources.push(Box::new(frankfurter::FrankfurterSource::new(&cfg.url)))
            }
            other => warn!(source = other, "unknown spot source in config, skipping"),
        }
    }
    sources
}

pub fn build_fx_sources(configs: &[ProviderConfig]) -> Vec<Box<dyn FxSource>> {
    let mut sources: Vec<Box<dyn FxSource>> = Vec::new();
    for cfg in configs.iter().filter(|c| c.enabled) {
        match cfg.source_id.as_str() {
            exchangerate_api::SOURCE_ID => sources.push(Box::new(
                exchangerate_api::ExchangeRateApiSource::new(&cfg.url),
            )),
            open_er::SOURCE_ID => sources.push(Box::new(open_er::OpenErApiSource::new(&cfg.url))),
            other => warn!(source = other, "unknown FX source in config, skipping"),
        }
    }
    sources
}
