use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::prices::FxCandidate;
use crate::prices::sources::{FxSource, fetch_json};

pub const SOURCE_ID: &str = "exchangerate-api";

pub struct ExchangeRateApiSource {
    url: String,
}

impl ExchangeRateApiSource {
    pub fn new(url: impl Into<String>) -> Self {
        ExchangeRateApiSource { url: url.into() }
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: RateBundle,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateBundle {
    #[serde(rename = "INR")]
    pub inr: Option<f64>,
    #[serde(rename = "AED")]
    pub aed: Option<f64>,
    #[serde(rename = "EUR")]
    pub eur: Option<f64>,
    #[serde(rename = "GBP")]
    pub gbp: Option<f64>,
}

/// Shared between the two FX providers, whose bodies have the same shape.
/// INR is the validity proxy: a bundle without it is no candidate at all.
pub(crate) fn candidate_from(source_id: &str, rates: RateBundle) -> Result<FxCandidate> {
    let inr = rates
        .inr
        .ok_or_else(|| Error::FetchParseError("bundle is missing INR".to_string()))?;
    Ok(FxCandidate {
        source_id: source_id.to_string(),
        usd_inr: inr,
        usd_aed: rates.aed,
        usd_eur: rates.eur,
        usd_gbp: rates.gbp,
    })
}

#[async_trait]
impl FxSource for ExchangeRateApiSource {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    async fn fetch(&self, client: &reqwest::Client) -> Result<FxCandidate> {
        let data: RatesResponse = fetch_json(client, &self.url).await?;
        candidate_from(SOURCE_ID, data.rates)
    }
}
