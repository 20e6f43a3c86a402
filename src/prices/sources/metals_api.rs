use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::prices::SpotCandidate;
use crate::prices::sources::{SpotSource, fetch_json};

pub const SOURCE_ID: &str = "metals-api";

/// metals-api.com quotes troy ounces of metal per USD, so the spot price is
/// the reciprocal of the reported rate.
pub struct MetalsApiSource {
    url: String,
}

impl MetalsApiSource {
    pub fn new(url: impl Into<String>) -> Self {
        MetalsApiSource { url: url.into() }
    }
}

#[derive(Debug, Deserialize)]
struct MetalsApiResponse {
    rates: MetalsApiRates,
}

#[derive(Debug, Deserialize)]
struct MetalsApiRates {
    #[serde(rename = "XAU")]
    xau: f64,
    #[serde(rename = "XAG")]
    xag: f64,
}

#[async_trait]
impl SpotSource for MetalsApiSource {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    async fn fetch(&self, client: &reqwest::Client) -> Result<SpotCandidate> {
        let data: MetalsApiResponse = fetch_json(client, &self.url).await?;
        if data.rates.xau <= 0.0 || data.rates.xag <= 0.0 {
            return Err(Error::FetchParseError(
                "non-positive XAU/XAG rate".to_string(),
            ));
        }
        Ok(SpotCandidate {
            source_id: SOURCE_ID.to_string(),
            gold_usd: 1.0 / data.rates.xau,
            silver_usd: Some(1.0 / data.rates.xag),
        })
    }
}
