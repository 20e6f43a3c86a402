use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::error::Result;
use crate::prices::SpotCandidate;
use crate::prices::sources::{SpotSource, fetch_json};

pub const SOURCE_ID: &str = "frankfurter";

/// api.frankfurter.app quotes one base currency per request, so gold and
/// silver are two separate calls. A failed silver leg keeps the gold value;
/// the previous snapshot's silver then passes through unchanged.
pub struct FrankfurterSource {
    base_url: String,
}

impl FrankfurterSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        FrankfurterSource {
            base_url: base_url.into(),
        }
    }

    fn quote_url(&self, metal: &str) -> String {
        format!("{}?from={}&to=USD", self.base_url, metal)
    }
}

#[derive(Debug, Deserialize)]
struct FrankfurterResponse {
    rates: FrankfurterRates,
}

#[derive(Debug, Deserialize)]
struct FrankfurterRates {
    #[serde(rename = "USD")]
    usd: f64,
}

#[async_trait]
impl SpotSource for FrankfurterSource {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    async fn fetch(&self, client: &reqwest::Client) -> Result<SpotCandidate> {
        let gold: FrankfurterResponse = fetch_json(client, &self.quote_url("XAU")).await?;

        let silver = match fetch_json::<FrankfurterResponse>(client, &self.quote_url("XAG")).await {
            Ok(resp) => Some(resp.rates.usd),
            Err(e) => {
                warn!(error = %e, "frankfurter silver quote failed, keeping previous silver");
                None
            }
        };

        Ok(SpotCandidate {
            source_id: SOURCE_ID.to_string(),
            gold_usd: gold.rates.usd,
            silver_usd: silver,
        })
    }
}
