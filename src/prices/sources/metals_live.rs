use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::prices::SpotCandidate;
use crate::prices::sources::{SpotSource, fetch_json};

pub const SOURCE_ID: &str = "metals-live";

/// api.metals.live returns an array of single-key objects, one per metal;
/// the last occurrence of each metal wins.
pub struct MetalsLiveSource {
    url: String,
}

impl MetalsLiveSource {
    pub fn new(url: impl Into<String>) -> Self {
        MetalsLiveSource { url: url.into() }
    }
}

#[derive(Debug, Deserialize)]
struct MetalsLiveEntry {
    gold: Option<f64>,
    silver: Option<f64>,
}

#[async_trait]
impl SpotSource for MetalsLiveSource {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    async fn fetch(&self, client: &reqwest::Client) -> Result<SpotCandidate> {
        let entries: Vec<MetalsLiveEntry> = fetch_json(client, &self.url).await?;

        let mut gold = None;
        let mut silver = None;
        for entry in entries {
            if let Some(g) = entry.gold {
                gold = Some(g);
            }
            if let Some(s) = entry.silver {
                silver = Some(s);
            }
        }

        let gold = gold.ok_or_else(|| Error::FetchParseError("no gold entry".to_string()))?;
        let silver = silver.ok_or_else(|| Error::FetchParseError("no silver entry".to_string()))?;
        if silver <= 0.0 {
            return Err(Error::FetchParseError("non-positive silver".to_string()));
        }

        Ok(SpotCandidate {
            source_id: SOURCE_ID.to_string(),
            gold_usd: gold,
            silver_usd: Some(silver),
        })
    }
}
