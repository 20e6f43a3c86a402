use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::prices::FxCandidate;
use crate::prices::sources::exchangerate_api::{RateBundle, candidate_from};
use crate::prices::sources::{FxSource, fetch_json};

pub const SOURCE_ID: &str = "open-er-api";

/// open.er-api.com fallback; same bundle shape as exchangerate-api.
pub struct OpenErApiSource {
    url: String,
}

impl OpenErApiSource {
    pub fn new(url: impl Into<String>) -> Self {
        OpenErApiSource { url: url.into() }
    }
}

#[derive(Debug, Deserialize)]
struct OpenErResponse {
    rates: RateBundle,
}

#[async_trait]
impl FxSource for OpenErApiSource {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    async fn fetch(&self, client: &reqwest::Client) -> Result<FxCandidate> {
        let data: OpenErResponse = fetch_json(client, &self.url).await?;
        candidate_from(SOURCE_ID, data.rates)
    }
}
