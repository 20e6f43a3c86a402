use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::prices::SpotCandidate;
use crate::prices::sources::{SpotSource, fetch_json};

pub const SOURCE_ID: &str = "goldprice";

/// data-asg.goldprice.org publishes both metals in the first element of an
/// `items` array.
pub struct GoldPriceSource {
    url: String,
}

impl GoldPriceSource {
    pub fn new(url: impl Into<String>) -> Self {
        GoldPriceSource { url: url.into() }
    }
}

#[derive(Debug, Deserialize)]
struct GoldPriceResponse {
    items: Vec<GoldPriceItem>,
}

#[derive(Debug, Deserialize)]
struct GoldPriceItem {
    #[serde(rename = "xauPrice")]
    xau_price: f64,
    #[serde(rename = "xagPrice")]
    xag_price: f64,
}

#[async_trait]
impl SpotSource for GoldPriceSource {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    async fn fetch(&self, client: &reqwest::Client) -> Result<SpotCandidate> {
        let data: GoldPriceResponse = fetch_json(client, &self.url).await?;
        let item = data
            .items
            .first()
            .ok_or_else(|| Error::FetchParseError("empty items array".to_string()))?;
        Ok(SpotCandidate {
            source_id: SOURCE_ID.to_string(),
            gold_usd: item.xau_price,
            silver_usd: Some(item.xag_price),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn reads_first_item() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [ { "xauPrice": 2350.25, "xagPrice": 27.8, "curr": "USD" } ]
            })))
            .mount(&server)
            .await;

        let source = GoldPriceSource::new(server.uri());
        let candidate = source.fetch(&reqwest::Client::new()).await.unwrap();
        assert_eq!(candidate.gold_usd, 2350.25);
        assert_eq!(candidate.silver_usd, Some(27.8));
    }

    #[tokio::test]
    async fn empty_items_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
            .mount(&server)
            .await;

        let source = GoldPriceSource::new(server.uri());
        let err = source.fetch(&reqwest::Client::new()).await.unwrap_err();
        assert!(matches!(err, Error::FetchParseError(_)));
    }
}
