use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metal {
    Gold,
    Silver,
}

impl Metal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metal::Gold => "gold",
            Metal::Silver => "silver",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "gold" => Ok(Metal::Gold),
            "silver" => Ok(Metal::Silver),
            other => Err(Error::Validation(format!("unknown metal: {}", other))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Jewellery,
    CoinBar,
    Raw,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Jewellery => "jewellery",
            ItemKind::CoinBar => "coin_bar",
            ItemKind::Raw => "raw",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "jewellery" => Ok(ItemKind::Jewellery),
            "coin_bar" => Ok(ItemKind::CoinBar),
            "raw" => Ok(ItemKind::Raw),
            other => Err(Error::Validation(format!("unknown item type: {}", other))),
        }
    }
}

/// A holding as returned to clients. `client_id` is the id the offline-first
/// frontend assigned before the row first synced.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub client_id: Option<String>,
    pub name: String,
    pub metal: Metal,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub grade_name: String,
    pub purity: f64,
    pub grams: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub purchase_date: String,
    pub price_paid: Option<f64>,
    pub price_paid_currency: Option<String>,
    #[serde(rename = "pricePaidUSD")]
    pub price_paid_usd: Option<f64>,
    pub receipt: Option<String>,
    pub sold: bool,
    pub sell_price: Option<f64>,
    pub sell_currency: Option<String>,
    #[serde(rename = "sellPriceUSD")]
    pub sell_price_usd: Option<f64>,
    #[serde(default)]
    pub sell_date: String,
    #[serde(default)]
    pub sell_notes: String,
    pub added_at: String,
}

/// Create/update payload for an item.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    pub client_id: Option<String>,
    pub name: String,
    pub metal: Metal,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub grade_name: String,
    pub purity: f64,
    pub grams: f64,
    pub notes: Option<String>,
    pub purchase_date: Option<String>,
    pub price_paid: Option<f64>,
    pub price_paid_currency: Option<String>,
    #[serde(rename = "pricePaidUSD")]
    pub price_paid_usd: Option<f64>,
    pub receipt: Option<String>,
    #[serde(default)]
    pub sold: bool,
    pub sell_price: Option<f64>,
    pub sell_currency: Option<String>,
    #[serde(rename = "sellPriceUSD")]
    pub sell_price_usd: Option<f64>,
    pub sell_date: Option<String>,
    pub sell_notes: Option<String>,
    pub added_at: Option<String>,
}
