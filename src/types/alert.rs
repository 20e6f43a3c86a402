use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::item::Metal;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "above" => Ok(Direction::Above),
            "below" => Ok(Direction::Below),
            other => Err(Error::Validation(format!("unknown direction: {}", other))),
        }
    }
}

/// A price alert as returned to clients. `fired` flips once when the client
/// reports the threshold was crossed; alerts never re-arm.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: i64,
    pub client_id: Option<String>,
    pub metal: Metal,
    pub dir: Direction,
    pub price: f64,
    #[serde(default)]
    pub note: String,
    pub fired: bool,
    pub created_at: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDraft {
    pub client_id: Option<String>,
    pub metal: Metal,
    pub dir: Direction,
    pub price: f64,
    pub note: Option<String>,
}
