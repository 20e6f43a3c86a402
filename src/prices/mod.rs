pub mod aggregator;
pub mod cache;
pub mod chain;
pub mod scheduler;
pub mod sources;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Candidate gold prices at or below this are treated as garbage (a zero,
/// a misparse, a provider echoing its error page) and rejected.
pub const GOLD_SANITY_FLOOR_USD: f64 = 1000.0;

/// The authoritative price state: spot prices per troy ounce in USD plus the
/// four USD conversion multipliers. Every field is always positive; a refresh
/// cycle either replaces a field with an accepted value or carries the
/// previous one forward unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub gold_usd: f64,
    pub silver_usd: f64,
    pub usd_inr: f64,
    pub usd_aed: f64,
    pub usd_eur: f64,
    pub usd_gbp: f64,
    /// When the last refresh cycle completed, whether or not any value
    /// actually changed.
    pub fetched_at: DateTime<Utc>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot {
            gold_usd: 3320.0,
            silver_usd: 33.2,
            usd_inr: 83.5,
            usd_aed: 3.67,
            usd_eur: 0.92,
            usd_gbp: 0.79,
            fetched_at: Utc::now(),
        }
    }
}

/// A spot price proposed by one source. `silver_usd` is optional because one
/// provider quotes gold and silver in separate requests and the silver leg
/// failing does not invalidate the gold value.
#[derive(Clone, Debug)]
pub struct SpotCandidate {
    pub source_id: String,
    pub gold_usd: f64,
    pub silver_usd: Option<f64>,
}

/// One provider's FX bundle. INR is the bundle's validity proxy and is
/// required; the other rates overwrite the previous snapshot only when
/// present.
#[derive(Clone, Debug)]
pub struct FxCandidate {
    pub source_id: String,
    pub usd_inr: f64,
    pub usd_aed: Option<f64>,
    pub usd_eur: Option<f64>,
    pub usd_gbp: Option<f64>,
}

/// One entry in a source chain. Order in the config file is priority order.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProviderConfig {
    pub source_id: String,
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}
