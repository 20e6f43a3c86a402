use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::prices::sources::{FxSource, SpotSource};
use crate::prices::{FxCandidate, GOLD_SANITY_FLOOR_USD, SpotCandidate};

/// Priority-ordered spot price sources, tried strictly in order until one
/// yields a candidate that clears the gold sanity floor. First acceptor wins;
/// later sources are not invoked. An implausible candidate is treated the
/// same as a failed source and the chain moves on.
pub struct SpotChain {
    sources: Vec<Box<dyn SpotSource>>,
}

impl SpotChain {
    pub fn new(sources: Vec<Box<dyn SpotSource>>) -> Self {
        SpotChain { sources }
    }

    pub async fn first_accepted(&self, client: &reqwest::Client) -> Result<SpotCandidate> {
        for source in &self.sources {
            match source.fetch(client).await {
                Ok(candidate) if candidate.gold_usd > GOLD_SANITY_FLOOR_USD => {
                    info!(
                        source = source.source_id(),
                        gold = candidate.gold_usd,
                        silver = ?candidate.silver_usd,
                        "spot price accepted"
                    );
                    return Ok(candidate);
                }
                Ok(candidate) => {
                    warn!(
                        source = source.source_id(),
                        gold = candidate.gold_usd,
                        "spot candidate below sanity floor, trying next source"
                    );
                }
                Err(e) => {
                    warn!(source = source.source_id(), error = %e, "spot source failed");
                }
            }
        }
        Err(Error::AllSourcesExhausted { chain: "spot" })
    }
}

/// Priority-ordered FX sources. A source is accepted as soon as it yields a
/// bundle carrying INR; bundles are never merged across sources in one cycle.
pub struct FxChain {
    sources: Vec<Box<dyn FxSource>>,
}

impl FxChain {
    pub fn new(sources: Vec<Box<dyn FxSource>>) -> Self {
        FxChain { sources }
    }

    pub async fn first_valid(&self, client: &reqwest::Client) -> Result<FxCandidate> {
        for source in &self.sources {
            match source.fetch(client).await {
                Ok(candidate) => {
                    info!(
                        source = source.source_id(),
                        inr = candidate.usd_inr,
                        "FX bundle accepted"
                    );
                    return Ok(candidate);
                }
                Err(e) => {
                    warn!(source = source.source_id(), error = %e, "FX source failed");
                }
            }
        }
        Err(Error::AllSourcesExhausted { chain: "fx" })
    }
}
