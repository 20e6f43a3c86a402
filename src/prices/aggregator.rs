use std::sync::Arc;

use chrono::Utc;
use tracing::{error, warn};

use crate::observability::metrics;
use crate::persistence::SnapshotStore;
use crate::prices::cache::PriceCache;
use crate::prices::chain::{FxChain, SpotChain};
use crate::prices::Snapshot;

/// Runs one refresh cycle: both chains against the previous snapshot as the
/// fallback baseline, then persist and publish.
///
/// Callers must not run two cycles concurrently. The scheduler satisfies
/// this by awaiting each cycle before the next tick; there is no internal
/// lock.
pub struct PriceAggregator {
    spot_chain: SpotChain,
    fx_chain: FxChain,
    cache: Arc<PriceCache>,
    store: Arc<dyn SnapshotStore>,
    client: reqwest::Client,
}

impl PriceAggregator {
    pub fn new(
        spot_chain: SpotChain,
        fx_chain: FxChain,
        cache: Arc<PriceCache>,
        store: Arc<dyn SnapshotStore>,
        client: reqwest::Client,
    ) -> Self {
        PriceAggregator {
            spot_chain,
            fx_chain,
            cache,
            store,
            client,
        }
    }

    /// One complete refresh cycle. Never fails: every chain or storage
    /// problem degrades to carrying the previous values forward, and the
    /// cycle always ends with a freshly timestamped snapshot published.
    pub async fn refresh(&self) {
        let mut next = (*self.cache.current()).clone();

        match self.spot_chain.first_accepted(&self.client).await {
            Ok(candidate) => {
                next.gold_usd = candidate.gold_usd;
                if let Some(silver) = candidate.silver_usd {
                    next.silver_usd = silver;
                }
            }
            Err(e) => {
                warn!(error = %e, "no spot source accepted, keeping previous gold/silver");
                metrics::SPOT_CHAIN_EXHAUSTED.inc();
            }
        }

        // The FX chain runs regardless of how the spot chain fared.
        match self.fx_chain.first_valid(&self.client).await {
            Ok(candidate) => {
                next.usd_inr = candidate.usd_inr;
                if let Some(aed) = candidate.usd_aed {
                    next.usd_aed = aed;
                }
                if let Some(eur) = candidate.usd_eur {
                    next.usd_eur = eur;
                }
                if let Some(gbp) = candidate.usd_gbp {
                    next.usd_gbp = gbp;
                }
            }
            Err(e) => {
                warn!(error = %e, "no FX source accepted, keeping previous rates");
                metrics::FX_CHAIN_EXHAUSTED.inc();
            }
        }

        // Marks "last completed refresh attempt", not "last value change".
        next.fetched_at = Utc::now();

        // A failed write must not hide fresh values from readers.
        if let Err(e) = self.store.save_snapshot(&next).await {
            error!(error = %e, "persisting snapshot failed, publishing to cache anyway");
            metrics::SNAPSHOT_PERSIST_ERRORS.inc();
        }

        metrics::GOLD_PRICE_USD.set(next.gold_usd);
        metrics::SILVER_PRICE_USD.set(next.silver_usd);
        metrics::REFRESH_CYCLES.inc();
        self.cache.publish(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::{Error, Result};
    use crate::prices::chain::tests::{StubFxSource, StubSpotSource};
    use crate::prices::FxCandidate;

    struct RecordingStore {
        saves: AtomicUsize,
        fail_saves: bool,
        last: Mutex<Option<Snapshot>>,
    }

    impl RecordingStore {
        fn new(fail_saves: bool) -> Self {
            RecordingStore {
                saves: AtomicUsize::new(0),
                fail_saves,
                last: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl SnapshotStore for RecordingStore {
        async fn load_snapshot(&self) -> Result<Option<Snapshot>> {
            Ok(self.last.lock().unwrap().clone())
        }

        async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail_saves {
                return Err(Error::PersistenceError("disk full".into()));
            }
            *self.last.lock().unwrap() = Some(snapshot.clone());
            Ok(())
        }
    }

    fn aggregator(
        spot: Vec<Box<dyn crate::prices::sources::SpotSource>>,
        fx: Vec<Box<dyn crate::prices::sources::FxSource>>,
        store: Arc<RecordingStore>,
    ) -> (PriceAggregator, Arc<PriceCache>) {
        let cache = Arc::new(PriceCache::new(Snapshot::default()));
        let aggregator = PriceAggregator::new(
            SpotChain::new(spot),
            FxChain::new(fx),
            cache.clone(),
            store,
            reqwest::Client::new(),
        );
        (aggregator, cache)
    }

    fn fx_ok(inr: f64, eur: Option<f64>) -> Box<StubFxSource> {
        Box::new(StubFxSource {
            id: "fx",
            result: Ok(FxCandidate {
                source_id: "fx".to_string(),
                usd_inr: inr,
                usd_aed: None,
                usd_eur: eur,
                usd_gbp: None,
            }),
        })
    }

    #[tokio::test]
    async fn accepted_values_replace_baseline() {
        let store = Arc::new(RecordingStore::new(false));
        let (aggregator, cache) = aggregator(
            vec![Box::new(StubSpotSource::ok("spot", 2500.0, Some(30.0)))],
            vec![fx_ok(85.0, Some(0.95))],
            store.clone(),
        );

        aggregator.refresh().await;

        let snap = cache.current();
        assert_eq!(snap.gold_usd, 2500.0);
        assert_eq!(snap.silver_usd, 30.0);
        assert_eq!(snap.usd_inr, 85.0);
        assert_eq!(snap.usd_eur, 0.95);
        // Absent bundle fields pass through from the defaults.
        assert_eq!(snap.usd_aed, 3.67);
        assert_eq!(snap.usd_gbp, 0.79);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn total_failure_passes_all_values_through() {
        let store = Arc::new(RecordingStore::new(false));
        let (aggregator, cache) = aggregator(
            vec![Box::new(StubSpotSource::failing("spot"))],
            vec![Box::new(StubFxSource {
                id: "fx",
                result: Err(Error::FetchNetworkError("down".into())),
            })],
            store,
        );

        let before = cache.current();
        aggregator.refresh().await;
        let after = cache.current();

        assert_eq!(after.gold_usd, before.gold_usd);
        assert_eq!(after.silver_usd, before.silver_usd);
        assert_eq!(after.usd_inr, before.usd_inr);
        // The timestamp still advances: it denotes a completed attempt.
        assert!(after.fetched_at >= before.fetched_at);
    }

    #[tokio::test]
    async fn fetched_at_is_monotone_across_cycles() {
        let store = Arc::new(RecordingStore::new(false));
        let (aggregator, cache) = aggregator(
            vec![Box::new(StubSpotSource::ok("spot", 2500.0, Some(30.0)))],
            vec![fx_ok(85.0, None)],
            store,
        );

        aggregator.refresh().await;
        let first = cache.current().fetched_at;
        aggregator.refresh().await;
        let second = cache.current().fetched_at;
        assert!(second >= first);
    }

    #[tokio::test]
    async fn spot_failure_does_not_block_fx() {
        let store = Arc::new(RecordingStore::new(false));
        let (aggregator, cache) = aggregator(
            vec![Box::new(StubSpotSource::failing("spot"))],
            vec![fx_ok(90.0, None)],
            store,
        );

        aggregator.refresh().await;

        let snap = cache.current();
        assert_eq!(snap.gold_usd, 3320.0);
        assert_eq!(snap.usd_inr, 90.0);
    }

    #[tokio::test]
    async fn persistence_failure_still_publishes() {
        let store = Arc::new(RecordingStore::new(true));
        let (aggregator, cache) = aggregator(
            vec![Box::new(StubSpotSource::ok("spot", 2100.0, Some(26.0)))],
            vec![fx_ok(85.0, None)],
            store.clone(),
        );

        aggregator.refresh().await;

        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert_eq!(cache.current().gold_usd, 2100.0);
    }

    #[tokio::test]
    async fn candidate_without_silver_keeps_previous_silver() {
        let store = Arc::new(RecordingStore::new(false));
        let (aggregator, cache) = aggregator(
            vec![Box::new(StubSpotSource::ok("spot", 2400.0, None))],
            vec![fx_ok(85.0, None)],
            store,
        );

        aggregator.refresh().await;

        let snap = cache.current();
        assert_eq!(snap.gold_usd, 2400.0);
        assert_eq!(snap.silver_usd, 33.2);
    }
}
