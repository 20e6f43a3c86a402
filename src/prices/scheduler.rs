use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use crate::prices::aggregator::PriceAggregator;

/// Drives the aggregator: one cycle immediately at startup, then one per
/// interval, forever. Each cycle is awaited before the next tick, so cycles
/// never overlap; with `MissedTickBehavior::Skip`, a cycle that overruns the
/// interval causes the next tick to be dropped rather than queued.
pub struct PriceScheduler {
    aggregator: Arc<PriceAggregator>,
    interval: Duration,
}

impl PriceScheduler {
    pub fn new(aggregator: Arc<PriceAggregator>, interval: Duration) -> Self {
        PriceScheduler {
            aggregator,
            interval,
        }
    }

    /// Never returns. `refresh()` is infallible, so nothing here can kill
    /// the loop.
    pub async fn run(self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            // The first tick resolves immediately, giving the startup refresh.
            ticker.tick().await;
            debug!("starting price refresh cycle");
            self.aggregator.refresh().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::Result;
    use crate::persistence::SnapshotStore;
    use crate::prices::cache::PriceCache;
    use crate::prices::chain::{FxChain, SpotChain};
    use crate::prices::sources::SpotSource;
    use crate::prices::{Snapshot, SpotCandidate};

    struct CountingStore {
        saves: AtomicUsize,
    }

    #[async_trait]
    impl SnapshotStore for CountingStore {
        async fn load_snapshot(&self) -> Result<Option<Snapshot>> {
            Ok(None)
        }

        async fn save_snapshot(&self, _snapshot: &Snapshot) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// First fetch stalls for `delay`, every later fetch returns at once.
    struct SlowFirstFetchSource {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl SpotSource for SlowFirstFetchSource {
        fn source_id(&self) -> &str {
            "slow"
        }

        async fn fetch(&self, _client: &reqwest::Client) -> Result<SpotCandidate> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(self.delay).await;
            }
            Ok(SpotCandidate {
                source_id: "slow".to_string(),
                gold_usd: 2000.0,
                silver_usd: Some(25.0),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_immediately_then_once_per_interval() {
        // Empty chains: cycles complete instantly without touching the
        // network, so only the timer governs the cadence.
        let store = Arc::new(CountingStore {
            saves: AtomicUsize::new(0),
        });
        let aggregator = Arc::new(PriceAggregator::new(
            SpotChain::new(vec![]),
            FxChain::new(vec![]),
            Arc::new(PriceCache::new(Snapshot::default())),
            store.clone(),
            reqwest::Client::new(),
        ));
        let scheduler = PriceScheduler::new(aggregator, Duration::from_secs(300));

        tokio::spawn(scheduler.run());

        // Startup cycle, before any interval has elapsed.
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);

        // One more cycle per elapsed interval.
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(store.saves.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(store.saves.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn overrunning_cycle_skips_missed_ticks_instead_of_queueing() {
        let store = Arc::new(CountingStore {
            saves: AtomicUsize::new(0),
        });
        let aggregator = Arc::new(PriceAggregator::new(
            SpotChain::new(vec![Box::new(SlowFirstFetchSource {
                calls: AtomicUsize::new(0),
                delay: Duration::from_secs(750),
            })]),
            FxChain::new(vec![]),
            Arc::new(PriceCache::new(Snapshot::default())),
            store.clone(),
            reqwest::Client::new(),
        ));
        let scheduler = PriceScheduler::new(aggregator, Duration::from_secs(300));

        tokio::spawn(scheduler.run());

        // The startup cycle runs from t=0 to t=750, overrunning the ticks
        // due at 300 and 600. Both are dropped: exactly one catch-up cycle
        // runs when the slow cycle ends. Queued ticks would give three saves.
        tokio::time::sleep(Duration::from_secs(751)).await;
        assert_eq!(store.saves.load(Ordering::SeqCst), 2);

        // The cadence realigns to the next interval multiple, t=900.
        tokio::time::sleep(Duration::from_secs(150)).await;
        assert_eq!(store.saves.load(Ordering::SeqCst), 3);
    }
}
