use std::sync::{Arc, RwLock};

use crate::prices::Snapshot;

/// The single shared snapshot of current prices.
///
/// The aggregator is the only writer and replaces the whole `Arc` in one
/// swap, so a reader always sees either the previous snapshot or the new one
/// in full, never a mix of the two. Reads take a read lock only long enough
/// to clone the `Arc`.
pub struct PriceCache {
    inner: RwLock<Arc<Snapshot>>,
}

impl PriceCache {
    pub fn new(initial: Snapshot) -> Self {
        PriceCache {
            inner: RwLock::new(Arc::new(initial)),
        }
    }

    /// The most recently published snapshot. Non-blocking in practice and
    /// infallible; before the first refresh cycle this is the snapshot loaded
    /// from storage, or the process defaults on a cold start.
    pub fn current(&self) -> Arc<Snapshot> {
        self.inner.read().unwrap().clone()
    }

    /// Atomically replace the published snapshot. Aggregator only.
    pub fn publish(&self, snapshot: Snapshot) {
        *self.inner.write().unwrap() = Arc::new(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn cold_start_serves_defaults() {
        let cache = PriceCache::new(Snapshot::default());
        let snap = cache.current();
        assert_eq!(snap.gold_usd, 3320.0);
        assert_eq!(snap.silver_usd, 33.2);
        assert_eq!(snap.usd_inr, 83.5);
        assert_eq!(snap.usd_aed, 3.67);
        assert_eq!(snap.usd_eur, 0.92);
        assert_eq!(snap.usd_gbp, 0.79);
    }

    #[test]
    fn publish_replaces_whole_snapshot() {
        let cache = PriceCache::new(Snapshot::default());
        let mut next = Snapshot::default();
        next.gold_usd = 2000.0;
        next.silver_usd = 25.0;
        cache.publish(next.clone());
        assert_eq!(*cache.current(), next);
    }

    #[test]
    fn concurrent_readers_never_see_a_torn_snapshot() {
        // Writer alternates between two snapshots whose gold and silver
        // values are paired; a torn read would break the pairing.
        let cache = Arc::new(PriceCache::new(Snapshot {
            gold_usd: 1000.0,
            silver_usd: 10.0,
            ..Snapshot::default()
        }));

        let writer = {
            let cache = cache.clone();
            thread::spawn(move || {
                for i in 0..2000u32 {
                    let gold = if i % 2 == 0 { 2000.0 } else { 3000.0 };
                    cache.publish(Snapshot {
                        gold_usd: gold,
                        silver_usd: gold / 100.0,
                        ..Snapshot::default()
                    });
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for _ in 0..2000 {
                        let snap = cache.current();
                        assert_eq!(snap.silver_usd, snap.gold_usd / 100.0);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
    }
}
