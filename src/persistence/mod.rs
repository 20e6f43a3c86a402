pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::prices::Snapshot;

/// Durable home of the price snapshot. Loaded once at startup, written once
/// per completed refresh cycle. A write failure is reported, never fatal:
/// the aggregator publishes to the in-memory cache regardless.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load_snapshot(&self) -> Result<Option<Snapshot>>;
    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()>;
}
