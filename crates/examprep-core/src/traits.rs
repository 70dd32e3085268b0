//! Trait for the external attempt-record store.
//!
//! Implemented by the `examprep-store` crate. The store must hand records
//! back exactly as they were appended.

use async_trait::async_trait;

use crate::model::AttemptRecord;

/// Durable, append-only storage of attempt records.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Human-readable store name (e.g. "jsonl").
    fn name(&self) -> &str;

    /// Persist one record.
    async fn append(&self, record: &AttemptRecord) -> anyhow::Result<()>;

    /// Every record owned by `user_id`, in insertion order.
    async fn list_for_user(&self, user_id: &str) -> anyhow::Result<Vec<AttemptRecord>>;
}
