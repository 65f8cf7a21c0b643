// Sequence Port - monotonically increasing counters for reference numbers

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait SequenceRepository: Send + Sync {
    /// Atomically increment and return the counter `name` (first value is 1)
    async fn next_value(&self, name: &str) -> Result<i64>;
}
