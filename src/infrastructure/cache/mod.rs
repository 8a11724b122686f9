pub mod cache_keys;
pub mod in_memory;

use crate::core::errors::ExpenseError;
use crate::core::models::settlement::Settlement;
use async_trait::async_trait;

/// Per-group cache of computed settlement summaries.
///
/// Every invalidation bumps the group's generation. A summary is only stored
/// against the generation that was current before its expenses were loaded,
/// so a result computed from data that changed mid-flight is never cached.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_settlement_summary(&self, group_id: &str) -> Result<Option<Vec<Settlement>>, ExpenseError>;
    async fn settlement_generation(&self, group_id: &str) -> Result<u64, ExpenseError>;
    /// Returns `false` without storing if the group was invalidated after `generation` was read.
    async fn save_settlement_summary(
        &self,
        group_id: &str,
        generation: u64,
        settlements: &[Settlement],
        ttl: std::time::Duration,
    ) -> Result<bool, ExpenseError>;
    async fn invalidate_settlement_summary(&self, group_id: &str) -> Result<(), ExpenseError>;
}
