use crate::core::errors::ExpenseError;
use crate::core::models::settlement::Settlement;
use crate::infrastructure::cache::{Cache, cache_keys::settlement_summary_key};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Entry = (Vec<Settlement>, DateTime<Utc>);

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Entry>,
    generations: HashMap<String, u64>,
}

#[derive(Clone, Default)]
pub struct InMemoryCache {
    state: Arc<RwLock<CacheState>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_settlement_summary(&self, group_id: &str) -> Result<Option<Vec<Settlement>>, ExpenseError> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .get(&settlement_summary_key(group_id))
            .filter(|(_, expiry)| *expiry > Utc::now())
            .map(|(settlements, _)| settlements.clone()))
    }

    async fn settlement_generation(&self, group_id: &str) -> Result<u64, ExpenseError> {
        let state = self.state.read().await;
        Ok(state
            .generations
            .get(&settlement_summary_key(group_id))
            .copied()
            .unwrap_or_default())
    }

    async fn save_settlement_summary(
        &self,
        group_id: &str,
        generation: u64,
        settlements: &[Settlement],
        ttl: std::time::Duration,
    ) -> Result<bool, ExpenseError> {
        let expiry = Utc::now()
            + chrono::Duration::from_std(ttl)
                .map_err(|e| ExpenseError::CacheError(format!("Failed to convert TTL: {}", e)))?;
        let key = settlement_summary_key(group_id);
        let mut state = self.state.write().await;
        if state.generations.get(&key).copied().unwrap_or_default() != generation {
            return Ok(false);
        }
        state.entries.insert(key, (settlements.to_vec(), expiry));
        Ok(true)
    }

    async fn invalidate_settlement_summary(&self, group_id: &str) -> Result<(), ExpenseError> {
        let key = settlement_summary_key(group_id);
        let mut state = self.state.write().await;
        state.entries.remove(&key);
        *state.generations.entry(key).or_default() += 1;
        let now = Utc::now();
        state.entries.retain(|_, (_, expiry)| *expiry > now);
        Ok(())
    }
}
