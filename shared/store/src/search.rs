//! Recent search queries, newest first.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::kv::{keys, KvStore};
use crate::optimistic::{Collection, Mutation, OptimisticStore};
use crate::Result;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchHistory(pub Vec<String>);

impl Collection for SearchHistory {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.0.iter().any(|q| q.trim().is_empty()) {
            return Err("blank query in history".to_string());
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct SearchHistoryStore {
    store: OptimisticStore<SearchHistory>,
    limit: usize,
}

impl SearchHistoryStore {
    pub fn new(kv: Arc<dyn KvStore>, limit: usize) -> Self {
        Self {
            store: OptimisticStore::new(keys::SEARCH_HISTORY, kv),
            limit: limit.max(1),
        }
    }

    pub async fn load(&self) -> usize {
        self.store.load().await.0.len()
    }

    /// Put `query` at the front of the history.
    ///
    /// Blank queries are ignored and return `false`.
    pub async fn record(&self, query: &str) -> Result<bool> {
        let query = query.trim().to_string();
        if query.is_empty() {
            return Ok(false);
        }
        let limit = self.limit;

        self.store
            .apply(move |history: &mut SearchHistory| {
                if history.0.first() == Some(&query) {
                    return Mutation::Unchanged(true);
                }
                history.0.retain(|existing| *existing != query);
                history.0.insert(0, query);
                history.0.truncate(limit);
                Mutation::Write(true)
            })
            .await
    }

    pub async fn remove(&self, query: &str) -> Result<bool> {
        let query = query.trim().to_string();
        self.store
            .apply(move |history: &mut SearchHistory| {
                let before = history.0.len();
                history.0.retain(|existing| *existing != query);
                let removed = history.0.len() != before;
                Mutation::write_if(removed, removed)
            })
            .await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store
            .apply(|history: &mut SearchHistory| {
                history.0.clear();
                Mutation::Remove(())
            })
            .await
    }

    pub async fn recent(&self) -> Vec<String> {
        self.store.snapshot().await.0
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchHistory> {
        self.store.subscribe()
    }
}
