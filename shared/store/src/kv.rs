//! Durable key-value storage.
//!
//! Every collection lives under a single string key and is written as one
//! JSON document, so a write either lands completely or not at all.

mod encrypted;
mod sled_kv;

pub use encrypted::EncryptedKv;
pub use sled_kv::SledKv;

use crate::{Result, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Well-known keys, one per collection kind.
pub mod keys {
    pub const CART: &str = "cart";
    pub const LIKES: &str = "likes";
    pub const CHAT: &str = "chat";
    pub const REVIEWS: &str = "reviews";
    pub const SEARCH_HISTORY: &str = "search-history";
}

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the raw value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// In-process storage, used for ephemeral sessions and tests.
///
/// Writes can be made to fail on demand to exercise rollback paths.
#[derive(Clone, Default)]
pub struct MemoryKv {
    entries: Arc<RwLock<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set`/`remove` fail until switched back off.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn check_writable(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("write to `{key}` rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.check_writable(key)?;
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.check_writable(key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }
}
