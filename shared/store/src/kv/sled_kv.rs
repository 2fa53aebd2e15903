use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use super::KvStore;
use crate::{Result, StoreError};

/// On-device storage backed by a sled database.
#[derive(Clone)]
pub struct SledKv {
    db: sled::Db,
}

impl SledKv {
    const TREE: &'static str = "collections";

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(|e| {
            StoreError::Backend(format!(
                "failed to create storage directory {:?}: {}",
                path, e
            ))
        })?;
        let db = sled::open(path)?;
        debug!(?path, "opened sled storage");
        Ok(Self { db })
    }

    fn tree(&self) -> sled::Result<sled::Tree> {
        self.db.open_tree(Self::TREE)
    }
}

#[async_trait]
impl KvStore for SledKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let tree = self.tree()?;
        let Some(raw) = tree.get(key.as_bytes())? else {
            return Ok(None);
        };
        let value = String::from_utf8(raw.to_vec()).map_err(|_| StoreError::Corrupt {
            key: key.to_string(),
            reason: "stored value was not valid UTF-8".to_string(),
        })?;
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let tree = self.tree()?;
        tree.insert(key.as_bytes(), value.into_bytes())?;
        tree.flush_async().await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let tree = self.tree()?;
        tree.remove(key.as_bytes())?;
        tree.flush_async().await?;
        Ok(())
    }
}
