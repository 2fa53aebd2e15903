//! Liked products, optionally mirrored to the remote API.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use storefront_model::ProductId;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::kv::{keys, KvStore};
use crate::optimistic::{Collection, Mutation, OptimisticStore};
use crate::remote::LikesRemote;
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LikedIds(pub Vec<ProductId>);

impl Collection for LikedIds {
    fn validate(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();
        match self.0.iter().find(|id| !seen.insert(**id)) {
            Some(id) => Err(format!("product {id} liked twice")),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LikeChange {
    liked: bool,
    changed: bool,
}

fn set_liked(ids: &mut LikedIds, id: ProductId, liked: bool) -> LikeChange {
    let changed = match (ids.0.contains(&id), liked) {
        (false, true) => {
            ids.0.push(id);
            true
        }
        (true, false) => {
            ids.0.retain(|existing| *existing != id);
            true
        }
        _ => false,
    };
    LikeChange { liked, changed }
}

#[derive(Clone)]
pub struct LikeStore {
    store: OptimisticStore<LikedIds>,
    remote: Option<Arc<dyn LikesRemote>>,
}

impl LikeStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            store: OptimisticStore::new(keys::LIKES, kv),
            remote: None,
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn LikesRemote>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub async fn load(&self) -> usize {
        self.store.load().await.0.len()
    }

    /// Like `id`. Returns `false` if it was already liked.
    pub async fn like(&self, id: ProductId) -> Result<bool> {
        let change = self.mutate(id, move |ids| set_liked(ids, id, true)).await?;
        Ok(change.changed)
    }

    /// Unlike `id`. Returns `false` if it was not liked.
    pub async fn unlike(&self, id: ProductId) -> Result<bool> {
        let change = self.mutate(id, move |ids| set_liked(ids, id, false)).await?;
        Ok(change.changed)
    }

    /// Flip the like on `id`, returning the new state.
    pub async fn toggle(&self, id: ProductId) -> Result<bool> {
        let change = self
            .mutate(id, move |ids| {
                let liked = !ids.0.contains(&id);
                set_liked(ids, id, liked)
            })
            .await?;
        Ok(change.liked)
    }

    async fn mutate<F>(&self, id: ProductId, change: F) -> Result<LikeChange>
    where
        F: FnOnce(&mut LikedIds) -> LikeChange,
    {
        let mutation = move |ids: &mut LikedIds| {
            let change = change(ids);
            Mutation::write_if(change.changed, change)
        };

        let Some(remote) = self.remote.clone() else {
            return self.store.apply(mutation).await;
        };

        self.store
            .apply_confirmed(mutation, move |change| async move {
                remote.set_like(id, change.liked).await.map_err(|err| {
                    warn!(product = %id, liked = change.liked, error = %err, "failed to mirror like");
                    err
                })
            })
            .await
    }

    /// Replace the local likes with the server's list.
    pub async fn refresh(&self) -> Result<usize> {
        let Some(remote) = &self.remote else {
            return Ok(self.store.read(|ids| ids.0.len()).await);
        };

        let mut fetched = remote.fetch_likes().await?;
        let mut seen = HashSet::new();
        fetched.retain(|id| seen.insert(*id));
        let count = fetched.len();

        self.store
            .apply(move |ids: &mut LikedIds| {
                let changed = ids.0 != fetched;
                ids.0 = fetched;
                Mutation::write_if(changed, ())
            })
            .await?;
        debug!(count, "likes refreshed from remote");
        Ok(count)
    }

    /// Drop the local likes and their durable key.
    ///
    /// Local only: the remote keeps its likes and the next [`refresh`]
    /// restores them. Use [`unlike_all`] to remove them on the remote too.
    ///
    /// [`refresh`]: Self::refresh
    /// [`unlike_all`]: Self::unlike_all
    pub async fn clear(&self) -> Result<()> {
        self.store
            .apply(|ids: &mut LikedIds| {
                ids.0.clear();
                Mutation::Remove(())
            })
            .await
    }

    /// Unlike every product, mirroring each removal to the remote when one is
    /// configured. Returns how many likes were removed.
    ///
    /// Stops at the first rejected removal; the likes removed before it stay
    /// removed on both sides.
    pub async fn unlike_all(&self) -> Result<usize> {
        let ids = self.ids().await;
        if self.remote.is_some() {
            for id in &ids {
                self.unlike(*id).await?;
            }
        }
        self.clear().await?;
        Ok(ids.len())
    }

    pub async fn is_liked(&self, id: ProductId) -> bool {
        self.store.read(|ids| ids.0.contains(&id)).await
    }

    pub async fn ids(&self) -> Vec<ProductId> {
        self.store.snapshot().await.0
    }

    pub fn subscribe(&self) -> watch::Receiver<LikedIds> {
        self.store.subscribe()
    }
}
