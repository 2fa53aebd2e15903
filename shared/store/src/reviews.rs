//! Product reviews: remote "seed" reviews merged with reviews written locally.
//!
//! Only local reviews are persisted. Seeds are replaced whenever they are
//! fetched again, so they are kept in memory only.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use storefront_model::{ProductId, Review, ReviewDraft, ReviewId};
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

use crate::kv::{keys, KvStore};
use crate::optimistic::{Collection, Mutation, OptimisticStore};
use crate::remote::ReviewsRemote;
use crate::{Result, StoreError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalReviews(pub Vec<Review>);

impl Collection for LocalReviews {
    fn validate(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();
        for review in &self.0 {
            if !review.has_valid_rating() {
                return Err(format!("review {} has rating {}", review.id, review.rating));
            }
            if !seen.insert(review.id) {
                return Err(format!("duplicate review {}", review.id));
            }
        }
        Ok(())
    }
}

/// Merge seed and stored reviews by id.
///
/// When both lists contain the same id the stored copy wins. The result is
/// ordered by ascending id.
pub fn reconcile(seed: &[Review], stored: &[Review]) -> Vec<Review> {
    let mut merged: BTreeMap<ReviewId, &Review> = BTreeMap::new();
    for review in seed {
        merged.insert(review.id, review);
    }
    for review in stored {
        merged.insert(review.id, review);
    }
    merged.into_values().cloned().collect()
}

fn max_id(reviews: &[Review]) -> i64 {
    reviews.iter().map(|r| r.id.0).max().unwrap_or(0)
}

#[derive(Clone)]
pub struct ReviewStore {
    store: OptimisticStore<LocalReviews>,
    seed: Arc<RwLock<Vec<Review>>>,
    remote: Option<Arc<dyn ReviewsRemote>>,
}

impl ReviewStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            store: OptimisticStore::new(keys::REVIEWS, kv),
            seed: Arc::new(RwLock::new(Vec::new())),
            remote: None,
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn ReviewsRemote>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Load locally written reviews, returning how many there are.
    pub async fn load(&self) -> usize {
        self.store.load().await.0.len()
    }

    /// Replace all seed reviews.
    pub async fn set_seed(&self, reviews: Vec<Review>) {
        *self.seed.write().await = reviews;
    }

    /// Re-fetch seed reviews for one product from the remote API.
    pub async fn refresh_seed(&self, product: ProductId) -> Result<usize> {
        let Some(remote) = &self.remote else {
            return Ok(0);
        };

        let fetched: Vec<Review> = remote
            .fetch_reviews(product)
            .await?
            .into_iter()
            .filter(|review| {
                let valid = review.has_valid_rating() && review.product_id == product;
                if !valid {
                    warn!(review = %review.id, %product, "ignoring malformed remote review");
                }
                valid
            })
            .collect();
        let count = fetched.len();

        let mut seed = self.seed.write().await;
        seed.retain(|review| review.product_id != product);
        seed.extend(fetched);
        debug!(%product, count, "review seed refreshed");
        Ok(count)
    }

    /// Write a new review. The id is one past the highest known id.
    ///
    /// With a remote configured the review is submitted after the local
    /// write, and withdrawn locally if the submission fails.
    pub async fn add(&self, draft: ReviewDraft) -> Result<Review> {
        if draft.author.trim().is_empty() {
            return Err(StoreError::InvalidInput("review author is empty".to_string()));
        }
        let seed_max = max_id(&self.seed.read().await);

        let mutation = move |local: &mut LocalReviews| {
            let Some(id) = seed_max.max(max_id(&local.0)).checked_add(1) else {
                return Mutation::Unchanged(None);
            };
            let review = draft.into_review(ReviewId(id));
            local.0.push(review.clone());
            Mutation::Write(Some(review))
        };

        let added = match self.remote.clone() {
            None => self.store.apply(mutation).await?,
            Some(remote) => {
                self.store
                    .apply_confirmed(mutation, |review| async move {
                        let Some(review) = review else {
                            return Ok(());
                        };
                        remote.submit_review(&review).await.map_err(|err| {
                            warn!(review = %review.id, error = %err, "failed to submit review");
                            err
                        })
                    })
                    .await?
            }
        };
        added.ok_or_else(|| StoreError::InvalidInput("review ids are exhausted".to_string()))
    }

    /// Delete a locally written review. Seed reviews cannot be removed.
    pub async fn remove(&self, id: ReviewId) -> Result<bool> {
        self.store
            .apply(move |local: &mut LocalReviews| {
                let before = local.0.len();
                local.0.retain(|review| review.id != id);
                let removed = local.0.len() != before;
                Mutation::write_if(removed, removed)
            })
            .await
    }

    /// Drop local reviews and delete the durable key.
    pub async fn clear(&self) -> Result<()> {
        self.store
            .apply(|local: &mut LocalReviews| {
                local.0.clear();
                Mutation::Remove(())
            })
            .await
    }

    /// Seed and local reviews merged.
    pub async fn all(&self) -> Vec<Review> {
        let seed = self.seed.read().await;
        self.store.read(|local| reconcile(&seed, &local.0)).await
    }

    pub async fn local(&self) -> Vec<Review> {
        self.store.snapshot().await.0
    }

    pub async fn for_product(&self, product: ProductId) -> Vec<Review> {
        self.all()
            .await
            .into_iter()
            .filter(|review| review.product_id == product)
            .collect()
    }

    pub async fn average_rating(&self, product: ProductId) -> Option<f64> {
        let reviews = self.for_product(product).await;
        if reviews.is_empty() {
            return None;
        }
        let sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
        Some(f64::from(sum) / reviews.len() as f64)
    }

    pub fn subscribe(&self) -> watch::Receiver<LocalReviews> {
        self.store.subscribe()
    }
}
