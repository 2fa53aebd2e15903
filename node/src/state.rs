use crate::config::{AppConfig, StorageBackend};
use crate::remote::RestClient;
use anyhow::Context;
use std::sync::Arc;
use storefront_store::{
    CartStore, ChatStore, EncryptedKv, KvStore, LikeStore, LikesRemote, MemoryKv, ReviewStore,
    ReviewsRemote, SearchHistoryStore, SledKv, StoreError,
};
use tracing::{info, warn};

/// Remote mirrors handed to the stores that use them.
#[derive(Clone, Default)]
pub struct Remotes {
    pub likes: Option<Arc<dyn LikesRemote>>,
    pub reviews: Option<Arc<dyn ReviewsRemote>>,
}

/// Every store, built once at start-up and shared with the handlers.
pub struct AppState {
    config: AppConfig,
    pub cart: CartStore,
    pub likes: LikeStore,
    pub chat: ChatStore,
    pub reviews: ReviewStore,
    pub search_history: SearchHistoryStore,
}

impl AppState {
    /// Open the configured storage backend and remote, then load every store.
    pub async fn open(config: AppConfig) -> anyhow::Result<Arc<Self>> {
        let passphrase = config.storage_passphrase.as_deref();
        let kv = match config.storage {
            StorageBackend::Sled => {
                let sled = SledKv::open(&config.data_dir).with_context(|| {
                    format!("failed to open storage at {:?}", config.data_dir)
                })?;
                seal(sled, passphrase)
            }
            StorageBackend::Memory => seal(MemoryKv::new(), passphrase),
        };

        let mut remotes = Remotes::default();
        if let Some(url) = &config.api_url {
            let client = Arc::new(
                RestClient::new(url.clone(), config.api_token.clone())
                    .context("failed to create REST client")?,
            );
            remotes.likes = Some(client.clone());
            remotes.reviews = Some(client);
        }

        Ok(Self::with_backend(config, kv, remotes).await)
    }

    /// Build and load every store on top of `kv`.
    pub async fn with_backend(config: AppConfig, kv: Arc<dyn KvStore>, remotes: Remotes) -> Arc<Self> {
        let mut likes = LikeStore::new(kv.clone());
        if let Some(remote) = remotes.likes {
            likes = likes.with_remote(remote);
        }
        let mut reviews = ReviewStore::new(kv.clone());
        if let Some(remote) = remotes.reviews {
            reviews = reviews.with_remote(remote);
        }

        let state = Self {
            cart: CartStore::new(kv.clone()),
            likes,
            chat: ChatStore::new(kv.clone()),
            reviews,
            search_history: SearchHistoryStore::new(kv, config.search_history_limit),
            config,
        };

        let cart = state.cart.load().await;
        let likes = state.likes.load().await;
        let threads = state.chat.load().await;
        let reviews = state.reviews.load().await;
        let searches = state.search_history.load().await;
        info!(cart, likes, threads, reviews, searches, "collections loaded");

        Arc::new(state)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn build_id(&self) -> &str {
        &self.config.build_id
    }

    /// Clear every per-user collection.
    ///
    /// Every collection is attempted even when an earlier one fails; the
    /// first error is returned after the rest have been cleared.
    pub async fn logout(&self) -> Result<(), StoreError> {
        let results = [
            ("cart", self.cart.clear().await),
            ("likes", self.likes.clear().await),
            ("chat", self.chat.clear().await),
            ("reviews", self.reviews.clear().await),
            ("search history", self.search_history.clear().await),
        ];

        let mut first_error = None;
        for (collection, result) in results {
            if let Err(err) = result {
                warn!(collection, error = %err, "failed to clear collection on logout");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => {
                info!("session cleared");
                Ok(())
            }
        }
    }
}

fn seal<K: KvStore + 'static>(kv: K, passphrase: Option<&str>) -> Arc<dyn KvStore> {
    match passphrase {
        Some(passphrase) => Arc::new(EncryptedKv::new(kv, passphrase)),
        None => Arc::new(kv),
    }
}
