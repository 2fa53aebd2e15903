use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use storefront_store::search::DEFAULT_HISTORY_LIMIT;
use uuid::Uuid;

/// Where collections are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// sled database under `data_dir`
    Sled,
    /// In-process only; lost on restart
    Memory,
}

/// Runtime configuration for the node service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub build_id: String,
    pub data_dir: PathBuf,
    pub storage: StorageBackend,
    /// Enables at-rest encryption when set
    pub storage_passphrase: Option<String>,
    /// Base URL of the REST API that likes and reviews are mirrored to
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub search_history_limit: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = non_empty("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let build_id =
            non_empty("STOREFRONT_BUILD_ID").unwrap_or_else(|| Uuid::new_v4().to_string());
        let data_dir = non_empty("STOREFRONT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/storefront"));

        let storage = match non_empty("STOREFRONT_STORAGE").as_deref() {
            None | Some("sled") => StorageBackend::Sled,
            Some("memory") => StorageBackend::Memory,
            Some(other) => bail!("unknown STOREFRONT_STORAGE backend `{other}`"),
        };

        let search_history_limit = match non_empty("STOREFRONT_SEARCH_HISTORY_LIMIT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid STOREFRONT_SEARCH_HISTORY_LIMIT `{raw}`"))?,
            None => DEFAULT_HISTORY_LIMIT,
        };

        Ok(Self {
            host,
            port,
            build_id,
            data_dir,
            storage,
            storage_passphrase: non_empty("STOREFRONT_STORAGE_PASSPHRASE"),
            api_url: non_empty("STOREFRONT_API_URL"),
            api_token: non_empty("STOREFRONT_API_TOKEN"),
            search_history_limit,
        })
    }

    /// In-memory configuration with no remote, for tests and demos.
    pub fn ephemeral() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            build_id: "ephemeral".to_string(),
            data_dir: PathBuf::new(),
            storage: StorageBackend::Memory,
            storage_passphrase: None,
            api_url: None,
            api_token: None,
            search_history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}
