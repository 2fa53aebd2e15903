pub mod config;
pub mod error;
pub mod remote;
pub mod routes;
pub mod state;

pub use config::{AppConfig, StorageBackend};
pub use error::{ApiError, ApiResult};
pub use remote::RestClient;
pub use routes::router;
pub use state::{AppState, Remotes};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
