//! Store selection
//!
//! The backend is chosen once from configuration and handed to the facade as
//! a trait object. Nothing downstream branches on the mode.

pub mod local;
pub mod provision;

pub use local::{Collections, LocalStore, PLANETS_FILE, SYSTEMS_FILE};
pub use provision::Provisioner;

use forge_core_interface::{ForgeStore, StoreMode};
use std::sync::Arc;
use tracing::info;

use crate::config::ForgeConfig;
use crate::error::{ForgeError, Result};

/// Open the store named by `config.mode`
pub async fn open_store(config: &ForgeConfig) -> Result<Arc<dyn ForgeStore>> {
    match config.mode {
        StoreMode::Mock => {
            let provisioner = Provisioner::new(config.local.rpc_url.clone());
            let store = LocalStore::open_with(&config.data_dir, provisioner).await?;
            Ok(Arc::new(store))
        }
        StoreMode::Remote => open_remote(config),
    }
}

#[cfg(feature = "remote")]
fn open_remote(config: &ForgeConfig) -> Result<Arc<dyn ForgeStore>> {
    use forge_connect::RemoteStore;
    use std::time::Duration;

    let store = RemoteStore::with_timeouts(
        &config.remote.base_url,
        Duration::from_secs(config.remote.connect_timeout_secs),
        config.timeouts.write(),
    )
    .map_err(|e| ForgeError::Config(e.to_string()))?;
    info!(base_url = store.base_url(), "using remote backend");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "remote"))]
fn open_remote(_config: &ForgeConfig) -> Result<Arc<dyn ForgeStore>> {
    info!("remote mode requested without remote support");
    Err(ForgeError::Config(
        "remote mode requires the `remote` feature".to_string(),
    ))
}
