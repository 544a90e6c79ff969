//! Forge Connect: HTTP adapter for the hosted Forge backend
//!
//! `RemoteStore` implements `ForgeStore` by calling the backend's
//! `/celestial-forge/...` JSON endpoints. Backend failures are mapped onto the
//! shared `StoreError` taxonomy so callers cannot tell which backend answered.
//!
//! # Example
//!
//! ```rust,no_run
//! use forge_connect::RemoteStore;
//! use forge_core_interface::{ForgeStore, SystemDraft};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RemoteStore::new("http://127.0.0.1:8000")?;
//!     let system = store.create_system(SystemDraft::new("Nova", "0xAAA", 5.0)).await?;
//!     println!("spawned {}", system.id);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod store;
pub mod wire;

pub use error::{ConnectError, Target};
pub use store::{RemoteStore, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
pub use wire::{Envelope, PlanetListBody, SpawnPlanetBody, StatusBody};
