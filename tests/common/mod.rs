//! Shared fixtures for the integration suites
#![allow(dead_code)]

#[cfg(feature = "remote")]
pub mod backend;

use async_trait::async_trait;
use forge::{Forge, ForgeStore, LocalStore, MemorySink, Timeouts};
use forge_core_interface::{
    Guidance, PlanetDraft, PlanetFilter, Result, StoreError, StoreMode, SystemDraft,
};
use forge_core_model::{Planet, PlanetId, StarSystem, StarSystemId, Status};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Notify;

pub const OWNER: &str = "0xAAA";
pub const STRANGER: &str = "0xBBB";

/// Forge over a fresh local store, collecting notices
pub async fn local_forge(dir: &Path) -> (Forge, MemorySink) {
    forge::logging::init_test_logging();
    let store = LocalStore::open(dir).await.unwrap();
    forge_over(Arc::new(store))
}

pub fn forge_over(store: Arc<dyn ForgeStore>) -> (Forge, MemorySink) {
    let sink = MemorySink::new();
    let forge = Forge::builder(store)
        .notifier(Arc::new(sink.clone()))
        .timeouts(Timeouts::default())
        .build();
    (forge, sink)
}

/// Delegating store whose `create_system` parks until released
pub struct GatedStore {
    inner: Arc<dyn ForgeStore>,
    pub entered: Notify,
    pub release: Notify,
}

impl GatedStore {
    pub fn new(inner: Arc<dyn ForgeStore>) -> Self {
        Self {
            inner,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl ForgeStore for GatedStore {
    fn mode(&self) -> StoreMode {
        self.inner.mode()
    }

    async fn create_system(&self, draft: SystemDraft) -> Result<StarSystem> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.create_system(draft).await
    }

    async fn create_planet(&self, draft: PlanetDraft) -> Result<Planet> {
        self.inner.create_planet(draft).await
    }

    async fn list_systems(&self) -> Result<Vec<StarSystem>> {
        self.inner.list_systems().await
    }

    async fn list_planets(&self, filter: &PlanetFilter) -> Result<Vec<Planet>> {
        self.inner.list_planets(filter).await
    }

    async fn get_system(&self, id: &StarSystemId) -> Result<StarSystem> {
        self.inner.get_system(id).await
    }

    async fn get_planet(&self, id: &PlanetId) -> Result<Planet> {
        self.inner.get_planet(id).await
    }

    async fn update_system_status(&self, id: &StarSystemId, status: Status) -> Result<StarSystem> {
        self.inner.update_system_status(id, status).await
    }

    async fn update_planet_status(&self, id: &PlanetId, status: Status) -> Result<Planet> {
        self.inner.update_planet_status(id, status).await
    }

    async fn delete_system(&self, id: &StarSystemId) -> Result<()> {
        self.inner.delete_system(id).await
    }

    async fn delete_planet(&self, id: &PlanetId) -> Result<()> {
        self.inner.delete_planet(id).await
    }
}

/// Store whose every call fails as unreachable
pub struct DownStore;

fn down<T>() -> Result<T> {
    Err(StoreError::Unreachable {
        reason: "connection refused".to_string(),
        guidance: Guidance::CheckConfiguration,
    })
}

#[async_trait]
impl ForgeStore for DownStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Remote
    }

    async fn create_system(&self, _draft: SystemDraft) -> Result<StarSystem> {
        down()
    }

    async fn create_planet(&self, _draft: PlanetDraft) -> Result<Planet> {
        down()
    }

    async fn list_systems(&self) -> Result<Vec<StarSystem>> {
        down()
    }

    async fn list_planets(&self, _filter: &PlanetFilter) -> Result<Vec<Planet>> {
        down()
    }

    async fn get_system(&self, _id: &StarSystemId) -> Result<StarSystem> {
        down()
    }

    async fn get_planet(&self, _id: &PlanetId) -> Result<Planet> {
        down()
    }

    async fn update_system_status(
        &self,
        _id: &StarSystemId,
        _status: Status,
    ) -> Result<StarSystem> {
        down()
    }

    async fn update_planet_status(&self, _id: &PlanetId, _status: Status) -> Result<Planet> {
        down()
    }

    async fn delete_system(&self, _id: &StarSystemId) -> Result<()> {
        down()
    }

    async fn delete_planet(&self, _id: &PlanetId) -> Result<()> {
        down()
    }
}
