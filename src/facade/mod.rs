//! The Forge facade
//!
//! `Forge` is the single entry point for clients. It owns the chosen store,
//! a snapshot of both collections, and the in-flight registry. Mutations are
//! checked against the snapshot first (validation, existence, ownership), run
//! under a bounded wait, and followed by a full snapshot refresh. Every
//! outcome is reported as a [`Notice`].

pub mod cache;
mod inflight;
mod refresh;
mod seed;

pub use cache::Snapshot;
pub use inflight::OperationKey;
pub use refresh::RefreshHandle;
pub use seed::SeedReport;

use forge_core_interface::{
    ForgeStore, ForgeStoreExt, Guidance, PlanetDraft, PlanetFilter, StoreMode, SystemDraft,
};
use forge_core_model::{
    authorize, Planet, PlanetId, PlanetType, StarSystem, StarSystemId, Status, WalletAddress,
};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, warn};

use crate::config::{ForgeConfig, TimeoutConfig};
use crate::error::{ErrorCategory, ForgeError, Result};
use crate::notify::{Notice, NoticeSink, TracingSink};
use crate::store::open_store;
use inflight::InFlight;

/// Bounded waits for store calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub read: Duration,
    pub write: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(5),
            write: Duration::from_secs(30),
        }
    }
}

impl From<&TimeoutConfig> for Timeouts {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            read: config.read(),
            write: config.write(),
        }
    }
}

/// A star system together with its planets in relationship order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemDetails {
    pub star_system: StarSystem,
    pub planets: Vec<Planet>,
}

struct Inner {
    store: Arc<dyn ForgeStore>,
    cache: RwLock<Snapshot>,
    refresh_lock: Mutex<()>,
    changes: watch::Sender<u64>,
    inflight: InFlight,
    notifier: Arc<dyn NoticeSink>,
    timeouts: Timeouts,
}

/// Cheap to clone; clones share the store, snapshot and in-flight registry
#[derive(Clone)]
pub struct Forge {
    inner: Arc<Inner>,
}

pub struct ForgeBuilder {
    store: Arc<dyn ForgeStore>,
    notifier: Arc<dyn NoticeSink>,
    timeouts: Timeouts,
}

impl ForgeBuilder {
    pub fn notifier(mut self, notifier: Arc<dyn NoticeSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn build(self) -> Forge {
        let (changes, _) = watch::channel(0);
        Forge {
            inner: Arc::new(Inner {
                store: self.store,
                cache: RwLock::new(Snapshot::default()),
                refresh_lock: Mutex::new(()),
                changes,
                inflight: InFlight::default(),
                notifier: self.notifier,
                timeouts: self.timeouts,
            }),
        }
    }
}

impl fmt::Debug for Forge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forge")
            .field("mode", &self.inner.store.mode())
            .field("timeouts", &self.inner.timeouts)
            .finish_non_exhaustive()
    }
}

fn require_caller(owner: Option<&str>) -> Result<WalletAddress> {
    match owner.map(WalletAddress::parse) {
        Some(Ok(caller)) => Ok(caller),
        _ => Err(ForgeError::Unauthorized(
            "a connected wallet is required".to_string(),
        )),
    }
}

fn not_owner(caller: &WalletAddress, what: impl fmt::Display) -> ForgeError {
    ForgeError::Unauthorized(format!("{caller} does not own {what}"))
}

fn sort_planets(planets: &mut [Planet]) {
    planets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

impl Forge {
    pub fn new(store: Arc<dyn ForgeStore>) -> Self {
        Self::builder(store).build()
    }

    pub fn builder(store: Arc<dyn ForgeStore>) -> ForgeBuilder {
        ForgeBuilder {
            store,
            notifier: Arc::new(TracingSink),
            timeouts: Timeouts::default(),
        }
    }

    /// Open the configured store and wrap it
    pub async fn from_config(config: &ForgeConfig) -> Result<Self> {
        let store = open_store(config).await?;
        Ok(Self::builder(store)
            .timeouts(Timeouts::from(&config.timeouts))
            .build())
    }

    pub fn mode(&self) -> StoreMode {
        self.inner.store.mode()
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.cache.read().await.clone()
    }

    /// Receiver that ticks whenever a refresh changes the snapshot
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Operations currently holding an in-flight slot
    pub fn in_flight(&self) -> Vec<OperationKey> {
        self.inner.inflight.active()
    }

    /// Replace the snapshot with a fresh read of both collections.
    ///
    /// On failure the previous snapshot is kept.
    pub async fn refresh(&self) -> Result<()> {
        let _serial = self.inner.refresh_lock.lock().await;
        let read = self.inner.timeouts.read;

        let outcome = async {
            let systems = self.bounded(read, self.inner.store.list_systems()).await?;
            let planets = self
                .bounded(read, self.inner.store.list_planets(&PlanetFilter::all()))
                .await?;
            Ok::<_, ForgeError>((systems, planets))
        }
        .await;

        let (systems, planets) = match outcome {
            Ok(collections) => collections,
            Err(e) => {
                warn!(error = %e, "refresh failed; keeping previous snapshot");
                return Err(e);
            }
        };

        let (snapshot, drifts) = Snapshot::build(systems, planets);
        for drift in &drifts {
            self.notify(Notice::warning(
                ErrorCategory::Inconsistent.as_str(),
                format!("Repaired planet list: {drift}"),
            ));
        }

        let mut cache = self.inner.cache.write().await;
        let changed = !cache.same_contents(&snapshot);
        debug!(
            star_systems = snapshot.systems.len(),
            planets = snapshot.planets.len(),
            changed,
            "snapshot refreshed"
        );
        *cache = snapshot;
        drop(cache);

        if changed {
            self.inner.changes.send_modify(|version| *version = version.wrapping_add(1));
        }
        Ok(())
    }

    pub async fn spawn_star_system(
        &self,
        name: &str,
        tribute_percent: f64,
        owner: Option<&str>,
    ) -> Result<StarSystem> {
        let result = self.try_spawn_star_system(name, tribute_percent, owner).await;
        self.report(&result, |system| {
            Notice::success(
                "star_system",
                format!("Star system '{}' spawned on subnet {}", system.name, system.subnet_id),
            )
        });
        result
    }

    pub async fn spawn_planet(
        &self,
        star_system_id: &StarSystemId,
        name: &str,
        planet_type: PlanetType,
        owner: Option<&str>,
    ) -> Result<Planet> {
        let result = self
            .try_spawn_planet(star_system_id, name, planet_type, owner)
            .await;
        self.report(&result, |planet| {
            Notice::success(
                "planet",
                format!("Planet '{}' spawned at {}", planet.name, planet.ip_address),
            )
        });
        result
    }

    pub async fn update_star_system_status(
        &self,
        id: &StarSystemId,
        status: Status,
        caller: Option<&str>,
    ) -> Result<StarSystem> {
        let result = self.try_update_system_status(id, status, caller).await;
        self.report(&result, |system| {
            Notice::success(
                "star_system",
                format!("Star system '{}' is now {}", system.name, system.status),
            )
        });
        result
    }

    /// Mark a star system active; repeating it is harmless
    pub async fn deploy_star_system(
        &self,
        id: &StarSystemId,
        caller: Option<&str>,
    ) -> Result<StarSystem> {
        let result = self.try_update_system_status(id, Status::Active, caller).await;
        self.report(&result, |system| {
            Notice::success("star_system", format!("Star system '{}' deployed", system.name))
        });
        result
    }

    pub async fn update_planet_status(
        &self,
        id: &PlanetId,
        status: Status,
        caller: Option<&str>,
    ) -> Result<Planet> {
        let result = self.try_update_planet_status(id, status, caller).await;
        self.report(&result, |planet| {
            Notice::success(
                "planet",
                format!("Planet '{}' is now {}", planet.name, planet.status),
            )
        });
        result
    }

    /// Delete a star system and all of its planets
    pub async fn delete_star_system(&self, id: &StarSystemId, caller: Option<&str>) -> Result<()> {
        let result = self.try_delete_star_system(id, caller).await;
        self.report(&result, |(name, planets)| {
            Notice::success(
                "star_system",
                format!("Star system '{name}' deleted with {planets} planet(s)"),
            )
        });
        result.map(|_| ())
    }

    pub async fn delete_planet(&self, id: &PlanetId, caller: Option<&str>) -> Result<()> {
        let result = self.try_delete_planet(id, caller).await;
        self.report(&result, |name| {
            Notice::success("planet", format!("Planet '{name}' deleted"))
        });
        result.map(|_| ())
    }

    /// `None` lists every star system; `Some` only the caller's.
    ///
    /// An unreachable backend yields an empty list and a warning notice.
    pub async fn list_star_systems(&self, owner: Option<&str>) -> Result<Vec<StarSystem>> {
        match self.refresh().await {
            Ok(()) => {}
            Err(e @ ForgeError::Unreachable { .. }) => return Ok(self.degraded(&e, "star systems")),
            Err(e) => return Err(e),
        }

        let cache = self.inner.cache.read().await;
        Ok(match owner {
            None => cache.systems.clone(),
            Some(raw) => {
                let caller = WalletAddress::parse(raw).ok();
                cache
                    .systems_owned_by(caller.as_ref())
                    .into_iter()
                    .cloned()
                    .collect()
            }
        })
    }

    pub async fn list_planets_for_system(
        &self,
        star_system_id: &StarSystemId,
    ) -> Result<Vec<Planet>> {
        let filter = PlanetFilter::for_system(star_system_id.clone());
        self.list_planets_degrading(&filter).await
    }

    /// Planets owned by the caller; no caller sees nothing
    pub async fn list_planets_owned(&self, owner: Option<&str>) -> Result<Vec<Planet>> {
        let Some(caller) = owner.and_then(|raw| WalletAddress::parse(raw).ok()) else {
            return Ok(Vec::new());
        };
        self.list_planets_degrading(&PlanetFilter::owned_by(caller))
            .await
    }

    pub async fn get_star_system(&self, id: &StarSystemId) -> Result<StarSystem> {
        let read = self.inner.timeouts.read;
        self.bounded(read, self.inner.store.get_system(id)).await
    }

    pub async fn get_planet(&self, id: &PlanetId) -> Result<Planet> {
        let read = self.inner.timeouts.read;
        self.bounded(read, self.inner.store.get_planet(id)).await
    }

    pub async fn star_system_details(&self, id: &StarSystemId) -> Result<SystemDetails> {
        let read = self.inner.timeouts.read;
        let (star_system, mut planets) = self
            .bounded(read, self.inner.store.system_with_planets(id))
            .await?;
        sort_planets(&mut planets);
        Ok(SystemDetails {
            star_system,
            planets,
        })
    }

    async fn try_spawn_star_system(
        &self,
        name: &str,
        tribute_percent: f64,
        owner: Option<&str>,
    ) -> Result<StarSystem> {
        let owner = require_caller(owner)?;
        let draft = SystemDraft::new(name, owner.as_str(), tribute_percent).validated()?;

        self.ensure_loaded().await?;
        if self.inner.cache.read().await.system_named(&draft.name).is_some() {
            return Err(ForgeError::DuplicateName {
                kind: forge_core_model::EntityKind::StarSystem,
                name: draft.name,
            });
        }

        let _slot = self.inner.inflight.try_acquire(OperationKey::SpawnSystem)?;
        let write = self.inner.timeouts.write;
        let system = self.bounded(write, self.inner.store.create_system(draft)).await?;
        self.refresh_after_write().await;
        Ok(system)
    }

    async fn try_spawn_planet(
        &self,
        star_system_id: &StarSystemId,
        name: &str,
        planet_type: PlanetType,
        owner: Option<&str>,
    ) -> Result<Planet> {
        let owner = require_caller(owner)?;
        let draft = PlanetDraft::new(star_system_id.clone(), name, planet_type, owner.as_str())
            .validated()?;

        let parent = self
            .find_system(star_system_id)
            .await?
            .ok_or_else(|| ForgeError::SystemNotFound(star_system_id.clone()))?;
        if !authorize(&parent, Some(&owner)) {
            return Err(not_owner(&owner, format_args!("star system '{}'", parent.name)));
        }
        if parent
            .has_planet_named(&self.inner.cache.read().await.planets, &draft.name)
            .is_some()
        {
            return Err(ForgeError::DuplicateName {
                kind: forge_core_model::EntityKind::Planet,
                name: draft.name,
            });
        }

        let _slot = self
            .inner
            .inflight
            .try_acquire(OperationKey::SpawnPlanet(star_system_id.clone()))?;
        let write = self.inner.timeouts.write;
        let planet = self.bounded(write, self.inner.store.create_planet(draft)).await?;
        self.refresh_after_write().await;
        Ok(planet)
    }

    async fn try_update_system_status(
        &self,
        id: &StarSystemId,
        status: Status,
        caller: Option<&str>,
    ) -> Result<StarSystem> {
        let caller = require_caller(caller)?;
        let system = self.owned_system(id, &caller).await?;

        let _slot = self
            .inner
            .inflight
            .try_acquire(OperationKey::SystemStatus(id.clone()))?;
        let write = self.inner.timeouts.write;
        let updated = self
            .bounded(write, self.inner.store.update_system_status(&system.id, status))
            .await?;
        self.refresh_after_write().await;
        Ok(updated)
    }

    async fn try_update_planet_status(
        &self,
        id: &PlanetId,
        status: Status,
        caller: Option<&str>,
    ) -> Result<Planet> {
        let caller = require_caller(caller)?;
        let planet = self.owned_planet(id, &caller).await?;

        let _slot = self
            .inner
            .inflight
            .try_acquire(OperationKey::PlanetStatus(id.clone()))?;
        let write = self.inner.timeouts.write;
        let updated = self
            .bounded(write, self.inner.store.update_planet_status(&planet.id, status))
            .await?;
        self.refresh_after_write().await;
        Ok(updated)
    }

    /// Returns the deleted system's name and how many planets went with it
    async fn try_delete_star_system(
        &self,
        id: &StarSystemId,
        caller: Option<&str>,
    ) -> Result<(String, usize)> {
        let caller = require_caller(caller)?;
        let system = self.owned_system(id, &caller).await?;
        let planets = self.inner.cache.read().await.planets_of(id).len();

        let _slot = self
            .inner
            .inflight
            .try_acquire(OperationKey::DeleteSystem(id.clone()))?;
        let write = self.inner.timeouts.write;
        self.bounded(write, self.inner.store.delete_system(id)).await?;
        self.refresh_after_write().await;
        Ok((system.name, planets))
    }

    async fn try_delete_planet(&self, id: &PlanetId, caller: Option<&str>) -> Result<String> {
        let caller = require_caller(caller)?;
        let planet = self.owned_planet(id, &caller).await?;

        let _slot = self
            .inner
            .inflight
            .try_acquire(OperationKey::DeletePlanet(id.clone()))?;
        let write = self.inner.timeouts.write;
        self.bounded(write, self.inner.store.delete_planet(id)).await?;
        self.refresh_after_write().await;
        Ok(planet.name)
    }

    async fn owned_system(&self, id: &StarSystemId, caller: &WalletAddress) -> Result<StarSystem> {
        let system = self.find_system(id).await?.ok_or_else(|| {
            ForgeError::not_found(forge_core_model::EntityKind::StarSystem, id)
        })?;
        if !authorize(&system, Some(caller)) {
            return Err(not_owner(caller, format_args!("star system '{}'", system.name)));
        }
        Ok(system)
    }

    async fn owned_planet(&self, id: &PlanetId, caller: &WalletAddress) -> Result<Planet> {
        let planet = self
            .find_planet(id)
            .await?
            .ok_or_else(|| ForgeError::not_found(forge_core_model::EntityKind::Planet, id))?;
        if !authorize(&planet, Some(caller)) {
            return Err(not_owner(caller, format_args!("planet '{}'", planet.name)));
        }
        Ok(planet)
    }

    /// Look up in the snapshot, refreshing once on a miss
    async fn find_system(&self, id: &StarSystemId) -> Result<Option<StarSystem>> {
        self.ensure_loaded().await?;
        if let Some(system) = self.inner.cache.read().await.system(id).cloned() {
            return Ok(Some(system));
        }
        self.refresh().await?;
        Ok(self.inner.cache.read().await.system(id).cloned())
    }

    async fn find_planet(&self, id: &PlanetId) -> Result<Option<Planet>> {
        self.ensure_loaded().await?;
        if let Some(planet) = self.inner.cache.read().await.planet(id).cloned() {
            return Ok(Some(planet));
        }
        self.refresh().await?;
        Ok(self.inner.cache.read().await.planet(id).cloned())
    }

    async fn ensure_loaded(&self) -> Result<()> {
        if self.inner.cache.read().await.is_loaded() {
            return Ok(());
        }
        self.refresh().await
    }

    async fn refresh_after_write(&self) {
        if let Err(e) = self.refresh().await {
            debug!(error = %e, "post-write refresh failed");
        }
    }

    async fn list_planets_degrading(&self, filter: &PlanetFilter) -> Result<Vec<Planet>> {
        let read = self.inner.timeouts.read;
        match self.bounded(read, self.inner.store.list_planets(filter)).await {
            Ok(mut planets) => {
                sort_planets(&mut planets);
                Ok(planets)
            }
            Err(e @ ForgeError::Unreachable { .. }) => Ok(self.degraded(&e, "planets")),
            Err(e) => Err(e),
        }
    }

    fn degraded<T>(&self, err: &ForgeError, what: &str) -> Vec<T> {
        let hint = err.guidance().map(|g| g.hint()).unwrap_or_default();
        self.notify(Notice::warning(
            err.category().as_str(),
            format!("{err}. Showing no {what}; {hint}"),
        ));
        Vec::new()
    }

    async fn bounded<T, F>(&self, limit: Duration, call: F) -> Result<T>
    where
        F: Future<Output = forge_core_interface::Result<T>>,
    {
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result.map_err(ForgeError::from),
            Err(_) => Err(ForgeError::Unreachable {
                reason: format!("no response within {:.1}s", limit.as_secs_f64()),
                guidance: Guidance::Retry,
            }),
        }
    }

    fn notify(&self, notice: Notice) {
        self.inner.notifier.notify(notice);
    }

    fn report<T>(&self, result: &Result<T>, success: impl FnOnce(&T) -> Notice) {
        let notice = match result {
            Ok(value) => success(value),
            Err(e) => Notice::from_error(e),
        };
        self.notify(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{MemorySink, NoticeLevel};
    use crate::store::LocalStore;
    use tempfile::tempdir;

    async fn forge_in(dir: &std::path::Path) -> (Forge, MemorySink) {
        let store = LocalStore::open(dir).await.unwrap();
        let sink = MemorySink::new();
        let forge = Forge::builder(Arc::new(store))
            .notifier(Arc::new(sink.clone()))
            .build();
        (forge, sink)
    }

    #[tokio::test]
    async fn test_spawn_requires_wallet() {
        let dir = tempdir().unwrap();
        let (forge, sink) = forge_in(dir.path()).await;
        let err = forge.spawn_star_system("Nova", 5.0, None).await.unwrap_err();
        assert!(matches!(err, ForgeError::Unauthorized(_)));
        let err = forge.spawn_star_system("Nova", 5.0, Some("  ")).await.unwrap_err();
        assert!(matches!(err, ForgeError::Unauthorized(_)));
        assert!(sink.notices().iter().all(|n| n.level == NoticeLevel::Error));
    }

    #[tokio::test]
    async fn test_success_notice_and_snapshot() {
        let dir = tempdir().unwrap();
        let (forge, sink) = forge_in(dir.path()).await;
        let nova = forge.spawn_star_system("Nova", 5.0, Some("0xAAA")).await.unwrap();

        let snapshot = forge.snapshot().await;
        assert_eq!(snapshot.systems.len(), 1);
        assert_eq!(snapshot.systems[0].id, nova.id);

        let notices = sink.take();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Success);
        assert_eq!(notices[0].category, "star_system");
    }

    #[tokio::test]
    async fn test_subscribe_ticks_on_change() {
        let dir = tempdir().unwrap();
        let (forge, _) = forge_in(dir.path()).await;
        let rx = forge.subscribe();
        let before = *rx.borrow();
        forge.spawn_star_system("Nova", 5.0, Some("0xAAA")).await.unwrap();
        assert!(*rx.borrow() > before);

        let after_spawn = *rx.borrow();
        forge.refresh().await.unwrap();
        assert_eq!(*rx.borrow(), after_spawn);
    }

    #[tokio::test]
    async fn test_list_owner_filter() {
        let dir = tempdir().unwrap();
        let (forge, _) = forge_in(dir.path()).await;
        forge.spawn_star_system("Nova", 5.0, Some("0xAAA")).await.unwrap();
        forge.spawn_star_system("Vega", 5.0, Some("0xBBB")).await.unwrap();

        assert_eq!(forge.list_star_systems(None).await.unwrap().len(), 2);
        assert_eq!(forge.list_star_systems(Some("0xaaa")).await.unwrap().len(), 1);
        assert!(forge.list_star_systems(Some("")).await.unwrap().is_empty());
        assert!(forge.list_planets_owned(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deploy_is_idempotent() {
        let dir = tempdir().unwrap();
        let (forge, _) = forge_in(dir.path()).await;
        let nova = forge.spawn_star_system("Nova", 5.0, Some("0xAAA")).await.unwrap();
        let first = forge.deploy_star_system(&nova.id, Some("0xAAA")).await.unwrap();
        let second = forge.deploy_star_system(&nova.id, Some("0xAAA")).await.unwrap();
        assert_eq!(first.status, Status::Active);
        assert_eq!(second.status, Status::Active);
    }
}
