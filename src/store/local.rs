//! Durable local implementation of ForgeStore
//!
//! State lives in two JSON collections under one data directory. Both are read
//! fully into memory on open. Every mutation is computed on a copy, staged as
//! two temp files, and then installed: both renames and the in-memory swap
//! run without an await point between them, so a failed or cancelled write
//! leaves the store as it was on disk and in memory.
//!
//! A crash between the two renames can still leave the collections
//! disagreeing. Opening the store repairs that: orphaned planets are dropped
//! and every system's planet list is recomputed from the planets.

use async_trait::async_trait;
use chrono::Utc;
use forge_core_interface::{
    ForgeStore, PlanetDraft, PlanetFilter, Result, StoreError, StoreMode, SystemDraft,
};
use forge_core_model::{
    orphans, reconcile, EntityKind, Lifecycle, Planet, PlanetId, StarSystem, StarSystemId,
    Status, WalletAddress,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::provision::Provisioner;

pub const SYSTEMS_FILE: &str = "star_systems.json";
pub const PLANETS_FILE: &str = "planets.json";

/// In-memory copy of both collections
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collections {
    pub systems: Vec<StarSystem>,
    pub planets: Vec<Planet>,
}

impl Collections {
    fn system(&self, id: &StarSystemId) -> Option<&StarSystem> {
        self.systems.iter().find(|s| &s.id == id)
    }

    /// Recompute planet lists; any drift here means a bug upstream of the write
    fn settle(&mut self) {
        for drift in reconcile(&mut self.systems, &self.planets) {
            warn!(
                category = "inconsistent",
                star_system_id = %drift.star_system_id,
                missing = drift.missing.len(),
                stale = drift.extra.len(),
                "repaired planet list before write-back"
            );
        }
    }
}

/// Local durable store with synthetic provisioning
///
/// # Example
///
/// ```rust,no_run
/// use forge::store::LocalStore;
/// use forge_core_interface::{ForgeStore, SystemDraft};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let store = LocalStore::open("/tmp/forge-data").await?;
///     let nova = store.create_system(SystemDraft::new("Nova", "0xAAA", 5.0)).await?;
///     println!("spawned {} on subnet {}", nova.name, nova.subnet_id);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct LocalStore {
    dir: PathBuf,
    provisioner: Provisioner,
    state: Mutex<Collections>,
}

impl LocalStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with(dir, Provisioner::default()).await
    }

    pub async fn open_with(dir: impl Into<PathBuf>, provisioner: Provisioner) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error("create data directory", &dir.display(), e))?;

        let mut systems: Vec<StarSystem> = read_collection(&dir.join(SYSTEMS_FILE)).await?;
        let mut planets: Vec<Planet> = read_collection(&dir.join(PLANETS_FILE)).await?;
        ensure_unique(SYSTEMS_FILE, systems.iter().map(|s| &s.id))?;
        ensure_unique(PLANETS_FILE, planets.iter().map(|p| &p.id))?;

        let orphaned: HashSet<PlanetId> = orphans(&systems, &planets)
            .into_iter()
            .map(|p| p.id.clone())
            .collect();
        if !orphaned.is_empty() {
            warn!(
                category = "inconsistent",
                count = orphaned.len(),
                "dropping planets whose star system no longer exists"
            );
            planets.retain(|p| !orphaned.contains(&p.id));
        }

        for drift in reconcile(&mut systems, &planets) {
            warn!(
                category = "inconsistent",
                star_system_id = %drift.star_system_id,
                missing = drift.missing.len(),
                stale = drift.extra.len(),
                "repaired planet list on load"
            );
        }

        info!(
            data_dir = %dir.display(),
            star_systems = systems.len(),
            planets = planets.len(),
            "local store opened"
        );

        Ok(Self {
            dir,
            provisioner,
            state: Mutex::new(Collections { systems, planets }),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.dir
    }

    /// Copy of the current in-memory state
    pub async fn collections(&self) -> Collections {
        self.state.lock().await.clone()
    }

    /// Persist `next` and make it the current state
    async fn commit(&self, current: &mut Collections, next: Collections) -> Result<()> {
        let planets = stage_collection(&self.dir.join(PLANETS_FILE), &next.planets).await?;
        let systems = match stage_collection(&self.dir.join(SYSTEMS_FILE), &next.systems).await {
            Ok(staged) => staged,
            Err(e) => {
                planets.discard().await;
                return Err(e);
            }
        };

        // No await from here on.
        if let Err(e) = planets.install() {
            systems.discard_now();
            return Err(e);
        }
        if let Err(e) = systems.install() {
            if let Err(restore) = replace_collection(&planets.path, &current.planets) {
                error!(
                    error = %restore,
                    path = %planets.path.display(),
                    "failed to restore planets after an incomplete write"
                );
            }
            return Err(e);
        }
        *current = next;
        Ok(())
    }
}

#[async_trait]
impl ForgeStore for LocalStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Mock
    }

    async fn create_system(&self, draft: SystemDraft) -> Result<StarSystem> {
        let draft = draft.validated()?;
        let mut state = self.state.lock().await;

        if state.systems.iter().any(|s| s.name == draft.name) {
            return Err(StoreError::DuplicateName {
                kind: EntityKind::StarSystem,
                name: draft.name,
            });
        }

        let system = self.provisioner.provision_system(&draft, Utc::now());
        let mut next = state.clone();
        next.systems.push(system.clone());
        self.commit(&mut state, next).await?;

        info!(
            star_system_id = %system.id,
            name = %system.name,
            subnet_id = %system.subnet_id,
            "star system spawned"
        );
        Ok(system)
    }

    async fn create_planet(&self, draft: PlanetDraft) -> Result<Planet> {
        let draft = draft.validated()?;
        let mut state = self.state.lock().await;

        let parent = state
            .system(&draft.star_system_id)
            .ok_or_else(|| StoreError::SystemNotFound(draft.star_system_id.clone()))?;
        let caller = WalletAddress::parse(&draft.owner_wallet)?;
        if !caller.matches(&parent.owner_wallet) {
            return Err(StoreError::Unauthorized(format!(
                "{} does not own star system {}",
                caller, parent.id
            )));
        }
        if parent.has_planet_named(&state.planets, &draft.name).is_some() {
            return Err(StoreError::DuplicateName {
                kind: EntityKind::Planet,
                name: draft.name,
            });
        }

        let planet = self.provisioner.provision_planet(&draft, Utc::now());
        let mut next = state.clone();
        next.planets.push(planet.clone());
        if let Some(system) = next.systems.iter_mut().find(|s| s.id == planet.star_system_id) {
            system.planets.push(planet.id.clone());
        }
        next.settle();
        self.commit(&mut state, next).await?;

        info!(
            planet_id = %planet.id,
            star_system_id = %planet.star_system_id,
            name = %planet.name,
            "planet spawned"
        );
        Ok(planet)
    }

    async fn list_systems(&self) -> Result<Vec<StarSystem>> {
        Ok(self.state.lock().await.systems.clone())
    }

    async fn list_planets(&self, filter: &PlanetFilter) -> Result<Vec<Planet>> {
        let state = self.state.lock().await;
        Ok(state
            .planets
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn get_system(&self, id: &StarSystemId) -> Result<StarSystem> {
        self.state
            .lock()
            .await
            .system(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityKind::StarSystem, id))
    }

    async fn get_planet(&self, id: &PlanetId) -> Result<Planet> {
        self.state
            .lock()
            .await
            .planets
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityKind::Planet, id))
    }

    async fn update_system_status(&self, id: &StarSystemId, status: Status) -> Result<StarSystem> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let system = next
            .systems
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| StoreError::not_found(EntityKind::StarSystem, id))?;

        let transition = system.transition_to(status, Utc::now());
        let updated = system.clone();
        self.commit(&mut state, next).await?;

        debug!(star_system_id = %id, %transition, noop = transition.is_noop(), "status applied");
        Ok(updated)
    }

    async fn update_planet_status(&self, id: &PlanetId, status: Status) -> Result<Planet> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let planet = next
            .planets
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Planet, id))?;

        let transition = planet.transition_to(status, Utc::now());
        let updated = planet.clone();
        self.commit(&mut state, next).await?;

        debug!(planet_id = %id, %transition, noop = transition.is_noop(), "status applied");
        Ok(updated)
    }

    async fn delete_system(&self, id: &StarSystemId) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.system(id).is_none() {
            return Err(StoreError::not_found(EntityKind::StarSystem, id));
        }

        let mut next = state.clone();
        next.systems.retain(|s| &s.id != id);
        let before = next.planets.len();
        next.planets.retain(|p| &p.star_system_id != id);
        let removed = before - next.planets.len();
        self.commit(&mut state, next).await?;

        info!(star_system_id = %id, planets = removed, "star system deleted");
        Ok(())
    }

    async fn delete_planet(&self, id: &PlanetId) -> Result<()> {
        let mut state = self.state.lock().await;
        let system_id = state
            .planets
            .iter()
            .find(|p| &p.id == id)
            .map(|p| p.star_system_id.clone())
            .ok_or_else(|| StoreError::not_found(EntityKind::Planet, id))?;

        let mut next = state.clone();
        next.planets.retain(|p| &p.id != id);
        if let Some(system) = next.systems.iter_mut().find(|s| s.id == system_id) {
            system.planets.retain(|p| p != id);
        }
        next.settle();
        self.commit(&mut state, next).await?;

        info!(planet_id = %id, star_system_id = %system_id, "planet deleted");
        Ok(())
    }
}

fn io_error(action: &str, target: &dyn Display, err: std::io::Error) -> StoreError {
    StoreError::Storage(format!("Failed to {action} {target}: {err}"))
}

async fn read_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    match fs::read_to_string(path).await {
        Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
        Ok(content) => serde_json::from_str(&content)
            .map_err(|e| StoreError::Storage(format!("Corrupt {}: {}", path.display(), e))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(io_error("read", &path.display(), e)),
    }
}

fn encode<T: Serialize>(path: &Path, items: &[T]) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(items)
        .map_err(|e| StoreError::Storage(format!("Failed to serialize {}: {}", path.display(), e)))
}

fn temp_path(path: &Path) -> PathBuf {
    path.with_extension("json.tmp")
}

/// A fully written and synced temp file waiting to replace `path`
struct Staged {
    tmp: PathBuf,
    path: PathBuf,
}

impl Staged {
    fn install(&self) -> Result<()> {
        std::fs::rename(&self.tmp, &self.path)
            .map_err(|e| io_error("replace", &self.path.display(), e))
    }

    async fn discard(&self) {
        let _ = fs::remove_file(&self.tmp).await;
    }

    fn discard_now(&self) {
        let _ = std::fs::remove_file(&self.tmp);
    }
}

async fn stage_collection<T: Serialize>(path: &Path, items: &[T]) -> Result<Staged> {
    let json = encode(path, items)?;
    let tmp = temp_path(path);

    let mut file = fs::File::create(&tmp)
        .await
        .map_err(|e| io_error("create", &tmp.display(), e))?;
    file.write_all(&json)
        .await
        .map_err(|e| io_error("write", &tmp.display(), e))?;
    file.sync_all()
        .await
        .map_err(|e| io_error("sync", &tmp.display(), e))?;

    Ok(Staged {
        tmp,
        path: path.to_path_buf(),
    })
}

/// Blocking whole-file replace, used to roll back an installed collection
fn replace_collection<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let json = encode(path, items)?;
    let tmp = temp_path(path);
    std::fs::write(&tmp, json).map_err(|e| io_error("write", &tmp.display(), e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_error("replace", &path.display(), e))
}

fn ensure_unique<'a, I, T>(collection: &str, ids: I) -> Result<()>
where
    I: IntoIterator<Item = &'a T>,
    T: Display + Eq + std::hash::Hash + 'a,
{
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(StoreError::Storage(format!(
                "Corrupt {collection}: duplicate id {id}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core_model::PlanetType;
    use tempfile::tempdir;

    fn terra_draft(system: &StarSystemId) -> PlanetDraft {
        PlanetDraft::new(system.clone(), "Terra", PlanetType::Habitable, "0xAAA")
    }

    async fn seeded(dir: &Path) -> (LocalStore, StarSystem) {
        let store = LocalStore::open(dir).await.unwrap();
        let nova = store
            .create_system(SystemDraft::new("Nova", "0xAAA", 5.0))
            .await
            .unwrap();
        (store, nova)
    }

    #[tokio::test]
    async fn test_create_and_reopen() {
        let dir = tempdir().unwrap();
        let (store, nova) = seeded(dir.path()).await;
        let terra = store
            .create_planet(terra_draft(&nova.id))
            .await
            .unwrap();
        let before = store.collections().await;
        drop(store);

        let reopened = LocalStore::open(dir.path()).await.unwrap();
        let after = reopened.collections().await;
        assert_eq!(before, after);
        assert_eq!(after.systems[0].planets, vec![terra.id]);
    }

    #[tokio::test]
    async fn test_duplicate_system_name_rejected() {
        let dir = tempdir().unwrap();
        let (store, _) = seeded(dir.path()).await;
        let err = store
            .create_system(SystemDraft::new(" Nova ", "0xBBB", 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName { kind: EntityKind::StarSystem, .. }));
        assert_eq!(store.list_systems().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_planet_name_unique_per_system_only() {
        let dir = tempdir().unwrap();
        let (store, nova) = seeded(dir.path()).await;
        let vega = store
            .create_system(SystemDraft::new("Vega", "0xAAA", 0.0))
            .await
            .unwrap();

        let terra = PlanetDraft::new(nova.id.clone(), "Terra", PlanetType::Habitable, "0xAAA");
        store.create_planet(terra.clone()).await.unwrap();
        assert!(matches!(
            store.create_planet(terra).await,
            Err(StoreError::DuplicateName { kind: EntityKind::Planet, .. })
        ));
        store
            .create_planet(PlanetDraft::new(vega.id, "Terra", PlanetType::Habitable, "0xAAA"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_untouched() {
        let dir = tempdir().unwrap();
        let (store, _) = seeded(dir.path()).await;

        // A directory where the temp file should go makes the write fail.
        std::fs::create_dir(dir.path().join("planets.json.tmp")).unwrap();
        let err = store
            .create_system(SystemDraft::new("Vega", "0xAAA", 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert_eq!(store.list_systems().await.unwrap().len(), 1);

        std::fs::remove_dir(dir.path().join("planets.json.tmp")).unwrap();
        store
            .create_system(SystemDraft::new("Vega", "0xAAA", 0.0))
            .await
            .unwrap();
        assert_eq!(store.list_systems().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_systems_write_keeps_planets_on_disk() {
        let dir = tempdir().unwrap();
        let (store, nova) = seeded(dir.path()).await;
        let terra = store
            .create_planet(terra_draft(&nova.id))
            .await
            .unwrap();

        // Planets stage fine; the systems temp file cannot be created.
        std::fs::create_dir(dir.path().join("star_systems.json.tmp")).unwrap();
        let err = store.delete_system(&nova.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert!(!dir.path().join("planets.json.tmp").exists());
        drop(store);

        std::fs::remove_dir(dir.path().join("star_systems.json.tmp")).unwrap();
        let reopened = LocalStore::open(dir.path()).await.unwrap();
        let after = reopened.collections().await;
        assert_eq!(after.systems.len(), 1);
        assert_eq!(after.planets.len(), 1);
        assert_eq!(after.systems[0].planets, vec![terra.id]);
    }

    #[tokio::test]
    async fn test_failed_systems_rename_restores_planets() {
        let dir = tempdir().unwrap();
        let (store, nova) = seeded(dir.path()).await;
        let systems_before = std::fs::read_to_string(dir.path().join(SYSTEMS_FILE)).unwrap();

        // Planets get renamed into place, then the systems rename hits a directory.
        std::fs::remove_file(dir.path().join(SYSTEMS_FILE)).unwrap();
        std::fs::create_dir(dir.path().join(SYSTEMS_FILE)).unwrap();
        std::fs::write(dir.path().join(SYSTEMS_FILE).join("keep"), "x").unwrap();

        let err = store
            .create_planet(terra_draft(&nova.id))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert!(store.collections().await.planets.is_empty());

        let on_disk: Vec<Planet> =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(PLANETS_FILE)).unwrap())
                .unwrap();
        assert!(on_disk.is_empty());
        drop(store);

        std::fs::remove_dir_all(dir.path().join(SYSTEMS_FILE)).unwrap();
        std::fs::write(dir.path().join(SYSTEMS_FILE), systems_before).unwrap();
        let reopened = LocalStore::open(dir.path()).await.unwrap();
        let after = reopened.collections().await;
        assert!(after.planets.is_empty());
        assert!(after.systems[0].planets.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_ids_on_disk_are_corruption() {
        let dir = tempdir().unwrap();
        let (store, nova) = seeded(dir.path()).await;
        drop(store);

        let doubled = serde_json::to_string(&vec![nova.clone(), nova]).unwrap();
        std::fs::write(dir.path().join(SYSTEMS_FILE), doubled).unwrap();
        let err = LocalStore::open(dir.path()).await.unwrap_err();
        assert!(matches!(err, StoreError::Storage(msg) if msg.contains("duplicate id")));
    }

    #[tokio::test]
    async fn test_corrupt_json_is_storage_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(PLANETS_FILE), "[{not json").unwrap();
        assert!(matches!(
            LocalStore::open(dir.path()).await,
            Err(StoreError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_files_load_as_empty() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(SYSTEMS_FILE), "").unwrap();
        std::fs::write(dir.path().join(PLANETS_FILE), "  \n").unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        assert!(store.list_systems().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_update_is_idempotent() {
        let dir = tempdir().unwrap();
        let (store, nova) = seeded(dir.path()).await;
        let first = store.update_system_status(&nova.id, Status::Active).await.unwrap();
        let second = store.update_system_status(&nova.id, Status::Active).await.unwrap();
        assert_eq!(first.status, Status::Active);
        assert_eq!(second.status, Status::Active);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_missing_entities() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        let ghost = StarSystemId::new("ghost");
        assert!(matches!(
            store.delete_system(&ghost).await,
            Err(StoreError::NotFound { kind: EntityKind::StarSystem, .. })
        ));
        assert!(matches!(
            store.get_planet(&PlanetId::new("ghost")).await,
            Err(StoreError::NotFound { kind: EntityKind::Planet, .. })
        ));
        assert!(matches!(
            store
                .create_planet(terra_draft(&ghost))
                .await,
            Err(StoreError::SystemNotFound(id)) if id == ghost
        ));
    }
}
