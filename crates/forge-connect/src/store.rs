//! RemoteStore - ForgeStore implementation backed by the hosted HTTP API
//!
//! The backend is authoritative. This adapter keeps a last-known snapshot,
//! filled by every read, to reject obviously invalid requests before they
//! leave the process. `get_system` rebuilds the planet list from planet
//! records; `list_systems` hands back the stored lists so the caller can
//! reconcile them and report drift.

use crate::error::{ConnectError, Target};
use crate::wire::{Envelope, PlanetListBody, SpawnPlanetBody, StatusBody};
use async_trait::async_trait;
use forge_core_interface::{
    ForgeStore, PlanetDraft, PlanetFilter, Result, StoreError, StoreMode, SystemDraft,
};
use forge_core_model::{
    derive_planet_ids, reconcile, EntityKind, Planet, PlanetId, StarSystem, StarSystemId, Status,
    WalletAddress,
};
use reqwest::{Client, RequestBuilder, Url};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const API_ROOT: &str = "celestial-forge";

#[derive(Debug, Default)]
struct Known {
    systems: Vec<StarSystem>,
    planets: Vec<Planet>,
}

/// HTTP client for the Forge backend
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    base_url: Url,
    known: Arc<RwLock<Known>>,
}

impl RemoteStore {
    pub fn new(base_url: &str) -> std::result::Result<Self, ConnectError> {
        Self::with_timeouts(base_url, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeouts(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> std::result::Result<Self, ConnectError> {
        let url = Url::parse(base_url.trim()).map_err(|e| ConnectError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ConnectError::InvalidUrl {
                url: base_url.to_string(),
                reason: "expected an http(s) URL".to_string(),
            });
        }

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;

        debug!(base_url = %url, "remote store configured");

        Ok(Self {
            client,
            base_url: url,
            known: Arc::new(RwLock::new(Known::default())),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, segments: &[&str]) -> std::result::Result<Url, ConnectError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ConnectError::InvalidUrl {
                    url: self.base_url.to_string(),
                    reason: "URL cannot carry a path".to_string(),
                })?;
            path.pop_if_empty().push(API_ROOT).extend(segments);
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> std::result::Result<Envelope, ConnectError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let envelope = if body.is_empty() {
            Envelope::default()
        } else {
            match serde_json::from_slice::<Envelope>(&body) {
                Ok(envelope) => envelope,
                Err(e) if status.is_success() => return Err(ConnectError::Decode(e.to_string())),
                Err(_) => Envelope {
                    error: Some(String::from_utf8_lossy(&body).into_owned()),
                    ..Envelope::default()
                },
            }
        };

        if !status.is_success() || envelope.is_failure() {
            let message = envelope
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(ConnectError::Backend {
                status: status.as_u16(),
                code: envelope.code,
                message,
            });
        }

        Ok(envelope)
    }

    async fn fetch_systems(&self) -> std::result::Result<Vec<StarSystem>, ConnectError> {
        let url = self.endpoint(&["star-systems"])?;
        let envelope = self.send(self.client.get(url)).await?;
        envelope
            .star_systems
            .ok_or(ConnectError::MissingField("star_systems"))
    }

    async fn fetch_planets(
        &self,
        filter: &PlanetFilter,
    ) -> std::result::Result<Vec<Planet>, ConnectError> {
        let url = self.endpoint(&["planets"])?;
        let mut request = self.client.get(url);
        if let Some(id) = &filter.star_system_id {
            request = request.query(&[("star_system_id", id.as_str())]);
        }
        if let Some(owner) = &filter.owner_wallet {
            request = request.query(&[("owner_wallet", owner.as_str())]);
        }

        let planets = self
            .send(request)
            .await?
            .planets
            .ok_or(ConnectError::MissingField("planets"))?;

        Ok(planets.into_iter().filter(|p| filter.matches(p)).collect())
    }

    async fn fetch_planet(&self, id: &PlanetId) -> std::result::Result<Planet, ConnectError> {
        let url = self.endpoint(&["planets", id.as_str()])?;
        self.send(self.client.get(url))
            .await?
            .planet
            .ok_or(ConnectError::MissingField("planet"))
    }

    /// Rebuild the system's planet list and push it to the backend.
    ///
    /// Failure is logged and left for the next read to repair.
    async fn sync_planet_list(&self, system_id: &StarSystemId) {
        let outcome = async {
            let planets = self
                .fetch_planets(&PlanetFilter::for_system(system_id.clone()))
                .await?;
            let ids = derive_planet_ids(system_id, &planets);
            let url = self.endpoint(&["star-systems", system_id.as_str(), "planets"])?;
            let body = PlanetListBody {
                planets: ids.clone(),
            };
            self.send(self.client.patch(url).json(&body)).await?;
            Ok::<_, ConnectError>(ids)
        }
        .await;

        match outcome {
            Ok(ids) => {
                debug!(star_system_id = %system_id, planets = ids.len(), "planet list synced");
                if let Some(system) = self
                    .known_mut()
                    .systems
                    .iter_mut()
                    .find(|s| &s.id == system_id)
                {
                    system.planets = ids;
                }
            }
            Err(e) => {
                warn!(
                    category = "inconsistent",
                    star_system_id = %system_id,
                    error = %e,
                    "planet list follow-up failed; next read will repair it"
                );
            }
        }
    }

    fn known(&self) -> RwLockReadGuard<'_, Known> {
        self.known.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn known_mut(&self) -> RwLockWriteGuard<'_, Known> {
        self.known.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn remember_system(&self, system: StarSystem) {
        let mut known = self.known_mut();
        match known.systems.iter_mut().find(|s| s.id == system.id) {
            Some(slot) => *slot = system,
            None => known.systems.push(system),
        }
    }

    fn remember_planet(&self, planet: Planet) {
        let mut known = self.known_mut();
        match known.planets.iter_mut().find(|p| p.id == planet.id) {
            Some(slot) => *slot = planet,
            None => known.planets.push(planet),
        }
    }

    /// Check a planet draft against what this client last saw.
    ///
    /// Returns the parent's name when the parent is known.
    fn precheck_planet(&self, draft: &PlanetDraft) -> Result<Option<String>> {
        let known = self.known();
        let Some(parent) = known.systems.iter().find(|s| s.id == draft.star_system_id) else {
            return Ok(None);
        };

        let caller = WalletAddress::parse(&draft.owner_wallet)?;
        if !caller.matches(&parent.owner_wallet) {
            return Err(StoreError::Unauthorized(format!(
                "{} does not own star system {}",
                caller, parent.id
            )));
        }
        if parent.has_planet_named(&known.planets, &draft.name).is_some() {
            return Err(StoreError::DuplicateName {
                kind: EntityKind::Planet,
                name: draft.name.clone(),
            });
        }
        Ok(Some(parent.name.clone()))
    }
}

fn repair_planet_lists(systems: &mut [StarSystem], planets: &[Planet]) {
    for drift in reconcile(systems, planets) {
        warn!(
            category = "inconsistent",
            star_system_id = %drift.star_system_id,
            missing = drift.missing.len(),
            stale = drift.extra.len(),
            "repaired planet list from planet records"
        );
    }
}

#[async_trait]
impl ForgeStore for RemoteStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Remote
    }

    async fn create_system(&self, draft: SystemDraft) -> Result<StarSystem> {
        let draft = draft.validated()?;
        let target = Target::NewSystem { name: &draft.name };

        if self.known().systems.iter().any(|s| s.name == draft.name) {
            return Err(StoreError::DuplicateName {
                kind: EntityKind::StarSystem,
                name: draft.name.clone(),
            });
        }

        let url = self
            .endpoint(&["spawn-star-system"])
            .map_err(|e| e.into_store_error(target))?;
        let system = self
            .send(self.client.post(url).json(&draft))
            .await
            .and_then(|env| env.star_system.ok_or(ConnectError::MissingField("star_system")))
            .map_err(|e| e.into_store_error(target))?;

        info!(star_system_id = %system.id, name = %system.name, "star system spawned");
        self.remember_system(system.clone());
        Ok(system)
    }

    async fn create_planet(&self, draft: PlanetDraft) -> Result<Planet> {
        let draft = draft.validated()?;
        let target = Target::NewPlanet {
            system: &draft.star_system_id,
            name: &draft.name,
        };

        let star_system_name = self.precheck_planet(&draft)?;
        let body = SpawnPlanetBody {
            draft: draft.clone(),
            star_system_name,
        };

        let url = self
            .endpoint(&["spawn-planet"])
            .map_err(|e| e.into_store_error(target))?;
        let planet = self
            .send(self.client.post(url).json(&body))
            .await
            .and_then(|env| env.planet.ok_or(ConnectError::MissingField("planet")))
            .map_err(|e| e.into_store_error(target))?;

        info!(
            planet_id = %planet.id,
            star_system_id = %planet.star_system_id,
            name = %planet.name,
            "planet spawned"
        );
        self.remember_planet(planet.clone());
        self.sync_planet_list(&planet.star_system_id).await;
        Ok(planet)
    }

    /// Planet lists come back as the backend stores them; the caller
    /// reconciles them against the planet records.
    async fn list_systems(&self) -> Result<Vec<StarSystem>> {
        let systems = self.fetch_systems().await?;
        let planets = self.fetch_planets(&PlanetFilter::all()).await?;

        let mut known = self.known_mut();
        known.systems = systems.clone();
        known.planets = planets;
        Ok(systems)
    }

    async fn list_planets(&self, filter: &PlanetFilter) -> Result<Vec<Planet>> {
        let planets = self.fetch_planets(filter).await?;
        if filter.is_unfiltered() {
            self.known_mut().planets = planets.clone();
        }
        Ok(planets)
    }

    async fn get_system(&self, id: &StarSystemId) -> Result<StarSystem> {
        let target = Target::System(id);
        let url = self
            .endpoint(&["star-systems", id.as_str()])
            .map_err(|e| e.into_store_error(target))?;
        let envelope = self
            .send(self.client.get(url))
            .await
            .map_err(|e| e.into_store_error(target))?;

        let mut system = envelope
            .star_system
            .ok_or(ConnectError::MissingField("star_system"))
            .map_err(|e| e.into_store_error(target))?;
        let planets = match envelope.planets {
            Some(planets) => planets,
            None => self
                .fetch_planets(&PlanetFilter::for_system(id.clone()))
                .await
                .map_err(|e| e.into_store_error(target))?,
        };

        repair_planet_lists(std::slice::from_mut(&mut system), &planets);
        self.remember_system(system.clone());
        for planet in planets.into_iter().filter(|p| &p.star_system_id == id) {
            self.remember_planet(planet);
        }
        Ok(system)
    }

    async fn get_planet(&self, id: &PlanetId) -> Result<Planet> {
        let planet = self
            .fetch_planet(id)
            .await
            .map_err(|e| e.into_store_error(Target::Planet(id)))?;
        self.remember_planet(planet.clone());
        Ok(planet)
    }

    async fn update_system_status(&self, id: &StarSystemId, status: Status) -> Result<StarSystem> {
        let target = Target::System(id);
        let url = self
            .endpoint(&["star-systems", id.as_str(), "status"])
            .map_err(|e| e.into_store_error(target))?;
        self.send(self.client.patch(url).json(&StatusBody { status }))
            .await
            .map_err(|e| e.into_store_error(target))?;

        info!(star_system_id = %id, %status, "star system status updated");
        self.get_system(id).await
    }

    async fn update_planet_status(&self, id: &PlanetId, status: Status) -> Result<Planet> {
        let target = Target::Planet(id);
        let url = self
            .endpoint(&["planets", id.as_str(), "status"])
            .map_err(|e| e.into_store_error(target))?;
        let envelope = self
            .send(self.client.patch(url).json(&StatusBody { status }))
            .await
            .map_err(|e| e.into_store_error(target))?;

        info!(planet_id = %id, %status, "planet status updated");
        match envelope.planet {
            Some(planet) => {
                self.remember_planet(planet.clone());
                Ok(planet)
            }
            None => self.get_planet(id).await,
        }
    }

    async fn delete_system(&self, id: &StarSystemId) -> Result<()> {
        let target = Target::System(id);
        let planets = self
            .fetch_planets(&PlanetFilter::for_system(id.clone()))
            .await
            .map_err(|e| e.into_store_error(target))?;

        for planet in &planets {
            let url = self
                .endpoint(&["planets", planet.id.as_str()])
                .map_err(|e| e.into_store_error(Target::Planet(&planet.id)))?;
            match self.send(self.client.delete(url)).await {
                Ok(_) => {}
                Err(e) => match e.into_store_error(Target::Planet(&planet.id)) {
                    StoreError::NotFound { .. } => {}
                    other => return Err(other),
                },
            }
        }

        let url = self
            .endpoint(&["star-systems", id.as_str()])
            .map_err(|e| e.into_store_error(target))?;
        self.send(self.client.delete(url))
            .await
            .map_err(|e| e.into_store_error(target))?;

        info!(star_system_id = %id, planets = planets.len(), "star system deleted");
        let mut known = self.known_mut();
        known.systems.retain(|s| &s.id != id);
        known.planets.retain(|p| &p.star_system_id != id);
        Ok(())
    }

    async fn delete_planet(&self, id: &PlanetId) -> Result<()> {
        let target = Target::Planet(id);
        let cached = self
            .known()
            .planets
            .iter()
            .find(|p| &p.id == id)
            .map(|p| p.star_system_id.clone());
        let system_id = match cached {
            Some(system_id) => system_id,
            None => {
                self.fetch_planet(id)
                    .await
                    .map_err(|e| e.into_store_error(target))?
                    .star_system_id
            }
        };

        let url = self
            .endpoint(&["planets", id.as_str()])
            .map_err(|e| e.into_store_error(target))?;
        self.send(self.client.delete(url))
            .await
            .map_err(|e| e.into_store_error(target))?;

        info!(planet_id = %id, star_system_id = %system_id, "planet deleted");
        self.known_mut().planets.retain(|p| &p.id != id);
        self.sync_planet_list(&system_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(matches!(
            RemoteStore::new("ftp://example.com"),
            Err(ConnectError::InvalidUrl { .. })
        ));
        assert!(matches!(
            RemoteStore::new("not a url"),
            Err(ConnectError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_endpoint_joins_under_api_root() {
        let store = RemoteStore::new("http://127.0.0.1:8000/api/").unwrap();
        let url = store.endpoint(&["star-systems", "abc", "status"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8000/api/celestial-forge/star-systems/abc/status"
        );

        let store = RemoteStore::new("http://127.0.0.1:8000").unwrap();
        let url = store.endpoint(&["planets"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/celestial-forge/planets");
    }

    #[test]
    fn test_mode_is_remote() {
        let store = RemoteStore::new("http://localhost:8000").unwrap();
        assert_eq!(store.mode(), StoreMode::Remote);
    }
}
