//! In-process HTTP backend speaking the celestial-forge API
//!
//! Tables are kept in memory. Star system planet lists are stored exactly as
//! the client sends them, so a failed list update stays visible until the
//! client repairs it.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use forge::store::Provisioner;
use forge_connect::{Envelope, PlanetListBody, SpawnPlanetBody, StatusBody};
use forge_core_interface::{StoreError, SystemDraft};
use forge_core_model::{EntityKind, Lifecycle, Planet, StarSystem, WalletAddress};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

type Reply = (StatusCode, Json<Envelope>);

#[derive(Default)]
pub struct Tables {
    pub systems: Vec<StarSystem>,
    pub planets: Vec<Planet>,
}

#[derive(Default)]
pub struct Backend {
    pub tables: Mutex<Tables>,
    /// Make `PATCH /star-systems/{id}/planets` answer 503
    pub fail_planet_sync: AtomicBool,
    provisioner: Provisioner,
}

impl Backend {
    pub fn set_fail_planet_sync(&self, fail: bool) {
        self.fail_planet_sync.store(fail, Ordering::SeqCst);
    }

    pub fn stored_planet_list(&self, system: &forge_core_model::StarSystemId) -> Vec<String> {
        let tables = self.tables.lock().unwrap();
        tables
            .systems
            .iter()
            .find(|s| &s.id == system)
            .map(|s| s.planets.iter().map(|p| p.to_string()).collect())
            .unwrap_or_default()
    }
}

pub struct RunningBackend {
    pub state: Arc<Backend>,
    pub addr: SocketAddr,
}

impl RunningBackend {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

fn ok(envelope: Envelope) -> Reply {
    (StatusCode::OK, Json(envelope))
}

fn fail(status: StatusCode, err: StoreError) -> Reply {
    (status, Json(Envelope::failure(&err)))
}

fn missing(kind: EntityKind, id: &str) -> Reply {
    fail(StatusCode::NOT_FOUND, StoreError::not_found(kind, id))
}

async fn spawn_system(
    State(backend): State<Arc<Backend>>,
    Json(draft): Json<SystemDraft>,
) -> Reply {
    let draft = match draft.validated() {
        Ok(draft) => draft,
        Err(e) => return fail(StatusCode::UNPROCESSABLE_ENTITY, e),
    };
    let mut tables = backend.tables.lock().unwrap();
    if tables.systems.iter().any(|s| s.name == draft.name) {
        return fail(
            StatusCode::CONFLICT,
            StoreError::DuplicateName {
                kind: EntityKind::StarSystem,
                name: draft.name,
            },
        );
    }
    let system = backend.provisioner.provision_system(&draft, Utc::now());
    tables.systems.push(system.clone());
    ok(Envelope::with_system(system))
}

async fn spawn_planet(
    State(backend): State<Arc<Backend>>,
    Json(body): Json<SpawnPlanetBody>,
) -> Reply {
    let draft = match body.draft.validated() {
        Ok(draft) => draft,
        Err(e) => return fail(StatusCode::UNPROCESSABLE_ENTITY, e),
    };
    let mut tables = backend.tables.lock().unwrap();
    let Some(parent) = tables.systems.iter().find(|s| s.id == draft.star_system_id) else {
        return missing(EntityKind::StarSystem, draft.star_system_id.as_str());
    };
    let owner_matches = WalletAddress::parse(&draft.owner_wallet)
        .map(|caller| caller.matches(&parent.owner_wallet))
        .unwrap_or(false);
    if !owner_matches {
        return fail(
            StatusCode::FORBIDDEN,
            StoreError::Unauthorized("not the star system owner".into()),
        );
    }
    if parent.has_planet_named(&tables.planets, &draft.name).is_some() {
        return fail(
            StatusCode::CONFLICT,
            StoreError::DuplicateName {
                kind: EntityKind::Planet,
                name: draft.name,
            },
        );
    }
    let planet = backend.provisioner.provision_planet(&draft, Utc::now());
    tables.planets.push(planet.clone());
    ok(Envelope::with_planet(planet))
}

async fn list_systems(State(backend): State<Arc<Backend>>) -> Reply {
    let tables = backend.tables.lock().unwrap();
    ok(Envelope::with_systems(tables.systems.clone()))
}

async fn get_system(State(backend): State<Arc<Backend>>, Path(id): Path<String>) -> Reply {
    let tables = backend.tables.lock().unwrap();
    match tables.systems.iter().find(|s| s.id.as_str() == id) {
        Some(system) => ok(Envelope::with_system(system.clone())),
        None => missing(EntityKind::StarSystem, &id),
    }
}

async fn system_status(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Reply {
    let mut tables = backend.tables.lock().unwrap();
    match tables.systems.iter_mut().find(|s| s.id.as_str() == id) {
        Some(system) => {
            system.transition_to(body.status, Utc::now());
            ok(Envelope::with_system(system.clone()))
        }
        None => missing(EntityKind::StarSystem, &id),
    }
}

async fn system_planets(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<String>,
    Json(body): Json<PlanetListBody>,
) -> Reply {
    if backend.fail_planet_sync.load(Ordering::SeqCst) {
        let body = Envelope {
            success: Some(false),
            error: Some("planet list update unavailable".into()),
            ..Envelope::default()
        };
        return (StatusCode::SERVICE_UNAVAILABLE, Json(body));
    }
    let mut tables = backend.tables.lock().unwrap();
    match tables.systems.iter_mut().find(|s| s.id.as_str() == id) {
        Some(system) => {
            system.planets = body.planets;
            ok(Envelope::with_system(system.clone()))
        }
        None => missing(EntityKind::StarSystem, &id),
    }
}

async fn delete_system(State(backend): State<Arc<Backend>>, Path(id): Path<String>) -> Reply {
    let mut tables = backend.tables.lock().unwrap();
    let before = tables.systems.len();
    tables.systems.retain(|s| s.id.as_str() != id);
    if tables.systems.len() == before {
        return missing(EntityKind::StarSystem, &id);
    }
    ok(Envelope::ok())
}

#[derive(Deserialize)]
struct PlanetQuery {
    star_system_id: Option<String>,
    owner_wallet: Option<String>,
}

async fn list_planets(
    State(backend): State<Arc<Backend>>,
    Query(query): Query<PlanetQuery>,
) -> Reply {
    let tables = backend.tables.lock().unwrap();
    let planets = tables
        .planets
        .iter()
        .filter(|p| {
            query
                .star_system_id
                .as_deref()
                .map_or(true, |id| p.star_system_id.as_str() == id)
        })
        .filter(|p| {
            query
                .owner_wallet
                .as_deref()
                .map_or(true, |owner| p.owner_wallet.eq_ignore_ascii_case(owner))
        })
        .cloned()
        .collect();
    ok(Envelope::with_planets(planets))
}

async fn get_planet(State(backend): State<Arc<Backend>>, Path(id): Path<String>) -> Reply {
    let tables = backend.tables.lock().unwrap();
    match tables.planets.iter().find(|p| p.id.as_str() == id) {
        Some(planet) => ok(Envelope::with_planet(planet.clone())),
        None => missing(EntityKind::Planet, &id),
    }
}

async fn planet_status(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Reply {
    let mut tables = backend.tables.lock().unwrap();
    match tables.planets.iter_mut().find(|p| p.id.as_str() == id) {
        Some(planet) => {
            planet.transition_to(body.status, Utc::now());
            ok(Envelope::with_planet(planet.clone()))
        }
        None => missing(EntityKind::Planet, &id),
    }
}

async fn delete_planet(State(backend): State<Arc<Backend>>, Path(id): Path<String>) -> Reply {
    let mut tables = backend.tables.lock().unwrap();
    let before = tables.planets.len();
    tables.planets.retain(|p| p.id.as_str() != id);
    if tables.planets.len() == before {
        return missing(EntityKind::Planet, &id);
    }
    ok(Envelope::ok())
}

fn router(state: Arc<Backend>) -> Router {
    let api = Router::new()
        .route("/spawn-star-system", post(spawn_system))
        .route("/spawn-planet", post(spawn_planet))
        .route("/star-systems", get(list_systems))
        .route("/star-systems/:id", get(get_system).delete(delete_system))
        .route("/star-systems/:id/status", patch(system_status))
        .route("/star-systems/:id/planets", patch(system_planets))
        .route("/planets", get(list_planets))
        .route("/planets/:id", get(get_planet).delete(delete_planet))
        .route("/planets/:id/status", patch(planet_status));
    Router::new()
        .nest("/celestial-forge", api)
        .with_state(state)
}

/// Bind to an ephemeral port and serve until the runtime shuts down
pub async fn spawn_backend() -> RunningBackend {
    let state = Arc::new(Backend::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(Arc::clone(&state));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    RunningBackend { state, addr }
}
