//! Forge Core Interface: one storage contract, two backends
//!
//! This crate defines the `ForgeStore` trait. The local store (durable files
//! on disk) and the remote store (HTTP backend) both implement it, and callers
//! see the same results and the same error categories from either.
//!
//! # Contract
//!
//! - Creation validates input before any write and rejects duplicate names
//!   (global for star systems, per star system for planets)
//! - New entities start in `deploying`
//! - Every returned star system carries a planet list derived from the
//!   planets' foreign keys
//! - Deleting a star system deletes its planets
//!
//! # Example
//!
//! ```rust,no_run
//! use forge_core_interface::{ForgeStore, ForgeStoreExt, SystemDraft};
//!
//! async fn spawn<S: ForgeStore>(store: &S) -> forge_core_interface::Result<()> {
//!     let system = store
//!         .create_system(SystemDraft::new("Nova", "0xAAA", 5.0))
//!         .await?;
//!     let (_system, planets) = store.system_with_planets(&system.id).await?;
//!     assert!(planets.is_empty());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use forge_core_model::{
    validate, EntityKind, NodeType, Planet, PlanetId, PlanetType, StarSystem, StarSystemId,
    Status, ValidationError, WalletAddress,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What the caller should do about an unreachable backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guidance {
    /// Transient: the request timed out or the backend was overloaded
    Retry,
    /// The backend could not be contacted at the configured address
    CheckConfiguration,
}

impl Guidance {
    pub fn hint(&self) -> &'static str {
        match self {
            Guidance::Retry => "the backend did not answer in time; try again",
            Guidance::CheckConfiguration => {
                "check that the backend is running and remote.base_url points at it"
            }
        }
    }
}

impl fmt::Display for Guidance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hint())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{} named '{name}' already exists", kind.title())]
    DuplicateName { kind: EntityKind, name: String },

    #[error("Star system not found: {0}")]
    SystemNotFound(StarSystemId),

    #[error("{} not found: {id}", kind.title())]
    NotFound { kind: EntityKind, id: String },

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Backend unreachable: {reason}")]
    Unreachable { reason: String, guidance: Guidance },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Stable machine-readable code, shared with the HTTP envelope
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::InvalidInput(_) => "invalid_input",
            StoreError::DuplicateName { .. } => "duplicate_name",
            StoreError::SystemNotFound(_) => "system_not_found",
            StoreError::NotFound { .. } => "not_found",
            StoreError::Unauthorized(_) => "unauthorized",
            StoreError::Unreachable { .. } => "unreachable",
            StoreError::Storage(_) => "storage",
            StoreError::Protocol(_) => "protocol",
        }
    }

    pub fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, StoreError::Unreachable { .. })
    }
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        StoreError::InvalidInput(err.reason())
    }
}

/// Which backend a store talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// Durable local files with synthetic provisioning
    #[default]
    Mock,
    /// Hosted HTTP backend
    Remote,
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreMode::Mock => write!(f, "mock"),
            StoreMode::Remote => write!(f, "remote"),
        }
    }
}

impl FromStr for StoreMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" | "local" => Ok(StoreMode::Mock),
            "remote" => Ok(StoreMode::Remote),
            _ => Err(ValidationError::InvalidEnum {
                field: "mode",
                value: s.to_string(),
                expected: "mock, remote",
            }),
        }
    }
}

/// Input for creating a star system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemDraft {
    pub name: String,
    pub owner_wallet: String,
    pub tribute_percent: f64,
}

impl SystemDraft {
    pub fn new(
        name: impl Into<String>,
        owner_wallet: impl Into<String>,
        tribute_percent: f64,
    ) -> Self {
        Self {
            name: name.into(),
            owner_wallet: owner_wallet.into(),
            tribute_percent,
        }
    }

    /// Normalised copy, or the first rule the input breaks
    pub fn validated(&self) -> Result<Self> {
        let owner = WalletAddress::parse(&self.owner_wallet)
            .map_err(|_| StoreError::Unauthorized("a wallet address is required".to_string()))?;
        Ok(Self {
            name: validate::validate_name(EntityKind::StarSystem, &self.name)?,
            owner_wallet: owner.as_str().to_string(),
            tribute_percent: validate::validate_tribute(self.tribute_percent)?,
        })
    }
}

/// Input for creating a planet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetDraft {
    pub star_system_id: StarSystemId,
    pub name: String,
    pub planet_type: PlanetType,
    #[serde(default)]
    pub node_type: NodeType,
    pub owner_wallet: String,
}

impl PlanetDraft {
    pub fn new(
        star_system_id: StarSystemId,
        name: impl Into<String>,
        planet_type: PlanetType,
        owner_wallet: impl Into<String>,
    ) -> Self {
        Self {
            star_system_id,
            name: name.into(),
            planet_type,
            node_type: NodeType::default(),
            owner_wallet: owner_wallet.into(),
        }
    }

    pub fn with_node_type(mut self, node_type: NodeType) -> Self {
        self.node_type = node_type;
        self
    }

    pub fn validated(&self) -> Result<Self> {
        let owner = WalletAddress::parse(&self.owner_wallet)
            .map_err(|_| StoreError::Unauthorized("a wallet address is required".to_string()))?;
        Ok(Self {
            star_system_id: self.star_system_id.clone(),
            name: validate::validate_name(EntityKind::Planet, &self.name)?,
            planet_type: self.planet_type,
            node_type: self.node_type,
            owner_wallet: owner.as_str().to_string(),
        })
    }
}

/// Which planets a listing should return
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanetFilter {
    pub star_system_id: Option<StarSystemId>,
    pub owner_wallet: Option<WalletAddress>,
}

impl PlanetFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_system(id: StarSystemId) -> Self {
        Self {
            star_system_id: Some(id),
            owner_wallet: None,
        }
    }

    pub fn owned_by(owner: WalletAddress) -> Self {
        Self {
            star_system_id: None,
            owner_wallet: Some(owner),
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.star_system_id.is_none() && self.owner_wallet.is_none()
    }

    pub fn matches(&self, planet: &Planet) -> bool {
        self.star_system_id
            .as_ref()
            .map_or(true, |id| &planet.star_system_id == id)
            && self
                .owner_wallet
                .as_ref()
                .map_or(true, |owner| owner.matches(&planet.owner_wallet))
    }
}

/// Storage contract shared by the local and remote backends
///
/// Implementations must be safe to share across tasks. Errors are always one
/// of the [`StoreError`] categories so callers never branch on the backend.
#[async_trait]
pub trait ForgeStore: Send + Sync + 'static {
    fn mode(&self) -> StoreMode;

    async fn create_system(&self, draft: SystemDraft) -> Result<StarSystem>;

    async fn create_planet(&self, draft: PlanetDraft) -> Result<Planet>;

    /// All star systems. Their planet lists are the stored cache and may
    /// lag the planet records; callers reconcile with `forge_core_model::reconcile`.
    async fn list_systems(&self) -> Result<Vec<StarSystem>>;

    async fn list_planets(&self, filter: &PlanetFilter) -> Result<Vec<Planet>>;

    async fn get_system(&self, id: &StarSystemId) -> Result<StarSystem>;

    async fn get_planet(&self, id: &PlanetId) -> Result<Planet>;

    async fn update_system_status(&self, id: &StarSystemId, status: Status) -> Result<StarSystem>;

    async fn update_planet_status(&self, id: &PlanetId, status: Status) -> Result<Planet>;

    /// Remove a star system and every planet that belongs to it
    async fn delete_system(&self, id: &StarSystemId) -> Result<()>;

    async fn delete_planet(&self, id: &PlanetId) -> Result<()>;
}

/// Convenience operations built on the core trait
#[async_trait]
pub trait ForgeStoreExt: ForgeStore {
    async fn planets_for_system(&self, id: &StarSystemId) -> Result<Vec<Planet>> {
        self.list_planets(&PlanetFilter::for_system(id.clone())).await
    }

    async fn system_with_planets(&self, id: &StarSystemId) -> Result<(StarSystem, Vec<Planet>)> {
        let system = self.get_system(id).await?;
        let planets = self.planets_for_system(id).await?;
        Ok((system, planets))
    }
}

impl<T: ForgeStore + ?Sized> ForgeStoreExt for T {}
