//! Core data model for Forge
//!
//! This crate holds the two entities Forge manages and the rules that keep them
//! consistent, independent of where they are stored.
//!
//! # Key Concepts
//!
//! - **Star System**: an owned subnet with a tribute rate and a treasury
//! - **Planet**: a node attached to exactly one star system, owned by the same wallet
//! - **Planet list**: the ordered ids on a star system, always derivable from the
//!   planets' foreign keys (see [`relations`])
//!
//! # Example
//!
//! ```
//! use forge_core_model::{validate, EntityKind, Status};
//!
//! assert!(validate::validate_name(EntityKind::StarSystem, "Nova").is_ok());
//! assert!(validate::validate_tribute(25.0).is_err());
//! assert_eq!("deploying".parse::<Status>().unwrap(), Status::Deploying);
//! ```

pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod ownership;
pub mod relations;
pub mod validate;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use error::{Result, ValidationError};
pub use ids::{PlanetId, StarSystemId};
pub use lifecycle::{Lifecycle, Status, Transition};
pub use ownership::{authorize, list_owned, Owned, WalletAddress};
pub use relations::{derive_planet_ids, orphans, reconcile, Drift};

/// Token balances held by a star system, keyed by token symbol
pub type TreasuryBalance = BTreeMap<String, f64>;

/// Which of the two entity kinds a message or error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    StarSystem,
    Planet,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::StarSystem => "star system",
            EntityKind::Planet => "planet",
        }
    }

    /// Label with the first letter capitalised, for user-facing messages
    pub fn title(&self) -> &'static str {
        match self {
            EntityKind::StarSystem => "Star system",
            EntityKind::Planet => "Planet",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Role a planet's node plays in its subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    #[default]
    Master,
    Validator,
}

impl NodeType {
    pub const ALL: [NodeType; 2] = [NodeType::Master, NodeType::Validator];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Master => "master",
            NodeType::Validator => "validator",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "master" => Ok(NodeType::Master),
            "validator" => Ok(NodeType::Validator),
            _ => Err(ValidationError::InvalidEnum {
                field: "node type",
                value: s.to_string(),
                expected: "master, validator",
            }),
        }
    }
}

/// What a planet is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanetType {
    #[default]
    Habitable,
    Resource,
    Research,
    Military,
}

impl PlanetType {
    pub const ALL: [PlanetType; 4] = [
        PlanetType::Habitable,
        PlanetType::Resource,
        PlanetType::Research,
        PlanetType::Military,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanetType::Habitable => "habitable",
            PlanetType::Resource => "resource",
            PlanetType::Research => "research",
            PlanetType::Military => "military",
        }
    }
}

impl fmt::Display for PlanetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlanetType {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "habitable" => Ok(PlanetType::Habitable),
            "resource" => Ok(PlanetType::Resource),
            "research" => Ok(PlanetType::Research),
            "military" => Ok(PlanetType::Military),
            _ => Err(ValidationError::InvalidEnum {
                field: "planet type",
                value: s.to_string(),
                expected: "habitable, resource, research, military",
            }),
        }
    }
}

/// A star system (subnet) owned by a wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarSystem {
    pub id: StarSystemId,

    /// Display name, unique across all star systems
    pub name: String,

    /// Provisioned subnet identifier
    pub subnet_id: String,

    pub owner_wallet: String,

    #[serde(default)]
    pub rpc_url: String,

    #[serde(default)]
    pub chain_id: Option<u64>,

    /// Percentage in 0..=20
    pub tribute_percent: f64,

    pub status: Status,

    #[serde(default)]
    pub treasury_balance: TreasuryBalance,

    /// Ids of member planets, ordered by planet creation
    #[serde(default)]
    pub planets: Vec<PlanetId>,

    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// A planet (node) inside one star system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub id: PlanetId,

    /// Display name, unique within its star system
    pub name: String,

    pub star_system_id: StarSystemId,

    #[serde(default)]
    pub node_type: NodeType,

    #[serde(default)]
    pub planet_type: PlanetType,

    pub owner_wallet: String,

    #[serde(default)]
    pub ip_address: String,

    pub status: Status,

    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl StarSystem {
    /// Find a planet by name among this system's members
    pub fn has_planet_named<'a>(&self, planets: &'a [Planet], name: &str) -> Option<&'a Planet> {
        planets
            .iter()
            .find(|p| p.star_system_id == self.id && p.name == name)
    }
}

impl Owned for StarSystem {
    fn owner_wallet(&self) -> &str {
        &self.owner_wallet
    }
}

impl Owned for Planet {
    fn owner_wallet(&self) -> &str {
        &self.owner_wallet
    }
}

impl Lifecycle for StarSystem {
    fn status(&self) -> Status {
        self.status
    }

    fn record_transition(&mut self, to: Status, at: DateTime<Utc>) {
        self.status = to;
        self.updated_at = at;
    }
}

impl Lifecycle for Planet {
    fn status(&self) -> Status {
        self.status
    }

    fn record_transition(&mut self, to: Status, at: DateTime<Utc>) {
        self.status = to;
        self.updated_at = at;
    }
}
