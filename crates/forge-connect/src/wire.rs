//! JSON bodies exchanged with the backend

use forge_core_interface::{PlanetDraft, StoreError};
use forge_core_model::{Planet, PlanetId, StarSystem, Status};
use serde::{Deserialize, Serialize};

/// Response envelope used by every endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star_system: Option<StarSystem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star_systems: Option<Vec<StarSystem>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planet: Option<Planet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planets: Option<Vec<Planet>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// FastAPI-style error detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Envelope {
    pub fn ok() -> Self {
        Self {
            success: Some(true),
            ..Self::default()
        }
    }

    pub fn with_system(system: StarSystem) -> Self {
        Self {
            star_system: Some(system),
            ..Self::ok()
        }
    }

    pub fn with_systems(systems: Vec<StarSystem>) -> Self {
        Self {
            star_systems: Some(systems),
            ..Self::ok()
        }
    }

    pub fn with_planet(planet: Planet) -> Self {
        Self {
            planet: Some(planet),
            ..Self::ok()
        }
    }

    pub fn with_planets(planets: Vec<Planet>) -> Self {
        Self {
            planets: Some(planets),
            ..Self::ok()
        }
    }

    pub fn failure(err: &StoreError) -> Self {
        Self {
            success: Some(false),
            error: Some(err.to_string()),
            code: Some(err.code().to_string()),
            ..Self::default()
        }
    }

    /// Whether the body itself reports failure
    pub fn is_failure(&self) -> bool {
        self.success == Some(false)
    }

    pub fn message(&self) -> Option<&str> {
        self.error.as_deref().or(self.detail.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusBody {
    pub status: Status,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanetListBody {
    pub planets: Vec<PlanetId>,
}

/// `spawn-planet` request; the parent's name is sent when known
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnPlanetBody {
    #[serde(flatten)]
    pub draft: PlanetDraft,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star_system_name: Option<String>,
}
