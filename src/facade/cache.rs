//! Facade-side snapshot of both collections

use chrono::{DateTime, Utc};
use forge_core_model::{
    list_owned, reconcile, Drift, Planet, PlanetId, StarSystem, StarSystemId, WalletAddress,
};
use serde::Serialize;

/// Last state read from the store
///
/// Replaced wholesale on refresh, never patched. Planet lists are always the
/// derived ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub systems: Vec<StarSystem>,
    pub planets: Vec<Planet>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Build from a store read, repairing planet lists on the way in
    pub fn build(mut systems: Vec<StarSystem>, planets: Vec<Planet>) -> (Self, Vec<Drift>) {
        let drifts = reconcile(&mut systems, &planets);
        let snapshot = Self {
            systems,
            planets,
            refreshed_at: Some(Utc::now()),
        };
        (snapshot, drifts)
    }

    pub fn is_loaded(&self) -> bool {
        self.refreshed_at.is_some()
    }

    pub fn system(&self, id: &StarSystemId) -> Option<&StarSystem> {
        self.systems.iter().find(|s| &s.id == id)
    }

    pub fn planet(&self, id: &PlanetId) -> Option<&Planet> {
        self.planets.iter().find(|p| &p.id == id)
    }

    pub fn system_named(&self, name: &str) -> Option<&StarSystem> {
        self.systems.iter().find(|s| s.name == name)
    }

    pub fn planets_of(&self, id: &StarSystemId) -> Vec<&Planet> {
        self.planets
            .iter()
            .filter(|p| &p.star_system_id == id)
            .collect()
    }

    pub fn systems_owned_by(&self, owner: Option<&WalletAddress>) -> Vec<&StarSystem> {
        list_owned(&self.systems, owner)
    }

    /// Same entities, ignoring when they were read
    pub fn same_contents(&self, other: &Snapshot) -> bool {
        self.systems == other.systems && self.planets == other.planets
    }
}
