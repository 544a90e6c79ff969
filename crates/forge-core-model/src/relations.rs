//! Star system / planet relationship
//!
//! The authoritative link is `Planet::star_system_id`. A star system's
//! `planets` list is a denormalised copy that can always be rebuilt from it:
//! planets of the system ordered by `created_at`, ties broken by id.

use crate::{Planet, PlanetId, StarSystem, StarSystemId};
use std::collections::HashSet;
use std::fmt;

/// Difference between a stored planet list and the one derived from planets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drift {
    pub star_system_id: StarSystemId,
    /// Planets pointing at the system but absent from its list
    pub missing: Vec<PlanetId>,
    /// Listed ids with no matching planet
    pub extra: Vec<PlanetId>,
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "planet list of star system {} drifted ({} missing, {} stale)",
            self.star_system_id,
            self.missing.len(),
            self.extra.len()
        )
    }
}

pub fn derive_planet_ids(system_id: &StarSystemId, planets: &[Planet]) -> Vec<PlanetId> {
    let mut members: Vec<&Planet> = planets
        .iter()
        .filter(|p| &p.star_system_id == system_id)
        .collect();
    members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    members.into_iter().map(|p| p.id.clone()).collect()
}

/// Rewrite every system's planet list from the planets' foreign keys.
///
/// Returns one [`Drift`] per system whose stored list held a different set of
/// ids. Lists that only differed in order are fixed silently.
pub fn reconcile(systems: &mut [StarSystem], planets: &[Planet]) -> Vec<Drift> {
    let mut drifts = Vec::new();

    for system in systems.iter_mut() {
        let derived = derive_planet_ids(&system.id, planets);
        if derived == system.planets {
            continue;
        }

        let stored: HashSet<&PlanetId> = system.planets.iter().collect();
        let actual: HashSet<&PlanetId> = derived.iter().collect();
        let missing: Vec<PlanetId> = derived
            .iter()
            .filter(|id| !stored.contains(id))
            .cloned()
            .collect();
        let extra: Vec<PlanetId> = system
            .planets
            .iter()
            .filter(|id| !actual.contains(id))
            .cloned()
            .collect();

        if !missing.is_empty() || !extra.is_empty() {
            drifts.push(Drift {
                star_system_id: system.id.clone(),
                missing,
                extra,
            });
        }
        system.planets = derived;
    }

    drifts
}

/// Planets whose star system does not exist
pub fn orphans<'a>(systems: &[StarSystem], planets: &'a [Planet]) -> Vec<&'a Planet> {
    let known: HashSet<&StarSystemId> = systems.iter().map(|s| &s.id).collect();
    planets
        .iter()
        .filter(|p| !known.contains(&p.star_system_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodeType, PlanetType, Status, TreasuryBalance};
    use chrono::{Duration, TimeZone, Utc};

    fn system(id: &str, planets: &[&str]) -> StarSystem {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        StarSystem {
            id: StarSystemId::new(id),
            name: format!("System {id}"),
            subnet_id: format!("mock-{id}"),
            owner_wallet: "0xAAA".into(),
            rpc_url: String::new(),
            chain_id: None,
            tribute_percent: 0.0,
            status: Status::Active,
            treasury_balance: TreasuryBalance::new(),
            planets: planets.iter().map(|p| PlanetId::new(*p)).collect(),
            created_at: t,
            updated_at: t,
        }
    }

    fn planet(id: &str, system: &str, offset_secs: i64) -> Planet {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs);
        Planet {
            id: PlanetId::new(id),
            name: format!("Planet {id}"),
            star_system_id: StarSystemId::new(system),
            node_type: NodeType::Validator,
            planet_type: PlanetType::Habitable,
            owner_wallet: "0xAAA".into(),
            ip_address: "10.0.0.1".into(),
            status: Status::Deploying,
            created_at: t,
            updated_at: t,
        }
    }

    #[test]
    fn test_derive_orders_by_creation_then_id() {
        let planets = vec![
            planet("c", "s1", 2),
            planet("b", "s1", 1),
            planet("a", "s1", 1),
            planet("x", "s2", 0),
        ];
        let ids = derive_planet_ids(&StarSystemId::new("s1"), &planets);
        let expected: Vec<PlanetId> = ["a", "b", "c"].into_iter().map(PlanetId::new).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_reconcile_reports_and_repairs() {
        let mut systems = vec![system("s1", &["p1", "ghost"]), system("s2", &[])];
        let planets = vec![
            planet("p1", "s1", 0),
            planet("p2", "s1", 1),
            planet("p3", "s2", 0),
        ];

        let drifts = reconcile(&mut systems, &planets);
        assert_eq!(drifts.len(), 2);
        assert_eq!(drifts[0].missing, vec![PlanetId::new("p2")]);
        assert_eq!(drifts[0].extra, vec![PlanetId::new("ghost")]);
        assert_eq!(systems[0].planets, vec![PlanetId::new("p1"), PlanetId::new("p2")]);
        assert_eq!(systems[1].planets, vec![PlanetId::new("p3")]);

        assert!(reconcile(&mut systems, &planets).is_empty());
    }

    #[test]
    fn test_reorder_is_not_drift() {
        let mut systems = vec![system("s1", &["p2", "p1"])];
        let planets = vec![planet("p1", "s1", 0), planet("p2", "s1", 1)];
        assert!(reconcile(&mut systems, &planets).is_empty());
        assert_eq!(systems[0].planets, vec![PlanetId::new("p1"), PlanetId::new("p2")]);
    }

    #[test]
    fn test_orphans() {
        let systems = vec![system("s1", &[])];
        let planets = vec![planet("p1", "s1", 0), planet("p2", "gone", 0)];
        let lost = orphans(&systems, &planets);
        assert_eq!(lost.len(), 1);
        assert_eq!(lost[0].id, PlanetId::new("p2"));
    }
}
