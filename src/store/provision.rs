//! Synthetic provisioning for the local store
//!
//! Stands in for the network side effects a real deployment would have:
//! subnet ids, chain ids, RPC endpoints and node addresses.

use chrono::{DateTime, Utc};
use forge_core_interface::{PlanetDraft, SystemDraft};
use forge_core_model::{Planet, PlanetId, StarSystem, StarSystemId, Status, TreasuryBalance};
use rand::Rng;

use crate::config::DEFAULT_LOCAL_RPC_URL;

pub const CHAIN_ID_BASE: u64 = 900_000;

/// Fills in the generated fields of new entities
#[derive(Debug, Clone)]
pub struct Provisioner {
    /// RPC endpoint template; `{subnet_id}` is replaced per system
    pub rpc_url: String,
    pub initial_treasury: TreasuryBalance,
}

impl Default for Provisioner {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_RPC_URL)
    }
}

impl Provisioner {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        let mut initial_treasury = TreasuryBalance::new();
        initial_treasury.insert("AVAX".to_string(), 10_000.0);
        initial_treasury.insert("xBGL".to_string(), 0.0);
        Self {
            rpc_url: rpc_url.into(),
            initial_treasury,
        }
    }

    /// Build a star system from an already validated draft
    pub fn provision_system(&self, draft: &SystemDraft, now: DateTime<Utc>) -> StarSystem {
        let subnet_id = subnet_id(&draft.name, now);
        StarSystem {
            id: StarSystemId::generate(),
            name: draft.name.clone(),
            rpc_url: self.rpc_url.replace("{subnet_id}", &subnet_id),
            subnet_id,
            owner_wallet: draft.owner_wallet.clone(),
            chain_id: Some(chain_id()),
            tribute_percent: draft.tribute_percent,
            status: Status::Deploying,
            treasury_balance: self.initial_treasury.clone(),
            planets: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a planet from an already validated draft
    pub fn provision_planet(&self, draft: &PlanetDraft, now: DateTime<Utc>) -> Planet {
        Planet {
            id: PlanetId::generate(),
            name: draft.name.clone(),
            star_system_id: draft.star_system_id.clone(),
            node_type: draft.node_type,
            planet_type: draft.planet_type,
            owner_wallet: draft.owner_wallet.clone(),
            ip_address: ip_address(),
            status: Status::Deploying,
            created_at: now,
            updated_at: now,
        }
    }
}

/// `mock-<slug>-<unix millis>`, slug being the lower-cased name with
/// whitespace runs collapsed to `-`
pub fn subnet_id(name: &str, now: DateTime<Utc>) -> String {
    let slug = name
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    format!("mock-{}-{}", slug, now.timestamp_millis())
}

/// Chain id in `900001..=999999`
pub fn chain_id() -> u64 {
    CHAIN_ID_BASE + rand::rng().random_range(1..100_000)
}

/// Private `10.x.y.z` address
pub fn ip_address() -> String {
    let mut rng = rand::rng();
    format!(
        "10.{}.{}.{}",
        rng.random_range(0..=255u8),
        rng.random_range(0..=255u8),
        rng.random_range(1..=254u8)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use forge_core_model::PlanetType;

    #[test]
    fn test_subnet_slug() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(subnet_id("Nova  Prime", now), "mock-nova-prime-1700000000123");
    }

    #[test]
    fn test_chain_id_range() {
        for _ in 0..1000 {
            let id = chain_id();
            assert!((900_001..=999_999).contains(&id));
        }
    }

    #[test]
    fn test_ip_shape() {
        let ip = ip_address();
        let octets: Vec<u16> = ip.split('.').map(|o| o.parse().unwrap()).collect();
        assert_eq!(octets.len(), 4);
        assert_eq!(octets[0], 10);
        assert!(octets.iter().all(|o| *o <= 255));
    }

    #[test]
    fn test_provisioned_system() {
        let provisioner = Provisioner::new("http://rpc.local/{subnet_id}");
        let draft = SystemDraft::new("Nova", "0xAAA", 5.0);
        let system = provisioner.provision_system(&draft, Utc::now());
        assert_eq!(system.status, Status::Deploying);
        assert_eq!(system.rpc_url, format!("http://rpc.local/{}", system.subnet_id));
        assert_eq!(system.treasury_balance.get("AVAX"), Some(&10_000.0));
        assert!(system.planets.is_empty());
    }

    #[test]
    fn test_provisioned_planet() {
        let draft =
            PlanetDraft::new(StarSystemId::new("s1"), "Terra", PlanetType::Research, "0xAAA");
        let planet = Provisioner::default().provision_planet(&draft, Utc::now());
        assert_eq!(planet.star_system_id, StarSystemId::new("s1"));
        assert_eq!(planet.planet_type, PlanetType::Research);
        assert!(planet.ip_address.starts_with("10."));
    }
}
