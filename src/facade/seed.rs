//! Demo seeding and owner-scoped purge

use forge_core_model::{PlanetType, StarSystem, WalletAddress};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use super::{require_caller, Forge, OperationKey};
use crate::error::{ForgeError, Result};
use crate::notify::Notice;

const SEED_PREFIX: &str = "TestSystem";

/// What a seeding run created
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedReport {
    pub systems: Vec<StarSystem>,
    pub planets: usize,
    /// Names that already existed and were left alone
    pub skipped: Vec<String>,
}

/// First `count` indices `i` for which `TestSystem{i}` is not taken
fn free_indices<'a>(taken: impl Iterator<Item = &'a str>, count: usize) -> Vec<usize> {
    let used: std::collections::HashSet<usize> = taken
        .filter_map(|name| name.strip_prefix(SEED_PREFIX))
        .filter_map(|suffix| suffix.parse().ok())
        .collect();
    (1..).filter(|i| !used.contains(i)).take(count).collect()
}

impl Forge {
    /// Spawn `systems` demo star systems, each with `planets_per_system`
    /// planets of random type.
    pub async fn seed_demo(
        &self,
        owner: Option<&str>,
        systems: usize,
        planets_per_system: usize,
    ) -> Result<SeedReport> {
        let result = self.try_seed(owner, systems, planets_per_system).await;
        self.report(&result, |report| {
            Notice::success(
                "seed",
                format!(
                    "Seeded {} star system(s) and {} planet(s)",
                    report.systems.len(),
                    report.planets
                ),
            )
        });
        result
    }

    /// Delete every star system the caller owns; returns how many went
    pub async fn clear_owned(&self, caller: Option<&str>) -> Result<usize> {
        let result = self.try_clear(caller).await;
        self.report(&result, |count| {
            Notice::success("clear", format!("Deleted {count} star system(s)"))
        });
        result
    }

    async fn try_seed(
        &self,
        owner: Option<&str>,
        systems: usize,
        planets_per_system: usize,
    ) -> Result<SeedReport> {
        let owner = require_caller(owner)?;
        let _slot = self.inner.inflight.try_acquire(OperationKey::Seed)?;
        self.refresh().await?;

        let indices = {
            let cache = self.inner.cache.read().await;
            free_indices(cache.systems.iter().map(|s| s.name.as_str()), systems)
        };

        let mut report = SeedReport::default();
        for i in indices {
            let name = format!("{SEED_PREFIX}{i}");
            let tribute = f64::from(rand::rng().random_range(0..=20u8));
            let system = match self
                .try_spawn_star_system(&name, tribute, Some(owner.as_str()))
                .await
            {
                Ok(system) => system,
                Err(ForgeError::DuplicateName { name, .. }) => {
                    debug!(name = %name, "seed name taken; skipping");
                    report.skipped.push(name);
                    continue;
                }
                Err(e) => return Err(e),
            };

            for j in 1..=planets_per_system {
                let planet_name = format!("{name}Planet{j}");
                let planet_type = random_planet_type();
                match self
                    .try_spawn_planet(&system.id, &planet_name, planet_type, Some(owner.as_str()))
                    .await
                {
                    Ok(_) => report.planets += 1,
                    Err(ForgeError::DuplicateName { name, .. }) => report.skipped.push(name),
                    Err(e) => return Err(e),
                }
            }
            report.systems.push(system);
        }

        info!(
            owner = %owner,
            star_systems = report.systems.len(),
            planets = report.planets,
            "demo data seeded"
        );
        Ok(report)
    }

    async fn try_clear(&self, caller: Option<&str>) -> Result<usize> {
        let caller: WalletAddress = require_caller(caller)?;
        let _slot = self.inner.inflight.try_acquire(OperationKey::Clear)?;
        self.refresh().await?;

        let owned: Vec<_> = {
            let cache = self.inner.cache.read().await;
            cache
                .systems_owned_by(Some(&caller))
                .into_iter()
                .map(|s| s.id.clone())
                .collect()
        };

        let mut deleted = 0;
        for id in owned {
            match self.try_delete_star_system(&id, Some(caller.as_str())).await {
                Ok(_) => deleted += 1,
                Err(ForgeError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        info!(owner = %caller, deleted, "owned star systems cleared");
        Ok(deleted)
    }
}

fn random_planet_type() -> PlanetType {
    PlanetType::ALL
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or_default()
}
