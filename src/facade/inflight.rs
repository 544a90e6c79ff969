//! In-flight operation registry
//!
//! At most one operation per key runs at a time. A second request for a key
//! that is already held fails fast with `ForgeError::Busy`; nothing queues.

use forge_core_model::{PlanetId, StarSystemId};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{ForgeError, Result};

/// Operation class plus the resource it touches
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationKey {
    SpawnSystem,
    SpawnPlanet(StarSystemId),
    SystemStatus(StarSystemId),
    PlanetStatus(PlanetId),
    DeleteSystem(StarSystemId),
    DeletePlanet(PlanetId),
    Seed,
    Clear,
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKey::SpawnSystem => write!(f, "star system spawn"),
            OperationKey::SpawnPlanet(id) => write!(f, "planet spawn in star system {id}"),
            OperationKey::SystemStatus(id) => write!(f, "status update of star system {id}"),
            OperationKey::PlanetStatus(id) => write!(f, "status update of planet {id}"),
            OperationKey::DeleteSystem(id) => write!(f, "deletion of star system {id}"),
            OperationKey::DeletePlanet(id) => write!(f, "deletion of planet {id}"),
            OperationKey::Seed => write!(f, "demo seeding"),
            OperationKey::Clear => write!(f, "clearing owned star systems"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight {
    keys: Arc<Mutex<HashSet<OperationKey>>>,
}

impl InFlight {
    pub(crate) fn try_acquire(&self, key: OperationKey) -> Result<InFlightGuard> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert(key.clone()) {
            return Err(ForgeError::Busy(key));
        }
        Ok(InFlightGuard {
            keys: Arc::clone(&self.keys),
            key,
        })
    }

    pub(crate) fn active(&self) -> Vec<OperationKey> {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

/// Releases its key when dropped, on success and on error alike
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    keys: Arc<Mutex<HashSet<OperationKey>>>,
    key: OperationKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
