/*!
 * Celestial Forge - star system and planet provisioning
 *
 * A library for creating and managing owner-scoped star systems (subnets)
 * and their planets (nodes):
 * - Validation of names, tribute and enumerations before any write
 * - Permissive lifecycle (deploying, active, inactive)
 * - Wallet-scoped listing and authorization of mutations
 * - A local JSON store for offline use and an HTTP backend adapter
 * - Repair of the system to planet relationship on every read
 */

pub mod config;
pub mod error;
pub mod facade;
pub mod logging;
pub mod notify;
pub mod output;
pub mod store;

// Re-export commonly used types
pub use config::ForgeConfig;
pub use error::{ErrorCategory, ForgeError, Result};
pub use facade::{
    Forge, ForgeBuilder, OperationKey, RefreshHandle, SeedReport, Snapshot, SystemDetails,
    Timeouts,
};
pub use forge_core_interface::{ForgeStore, Guidance, PlanetFilter, StoreMode};
pub use forge_core_model::{
    NodeType, Planet, PlanetId, PlanetType, StarSystem, StarSystemId, Status, WalletAddress,
};
pub use notify::{MemorySink, Notice, NoticeLevel, NoticeSink, TracingSink};
pub use store::LocalStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
