/*!
 * Error types for Forge
 */

use forge_core_interface::{Guidance, StoreError};
use forge_core_model::{EntityKind, StarSystemId, ValidationError};
use std::fmt;
use thiserror::Error;

use crate::facade::OperationKey;

/// Exit codes for the CLI
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_REJECTED: i32 = 1;
pub const EXIT_FATAL: i32 = 2;
pub const EXIT_UNAVAILABLE: i32 = 3;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForgeError {
    /// Input failed a validation rule
    #[error("{0}")]
    InvalidInput(String),

    #[error("{} named '{name}' already exists", kind.title())]
    DuplicateName { kind: EntityKind, name: String },

    /// Parent star system missing when creating a planet
    #[error("Star system not found: {0}")]
    SystemNotFound(StarSystemId),

    #[error("{} not found: {id}", kind.title())]
    NotFound { kind: EntityKind, id: String },

    /// Caller is absent or does not own the entity
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Backend unreachable: {reason} ({guidance})")]
    Unreachable { reason: String, guidance: Guidance },

    /// The same operation on the same resource is already running
    #[error("Operation already in progress: {0}")]
    Busy(OperationKey),

    /// Local durable store failed or holds corrupt data
    #[error("Storage error: {0}")]
    Storage(String),

    /// Backend answered with something we could not interpret
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ForgeError>;

impl ForgeError {
    pub fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        ForgeError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ForgeError::Unreachable { .. } | ForgeError::Busy(_) => EXIT_UNAVAILABLE,
            ForgeError::Storage(_) | ForgeError::Protocol(_) | ForgeError::Config(_) => EXIT_FATAL,
            _ => EXIT_REJECTED,
        }
    }

    /// Whether repeating the same call later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ForgeError::Unreachable { guidance, .. } => *guidance == Guidance::Retry,
            ForgeError::Busy(_) => true,
            _ => false,
        }
    }

    pub fn guidance(&self) -> Option<Guidance> {
        match self {
            ForgeError::Unreachable { guidance, .. } => Some(*guidance),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ForgeError::InvalidInput(_) => ErrorCategory::Validation,
            ForgeError::DuplicateName { .. } => ErrorCategory::Conflict,
            ForgeError::SystemNotFound(_) | ForgeError::NotFound { .. } => ErrorCategory::NotFound,
            ForgeError::Unauthorized(_) => ErrorCategory::Authorization,
            ForgeError::Unreachable { .. } => ErrorCategory::Network,
            ForgeError::Busy(_) => ErrorCategory::Concurrency,
            ForgeError::Storage(_) => ErrorCategory::Storage,
            ForgeError::Protocol(_) => ErrorCategory::Protocol,
            ForgeError::Config(_) => ErrorCategory::Configuration,
        }
    }
}

impl From<StoreError> for ForgeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidInput(reason) => ForgeError::InvalidInput(reason),
            StoreError::DuplicateName { kind, name } => ForgeError::DuplicateName { kind, name },
            StoreError::SystemNotFound(id) => ForgeError::SystemNotFound(id),
            StoreError::NotFound { kind, id } => ForgeError::NotFound { kind, id },
            StoreError::Unauthorized(reason) => ForgeError::Unauthorized(reason),
            StoreError::Unreachable { reason, guidance } => {
                ForgeError::Unreachable { reason, guidance }
            }
            StoreError::Storage(reason) => ForgeError::Storage(reason),
            StoreError::Protocol(reason) => ForgeError::Protocol(reason),
        }
    }
}

impl From<ValidationError> for ForgeError {
    fn from(err: ValidationError) -> Self {
        ForgeError::InvalidInput(err.reason())
    }
}

/// Error categories for notices and structured logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    NotFound,
    Authorization,
    Network,
    Concurrency,
    Storage,
    Protocol,
    Configuration,
    /// Relationship drift that was detected and repaired
    Inconsistent,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::Network => "network",
            ErrorCategory::Concurrency => "concurrency",
            ErrorCategory::Storage => "storage",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Inconsistent => "inconsistent",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
