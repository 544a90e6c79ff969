//! Error types for the forge-connect crate

use forge_core_interface::{Guidance, StoreError};
use forge_core_model::{EntityKind, PlanetId, StarSystemId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid backend URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Backend rejected request ({status}): {message}")]
    Backend {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Malformed backend response: {0}")]
    Decode(String),

    #[error("Backend response is missing '{0}'")]
    MissingField(&'static str),
}

/// The resource a request was about, used to shape context-free backend errors
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    System(&'a StarSystemId),
    Planet(&'a PlanetId),
    NewSystem { name: &'a str },
    NewPlanet { system: &'a StarSystemId, name: &'a str },
    Listing,
}

impl ConnectError {
    /// Map onto the shared store taxonomy.
    ///
    /// The backend's `code` wins; without one the HTTP status decides.
    pub fn into_store_error(self, target: Target<'_>) -> StoreError {
        match self {
            ConnectError::Http(e) => transport_error(e),
            ConnectError::InvalidUrl { url, reason } => StoreError::Unreachable {
                reason: format!("invalid backend URL '{url}': {reason}"),
                guidance: Guidance::CheckConfiguration,
            },
            ConnectError::Decode(msg) => StoreError::Protocol(msg),
            ConnectError::MissingField(field) => {
                StoreError::Protocol(format!("response is missing '{field}'"))
            }
            ConnectError::Backend {
                status,
                code,
                message,
            } => backend_error(status, code.as_deref(), message, target),
        }
    }
}

impl From<ConnectError> for StoreError {
    fn from(err: ConnectError) -> Self {
        err.into_store_error(Target::Listing)
    }
}

fn transport_error(err: reqwest::Error) -> StoreError {
    let guidance = if err.is_timeout() {
        Guidance::Retry
    } else if err.is_connect() || err.is_builder() {
        Guidance::CheckConfiguration
    } else if err.is_decode() {
        return StoreError::Protocol(err.to_string());
    } else {
        Guidance::Retry
    };
    StoreError::Unreachable {
        reason: err.to_string(),
        guidance,
    }
}

fn backend_error(
    status: u16,
    code: Option<&str>,
    message: String,
    target: Target<'_>,
) -> StoreError {
    let category = code.unwrap_or(match status {
        400 | 422 => "invalid_input",
        401 | 403 => "unauthorized",
        404 => "not_found",
        409 => "duplicate_name",
        500..=599 => "unreachable",
        _ => "",
    });

    match (category, target) {
        ("invalid_input", _) => StoreError::InvalidInput(message),
        ("unauthorized", _) => StoreError::Unauthorized(message),
        ("unreachable", _) => StoreError::Unreachable {
            reason: format!("backend returned {status}: {message}"),
            guidance: Guidance::Retry,
        },
        ("duplicate_name", Target::NewSystem { name }) => StoreError::DuplicateName {
            kind: EntityKind::StarSystem,
            name: name.to_string(),
        },
        ("duplicate_name", Target::NewPlanet { name, .. }) => StoreError::DuplicateName {
            kind: EntityKind::Planet,
            name: name.to_string(),
        },
        ("system_not_found" | "not_found", Target::NewPlanet { system, .. }) => {
            StoreError::SystemNotFound(system.clone())
        }
        ("system_not_found" | "not_found", Target::System(id)) => {
            StoreError::not_found(EntityKind::StarSystem, id)
        }
        ("not_found", Target::Planet(id)) => StoreError::not_found(EntityKind::Planet, id),
        _ => StoreError::Protocol(format!("unexpected {status} response: {message}")),
    }
}
