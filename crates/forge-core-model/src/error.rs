//! Validation errors for entity input

use crate::EntityKind;
use thiserror::Error;

/// Result type for model validation
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Why a piece of user input was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Name shorter than the minimum after trimming
    #[error("{} name must be at least {min} characters", kind.title())]
    NameTooShort { kind: EntityKind, min: usize },

    /// Numeric value outside its closed range, or not a number at all
    #[error("{field} must be between {min}-{max}%")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// String that is not one of an enum's members
    #[error("Invalid {field} '{value}' (expected one of: {expected})")]
    InvalidEnum {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    /// Wallet address missing or blank
    #[error("Wallet address is required")]
    EmptyAddress,
}

impl ValidationError {
    /// Human-readable reason, suitable for surfacing as-is
    pub fn reason(&self) -> String {
        self.to_string()
    }
}
