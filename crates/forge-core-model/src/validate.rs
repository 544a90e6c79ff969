//! Input validation rules
//!
//! Each check returns the normalised value on success so callers store exactly
//! what was validated.

use crate::{EntityKind, NodeType, PlanetType, Result, Status, ValidationError};

/// Minimum name length, counted in characters after trimming
pub const MIN_NAME_LEN: usize = 3;

pub const MIN_TRIBUTE_PERCENT: f64 = 0.0;
pub const MAX_TRIBUTE_PERCENT: f64 = 20.0;

/// Trimmed name, or `NameTooShort`
pub fn validate_name(kind: EntityKind, candidate: &str) -> Result<String> {
    let trimmed = candidate.trim();
    if trimmed.chars().count() < MIN_NAME_LEN {
        return Err(ValidationError::NameTooShort {
            kind,
            min: MIN_NAME_LEN,
        });
    }
    Ok(trimmed.to_string())
}

/// Tribute in `[0, 20]` inclusive; NaN and infinities are rejected
pub fn validate_tribute(percent: f64) -> Result<f64> {
    if !(MIN_TRIBUTE_PERCENT..=MAX_TRIBUTE_PERCENT).contains(&percent) {
        return Err(ValidationError::OutOfRange {
            field: "Tribute",
            value: percent,
            min: MIN_TRIBUTE_PERCENT,
            max: MAX_TRIBUTE_PERCENT,
        });
    }
    Ok(percent)
}

pub fn parse_planet_type(raw: &str) -> Result<PlanetType> {
    raw.parse()
}

pub fn parse_node_type(raw: &str) -> Result<NodeType> {
    raw.parse()
}

pub fn parse_status(raw: &str) -> Result<Status> {
    raw.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_boundaries() {
        assert!(validate_name(EntityKind::StarSystem, "ab").is_err());
        assert_eq!(validate_name(EntityKind::StarSystem, "abc").unwrap(), "abc");
        assert_eq!(validate_name(EntityKind::Planet, "  Terra  ").unwrap(), "Terra");
        assert!(validate_name(EntityKind::Planet, "  ab  ").is_err());
        assert!(validate_name(EntityKind::Planet, "").is_err());
    }

    #[test]
    fn test_name_counts_characters() {
        assert!(validate_name(EntityKind::Planet, "äöü").is_ok());
    }

    #[test]
    fn test_tribute_boundaries() {
        assert_eq!(validate_tribute(0.0).unwrap(), 0.0);
        assert_eq!(validate_tribute(20.0).unwrap(), 20.0);
        assert!(validate_tribute(-0.01).is_err());
        assert!(validate_tribute(20.01).is_err());
        assert!(validate_tribute(f64::NAN).is_err());
        assert!(validate_tribute(f64::INFINITY).is_err());
    }

    #[test]
    fn test_enum_membership() {
        assert_eq!(parse_planet_type("military").unwrap(), PlanetType::Military);
        assert_eq!(parse_node_type("validator").unwrap(), NodeType::Validator);
        assert_eq!(parse_status("inactive").unwrap(), Status::Inactive);
        assert!(parse_status("archived").is_err());
    }
}
