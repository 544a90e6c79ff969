//! Wallet ownership checks
//!
//! Addresses compare case-insensitively after trimming. A missing caller is
//! never authorized and never sees entities in a filtered listing.

use crate::{Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-empty wallet address as supplied by the caller
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyAddress);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased form used for comparisons
    pub fn canonical(&self) -> String {
        self.0.to_lowercase()
    }

    pub fn matches(&self, owner: &str) -> bool {
        self.canonical() == owner.trim().to_lowercase()
    }
}

impl PartialEq for WalletAddress {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Entities that belong to a wallet
pub trait Owned {
    fn owner_wallet(&self) -> &str;
}

pub fn authorize<T: Owned + ?Sized>(entity: &T, caller: Option<&WalletAddress>) -> bool {
    caller.is_some_and(|c| c.matches(entity.owner_wallet()))
}

/// Entities owned by `caller`; empty when there is no caller
pub fn list_owned<'a, T: Owned>(entities: &'a [T], caller: Option<&WalletAddress>) -> Vec<&'a T> {
    entities.iter().filter(|e| authorize(*e, caller)).collect()
}
