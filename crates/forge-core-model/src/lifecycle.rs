//! Entity status and transitions
//!
//! Every transition between the three states is permitted, including
//! re-entering the current state. A transition that does not change the status
//! still refreshes `updated_at`.

use crate::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deployment status shared by star systems and planets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    /// Initial state of every new entity
    #[default]
    Deploying,
    Inactive,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Active, Status::Deploying, Status::Inactive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Deploying => "deploying",
            Status::Inactive => "inactive",
        }
    }

    pub fn can_transition_to(&self, _target: Status) -> bool {
        true
    }

    pub fn transition(self, target: Status) -> Transition {
        Transition {
            from: self,
            to: target,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Status::Active),
            "deploying" => Ok(Status::Deploying),
            "inactive" => Ok(Status::Inactive),
            _ => Err(ValidationError::InvalidEnum {
                field: "status",
                value: s.to_string(),
                expected: "active, deploying, inactive",
            }),
        }
    }
}

/// A status change that was applied to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Status,
    pub to: Status,
}

impl Transition {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Entities that carry a status
pub trait Lifecycle {
    fn status(&self) -> Status;

    /// Store the new status and stamp the time of the change
    fn record_transition(&mut self, to: Status, at: DateTime<Utc>);

    fn transition_to(&mut self, target: Status, at: DateTime<Utc>) -> Transition {
        let transition = self.status().transition(target);
        self.record_transition(target, at);
        transition
    }
}
