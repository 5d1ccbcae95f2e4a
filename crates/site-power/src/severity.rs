//! Alert priority to ticket severity mapping
//!
//! | priority | impact / urgency / severity |
//! |----------|-----------------------------|
//! | P1       | 1 High                      |
//! | P2       | 1 High                      |
//! | P3       | 2 Medium                    |
//! | P4       | 3 Low                       |
//! | P5       | 3 Low                       |

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// ITSM impact, urgency and severity level (all three are set alike)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    High = 1,
    Medium = 2,
    Low = 3,
}

/// Priority string that is not one of `P1`..`P5`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown alert priority '{0}'")]
pub struct UnknownPriority(pub String);

impl Severity {
    /// Look up the severity for an alert priority string
    pub fn from_priority(priority: &str) -> Result<Self, UnknownPriority> {
        match priority.trim() {
            "P1" | "P2" => Ok(Severity::High),
            "P3" => Ok(Severity::Medium),
            "P4" | "P5" => Ok(Severity::Low),
            other => Err(UnknownPriority(other.to_string())),
        }
    }

    /// One band more urgent, saturating at High
    pub fn escalated(self) -> Self {
        match self {
            Severity::High | Severity::Medium => Severity::High,
            Severity::Low => Severity::Medium,
        }
    }

    /// Numeric level as the ITSM expects it
    pub fn level(self) -> u8 {
        self as u8
    }
}

impl FromStr for Severity {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_priority(s)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.level())
    }
}
