//! User identity and profile.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifies a user. Ascending id order is the victim processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(UserId)
    }
}

/// A player as seen by the engine.
///
/// `total_area` mirrors the area of the user's territory. It is only ever
/// written by a store commit, in the same transaction as the territory row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Hex render color, e.g. `#e63946`.
    pub color: String,
    #[serde(default)]
    pub total_area: f64,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, color: impl Into<String>) -> Self {
        User {
            id,
            name: name.into(),
            color: color.into(),
            total_area: 0.0,
        }
    }
}
