//! Map identity newtype.
//!
//! The overview cache treats the active map's name as its only key, so
//! the name gets its own type rather than travelling around as a bare
//! `String`.

use serde::{Deserialize, Serialize};

/// Identity (name) of the map currently loaded by the game server.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapIdentity(String);

impl MapIdentity {
    /// Create a map identity from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the map name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for MapIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MapIdentity {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for MapIdentity {
    fn from(name: String) -> Self {
        Self(name)
    }
}
