//! Game host configuration.
//!
//! The host reads the `game` section of the same YAML file the status
//! server reads its `status_server` section from. Missing file, missing
//! section, or missing keys all fall back to defaults.

use std::path::Path;

use serde::Deserialize;

use crate::error::HostError;

/// One entry in the map rotation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapEntry {
    /// Map name, used as its identity.
    pub name: String,
    /// Map version.
    #[serde(default = "default_map_version")]
    pub version: String,
    /// Map author.
    #[serde(default = "default_map_author")]
    pub author: String,
}

fn default_map_version() -> String {
    String::from("1.0")
}

fn default_map_author() -> String {
    String::from("(unknown)")
}

impl MapEntry {
    fn new(name: &str, author: &str) -> Self {
        Self {
            name: String::from(name),
            version: default_map_version(),
            author: String::from(author),
        }
    }
}

/// The `game` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Human-readable server name.
    pub name: String,
    /// Game port, used to build the server identifier.
    pub game_port: u16,
    /// Game mode name.
    pub game_mode: String,
    /// Player capacity.
    pub max_players: u32,
    /// Score that ends a game and rotates the map.
    pub max_score: u32,
    /// Milliseconds between game ticks.
    pub tick_interval_ms: u64,
    /// Seconds to wait for the status server to bind before giving up.
    pub startup_timeout_secs: u64,
    /// Map rotation, played in order.
    pub maps: Vec<MapEntry>,
    /// Names of the simulated players.
    pub bots: Vec<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            name: String::from("status-host demo"),
            game_port: 32887,
            game_mode: String::from("ctf"),
            max_players: 32,
            max_score: 10,
            tick_interval_ms: 250,
            startup_timeout_secs: 10,
            maps: vec![
                MapEntry::new("classicgen", "(server)"),
                MapEntry::new("arena", "Jagex"),
                MapEntry::new("hallway", "Ben Aksoy"),
            ],
            bots: ["Deuce", "Ace", "Blaster", "Sniper", "Digger", "Medic"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl GameConfig {
    /// Load the `game` section from the YAML file at `path`.
    ///
    /// Returns defaults if the file does not exist or lacks the section.
    pub fn load(path: &Path) -> Result<Self, HostError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| HostError::Config {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::parse(&contents)
    }

    /// Parse the `game` section out of a full YAML document.
    pub fn parse(yaml: &str) -> Result<Self, HostError> {
        let raw: serde_yml::Value = serde_yml::from_str(yaml).map_err(|e| HostError::Config {
            message: format!("failed to parse config YAML: {e}"),
        })?;

        let config = match raw.get("game") {
            Some(section) => serde_yml::from_value::<Self>(section.clone()).map_err(|e| {
                HostError::Config {
                    message: format!("failed to parse game config: {e}"),
                }
            })?,
            None => Self::default(),
        };

        if config.maps.is_empty() {
            return Err(HostError::Config {
                message: String::from("game.maps must list at least one map"),
            });
        }
        Ok(config)
    }
}
