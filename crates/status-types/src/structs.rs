//! Point-in-time snapshots of the game server state.
//!
//! A [`GameStateSnapshot`] is produced on demand by the host's game state
//! provider. It is a plain value: once handed to the status server it no
//! longer tracks the live game.

use serde::{Deserialize, Serialize};

use crate::ids::MapIdentity;

/// Metadata about the currently loaded map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapInfo {
    /// Map identity (its name).
    pub name: MapIdentity,
    /// Map version string as declared by the map author.
    pub version: String,
    /// Map author.
    pub author: String,
}

/// A connected player as seen by the status page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    /// Display name.
    pub name: String,
    /// Round-trip latency in milliseconds.
    pub latency: u32,
    /// Client identification string.
    pub client: String,
    /// Kills this game.
    pub kills: u32,
    /// Name of the team the player is on.
    pub team: String,
}

/// Current team scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamScores {
    /// Blue team score.
    pub current_blue_score: u32,
    /// Green team score.
    pub current_green_score: u32,
    /// Score that ends the game.
    pub max_score: u32,
}

/// Read-only snapshot of server, map, player, and score data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateSnapshot {
    /// Stable server identifier (e.g. `aos://16777343:32887`).
    pub server_identifier: String,
    /// Human-readable server name.
    pub server_name: String,
    /// Server software version.
    pub server_version: String,
    /// Seconds since the server started.
    pub server_uptime: f64,
    /// Name of the active game mode.
    pub game_mode: String,
    /// Currently loaded map.
    pub map: MapInfo,
    /// Connected players.
    pub players: Vec<PlayerStatus>,
    /// Player capacity.
    pub max_players: u32,
    /// Team scores.
    pub scores: TeamScores,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> GameStateSnapshot {
        GameStateSnapshot {
            server_identifier: String::from("aos://16777343:32887"),
            server_name: String::from("test server"),
            server_version: String::from("1.0.0"),
            server_uptime: 12.5,
            game_mode: String::from("ctf"),
            map: MapInfo {
                name: MapIdentity::from("classicgen"),
                version: String::from("1.0"),
                author: String::from("(server)"),
            },
            players: vec![PlayerStatus {
                name: String::from("Deuce"),
                latency: 42,
                client: String::from("OpenSpades 0.1.3"),
                kills: 3,
                team: String::from("Blue"),
            }],
            max_players: 32,
            scores: TeamScores {
                current_blue_score: 1,
                current_green_score: 2,
                max_score: 10,
            },
        }
    }

    #[test]
    fn snapshot_uses_camel_case_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["serverName"], "test server");
        assert_eq!(json["gameMode"], "ctf");
        assert_eq!(json["maxPlayers"], 32);
        assert_eq!(json["map"]["name"], "classicgen");
        assert_eq!(json["scores"]["currentGreenScore"], 2);
        assert_eq!(json["scores"]["maxScore"], 10);
        assert_eq!(json["players"][0]["client"], "OpenSpades 0.1.3");
    }
}
