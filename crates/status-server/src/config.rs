//! Configuration for the status server.
//!
//! Settings are read once at startup from YAML and passed explicitly
//! into the server and the overview cache. The file layout mirrors the
//! game server's own config so the status section can live alongside it:
//!
//! ```yaml
//! status_server:
//!   host: 0.0.0.0
//!   port: 32886
//!   logging: false
//!   update_interval: 1min
//! scripts:
//!   - votekick
//!   - ratio
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held an unusable value.
    #[error("invalid value {value:?} for {variable}: {reason}")]
    InvalidOverride {
        /// The environment variable name.
        variable: &'static str,
        /// The rejected value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration consumed by the status server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub status_server: StatusServerConfig,

    /// Names of the scripts loaded by the game server, reported by `/json`.
    #[serde(default)]
    pub scripts: Vec<String>,
}

impl StatusConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `STATUS_SERVER_HOST` overrides `status_server.host`
    /// - `STATUS_SERVER_PORT` overrides `status_server.port`
    /// - `STATUS_SERVER_LOGGING` overrides `status_server.logging`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid, or
    /// [`ConfigError::InvalidOverride`] for an unparseable override.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.status_server.apply_env_overrides()?;
        Ok(config)
    }

    /// Like [`from_file`](Self::from_file), but a missing file yields the
    /// defaults with environment overrides applied.
    ///
    /// # Errors
    ///
    /// Same as [`from_file`](Self::from_file).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.status_server.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides
    /// are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// The `status_server` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StatusServerConfig {
    /// Address to bind to.
    pub host: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Whether to emit one access log line per request.
    pub logging: bool,
    /// Minimum time between unconditional overview refreshes.
    #[serde(deserialize_with = "deserialize_duration")]
    pub update_interval: Duration,
}

impl Default for StatusServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 32886,
            logging: false,
            update_interval: Duration::from_secs(60),
        }
    }
}

impl StatusServerConfig {
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("STATUS_SERVER_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("STATUS_SERVER_PORT") {
            self.port = port.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidOverride {
                    variable: "STATUS_SERVER_PORT",
                    value: port.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(logging) = lookup("STATUS_SERVER_LOGGING") {
            self.logging = match logging.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidOverride {
                        variable: "STATUS_SERVER_LOGGING",
                        value: logging,
                        reason: String::from("expected a boolean"),
                    });
                }
            };
        }
        Ok(())
    }
}

/// Parse a human duration such as `1min`, `30s`, `1h30min`, or `90`.
///
/// A bare number is seconds. Recognized units: `s`/`sec`/`second(s)`,
/// `m`/`min`/`minute(s)`, `h`/`hr`/`hour(s)`, `d`/`day(s)`, `w`/`week(s)`.
/// Returns `None` for anything else, including overflowing values.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(secs) = input.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let mut total: u64 = 0;
    let mut rest = input;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return None;
        }
        let (digits, tail) = rest.split_at(digits_end);
        let value: u64 = digits.parse().ok()?;

        let tail = tail.trim_start();
        let unit_end = tail
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);
        let scale = unit_seconds(unit)?;

        total = total.checked_add(value.checked_mul(scale)?)?;
        rest = tail.trim_start();
    }
    Some(Duration::from_secs(total))
}

fn unit_seconds(unit: &str) -> Option<u64> {
    match unit.to_ascii_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(60),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(3_600),
        "d" | "day" | "days" => Some(86_400),
        "w" | "week" | "weeks" => Some(604_800),
        _ => None,
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid duration {text:?}"))
        }),
    }
}
