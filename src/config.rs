use std::fs;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::ephemeris::ObserverSite;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: ObserverSite,
    pub ephemeris: EphemerisConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default = "default_target")]
    pub target: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EphemerisConfig {
    /// JPL SPK kernel, e.g. de440s.bsp.
    pub spk: String,
    /// Planetary constants kernel for the Earth body-fixed frame.
    #[serde(default = "default_pck")]
    pub pck: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SerialConfig {
    /// Port to connect to at startup; connection can also be requested
    /// interactively.
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default = "default_baud")]
    pub baud: u32,
    #[serde(
        default = "default_read_timeout",
        deserialize_with = "parse_duration"
    )]
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud: default_baud(),
            read_timeout: default_read_timeout(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Config, ConfigError> {
        let yaml = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&yaml)?)
    }
}

fn default_target() -> String {
    "Moon".to_string()
}

fn default_pck() -> String {
    "pck11.pca".to_string()
}

fn default_baud() -> u32 {
    115_200
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(5)
}

fn parse_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(&text).map_err(serde::de::Error::custom)
}
