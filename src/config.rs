//! Configuration Module
//!
//! Handles loading zone and sweeper configuration from environment variables.

use std::env;

use crate::error::{DictError, Result};

const DEFAULT_ZONES: &str = "default:1m";
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 1000;
const DEFAULT_SWEEP_BATCH: usize = 0;

/// One named dictionary to create at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneConfig {
    pub name: String,
    /// Region size in bytes
    pub size: usize,
}

/// Process configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Dictionaries to create, in declaration order
    pub zones: Vec<ZoneConfig>,
    /// Milliseconds between background sweeps of expired entries
    pub sweep_interval_ms: u64,
    /// Expired entries freed per dictionary per sweep, 0 = all
    pub sweep_batch: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SHDICT_ZONES` - Comma-separated `name:size` list (default: `default:1m`)
    /// - `SWEEP_INTERVAL_MS` - Sweep frequency in milliseconds (default: 1000)
    /// - `SWEEP_BATCH` - Entries freed per zone per sweep, 0 = all (default: 0)
    ///
    /// Unparseable numbers fall back to their defaults; a malformed zone list
    /// is an error.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let zones = var("SHDICT_ZONES").unwrap_or_else(|| DEFAULT_ZONES.to_string());

        Ok(Self {
            zones: parse_zones(&zones)?,
            sweep_interval_ms: var("SWEEP_INTERVAL_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_MS),
            sweep_batch: var("SWEEP_BATCH")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SWEEP_BATCH),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zones: vec![ZoneConfig {
                name: "default".to_string(),
                size: 1024 * 1024,
            }],
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
            sweep_batch: DEFAULT_SWEEP_BATCH,
        }
    }
}

/// Parses `name:size[,name:size...]`.
pub fn parse_zones(zones: &str) -> Result<Vec<ZoneConfig>> {
    zones
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (name, size) = part
                .split_once(':')
                .ok_or_else(|| DictError::InvalidZone(part.to_string()))?;
            let name = name.trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(DictError::InvalidZone(part.to_string()));
            }
            let size = parse_size(size.trim())
                .ok_or_else(|| DictError::InvalidZone(part.to_string()))?;
            Ok(ZoneConfig {
                name: name.to_string(),
                size,
            })
        })
        .collect()
}

/// Parses a byte count with an optional `k`, `m` or `g` suffix.
pub fn parse_size(text: &str) -> Option<usize> {
    let lower = text.to_ascii_lowercase();
    let (digits, unit) = match lower.chars().last()? {
        'k' => (&lower[..lower.len() - 1], 1 << 10),
        'm' => (&lower[..lower.len() - 1], 1 << 20),
        'g' => (&lower[..lower.len() - 1], 1 << 30),
        _ => (lower.as_str(), 1),
    };
    digits.parse::<usize>().ok()?.checked_mul(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.zones.len(), 1);
        assert_eq!(config.zones[0].name, "default");
        assert_eq!(config.zones[0].size, 1024 * 1024);
        assert_eq!(config.sweep_interval_ms, 1000);
        assert_eq!(config.sweep_batch, 0);
    }

    #[test]
    fn test_config_from_vars_defaults() {
        let config = Config::from_vars(vars(&[])).unwrap();
        assert_eq!(config.zones, Config::default().zones);
        assert_eq!(config.sweep_interval_ms, 1000);
        assert_eq!(config.sweep_batch, 0);
    }

    #[test]
    fn test_config_from_vars_overrides() {
        let config = Config::from_vars(vars(&[
            ("SHDICT_ZONES", "cache:10m, locks:64k"),
            ("SWEEP_INTERVAL_MS", "250"),
            ("SWEEP_BATCH", "100"),
        ]))
        .unwrap();

        assert_eq!(config.zones[0].name, "cache");
        assert_eq!(config.zones[0].size, 10 << 20);
        assert_eq!(config.zones[1].name, "locks");
        assert_eq!(config.zones[1].size, 64 << 10);
        assert_eq!(config.sweep_interval_ms, 250);
        assert_eq!(config.sweep_batch, 100);
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let config = Config::from_vars(vars(&[
            ("SWEEP_INTERVAL_MS", "soon"),
            ("SWEEP_BATCH", "-1"),
        ]))
        .unwrap();
        assert_eq!(config.sweep_interval_ms, 1000);
        assert_eq!(config.sweep_batch, 0);
    }

    #[test]
    fn test_malformed_zones() {
        assert!(matches!(
            parse_zones("nosize"),
            Err(DictError::InvalidZone(_))
        ));
        assert!(matches!(parse_zones(":1m"), Err(DictError::InvalidZone(_))));
        assert!(matches!(
            parse_zones("a:lots"),
            Err(DictError::InvalidZone(_))
        ));
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("8192"), Some(8192));
        assert_eq!(parse_size("12k"), Some(12 * 1024));
        assert_eq!(parse_size("1M"), Some(1 << 20));
        assert_eq!(parse_size("2g"), Some(2 << 30));
        assert_eq!(parse_size(""), None);
        assert_eq!(parse_size("k"), None);
        assert_eq!(parse_size("1.5m"), None);
    }
}
