//! Zone Registry Module
//!
//! Owns every configured dictionary, keyed by zone name.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{Config, ZoneConfig};
use crate::dict::SharedDict;
use crate::error::{DictError, Result};

/// The set of named dictionaries a process serves.
#[derive(Debug, Default)]
pub struct SharedDicts {
    zones: BTreeMap<String, Arc<SharedDict>>,
}

impl SharedDicts {
    /// Creates one dictionary per configured zone.
    ///
    /// Fails on a duplicate zone name or an invalid zone size.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::from_zones(&config.zones)
    }

    pub fn from_zones(zones: &[ZoneConfig]) -> Result<Self> {
        let mut dicts = Self::default();
        for zone in zones {
            if dicts.zones.contains_key(&zone.name) {
                return Err(DictError::InvalidZone(format!(
                    "duplicate zone name {}",
                    zone.name
                )));
            }
            let dict = SharedDict::new(zone.name.clone(), zone.size)?;
            dicts.zones.insert(zone.name.clone(), Arc::new(dict));
        }
        Ok(dicts)
    }

    pub fn get(&self, name: &str) -> Option<Arc<SharedDict>> {
        self.zones.get(name).cloned()
    }

    /// Dictionaries in name order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SharedDict>> {
        self.zones.values()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_zones;

    #[test]
    fn test_from_zones() {
        let dicts = SharedDicts::from_zones(&parse_zones("b:16k,a:8k").unwrap()).unwrap();

        assert_eq!(dicts.len(), 2);
        let names: Vec<_> = dicts.iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(dicts.get("b").unwrap().capacity(), 16 * 1024);
        assert!(dicts.get("c").is_none());
    }

    #[test]
    fn test_duplicate_zone_rejected() {
        let zones = parse_zones("a:8k,a:16k").unwrap();
        assert!(matches!(
            SharedDicts::from_zones(&zones),
            Err(DictError::InvalidZone(_))
        ));
    }

    #[test]
    fn test_zone_too_small_rejected() {
        let zones = parse_zones("tiny:100").unwrap();
        assert!(matches!(
            SharedDicts::from_zones(&zones),
            Err(DictError::InvalidCapacity(100))
        ));
    }

    #[test]
    fn test_from_default_config() {
        let dicts = SharedDicts::from_config(&Config::default()).unwrap();
        assert!(dicts.get("default").is_some());
    }
}
