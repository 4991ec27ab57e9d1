//! Named screen regions loaded from regions.json.
//!
//! The file maps a region name to `[left, top, right, bottom]` in absolute
//! pixel coordinates. Regions are loaded once before a run starts and are
//! read-only while the engine runs.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Region names the engine cannot run without.
pub const REQUIRED_REGIONS: &[&str] = &["time", "buy", "verify", "refresh", "money"];

/// Optional dedicated color-probe region. When absent the `verify` region's
/// own center is sampled instead.
pub const VERIFY_CHECK_REGION: &str = "verify_check";

/// A named rectangle in absolute frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Region {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Center point, used for clicks and pixel sampling.
    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }

    pub fn width(&self) -> u32 {
        (self.right - self.left) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top) as u32
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.right <= self.left || self.bottom <= self.top {
            return Err(anyhow!(
                "Region '{}' is degenerate: [{}, {}, {}, {}]",
                name, self.left, self.top, self.right, self.bottom
            ));
        }
        Ok(())
    }
}

/// Read-only mapping from region name to rectangle.
#[derive(Clone, Debug, Default)]
pub struct RegionStore {
    regions: HashMap<String, Region>,
}

impl RegionStore {
    /// Builds a store from an in-memory map, validating every rectangle.
    pub fn from_map(map: HashMap<String, Region>) -> Result<Self> {
        for (name, region) in &map {
            region.validate(name)?;
        }
        Ok(Self { regions: map })
    }

    /// Loads regions from a JSON file of `{ "name": [l, t, r, b], ... }`.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read region file {}", path.display()))?;
        let raw: HashMap<String, [i32; 4]> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse region file {}", path.display()))?;

        let map = raw
            .into_iter()
            .map(|(name, [l, t, r, b])| (name, Region::new(l, t, r, b)))
            .collect();
        Self::from_map(map)
    }

    pub fn get(&self, name: &str) -> Option<&Region> {
        self.regions.get(name)
    }

    /// Looks up a region the engine cannot run without.
    pub fn require(&self, name: &str) -> Result<&Region> {
        self.regions
            .get(name)
            .ok_or_else(|| anyhow!("Required region '{}' is not configured", name))
    }

    /// Returns the names of required regions missing from this store.
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_REGIONS
            .iter()
            .copied()
            .filter(|name| !self.regions.contains_key(*name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store_with(names: &[&str]) -> RegionStore {
        let map = names
            .iter()
            .map(|&n| (n.to_string(), Region::new(0, 0, 10, 10)))
            .collect();
        RegionStore::from_map(map).unwrap()
    }

    #[test]
    fn test_center() {
        let r = Region::new(100, 200, 300, 260);
        assert_eq!(r.center(), (200, 230));
    }

    #[test]
    fn test_degenerate_region_rejected() {
        let mut map = HashMap::new();
        map.insert("bad".to_string(), Region::new(50, 10, 50, 20));
        assert!(RegionStore::from_map(map).is_err());
    }

    #[test]
    fn test_missing_required() {
        let store = store_with(&["time", "buy", "verify"]);
        let mut missing = store.missing_required();
        missing.sort();
        assert_eq!(missing, vec!["money", "refresh"]);

        let full = store_with(REQUIRED_REGIONS);
        assert!(full.missing_required().is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"{{"time": [10, 20, 110, 50], "buy": [200, 300, 280, 340]}}"#
        )
        .unwrap();

        let store = RegionStore::load_from_file(&path).unwrap();
        assert_eq!(store.get("time"), Some(&Region::new(10, 20, 110, 50)));
        assert_eq!(store.get("buy").unwrap().center(), (240, 320));
        assert!(store.get("refresh").is_none());
    }

    #[test]
    fn test_load_rejects_bad_rect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.json");
        std::fs::write(&path, r#"{"time": [100, 20, 10, 50]}"#).unwrap();
        assert!(RegionStore::load_from_file(&path).is_err());
    }
}
