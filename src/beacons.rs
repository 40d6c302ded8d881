//! Known beacon (landmark) map
//!
//! Beacons are fixed points identified by the same id the lidar's data
//! association reports. Lookups never fail loudly: an unknown id yields
//! the sentinel record with `id == -1`.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Association id meaning "no beacon".
pub const UNASSOCIATED_ID: i32 = -1;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeaconData {
    pub id: i32,
    pub x: f64,
    pub y: f64,
}

impl BeaconData {
    pub fn new(id: i32, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }

    /// Sentinel returned by lookups that find nothing
    pub fn unassociated() -> Self {
        Self {
            id: UNASSOCIATED_ID,
            x: 0.0,
            y: 0.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.id != UNASSOCIATED_ID
    }
}

/// Lookup-by-id service consumed by the range/bearing update.
pub trait BeaconLookup {
    /// Returns the beacon, or [`BeaconData::unassociated`] when absent.
    fn get_beacon_with_id(&self, id: i32) -> BeaconData;
}

#[derive(Clone, Debug, Default)]
pub struct BeaconMap {
    beacons: HashMap<i32, BeaconData>,
}

impl BeaconMap {
    /// Build a map; later duplicates of an id replace earlier ones.
    /// Entries carrying the sentinel id are ignored.
    pub fn new(beacons: impl IntoIterator<Item = BeaconData>) -> Self {
        let beacons = beacons
            .into_iter()
            .filter(BeaconData::is_valid)
            .map(|b| (b.id, b))
            .collect();
        Self { beacons }
    }

    /// Load a JSON array of `{id, x, y}` records.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open beacon map {}", path.display()))?;
        let beacons: Vec<BeaconData> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse beacon map {}", path.display()))?;
        Ok(Self::new(beacons))
    }

    pub fn len(&self) -> usize {
        self.beacons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beacons.is_empty()
    }
}

impl BeaconLookup for BeaconMap {
    fn get_beacon_with_id(&self, id: i32) -> BeaconData {
        if id == UNASSOCIATED_ID {
            return BeaconData::unassociated();
        }
        self.beacons
            .get(&id)
            .copied()
            .unwrap_or_else(BeaconData::unassociated)
    }
}
