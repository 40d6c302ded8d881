//! Recorded sensor logs for offline replay
//!
//! A log is a JSON document (optionally gzip-compressed) holding the beacon
//! map and a time-ordered list of sensor events.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::Context;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use crate::beacons::BeaconData;
use crate::types::{GpsMeasurement, GyroMeasurement, LidarMeasurement};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorEvent {
    Gyro(GyroMeasurement),
    Gps(GpsMeasurement),
    Lidar {
        timestamp: f64,
        measurements: Vec<LidarMeasurement>,
    },
}

impl SensorEvent {
    pub fn timestamp(&self) -> f64 {
        match self {
            SensorEvent::Gyro(g) => g.timestamp,
            SensorEvent::Gps(g) => g.timestamp,
            SensorEvent::Lidar { timestamp, .. } => *timestamp,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SensorLog {
    #[serde(default)]
    pub beacons: Vec<BeaconData>,
    pub events: Vec<SensorEvent>,
}

/// Load a `.json` or `.json.gz` sensor log.
pub fn load_log(path: &Path) -> anyhow::Result<SensorLog> {
    let file = File::open(path).with_context(|| format!("failed to open log {}", path.display()))?;
    let log = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        parse_log(GzDecoder::new(file))
    } else {
        parse_log(file)
    };
    log.with_context(|| format!("failed to parse log {}", path.display()))
}

pub fn parse_log<R: Read>(reader: R) -> anyhow::Result<SensorLog> {
    Ok(serde_json::from_reader(BufReader::new(reader))?)
}
