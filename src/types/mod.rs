pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

use crate::beacons::UNASSOCIATED_ID;

/// Yaw-rate gyroscope reading, the control input of the extended filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GyroMeasurement {
    pub timestamp: f64,
    /// Turn rate [rad/s]
    pub psi_dot: f64,
}

/// Absolute position fix in the local frame [m].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsMeasurement {
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
}

/// Range/bearing observation of a beacon.
///
/// `id` is the data-association id; `-1` means the sensor could not
/// associate the return with any beacon.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LidarMeasurement {
    pub timestamp: f64,
    /// Range to beacon [m]
    pub range: f64,
    /// Bearing relative to vehicle heading [rad]
    pub theta: f64,
    #[serde(default = "unassociated_id")]
    pub id: i32,
}

fn unassociated_id() -> i32 {
    UNASSOCIATED_ID
}

impl LidarMeasurement {
    pub fn is_associated(&self) -> bool {
        self.id != UNASSOCIATED_ID
    }
}

/// Public pose estimate, identical in shape for both filter variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub x: f64,
    pub y: f64,
    /// Heading in (-π, π] [rad]
    pub psi: f64,
    /// Speed [m/s]
    pub v: f64,
}

impl VehicleState {
    pub fn new(x: f64, y: f64, psi: f64, v: f64) -> Self {
        Self { x, y, psi, v }
    }
}

/// Diagnostic snapshot of a filter, used by the replay harness.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilterSnapshot {
    pub state: VehicleState,

    /// Leading 2×2 block of the covariance, row-major [m²]
    pub position_covariance: [[f64; 2]; 2],

    /// Covariance trace for uncertainty
    pub covariance_trace: f64,

    pub initialized: bool,

    /// Update counters
    pub predict_count: u64,
    pub gps_updates: u64,
    pub lidar_updates: u64,
    pub lidar_skipped: u64,
}
