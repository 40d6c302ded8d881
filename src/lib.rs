//! Vehicle pose estimation from gyro, GPS and beacon range/bearing readings.
//!
//! Two Kalman filter variants share one interface ([`filters::PoseFilter`]):
//! a linear constant-velocity filter and an extended filter with a
//! gyro-driven unicycle model and beacon observations.

pub mod angles;
pub mod beacons;
pub mod belief;
pub mod config;
pub mod error;
pub mod filters;
pub mod sensors;
pub mod types;

pub use angles::wrap_angle;
pub use beacons::{BeaconData, BeaconLookup, BeaconMap, UNASSOCIATED_ID};
pub use belief::Belief;
pub use config::{FilterConfig, FilterVariant, InitPolicy, InitialPose, NoiseConfig, PriorConfig};
pub use error::ConfigError;
pub use filters::{build_filter, ExtendedKalmanFilter, LinearKalmanFilter, PoseFilter};
pub use types::{FilterSnapshot, GpsMeasurement, GyroMeasurement, LidarMeasurement, VehicleState};
