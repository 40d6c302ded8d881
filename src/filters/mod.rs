//! Pose filters
//!
//! Two interchangeable estimators behind one [`PoseFilter`] interface:
//! - [`lkf::LinearKalmanFilter`]: constant-velocity model, state [x, y, vx, vy]
//! - [`ekf::ExtendedKalmanFilter`]: gyro-driven unicycle, state [x, y, psi, v]
//!
//! A deployment picks one at configuration time via [`build_filter`].

pub mod ekf;
pub mod lkf;

use log::{info, warn};

use crate::beacons::BeaconLookup;
use crate::belief::Belief;
use crate::config::{FilterConfig, FilterVariant};
use crate::error::ConfigResult;
use crate::types::{
    FilterSnapshot, GpsMeasurement, GyroMeasurement, KalmanGain, LidarMeasurement, MeasureJacobian,
    MeasureNoise, MeasureVec, PositionCov, StateMat, StateVec, VehicleState,
};

pub use ekf::ExtendedKalmanFilter;
pub use lkf::LinearKalmanFilter;

/// Per-filter update counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateCounters {
    pub predict_count: u64,
    pub gps_updates: u64,
    pub lidar_updates: u64,
    pub lidar_skipped: u64,
}

/// Common estimator interface.
///
/// No operation returns an error: readings that cannot be used (belief not
/// initialised, unassociated beacon, degenerate geometry) leave the belief
/// untouched. Callers must serialise calls into one instance.
pub trait PoseFilter {
    fn variant(&self) -> FilterVariant;

    /// Time propagation by `dt` seconds. `gyro` is the turn-rate input; the
    /// linear filter ignores it.
    fn predict(&mut self, dt: f64, gyro: Option<&GyroMeasurement>);

    /// Absolute position correction, or bootstrap when uninitialised.
    fn update_position(&mut self, meas: &GpsMeasurement);

    /// Range/bearing correction against a known beacon.
    fn update_range_bearing(&mut self, meas: &LidarMeasurement, map: &dyn BeaconLookup);

    /// Sequential single-reading updates, in input order, assuming
    /// independent readings.
    fn update_range_bearing_batch(&mut self, meas: &[LidarMeasurement], map: &dyn BeaconLookup) {
        for reading in meas {
            self.update_range_bearing(reading, map);
        }
    }

    fn get_vehicle_state(&self) -> VehicleState;

    fn belief(&self) -> &Belief;

    fn belief_mut(&mut self) -> &mut Belief;

    fn counters(&self) -> UpdateCounters;

    /// Explicitly seed the belief, bypassing the initialisation policy.
    fn initialize(&mut self, mean: StateVec, covariance: StateMat) {
        self.belief_mut().initialize(mean, covariance);
    }

    fn get_position_covariance(&self) -> PositionCov {
        self.belief().position_covariance()
    }

    fn is_initialized(&self) -> bool {
        self.belief().is_initialized()
    }

    fn snapshot(&self) -> FilterSnapshot {
        let p = self.get_position_covariance();
        let counters = self.counters();
        FilterSnapshot {
            state: self.get_vehicle_state(),
            position_covariance: [[p[(0, 0)], p[(0, 1)]], [p[(1, 0)], p[(1, 1)]]],
            covariance_trace: self.belief().covariance_trace(),
            initialized: self.is_initialized(),
            predict_count: counters.predict_count,
            gps_updates: counters.gps_updates,
            lidar_updates: counters.lidar_updates,
            lidar_skipped: counters.lidar_skipped,
        }
    }
}

/// Build the configured filter variant.
pub fn build_filter(config: &FilterConfig) -> ConfigResult<Box<dyn PoseFilter>> {
    config.validate()?;
    info!("building {:?} pose filter (init policy {:?})", config.variant, config.init);
    Ok(match config.variant {
        FilterVariant::Linear => Box::new(LinearKalmanFilter::new(config)),
        FilterVariant::Extended => Box::new(ExtendedKalmanFilter::new(config)),
    })
}

/// Standard Kalman correction for a 2D measurement.
///
/// Returns the corrected (mean, covariance) without writing them back, or
/// `None` when the innovation covariance cannot be inverted. Covariance uses
/// the Joseph form P = (I-KH)P(I-KH)^T + KRK^T.
pub(crate) fn kalman_update(
    belief: &Belief,
    h: &MeasureJacobian,
    innovation: &MeasureVec,
    r: &MeasureNoise,
) -> Option<(StateVec, StateMat)> {
    let p = belief.covariance();
    let h_t = h.transpose();

    // Innovation covariance: S = H * P * H^T + R
    let s = h * p * h_t + r;
    let Some(s_inv) = s.try_inverse() else {
        warn!("innovation covariance is singular, skipping update: {:?}", s);
        return None;
    };

    // Kalman gain: K = P * H^T * S^-1
    let k: KalmanGain = p * h_t * s_inv;

    let mean = belief.mean() + k * innovation;

    let i_kh = StateMat::identity() - k * h;
    let covariance = i_kh * p * i_kh.transpose() + k * r * k.transpose();

    Some((mean, covariance))
}

/// Position-selection matrix, identical for both state layouts.
pub(crate) fn gps_measurement_jacobian() -> MeasureJacobian {
    let mut h = MeasureJacobian::zeros();
    h[(0, 0)] = 1.0;
    h[(1, 1)] = 1.0;
    h
}

/// Linear GPS correction shared by both variants. The measurement model
/// selects x and y, so no linearisation is involved.
pub(crate) fn gps_update(belief: &mut Belief, meas: &GpsMeasurement, gps_pos_std: f64) -> bool {
    let h = gps_measurement_jacobian();
    let z = MeasureVec::new(meas.x, meas.y);
    let innovation = z - h * belief.mean();
    let r = MeasureNoise::identity() * (gps_pos_std * gps_pos_std);

    match kalman_update(belief, &h, &innovation, &r) {
        Some((mean, covariance)) => {
            belief.set(mean, covariance);
            true
        }
        None => false,
    }
}
