/// Extended Kalman Filter (gyro-driven unicycle + beacon range/bearing)
///
/// State Vector (4D):
/// [0-1]: Position (X, Y) in local frame (meters)
/// [2]:   Heading psi in (-π, π] (rad)
/// [3]:   Speed v (m/s)
///
/// Prediction integrates the measured turn rate; beacon observations are
/// linearised around the current estimate. Angular innovations are always
/// wrapped before use.
use log::{debug, info};

use crate::angles::wrap_angle;
use crate::beacons::BeaconLookup;
use crate::belief::Belief;
use crate::config::{FilterConfig, FilterVariant, InitPolicy, InitialPose, NoiseConfig, PriorConfig};
use crate::filters::{gps_update, kalman_update, PoseFilter, UpdateCounters};
use crate::types::{
    GpsMeasurement, GyroMeasurement, LidarMeasurement, MeasureJacobian, MeasureNoise, MeasureVec,
    StateMat, StateVec, VehicleState,
};

/// Below this predicted range the bearing Jacobian is undefined [m]
const MIN_PREDICTED_RANGE: f64 = 1e-6;

pub struct ExtendedKalmanFilter {
    noise: NoiseConfig,
    prior: PriorConfig,
    init: InitPolicy,
    belief: Belief,
    counters: UpdateCounters,
}

impl ExtendedKalmanFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            noise: config.noise,
            prior: config.prior,
            init: config.init,
            belief: Belief::new(),
            counters: UpdateCounters::default(),
        }
    }

    /// Motion Jacobian F = ∂f/∂x, linearised at the prior heading.
    fn motion_jacobian(dt: f64, psi: f64, v: f64) -> StateMat {
        let (sin_psi, cos_psi) = psi.sin_cos();
        let mut f = StateMat::identity();
        f[(0, 2)] = -dt * v * sin_psi;
        f[(0, 3)] = dt * cos_psi;
        f[(1, 2)] = dt * v * cos_psi;
        f[(1, 3)] = dt * sin_psi;
        f
    }

    /// Diagonal Q: gyro noise on heading, accel noise on speed
    fn process_noise(&self, dt: f64) -> StateMat {
        let q_psi = dt * dt * self.noise.gyro_std * self.noise.gyro_std;
        let q_v = dt * dt * self.noise.accel_std * self.noise.accel_std;
        StateMat::from_diagonal(&StateVec::new(0.0, 0.0, q_psi, q_v))
    }

    fn lidar_noise(&self) -> MeasureNoise {
        let mut r = MeasureNoise::zeros();
        r[(0, 0)] = self.noise.lidar_range_std * self.noise.lidar_range_std;
        r[(1, 1)] = self.noise.lidar_theta_std * self.noise.lidar_theta_std;
        r
    }

    fn initialize_from_pose(&mut self, pose: &InitialPose) {
        let mean = StateVec::new(pose.x, pose.y, wrap_angle(pose.heading), pose.speed);
        let pos_var = pose.pos_std * pose.pos_std;
        let covariance = StateMat::from_diagonal(&StateVec::new(
            pos_var,
            pos_var,
            pose.heading_std * pose.heading_std,
            pose.vel_std * pose.vel_std,
        ));
        self.belief.initialize(mean, covariance);
        info!("EKF initialised from assumed pose at ({:.2}, {:.2})", pose.x, pose.y);
    }

    /// Heading and speed are placeholders (zero) until motion or bearing
    /// updates inform them.
    fn initialize_from_gps(&mut self, meas: &GpsMeasurement) {
        let gps_var = self.noise.gps_pos_std * self.noise.gps_pos_std;
        let mean = StateVec::new(meas.x, meas.y, 0.0, 0.0);
        let covariance = StateMat::from_diagonal(&StateVec::new(
            gps_var,
            gps_var,
            self.prior.init_psi_std * self.prior.init_psi_std,
            self.prior.init_vel_std * self.prior.init_vel_std,
        ));
        self.belief.initialize(mean, covariance);
        info!("EKF initialised from GPS fix at ({:.2}, {:.2})", meas.x, meas.y);
    }

    /// Apply one associated beacon observation. Returns false when the
    /// geometry is degenerate or S is singular.
    fn apply_range_bearing(&mut self, meas: &LidarMeasurement, beacon_x: f64, beacon_y: f64) -> bool {
        let state = self.belief.mean();
        let (p_x, p_y, psi) = (state[0], state[1], state[2]);

        // Predicted measurement from geometry
        let dx = beacon_x - p_x;
        let dy = beacon_y - p_y;
        let r_hat = dx.hypot(dy);
        if r_hat < MIN_PREDICTED_RANGE {
            debug!("EKF lidar update skipped: vehicle on top of beacon {}", meas.id);
            return false;
        }
        let theta_hat = wrap_angle(dy.atan2(dx) - psi);

        // Bearing innovation must be wrapped
        let innovation = MeasureVec::new(meas.range - r_hat, wrap_angle(meas.theta - theta_hat));

        let r_hat2 = r_hat * r_hat;
        let mut h = MeasureJacobian::zeros();
        h[(0, 0)] = -dx / r_hat;
        h[(0, 1)] = -dy / r_hat;
        h[(1, 0)] = dy / r_hat2;
        h[(1, 1)] = -dx / r_hat2;
        h[(1, 2)] = -1.0;

        let r = self.lidar_noise();
        match kalman_update(&self.belief, &h, &innovation, &r) {
            Some((mut mean, covariance)) => {
                mean[2] = wrap_angle(mean[2]);
                self.belief.set(mean, covariance);
                true
            }
            None => false,
        }
    }
}

impl PoseFilter for ExtendedKalmanFilter {
    fn variant(&self) -> FilterVariant {
        FilterVariant::Extended
    }

    fn predict(&mut self, dt: f64, gyro: Option<&GyroMeasurement>) {
        if !self.belief.is_initialized() {
            if let InitPolicy::OnFirstPrediction(pose) = self.init {
                self.initialize_from_pose(&pose);
            } else {
                debug!("EKF predict skipped: belief not initialised");
                return;
            }
        }

        // Missing gyro reading means no measured turn
        let psi_dot = gyro.map_or(0.0, |g| g.psi_dot);

        let state = self.belief.mean();
        let (p_x, p_y, psi, v) = (state[0], state[1], state[2], state[3]);

        let (sin_psi, cos_psi) = psi.sin_cos();
        let mean = StateVec::new(
            p_x + dt * v * cos_psi,
            p_y + dt * v * sin_psi,
            wrap_angle(psi + dt * psi_dot),
            v,
        );

        let f = Self::motion_jacobian(dt, psi, v);
        let q = self.process_noise(dt);
        let covariance = f * self.belief.covariance() * f.transpose() + q;
        self.belief.set(mean, covariance);

        self.counters.predict_count += 1;
    }

    fn update_position(&mut self, meas: &GpsMeasurement) {
        if !self.belief.is_initialized() {
            self.initialize_from_gps(meas);
        } else if gps_update(&mut self.belief, meas, self.noise.gps_pos_std) {
            let mut mean = *self.belief.mean();
            mean[2] = wrap_angle(mean[2]);
            let covariance = *self.belief.covariance();
            self.belief.set(mean, covariance);
        } else {
            return;
        }
        self.counters.gps_updates += 1;
    }

    fn update_range_bearing(&mut self, meas: &LidarMeasurement, map: &dyn BeaconLookup) {
        if !self.belief.is_initialized() {
            debug!("EKF lidar update skipped: belief not initialised");
            self.counters.lidar_skipped += 1;
            return;
        }

        // Match beacon with the built-in data association id
        let beacon = map.get_beacon_with_id(meas.id);
        if !meas.is_associated() || !beacon.is_valid() {
            debug!("EKF lidar update skipped: no beacon for id {}", meas.id);
            self.counters.lidar_skipped += 1;
            return;
        }

        if self.apply_range_bearing(meas, beacon.x, beacon.y) {
            self.counters.lidar_updates += 1;
        } else {
            self.counters.lidar_skipped += 1;
        }
    }

    fn get_vehicle_state(&self) -> VehicleState {
        if !self.belief.is_initialized() {
            return VehicleState::default();
        }
        let state = self.belief.mean();
        VehicleState::new(state[0], state[1], wrap_angle(state[2]), state[3])
    }

    fn belief(&self) -> &Belief {
        &self.belief
    }

    fn belief_mut(&mut self) -> &mut Belief {
        &mut self.belief
    }

    fn counters(&self) -> UpdateCounters {
        self.counters
    }
}
