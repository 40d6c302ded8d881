/// Linear Kalman Filter (constant velocity)
///
/// State Vector (4D):
/// [0-1]: Position (X, Y) in local frame (meters)
/// [2-3]: Velocity (Vx, Vy) in local frame (m/s)
///
/// Every model is linear, so the gain equations are exact. Range/bearing
/// readings are not used by this variant.
use log::{debug, info, trace};

use crate::angles::wrap_angle;
use crate::beacons::BeaconLookup;
use crate::belief::Belief;
use crate::config::{FilterConfig, FilterVariant, InitPolicy, InitialPose, NoiseConfig, PriorConfig};
use crate::filters::{gps_update, PoseFilter, UpdateCounters};
use crate::types::{
    AccelNoise, GpsMeasurement, GyroMeasurement, LidarMeasurement, NoiseShaping, StateMat,
    StateVec, VehicleState,
};

pub struct LinearKalmanFilter {
    noise: NoiseConfig,
    prior: PriorConfig,
    init: InitPolicy,
    belief: Belief,
    counters: UpdateCounters,
}

impl LinearKalmanFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            noise: config.noise,
            prior: config.prior,
            init: config.init,
            belief: Belief::new(),
            counters: UpdateCounters::default(),
        }
    }

    /// F: position integrates velocity over dt
    fn transition_matrix(dt: f64) -> StateMat {
        let mut f = StateMat::identity();
        f[(0, 2)] = dt;
        f[(1, 3)] = dt;
        f
    }

    /// L: maps 2D acceleration noise into state space
    fn noise_shaping(dt: f64) -> NoiseShaping {
        let half_dt2 = 0.5 * dt * dt;
        let mut l = NoiseShaping::zeros();
        l[(0, 0)] = half_dt2;
        l[(1, 1)] = half_dt2;
        l[(2, 0)] = dt;
        l[(3, 1)] = dt;
        l
    }

    /// Q = L * Qa * L^T
    fn process_noise(&self, dt: f64) -> StateMat {
        let l = Self::noise_shaping(dt);
        let q_accel = AccelNoise::identity() * (self.noise.accel_std * self.noise.accel_std);
        l * q_accel * l.transpose()
    }

    fn initialize_from_pose(&mut self, pose: &InitialPose) {
        let mean = StateVec::new(
            pose.x,
            pose.y,
            pose.speed * pose.heading.cos(),
            pose.speed * pose.heading.sin(),
        );
        let pos_var = pose.pos_std * pose.pos_std;
        let vel_var = pose.vel_std * pose.vel_std;
        let covariance = StateMat::from_diagonal(&StateVec::new(pos_var, pos_var, vel_var, vel_var));
        self.belief.initialize(mean, covariance);
        info!("LKF initialised from assumed pose at ({:.2}, {:.2})", pose.x, pose.y);
    }

    fn initialize_from_gps(&mut self, meas: &GpsMeasurement) {
        let gps_var = self.noise.gps_pos_std * self.noise.gps_pos_std;
        let vel_var = self.prior.init_vel_std * self.prior.init_vel_std;
        let mean = StateVec::new(meas.x, meas.y, 0.0, 0.0);
        let covariance = StateMat::from_diagonal(&StateVec::new(gps_var, gps_var, vel_var, vel_var));
        self.belief.initialize(mean, covariance);
        info!("LKF initialised from GPS fix at ({:.2}, {:.2})", meas.x, meas.y);
    }
}

impl PoseFilter for LinearKalmanFilter {
    fn variant(&self) -> FilterVariant {
        FilterVariant::Linear
    }

    fn predict(&mut self, dt: f64, _gyro: Option<&GyroMeasurement>) {
        if !self.belief.is_initialized() {
            if let InitPolicy::OnFirstPrediction(pose) = self.init {
                self.initialize_from_pose(&pose);
            } else {
                debug!("LKF predict skipped: belief not initialised");
                return;
            }
        }

        let f = Self::transition_matrix(dt);
        let q = self.process_noise(dt);

        let mean = f * self.belief.mean();
        let covariance = f * self.belief.covariance() * f.transpose() + q;
        self.belief.set(mean, covariance);

        self.counters.predict_count += 1;
    }

    fn update_position(&mut self, meas: &GpsMeasurement) {
        if !self.belief.is_initialized() {
            self.initialize_from_gps(meas);
        } else if !gps_update(&mut self.belief, meas, self.noise.gps_pos_std) {
            return;
        }
        self.counters.gps_updates += 1;
    }

    fn update_range_bearing(&mut self, meas: &LidarMeasurement, _map: &dyn BeaconLookup) {
        trace!("LKF ignores range/bearing reading for beacon {}", meas.id);
        self.counters.lidar_skipped += 1;
    }

    fn get_vehicle_state(&self) -> VehicleState {
        if !self.belief.is_initialized() {
            return VehicleState::default();
        }
        let state = self.belief.mean();
        let (vx, vy) = (state[2], state[3]);
        VehicleState::new(state[0], state[1], wrap_angle(vy.atan2(vx)), vx.hypot(vy))
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
