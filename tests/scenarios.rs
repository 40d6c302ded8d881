//! End-to-end scenarios driving both filter variants through the public API
//! with noise-free simulated readings.

use approx::assert_relative_eq;
use nalgebra::Matrix2;
use pose_tracker_rs::{
    build_filter, wrap_angle, BeaconData, BeaconMap, FilterConfig, GpsMeasurement,
    GyroMeasurement, LidarMeasurement, PoseFilter, VehicleState,
};

const DT: f64 = 0.1;

/// Ground-truth unicycle using the same discrete kinematics as the EKF
struct Truth {
    x: f64,
    y: f64,
    psi: f64,
    v: f64,
    psi_dot: f64,
}

impl Truth {
    fn step(&mut self) {
        self.x += DT * self.v * self.psi.cos();
        self.y += DT * self.v * self.psi.sin();
        self.psi = wrap_angle(self.psi + DT * self.psi_dot);
    }

    fn lidar(&self, beacon: &BeaconData, t: f64) -> LidarMeasurement {
        let dx = beacon.x - self.x;
        let dy = beacon.y - self.y;
        LidarMeasurement {
            timestamp: t,
            range: dx.hypot(dy),
            theta: wrap_angle(dy.atan2(dx) - self.psi),
            id: beacon.id,
        }
    }
}

fn beacons() -> Vec<BeaconData> {
    vec![
        BeaconData::new(0, 60.0, 0.0),
        BeaconData::new(1, 0.0, 60.0),
        BeaconData::new(2, -60.0, 0.0),
        BeaconData::new(3, 0.0, -60.0),
    ]
}

fn assert_covariance_healthy(filter: &dyn PoseFilter) {
    let p = filter.belief().covariance();
    assert_eq!(*p, p.transpose(), "covariance lost symmetry");
    assert!(p.cholesky().is_some(), "covariance not positive definite: {}", p);
}

#[test]
fn test_linear_bootstrap_from_first_fix() {
    let mut filter = build_filter(&FilterConfig::linear()).unwrap();
    assert!(!filter.is_initialized());

    filter.update_position(&GpsMeasurement {
        timestamp: 0.0,
        x: 10.0,
        y: 5.0,
    });

    assert!(filter.is_initialized());
    assert_eq!(filter.get_vehicle_state(), VehicleState::new(10.0, 5.0, 0.0, 0.0));
    assert_eq!(filter.get_position_covariance(), Matrix2::new(9.0, 0.0, 0.0, 9.0));
}

#[test]
fn test_linear_tracks_constant_velocity() {
    let mut filter = build_filter(&FilterConfig::linear()).unwrap();
    let (vx, vy) = (3.0, -2.0);

    for step in 0..=200 {
        let t = step as f64 * DT;
        if step > 0 {
            filter.predict(DT, None);
        }
        if step % 5 == 0 {
            let trace_before = filter.belief().covariance_trace();
            let was_initialized = filter.is_initialized();
            filter.update_position(&GpsMeasurement {
                timestamp: t,
                x: vx * t,
                y: vy * t,
            });
            if was_initialized {
                assert!(filter.belief().covariance_trace() <= trace_before + 1e-9);
            }
        }
        assert_covariance_healthy(filter.as_ref());
    }

    let state = filter.get_vehicle_state();
    let t = 200.0 * DT;
    assert!((state.x - vx * t).abs() < 0.5, "x = {}", state.x);
    assert!((state.y - vy * t).abs() < 0.5, "y = {}", state.y);
    assert!((state.v - vx.hypot(vy)).abs() < 0.2, "v = {}", state.v);
    assert!((state.psi - vy.atan2(vx)).abs() < 0.05, "psi = {}", state.psi);
}

#[test]
fn test_extended_tracks_circle_with_beacons() {
    let mut filter = build_filter(&FilterConfig::extended()).unwrap();
    let map = BeaconMap::new(beacons());
    let mut truth = Truth {
        x: 0.0,
        y: 0.0,
        psi: 0.3,
        v: 5.0,
        psi_dot: 0.1,
    };

    filter.update_position(&GpsMeasurement {
        timestamp: 0.0,
        x: truth.x,
        y: truth.y,
    });

    for step in 1..=400 {
        let t = step as f64 * DT;
        let gyro = GyroMeasurement {
            timestamp: t,
            psi_dot: truth.psi_dot,
        };
        filter.predict(DT, Some(&gyro));
        truth.step();

        if step % 10 == 0 {
            filter.update_position(&GpsMeasurement {
                timestamp: t,
                x: truth.x,
                y: truth.y,
            });
        }

        if step % 2 == 0 {
            let mut readings: Vec<_> = map_beacons(&truth, t);
            // an unassociated return mixed into the batch
            readings.push(LidarMeasurement {
                timestamp: t,
                range: 3.0,
                theta: 0.0,
                id: -1,
            });
            let trace_before = filter.belief().covariance_trace();
            filter.update_range_bearing_batch(&readings, &map);
            // linearisation can leave a hair of slack
            assert!(filter.belief().covariance_trace() <= trace_before * (1.0 + 1e-6) + 1e-9);
        }
        assert_covariance_healthy(filter.as_ref());
    }

    let state = filter.get_vehicle_state();
    assert!((state.x - truth.x).abs() < 1.0, "x {} vs {}", state.x, truth.x);
    assert!((state.y - truth.y).abs() < 1.0, "y {} vs {}", state.y, truth.y);
    assert!(wrap_angle(state.psi - truth.psi).abs() < 0.05, "psi {} vs {}", state.psi, truth.psi);
    assert!((state.v - truth.v).abs() < 0.5, "v {} vs {}", state.v, truth.v);

    let counters = filter.counters();
    assert_eq!(counters.predict_count, 400);
    assert_eq!(counters.gps_updates, 41);
    assert_eq!(counters.lidar_updates, 200 * 4);
    assert_eq!(counters.lidar_skipped, 200);
}

fn map_beacons(truth: &Truth, t: f64) -> Vec<LidarMeasurement> {
    beacons().iter().map(|b| truth.lidar(b, t)).collect()
}

#[test]
fn test_extended_heading_survives_wrap_seam() {
    // Drive west along y = 0 so heading sits on the ±π seam the whole time
    let mut filter = build_filter(&FilterConfig::extended()).unwrap();
    let map = BeaconMap::new(beacons());
    let mut truth = Truth {
        x: 20.0,
        y: 0.0,
        psi: std::f64::consts::PI,
        v: 2.0,
        psi_dot: 0.0,
    };
    filter.initialize(
        nalgebra::Vector4::new(truth.x, truth.y, -std::f64::consts::PI + 0.01, truth.v),
        nalgebra::Matrix4::from_diagonal(&nalgebra::Vector4::new(1.0, 1.0, 0.01, 0.25)),
    );

    for step in 1..=100 {
        let t = step as f64 * DT;
        filter.predict(DT, Some(&GyroMeasurement { timestamp: t, psi_dot: 0.0 }));
        truth.step();
        filter.update_range_bearing_batch(&map_beacons(&truth, t), &map);

        let state = filter.get_vehicle_state();
        assert!(
            wrap_angle(state.psi - truth.psi).abs() < 0.1,
            "heading diverged at step {}: {}",
            step,
            state.psi
        );
    }

    let state = filter.get_vehicle_state();
    assert!((state.x - truth.x).abs() < 0.5);
    assert!(state.y.abs() < 0.5);
}

#[test]
fn test_variants_share_interface() {
    let map = BeaconMap::new(beacons());
    let fix = GpsMeasurement {
        timestamp: 0.0,
        x: 1.0,
        y: 1.0,
    };
    let lidar = LidarMeasurement {
        timestamp: 0.0,
        range: 59.0,
        theta: 0.0,
        id: 0,
    };

    for config in [FilterConfig::linear(), FilterConfig::extended()] {
        let mut filter = build_filter(&config).unwrap();
        filter.update_position(&fix);
        filter.predict(0.5, Some(&GyroMeasurement { timestamp: 0.5, psi_dot: 0.0 }));
        filter.update_range_bearing(&lidar, &map);

        let state = filter.get_vehicle_state();
        assert_relative_eq!(state.x, 1.0, epsilon = 1.0);
        assert!(state.psi > -std::f64::consts::PI && state.psi <= std::f64::consts::PI);
        assert!(state.v >= 0.0);
        assert_eq!(filter.counters().predict_count, 1);
    }
}
