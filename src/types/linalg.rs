//! Linear algebra type system for the pose tracker
//!
//! Provides compile-time dimension checking and clean type aliases
//! for both Kalman filter variants.

use nalgebra::{SMatrix, SVector};

// ===== State Dimensions =====
pub const STATE_DIM: usize = 4;

// ===== Measurement Dimensions =====
pub const MEASURE_DIM_GPS: usize = 2; // (x, y)
pub const MEASURE_DIM_LIDAR: usize = 2; // (range, bearing)

// Both sensors produce 2-vectors, so one set of measurement types serves both.
pub const MEASURE_DIM: usize = MEASURE_DIM_GPS;

// ===== State Types =====
pub type StateVec = SVector<f64, STATE_DIM>;
pub type StateMat = SMatrix<f64, STATE_DIM, STATE_DIM>;

// ===== Measurement Types =====
pub type MeasureVec = SVector<f64, MEASURE_DIM>;
pub type MeasureNoise = SMatrix<f64, MEASURE_DIM, MEASURE_DIM>;

// Jacobian / selection matrix H
pub type MeasureJacobian = SMatrix<f64, MEASURE_DIM, STATE_DIM>; // 2×4

// Kalman gain K
pub type KalmanGain = SMatrix<f64, STATE_DIM, MEASURE_DIM>; // 4×2

// Acceleration noise shaping L (maps 2D accel noise into state space)
pub type NoiseShaping = SMatrix<f64, STATE_DIM, 2>; // 4×2
pub type AccelNoise = SMatrix<f64, 2, 2>;

// Marginal position uncertainty
pub type PositionCov = SMatrix<f64, 2, 2>;
