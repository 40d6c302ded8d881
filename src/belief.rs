//! Gaussian belief over the 4D vehicle state.
//!
//! One `Belief` is owned by exactly one filter instance; independent
//! vehicle tracks get independent beliefs.

use crate::types::{PositionCov, StateMat, StateVec};

#[derive(Clone, Debug, PartialEq)]
pub struct Belief {
    /// State mean [4D]
    mean: StateVec,

    /// Covariance matrix [4x4]
    covariance: StateMat,

    initialized: bool,
}

impl Default for Belief {
    fn default() -> Self {
        Self::new()
    }
}

impl Belief {
    /// Uninitialised belief with zeroed mean and covariance
    pub fn new() -> Self {
        Self {
            mean: StateVec::zeros(),
            covariance: StateMat::zeros(),
            initialized: false,
        }
    }

    /// Seed the belief. Covariance is symmetrized on entry.
    pub fn initialize(&mut self, mean: StateVec, covariance: StateMat) {
        self.mean = mean;
        self.covariance = symmetrize(&covariance);
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn mean(&self) -> &StateVec {
        &self.mean
    }

    pub fn covariance(&self) -> &StateMat {
        &self.covariance
    }

    /// Replace mean and covariance after a prediction or correction.
    pub fn set(&mut self, mean: StateVec, covariance: StateMat) {
        self.mean = mean;
        self.covariance = symmetrize(&covariance);
    }

    /// Leading 2×2 block; zero when uninitialised.
    pub fn position_covariance(&self) -> PositionCov {
        if !self.initialized {
            return PositionCov::zeros();
        }
        self.covariance.fixed_view::<2, 2>(0, 0).into_owned()
    }

    pub fn covariance_trace(&self) -> f64 {
        self.covariance.trace()
    }
}

/// (P + Pᵀ) / 2
pub fn symmetrize(p: &StateMat) -> StateMat {
    (p + p.transpose()) * 0.5
}
