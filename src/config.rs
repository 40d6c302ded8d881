//! Filter configuration
//!
//! Noise levels, cold-start priors and the initialisation policy. Every
//! value has a per-variant default so a config file only needs to name
//! what it overrides.

use std::f64::consts::FRAC_PI_4;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterVariant {
    /// Constant-velocity state [x, y, vx, vy]
    Linear,
    /// Unicycle state [x, y, psi, v] with range/bearing updates
    Extended,
}

/// Sensor and process noise standard deviations.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Acceleration white noise [m/s²]
    pub accel_std: f64,
    /// Gyro turn-rate noise [rad/s]
    pub gyro_std: f64,
    /// GPS position noise [m]
    pub gps_pos_std: f64,
    /// Lidar range noise [m]
    pub lidar_range_std: f64,
    /// Lidar bearing noise [rad]
    pub lidar_theta_std: f64,
}

impl NoiseConfig {
    pub fn linear() -> Self {
        Self {
            accel_std: 0.1,
            ..Self::extended()
        }
    }

    pub fn extended() -> Self {
        Self {
            accel_std: 1.0,
            gyro_std: 0.01_f64.to_radians(),
            gps_pos_std: 3.0,
            lidar_range_std: 3.0,
            lidar_theta_std: 0.02,
        }
    }
}

/// Prior spread on the components a position fix does not observe.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriorConfig {
    /// Velocity / speed std at bootstrap [m/s]
    pub init_vel_std: f64,
    /// Heading std at bootstrap [rad], extended filter only
    pub init_psi_std: f64,
}

impl PriorConfig {
    pub fn linear() -> Self {
        Self {
            init_vel_std: 15.0,
            ..Self::extended()
        }
    }

    pub fn extended() -> Self {
        Self {
            init_vel_std: 10.0,
            init_psi_std: 45.0_f64.to_radians(),
        }
    }
}

/// Assumed pose used when the filter initialises on its first prediction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitialPose {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub speed: f64,
    /// Position std [m]; zero pins the start position exactly
    pub pos_std: f64,
    /// Heading std [rad], extended filter only
    pub heading_std: f64,
    /// Velocity (linear) or speed (extended) std [m/s]
    pub vel_std: f64,
}

impl Default for InitialPose {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            heading: FRAC_PI_4,
            speed: 5.0,
            pos_std: 0.0,
            heading_std: FRAC_PI_4,
            vel_std: 15.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitPolicy {
    /// Bootstrap from the first GPS fix
    #[default]
    OnFirstPosition,
    /// Seed from an assumed pose on the first predict call
    OnFirstPrediction(InitialPose),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FilterConfig {
    pub variant: FilterVariant,
    pub noise: NoiseConfig,
    pub prior: PriorConfig,
    pub init: InitPolicy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::extended()
    }
}

/// On-disk shape: sections left out take the variant's defaults.
#[derive(Deserialize)]
struct ConfigFile {
    variant: FilterVariant,
    noise: Option<NoiseConfig>,
    prior: Option<PriorConfig>,
    #[serde(default)]
    init: InitPolicy,
}

impl<'de> Deserialize<'de> for FilterConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let file = ConfigFile::deserialize(deserializer)?;
        let defaults = Self::for_variant(file.variant);
        Ok(Self {
            variant: file.variant,
            noise: file.noise.unwrap_or(defaults.noise),
            prior: file.prior.unwrap_or(defaults.prior),
            init: file.init,
        })
    }
}

impl FilterConfig {
    pub fn linear() -> Self {
        Self {
            variant: FilterVariant::Linear,
            noise: NoiseConfig::linear(),
            prior: PriorConfig::linear(),
            init: InitPolicy::OnFirstPosition,
        }
    }

    pub fn extended() -> Self {
        Self {
            variant: FilterVariant::Extended,
            noise: NoiseConfig::extended(),
            prior: PriorConfig::extended(),
            init: InitPolicy::OnFirstPosition,
        }
    }

    pub fn for_variant(variant: FilterVariant) -> Self {
        match variant {
            FilterVariant::Linear => Self::linear(),
            FilterVariant::Extended => Self::extended(),
        }
    }

    pub fn with_init(mut self, init: InitPolicy) -> Self {
        self.init = init;
        self
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open filter config {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse filter config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let n = &self.noise;
        positive("accel_std", n.accel_std)?;
        positive("gyro_std", n.gyro_std)?;
        positive("gps_pos_std", n.gps_pos_std)?;
        positive("lidar_range_std", n.lidar_range_std)?;
        positive("lidar_theta_std", n.lidar_theta_std)?;
        positive("init_vel_std", self.prior.init_vel_std)?;
        positive("init_psi_std", self.prior.init_psi_std)?;

        if let InitPolicy::OnFirstPrediction(pose) = &self.init {
            finite("initial x", pose.x)?;
            finite("initial y", pose.y)?;
            finite("initial heading", pose.heading)?;
            finite("initial speed", pose.speed)?;
            if !pose.pos_std.is_finite() || pose.pos_std < 0.0 {
                return Err(ConfigError::NonPositiveStd {
                    name: "initial pos_std",
                    value: pose.pos_std,
                });
            }
            positive("initial heading_std", pose.heading_std)?;
            positive("initial vel_std", pose.vel_std)?;
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositiveStd { name, value })
    }
}

fn finite(name: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFiniteValue { name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_defaults() {
        let lkf = FilterConfig::linear();
        assert_eq!(lkf.noise.accel_std, 0.1);
        assert_eq!(lkf.prior.init_vel_std, 15.0);

        let ekf = FilterConfig::extended();
        assert_eq!(ekf.noise.accel_std, 1.0);
        assert_eq!(ekf.prior.init_vel_std, 10.0);
        assert!((ekf.noise.gyro_std - 0.01 / 180.0 * std::f64::consts::PI).abs() < 1e-15);
        assert_eq!(ekf.init, InitPolicy::OnFirstPosition);
        assert!(lkf.validate().is_ok());
        assert!(ekf.validate().is_ok());
    }

    #[test]
    fn test_default_initial_pose_validates() {
        let config = FilterConfig::linear().with_init(InitPolicy::OnFirstPrediction(InitialPose::default()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_std() {
        let mut config = FilterConfig::extended();
        config.noise.gps_pos_std = 0.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositiveStd {
                name: "gps_pos_std",
                value: 0.0
            })
        );

        let mut config = FilterConfig::extended();
        config.prior.init_psi_std = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite_pose() {
        let pose = InitialPose {
            speed: f64::INFINITY,
            ..InitialPose::default()
        };
        let config = FilterConfig::extended().with_init(InitPolicy::OnFirstPrediction(pose));
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonFiniteValue {
                name: "initial speed"
            })
        );
    }

    #[test]
    fn test_partial_json_uses_variant_defaults() {
        let config: FilterConfig = serde_json::from_str(r#"{"variant": "linear"}"#).unwrap();
        assert_eq!(config, FilterConfig::linear());

        let json = r#"{
            "variant": "extended",
            "prior": {"init_vel_std": 2.0, "init_psi_std": 0.5},
            "init": {"on_first_prediction": {
                "x": 1.0, "y": 2.0, "heading": 0.0, "speed": 3.0,
                "pos_std": 0.5, "heading_std": 0.1, "vel_std": 1.0
            }}
        }"#;
        let config: FilterConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.noise, NoiseConfig::extended());
        assert_eq!(config.prior.init_vel_std, 2.0);
        match config.init {
            InitPolicy::OnFirstPrediction(pose) => assert_eq!(pose.speed, 3.0),
            InitPolicy::OnFirstPosition => panic!("expected eager init"),
        }
    }
}
