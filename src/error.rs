use thiserror::Error;

/// Configuration errors. The estimator itself never fails; only building
/// one from bad parameters does.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a positive finite standard deviation, got {value}")]
    NonPositiveStd { name: &'static str, value: f64 },

    #[error("{name} must be finite")]
    NonFiniteValue { name: &'static str },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
