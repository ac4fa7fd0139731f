//! Error type shared by every part of the crate

use diffsol::error::DiffsolError;
use thiserror::Error;

/// Errors that can occur while configuring or running a dialysis simulation
#[derive(Error, Debug)]
pub enum DialysisError {
    /// An input or derived quantity is non-finite or outside its allowed range
    #[error("Invalid parameter: {param} = {value}")]
    InvalidParameter { param: String, value: f64 },

    /// The continuous regimen leaves a negative exchange period
    #[error(
        "Continuous regimen leaves a negative exchange period: dwell = {dwell} min \
         (total {total_time} min, fill {fill} min, drain {drain} min)"
    )]
    NegativeDwell {
        dwell: f64,
        total_time: f64,
        fill: f64,
        drain: f64,
    },

    /// The outflow of a single continuous-exchange tick would empty the cavity
    #[error("Outflow per step ({outflow} mL) must be smaller than the dialysate volume ({volume} mL)")]
    OutflowExceedsVolume { outflow: f64, volume: f64 },

    /// The step size of the ODE solver collapsed
    #[error("The step size of the ODE solver went to zero at t = {time}, check the volume profile and epsilon")]
    StepSizeTooSmall { time: f64 },

    /// Any other error reported by the ODE solver
    #[error("ODE solver error: {0}")]
    Solver(String),

    /// Failed to parse a scenario definition
    #[error("Failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl DialysisError {
    pub(crate) fn invalid(param: impl Into<String>, value: f64) -> Self {
        DialysisError::InvalidParameter {
            param: param.into(),
            value,
        }
    }
}

impl From<DiffsolError> for DialysisError {
    fn from(error: DiffsolError) -> Self {
        DialysisError::Solver(error.to_string())
    }
}

/// Reject values that are not finite and strictly positive
pub(crate) fn ensure_positive(param: &str, value: f64) -> Result<f64, DialysisError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(DialysisError::invalid(param, value))
    }
}

/// Reject values that are not finite or below zero
pub(crate) fn ensure_non_negative(param: &str, value: f64) -> Result<f64, DialysisError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(DialysisError::invalid(param, value))
    }
}
