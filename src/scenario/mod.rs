//! Scenario definitions loaded from JSON
//!
//! A scenario names the model to run and carries its inputs. Missing fields
//! fall back to the reference defaults.
//!
//! ```ignore
//! use pdsim::scenario::Scenario;
//!
//! let scenario = Scenario::from_str(r#"{
//!     "model": "continuous",
//!     "patient": { "weight": 5.0 },
//!     "regimen": { "drain_rate": 20.0, "fill_duration": 5.0, "total_time": 600.0 }
//! }"#)?;
//! let result = scenario.run()?;
//! println!("{}", result.summary());
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::DialysisError;
use crate::patient::{ContinuousRegimen, CyclicRegimen, Patient};
use crate::results::SimulationResult;
use crate::simulator::ode::{ExchangeParameters, PeriodicExchange};
use crate::simulator::{simulate, Regimen, SteppedSimulation};

/// One simulation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum Scenario {
    Cyclic {
        #[serde(default)]
        patient: Patient,
        #[serde(default)]
        regimen: CyclicRegimen,
    },
    Continuous {
        #[serde(default)]
        patient: Patient,
        #[serde(default)]
        regimen: ContinuousRegimen,
    },
    PeriodicExchange {
        #[serde(flatten)]
        parameters: ExchangeParameters,
    },
}

impl Scenario {
    /// Parse a JSON string into a Scenario
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self, DialysisError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON scenario file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DialysisError> {
        let json = fs::read_to_string(path)?;
        Self::from_str(&json)
    }

    /// Parse a JSON array of scenarios
    pub fn many_from_str(json: &str) -> Result<Vec<Self>, DialysisError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, DialysisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn regimen(&self) -> Regimen {
        match self {
            Scenario::Cyclic { .. } => Regimen::Cyclic,
            Scenario::Continuous { .. } => Regimen::Continuous,
            Scenario::PeriodicExchange { .. } => Regimen::PeriodicExchange,
        }
    }

    /// Validate the inputs and run the scenario to completion
    pub fn run(&self) -> Result<SimulationResult, DialysisError> {
        match self {
            Scenario::Cyclic { patient, regimen } => {
                simulate(SteppedSimulation::cyclic(patient, regimen)?)
            }
            Scenario::Continuous { patient, regimen } => {
                simulate(SteppedSimulation::continuous(patient, regimen)?)
            }
            Scenario::PeriodicExchange { parameters } => PeriodicExchange::new(*parameters)?.run(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_scenarios() {
        let scenario = Scenario::from_str(
            r#"{
                "model": "cyclic",
                "patient": { "weight": 6.0 },
                "regimen": { "num_cycles": 2, "dwell_duration": 30.0 }
            }"#,
        )
        .unwrap();

        match &scenario {
            Scenario::Cyclic { patient, regimen } => {
                assert_eq!(patient.weight, 6.0);
                assert_eq!(patient.blood_volume_per_kg, 80.0);
                assert_eq!(regimen.num_cycles, 2);
                assert_eq!(regimen.dwell_duration, 30.0);
                assert_eq!(regimen.fill_duration, 5.0);
            }
            other => panic!("unexpected scenario {:?}", other),
        }
        assert_eq!(scenario.regimen(), Regimen::Cyclic);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let scenario = Scenario::from_str(r#"{ "model": "continuous" }"#).unwrap();
        assert_eq!(
            scenario,
            Scenario::Continuous {
                patient: Patient::default(),
                regimen: ContinuousRegimen::default(),
            }
        );

        let ode = Scenario::from_str(r#"{ "model": "periodic_exchange", "mtac": 15.0 }"#).unwrap();
        match ode {
            Scenario::PeriodicExchange { parameters } => {
                assert_eq!(parameters.mtac, 15.0);
                assert_eq!(parameters.blood_volume, 800.0);
            }
            other => panic!("unexpected scenario {:?}", other),
        }
    }

    #[test]
    fn unknown_model_is_a_parse_error() {
        let result = Scenario::from_str(r#"{ "model": "hemodialysis" }"#);
        assert!(matches!(result, Err(DialysisError::Parse(_))));
    }

    #[test]
    fn serializes_with_the_model_tag() {
        let scenario = Scenario::Cyclic {
            patient: Patient::default(),
            regimen: CyclicRegimen::default().with_cycles(4),
        };
        let json = scenario.to_json().unwrap();
        assert!(json.contains(r#""model": "cyclic""#));
        assert!(json.contains(r#""num_cycles": 4"#));
        assert_eq!(Scenario::from_str(&json).unwrap().regimen(), Regimen::Cyclic);
    }

    #[test]
    fn runs_are_validated() {
        let scenario = Scenario::from_str(
            r#"{ "model": "continuous", "regimen": { "total_time": 8.0 } }"#,
        )
        .unwrap();
        assert!(matches!(
            scenario.run(),
            Err(DialysisError::NegativeDwell { .. })
        ));
    }
}
