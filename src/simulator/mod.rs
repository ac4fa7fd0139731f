//! Two-compartment solute transport during peritoneal dialysis
//!
//! Every regimen is a [`Simulation`]: something that can be advanced one tick
//! at a time until it runs out of ticks. [`simulate`] drives any of them and
//! collects the produced samples into a [`SimulationResult`].
//!
//! Three implementations are provided:
//! - [`SteppedSimulation::cyclic`]: fill, dwell and drain repeated `num_cycles` times
//! - [`SteppedSimulation::continuous`]: one fill, a continuous exchange, one drain
//! - [`ode::OdeSimulation`]: the periodic-volume ODE formulation, integrated with BDF

pub mod ode;
pub mod phase;
pub mod stepped;
pub mod sweep;
pub mod transport;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DialysisError;
use crate::results::{SimulationResult, TimeSeries};

pub use phase::{tick_count, Phase, PhaseSlot, SimulationState, DRAIN_VOLUME_FLOOR};
pub use stepped::SteppedSimulation;
pub use transport::{
    dilute, solute_flux, surface_coverage, transport_step, Concentrations, TransportParameters,
};

pub(crate) type T = f64;
pub(crate) type V = nalgebra::DVector<T>;
pub(crate) type M = nalgebra::DMatrix<T>;

/// The regimen a result was produced by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regimen {
    Cyclic,
    Continuous,
    PeriodicExchange,
}

impl fmt::Display for Regimen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Regimen::Cyclic => "Cycle",
            Regimen::Continuous => "Cont.",
            Regimen::PeriodicExchange => "ODE",
        };
        f.pad(tag)
    }
}

/// State of the system at the end of a tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Elapsed simulated time (min)
    pub time: f64,
    pub state: SimulationState,
}

/// A simulation strategy that can be advanced tick by tick
pub trait Simulation {
    /// The regimen this simulation implements
    fn regimen(&self) -> Regimen;

    /// Blood concentration at time zero
    fn initial_blood_concentration(&self) -> f64;

    /// Number of samples the full run will produce
    fn expected_ticks(&self) -> usize;

    /// Advance one tick
    ///
    /// Returns `Ok(None)` once the run is complete.
    fn advance(&mut self) -> Result<Option<Sample>, DialysisError>;

    /// Advance until completion and collect the result
    fn run(self) -> Result<SimulationResult, DialysisError>
    where
        Self: Sized,
    {
        simulate(self)
    }
}

/// Drive `simulation` to completion
pub fn simulate<S: Simulation>(mut simulation: S) -> Result<SimulationResult, DialysisError> {
    let regimen = simulation.regimen();
    let expected = simulation.expected_ticks();
    tracing::debug!(%regimen, expected, "Starting simulation");

    let mut series = TimeSeries::with_capacity(expected);
    while let Some(sample) = simulation.advance()? {
        series.push(sample);
    }

    let result = SimulationResult::new(regimen, simulation.initial_blood_concentration(), series);
    tracing::debug!(
        %regimen,
        ticks = result.series().len(),
        final_blood_concentration = ?result.final_blood_concentration(),
        "Simulation finished"
    );
    tracing::info!("{}", result.summary());
    Ok(result)
}
