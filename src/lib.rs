//! Solute transport between blood and dialysate during peritoneal dialysis
//!
//! Two stepped regimens (cyclic and continuous exchange) share one diffusion
//! law; a separate ODE pathway models a periodic dialysate volume. Every run
//! produces a [`SimulationResult`].

pub mod error;
pub mod patient;
pub mod results;
pub mod scenario;
pub mod simulator;

pub use error::DialysisError;
pub use patient::{ContinuousRegimen, CyclicRegimen, DerivedParameters, Patient, PhaseDurations};
pub use results::{SimulationResult, TimeSeries};
pub use scenario::Scenario;
pub use simulator::ode::{ExchangeParameters, PeriodicExchange, VolumeProfile};
pub use simulator::sweep::sweep;
pub use simulator::{simulate, Phase, Regimen, Simulation, SimulationState, SteppedSimulation};

/// Trait for typed parameter structs carried in a flat parameter vector.
///
/// The ODE pathway passes its model parameters to the solver as a plain
/// vector; implementors define the field order.
pub trait Params: Sized {
    /// Returns the names of all parameter fields
    fn field_names() -> &'static [&'static str];

    /// Returns the number of parameters
    fn num_params() -> usize;

    /// Create from a slice of values (in field order)
    fn from_slice(values: &[f64]) -> Self;

    /// Convert to a vector of values (in field order)
    fn to_vec(&self) -> Vec<f64>;
}

pub mod prelude {
    pub use crate::error::DialysisError;
    pub use crate::patient::{ContinuousRegimen, CyclicRegimen, Patient};
    pub use crate::results::{SimulationResult, TimeSeries};
    pub use crate::scenario::Scenario;
    pub use crate::simulator::ode::{ExchangeParameters, PeriodicExchange, VolumeProfile};
    pub use crate::simulator::sweep::{cycle_count_scenarios, sweep};
    pub use crate::simulator::{simulate, Regimen, Simulation, SteppedSimulation};
    pub use crate::Params;
}
