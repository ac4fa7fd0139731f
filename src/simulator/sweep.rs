//! Parallel runs over many independent scenarios

use rayon::prelude::*;

use crate::error::DialysisError;
use crate::patient::{CyclicRegimen, Patient};
use crate::results::SimulationResult;
use crate::scenario::Scenario;

/// Run independent scenarios in parallel
///
/// One result per scenario, in input order. A failing scenario does not stop
/// the others.
pub fn sweep(scenarios: &[Scenario]) -> Vec<Result<SimulationResult, DialysisError>> {
    tracing::debug!(scenarios = scenarios.len(), "Starting sweep");
    scenarios.par_iter().map(Scenario::run).collect()
}

/// Cyclic scenarios for one patient over a range of cycle counts
pub fn cycle_count_scenarios(
    patient: &Patient,
    regimen: &CyclicRegimen,
    cycles: impl IntoIterator<Item = usize>,
) -> Vec<Scenario> {
    cycles
        .into_iter()
        .map(|num_cycles| Scenario::Cyclic {
            patient: *patient,
            regimen: regimen.with_cycles(num_cycles),
        })
        .collect()
}
