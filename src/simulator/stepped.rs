//! Fixed-increment simulation of the cyclic and continuous regimens

use crate::error::DialysisError;
use crate::patient::{ContinuousRegimen, CyclicRegimen, DerivedParameters, Patient};

use super::phase::{Phase, PhaseSlot, SimulationState};
use super::{Regimen, Sample, Simulation};

/// Fixed-increment simulation over a sequence of phases
///
/// Concentrations carry over between phases and between cycles; nothing is
/// reset when a new fill starts.
#[derive(Debug, Clone)]
pub struct SteppedSimulation {
    regimen: Regimen,
    params: DerivedParameters,
    schedule: Vec<PhaseSlot>,
    state: SimulationState,
    slot: usize,
    tick_in_slot: usize,
    elapsed_ticks: usize,
}

impl SteppedSimulation {
    /// Fill, dwell and drain, repeated `regimen.num_cycles` times
    pub fn cyclic(patient: &Patient, regimen: &CyclicRegimen) -> Result<Self, DialysisError> {
        let params = regimen.derive(patient)?;
        let exchange = [
            PhaseSlot::new(Phase::Fill, params.durations.fill, params.dt),
            PhaseSlot::new(Phase::Dwell, params.durations.dwell, params.dt),
            PhaseSlot::new(Phase::Drain, params.durations.drain, params.dt),
        ];
        let schedule = exchange
            .iter()
            .copied()
            .cycle()
            .take(exchange.len() * regimen.num_cycles)
            .collect();
        Ok(Self::new(Regimen::Cyclic, params, schedule))
    }

    /// One fill, a continuous exchange for the back-derived dwell, one drain
    pub fn continuous(
        patient: &Patient,
        regimen: &ContinuousRegimen,
    ) -> Result<Self, DialysisError> {
        let params = regimen.derive(patient)?;
        let schedule = vec![
            PhaseSlot::new(Phase::Fill, params.durations.fill, params.dt),
            PhaseSlot::new(Phase::ContinuousExchange, params.durations.dwell, params.dt),
            PhaseSlot::new(Phase::Drain, params.durations.drain, params.dt),
        ];
        Ok(Self::new(Regimen::Continuous, params, schedule))
    }

    fn new(regimen: Regimen, params: DerivedParameters, schedule: Vec<PhaseSlot>) -> Self {
        Self {
            regimen,
            state: SimulationState::initial(params.initial_blood_concentration),
            params,
            schedule,
            slot: 0,
            tick_in_slot: 0,
            elapsed_ticks: 0,
        }
    }

    pub fn params(&self) -> &DerivedParameters {
        &self.params
    }

    pub fn schedule(&self) -> &[PhaseSlot] {
        &self.schedule
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// The phase the next tick belongs to, `None` once finished
    pub fn current_phase(&self) -> Option<Phase> {
        self.schedule[self.slot..]
            .iter()
            .enumerate()
            .find(|(offset, slot)| {
                let done = if *offset == 0 { self.tick_in_slot } else { 0 };
                done < slot.ticks
            })
            .map(|(_, slot)| slot.phase)
    }

    /// Elapsed simulated time (min)
    pub fn elapsed(&self) -> f64 {
        self.elapsed_ticks as f64 * self.params.dt
    }
}

impl Simulation for SteppedSimulation {
    fn regimen(&self) -> Regimen {
        self.regimen
    }

    fn initial_blood_concentration(&self) -> f64 {
        self.params.initial_blood_concentration
    }

    fn expected_ticks(&self) -> usize {
        self.schedule.iter().map(|slot| slot.ticks).sum()
    }

    fn advance(&mut self) -> Result<Option<Sample>, DialysisError> {
        while let Some(slot) = self.schedule.get(self.slot) {
            if self.tick_in_slot < slot.ticks {
                slot.phase
                    .advance(&mut self.state, &self.params, self.params.dt);
                self.tick_in_slot += 1;
                self.elapsed_ticks += 1;
                return Ok(Some(Sample {
                    time: self.elapsed(),
                    state: self.state,
                }));
            }
            self.slot += 1;
            self.tick_in_slot = 0;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::simulate;

    #[test]
    fn cyclic_schedule_repeats_each_exchange() {
        let regimen = CyclicRegimen::default().with_cycles(3);
        let simulation = SteppedSimulation::cyclic(&Patient::default(), &regimen).unwrap();

        let phases: Vec<Phase> = simulation.schedule().iter().map(|s| s.phase).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Fill,
                Phase::Dwell,
                Phase::Drain,
                Phase::Fill,
                Phase::Dwell,
                Phase::Drain,
                Phase::Fill,
                Phase::Dwell,
                Phase::Drain,
            ]
        );
        assert_eq!(simulation.expected_ticks(), 3 * 600);
    }

    #[test]
    fn continuous_schedule_is_a_single_pass() {
        let simulation =
            SteppedSimulation::continuous(&Patient::default(), &ContinuousRegimen::default())
                .unwrap();

        let slots = simulation.schedule();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0], PhaseSlot { phase: Phase::Fill, ticks: 50 });
        assert_eq!(slots[1].phase, Phase::ContinuousExchange);
        assert_eq!(slots[1].ticks, 5893);
        assert_eq!(slots[2], PhaseSlot { phase: Phase::Drain, ticks: 58 });
    }

    #[test]
    fn current_phase_follows_the_schedule() {
        let regimen = CyclicRegimen::default()
            .with_cycles(1)
            .with_durations(0.2, 0.1, 0.1);
        let mut simulation = SteppedSimulation::cyclic(&Patient::default(), &regimen).unwrap();

        let mut seen = Vec::new();
        while let Some(phase) = simulation.current_phase() {
            seen.push(phase);
            simulation.advance().unwrap();
        }
        assert_eq!(seen, vec![Phase::Fill, Phase::Fill, Phase::Dwell, Phase::Drain]);
        assert!(simulation.advance().unwrap().is_none());
    }

    #[test]
    fn produces_exactly_the_expected_ticks() {
        let regimen = CyclicRegimen::default().with_cycles(2);
        let simulation = SteppedSimulation::cyclic(&Patient::default(), &regimen).unwrap();
        let expected = simulation.expected_ticks();

        let result = simulate(simulation).unwrap();
        assert_eq!(result.series().len(), expected);
        assert_eq!(result.regimen(), Regimen::Cyclic);
    }

    #[test]
    fn state_carries_over_between_cycles() {
        let regimen = CyclicRegimen::default().with_cycles(2);
        let mut simulation = SteppedSimulation::cyclic(&Patient::default(), &regimen).unwrap();

        for _ in 0..600 {
            simulation.advance().unwrap();
        }
        let end_of_first = *simulation.state();
        assert!(end_of_first.dialysate_concentration > 0.0);

        let first_of_second = simulation.advance().unwrap().unwrap();
        assert!(first_of_second.state.dialysate_concentration > 0.0);
        assert!(first_of_second.state.blood_concentration <= end_of_first.blood_concentration);
    }
}
