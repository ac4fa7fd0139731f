//! Phases of an exchange and their per-tick volume and concentration updates

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::patient::DerivedParameters;
use crate::simulator::transport::{dilute, transport_step, Concentrations};

/// Smallest dialysate volume left in the cavity while draining (mL)
///
/// Keeps the diffusion step well defined at the end of a drain.
pub const DRAIN_VOLUME_FLOOR: f64 = 0.01;

/// Relative tolerance used when deciding whether a duration is a whole number of ticks
const TICK_TOLERANCE: f64 = 1e-9;

/// Blood and dialysate state at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationState {
    pub blood_concentration: f64,
    /// Only meaningful while `dialysate_volume > 0`
    pub dialysate_concentration: f64,
    pub dialysate_volume: f64,
}

impl SimulationState {
    /// An empty cavity and solute-free dialysate
    pub fn initial(blood_concentration: f64) -> Self {
        Self {
            blood_concentration,
            dialysate_concentration: 0.0,
            dialysate_volume: 0.0,
        }
    }

    pub fn concentrations(&self) -> Concentrations {
        Concentrations::new(self.blood_concentration, self.dialysate_concentration)
    }

    fn set_concentrations(&mut self, concentrations: Concentrations) {
        self.blood_concentration = concentrations.blood;
        self.dialysate_concentration = concentrations.dialysate;
    }

    /// Solute mass in the dialysate (mg)
    pub fn dialysate_mass(&self) -> f64 {
        self.dialysate_concentration * self.dialysate_volume
    }
}

/// A phase of an exchange, each with its own volume law
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Linear inflow of fresh dialysate up to the fill volume
    ///
    /// Transport runs on the post-inflow volume, then the dialysate concentration
    /// is rescaled by `old_volume / new_volume`.
    Fill,
    /// Constant volume
    Dwell,
    /// Constant volume with simultaneous outflow and fresh inflow at the drain rate
    ContinuousExchange,
    /// Linear outflow down to [`DRAIN_VOLUME_FLOOR`]
    Drain,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Fill => "fill",
            Phase::Dwell => "dwell",
            Phase::ContinuousExchange => "continuous exchange",
            Phase::Drain => "drain",
        };
        write!(f, "{}", name)
    }
}

impl Phase {
    /// Advance `state` by one tick of length `dt`
    pub fn advance(&self, state: &mut SimulationState, params: &DerivedParameters, dt: f64) {
        match self {
            Phase::Fill => {
                let old_volume = state.dialysate_volume;
                let new_volume =
                    (old_volume + params.fill_rate * dt).min(params.max_dialysate_volume);
                let mut next =
                    transport_step(&params.transport, state.concentrations(), new_volume, dt);
                next.dialysate = dilute(next.dialysate, old_volume, new_volume);
                state.dialysate_volume = new_volume;
                state.set_concentrations(next);
            }
            Phase::Dwell => {
                let next = transport_step(
                    &params.transport,
                    state.concentrations(),
                    state.dialysate_volume,
                    dt,
                );
                state.set_concentrations(next);
            }
            Phase::ContinuousExchange => {
                let volume = state.dialysate_volume;
                let mut next =
                    transport_step(&params.transport, state.concentrations(), volume, dt);
                if volume > 0.0 {
                    next.dialysate *= (volume - params.drain_rate * dt) / volume;
                }
                state.set_concentrations(next);
            }
            Phase::Drain => {
                let volume =
                    (state.dialysate_volume - params.drain_rate * dt).max(DRAIN_VOLUME_FLOOR);
                state.dialysate_volume = volume;
                let next = transport_step(&params.transport, state.concentrations(), volume, dt);
                state.set_concentrations(next);
            }
        }
    }
}

/// Number of ticks needed to cover `duration`
///
/// A trailing partial tick is run as a full tick; durations within rounding
/// noise of a whole number of ticks are not rounded up.
pub fn tick_count(duration: f64, dt: f64) -> usize {
    if duration <= 0.0 || dt <= 0.0 {
        return 0;
    }
    let ratio = duration / dt;
    let nearest = ratio.round();
    if (ratio - nearest).abs() <= TICK_TOLERANCE * nearest.max(1.0) {
        nearest as usize
    } else {
        ratio.ceil() as usize
    }
}

/// One phase and the number of ticks it lasts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseSlot {
    pub phase: Phase,
    pub ticks: usize,
}

impl PhaseSlot {
    pub fn new(phase: Phase, duration: f64, dt: f64) -> Self {
        Self {
            phase,
            ticks: tick_count(duration, dt),
        }
    }
}
