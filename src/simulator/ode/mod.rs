//! Periodic-exchange ODE formulation
//!
//! A separate pathway from the stepped simulations. The dialysate volume is an
//! explicit function of time ([`VolumeProfile`]) and the two concentrations obey
//!
//! ```text
//! dC1/dt = -(MTAC / V1) (C1 - C2)
//! dC2/dt =  MTAC / (V2(t) + eps) (C1 - C2) - V2'(t) / (V2(t) + eps) C2
//! ```
//!
//! integrated with diffsol's BDF method. The solver is stopped at every profile
//! breakpoint and restarted there, and C2 is set back to zero at the start of
//! every period after the first.

pub mod volume;

use diffsol::{
    error::{DiffsolError, OdeSolverError},
    Bdf, Closure, ConstantClosure, NalgebraLU, NewtonNonlinearSolver, OdeBuilder,
    OdeSolverEquations, OdeSolverMethod, OdeSolverProblem, OdeSolverStopReason, StateRefMut,
    UnitCallable,
};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, ensure_positive, DialysisError};
use crate::results::SimulationResult;
use crate::simulator::{simulate, Regimen, Sample, Simulation, SimulationState, M, T, V};
use crate::Params;

pub use volume::{Segment, VolumeProfile, BREAKPOINT_TOLERANCE};

const RTOL: f64 = 1e-6;
const ATOL: f64 = 1e-8;
/// Initial step size and the largest step taken right after a restart (min)
const RESTART_STEP: f64 = 1e-4;

type RhsFn = fn(&V, &V, T, &mut V);
type JacFn = fn(&V, &V, T, &V, &mut V);
type InitFn = fn(&V, T) -> V;

pub type ExchangeEquations = OdeSolverEquations<
    M,
    Closure<M, RhsFn, JacFn>,
    ConstantClosure<M, InitFn>,
    UnitCallable<M>,
    UnitCallable<M>,
    UnitCallable<M>,
>;
pub type ExchangeProblem = OdeSolverProblem<ExchangeEquations>;
type ExchangeSolver<'a> = Bdf<'a, ExchangeEquations, NewtonNonlinearSolver<M, NalgebraLU<T>>>;

/// Inputs of the periodic-exchange model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeParameters {
    /// Mass transfer area coefficient (mL/min)
    pub mtac: f64,
    /// Blood compartment volume V1 (mL)
    pub blood_volume: f64,
    pub initial_blood_concentration: f64,
    pub initial_dialysate_concentration: f64,
    /// Added to V2 in every denominator
    pub epsilon: f64,
    pub profile: VolumeProfile,
    /// Simulated time span (min)
    pub horizon: f64,
    /// Spacing of the output grid (min)
    pub sample_interval: f64,
    /// Tolerance of the period-start test that triggers a dialysate reset (min)
    pub reset_tolerance: f64,
}

impl Default for ExchangeParameters {
    fn default() -> Self {
        Self {
            mtac: 20.0,
            blood_volume: 800.0,
            initial_blood_concentration: 10.0,
            initial_dialysate_concentration: 0.0,
            epsilon: 1e-6,
            profile: VolumeProfile::default(),
            horizon: 120.0,
            sample_interval: 0.5,
            reset_tolerance: 1e-3,
        }
    }
}

impl ExchangeParameters {
    pub fn with_mtac(mut self, mtac: f64) -> Self {
        self.mtac = mtac;
        self
    }

    pub fn with_blood_volume(mut self, volume: f64) -> Self {
        self.blood_volume = volume;
        self
    }

    pub fn with_initial_concentrations(mut self, blood: f64, dialysate: f64) -> Self {
        self.initial_blood_concentration = blood;
        self.initial_dialysate_concentration = dialysate;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_profile(mut self, profile: VolumeProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_horizon(mut self, horizon: f64) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_sample_interval(mut self, interval: f64) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<(), DialysisError> {
        ensure_positive("mtac", self.mtac)?;
        ensure_positive("blood_volume", self.blood_volume)?;
        ensure_non_negative("initial_blood_concentration", self.initial_blood_concentration)?;
        ensure_non_negative(
            "initial_dialysate_concentration",
            self.initial_dialysate_concentration,
        )?;
        ensure_positive("epsilon", self.epsilon)?;
        ensure_positive("horizon", self.horizon)?;
        ensure_positive("sample_interval", self.sample_interval)?;
        ensure_positive("reset_tolerance", self.reset_tolerance)?;
        self.profile.validate()
    }

    /// Number of output samples, both ends of the horizon included
    pub fn sample_count(&self) -> usize {
        let intervals = self.horizon / self.sample_interval;
        (intervals + BREAKPOINT_TOLERANCE).floor() as usize + 1
    }

    pub fn model_parameters(&self) -> ModelParameters {
        ModelParameters {
            mtac: self.mtac,
            blood_volume: self.blood_volume,
            epsilon: self.epsilon,
            fill_duration: self.profile.fill_duration,
            dwell_duration: self.profile.dwell_duration,
            drain_duration: self.profile.drain_duration,
            plateau_volume: self.profile.plateau_volume,
            initial_blood_concentration: self.initial_blood_concentration,
            initial_dialysate_concentration: self.initial_dialysate_concentration,
        }
    }
}

/// Everything the right-hand side needs, carried in the solver's parameter vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParameters {
    pub mtac: f64,
    pub blood_volume: f64,
    pub epsilon: f64,
    pub fill_duration: f64,
    pub dwell_duration: f64,
    pub drain_duration: f64,
    pub plateau_volume: f64,
    pub initial_blood_concentration: f64,
    pub initial_dialysate_concentration: f64,
}

impl ModelParameters {
    pub fn profile(&self) -> VolumeProfile {
        VolumeProfile {
            fill_duration: self.fill_duration,
            dwell_duration: self.dwell_duration,
            drain_duration: self.drain_duration,
            plateau_volume: self.plateau_volume,
        }
    }
}

impl Params for ModelParameters {
    fn field_names() -> &'static [&'static str] {
        &[
            "mtac",
            "blood_volume",
            "epsilon",
            "fill_duration",
            "dwell_duration",
            "drain_duration",
            "plateau_volume",
            "initial_blood_concentration",
            "initial_dialysate_concentration",
        ]
    }

    fn num_params() -> usize {
        9
    }

    fn from_slice(values: &[f64]) -> Self {
        Self {
            mtac: values[0],
            blood_volume: values[1],
            epsilon: values[2],
            fill_duration: values[3],
            dwell_duration: values[4],
            drain_duration: values[5],
            plateau_volume: values[6],
            initial_blood_concentration: values[7],
            initial_dialysate_concentration: values[8],
        }
    }

    fn to_vec(&self) -> Vec<f64> {
        vec![
            self.mtac,
            self.blood_volume,
            self.epsilon,
            self.fill_duration,
            self.dwell_duration,
            self.drain_duration,
            self.plateau_volume,
            self.initial_blood_concentration,
            self.initial_dialysate_concentration,
        ]
    }
}

fn rhs(y: &V, p: &V, t: T, dy: &mut V) {
    let model = ModelParameters::from_slice(p.as_slice());
    let profile = model.profile();
    let dialysate_volume = profile.volume(t) + model.epsilon;
    let flux = model.mtac * (y[0] - y[1]);

    dy[0] = -flux / model.blood_volume;
    dy[1] = (flux - profile.rate(t) * y[1]) / dialysate_volume;
}

// J = [[-a, a], [b, -b - g]]
fn jacobian(_y: &V, p: &V, t: T, v: &V, jv: &mut V) {
    let model = ModelParameters::from_slice(p.as_slice());
    let profile = model.profile();
    let dialysate_volume = profile.volume(t) + model.epsilon;
    let a = model.mtac / model.blood_volume;
    let b = model.mtac / dialysate_volume;
    let g = profile.rate(t) / dialysate_volume;

    jv[0] = -a * v[0] + a * v[1];
    jv[1] = b * v[0] - (b + g) * v[1];
}

fn initial_state(p: &V, _t: T) -> V {
    let model = ModelParameters::from_slice(p.as_slice());
    V::from_vec(vec![
        model.initial_blood_concentration,
        model.initial_dialysate_concentration,
    ])
}

/// The periodic-exchange model with its assembled ODE problem
pub struct PeriodicExchange {
    params: ExchangeParameters,
    problem: ExchangeProblem,
}

impl PeriodicExchange {
    pub fn new(params: ExchangeParameters) -> Result<Self, DialysisError> {
        params.validate()?;
        let problem = OdeBuilder::<M>::new()
            .rtol(RTOL)
            .atol([ATOL, ATOL])
            .t0(0.0)
            .h0(RESTART_STEP)
            .p(params.model_parameters().to_vec())
            .rhs_implicit(rhs as RhsFn, jacobian as JacFn)
            .init(initial_state as InitFn)
            .build()?;
        Ok(Self { params, problem })
    }

    pub fn params(&self) -> &ExchangeParameters {
        &self.params
    }

    /// A fresh simulation borrowing this model's problem
    pub fn simulation(&self) -> Result<OdeSimulation<'_>, DialysisError> {
        let solver = self.problem.bdf::<NalgebraLU<T>>()?;
        Ok(OdeSimulation {
            solver,
            p: V::from_vec(self.params.model_parameters().to_vec()),
            params: self.params,
            next_sample: 0,
            samples: self.params.sample_count(),
        })
    }

    /// Integrate over the whole horizon
    pub fn run(&self) -> Result<SimulationResult, DialysisError> {
        simulate(self.simulation()?)
    }
}

/// Tick-by-tick driver of the periodic-exchange model
///
/// Every tick advances the solver to the next point of the output grid.
pub struct OdeSimulation<'a> {
    solver: ExchangeSolver<'a>,
    p: V,
    params: ExchangeParameters,
    next_sample: usize,
    samples: usize,
}

impl OdeSimulation<'_> {
    fn integrate_to(&mut self, target: f64) -> Result<(), DialysisError> {
        loop {
            let t = self.solver.state().t;
            if t >= target - BREAKPOINT_TOLERANCE {
                return Ok(());
            }
            let breakpoint = self.params.profile.next_breakpoint(t);
            let stop = breakpoint.min(target);
            self.stop_at(stop)?;
            if (breakpoint - stop).abs() <= BREAKPOINT_TOLERANCE {
                self.restart();
            }
        }
    }

    fn stop_at(&mut self, time: f64) -> Result<(), DialysisError> {
        match self.solver.set_stop_time(time) {
            Ok(_) => loop {
                match self.solver.step() {
                    Ok(OdeSolverStopReason::InternalTimestep) => continue,
                    Ok(OdeSolverStopReason::TstopReached) => return Ok(()),
                    Ok(OdeSolverStopReason::RootFound(t)) => {
                        return Err(DialysisError::Solver(format!(
                            "unexpected root found at t = {}",
                            t
                        )))
                    }
                    Err(DiffsolError::OdeSolverError(OdeSolverError::StepSizeTooSmall {
                        time,
                    })) => return Err(DialysisError::StepSizeTooSmall { time }),
                    Err(err) => return Err(err.into()),
                }
            },
            Err(DiffsolError::OdeSolverError(OdeSolverError::StopTimeAtCurrentTime)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Restart the integrator at a breakpoint, emptying the dialysate at a period start
    fn restart(&mut self) {
        let reset_tolerance = self.params.reset_tolerance;
        let profile = self.params.profile;
        let StateRefMut { y, dy, t, h, .. } = self.solver.state_mut();

        if profile.is_period_start(*t, reset_tolerance) {
            tracing::trace!(t = *t, "Resetting dialysate concentration");
            y[1] = 0.0;
        }
        rhs(y, &self.p, *t, dy);
        *h = h.min(RESTART_STEP);
    }
}

impl Simulation for OdeSimulation<'_> {
    fn regimen(&self) -> Regimen {
        Regimen::PeriodicExchange
    }

    fn initial_blood_concentration(&self) -> f64 {
        self.params.initial_blood_concentration
    }

    fn expected_ticks(&self) -> usize {
        self.samples
    }

    fn advance(&mut self) -> Result<Option<Sample>, DialysisError> {
        if self.next_sample >= self.samples {
            return Ok(None);
        }
        let time = self.next_sample as f64 * self.params.sample_interval;
        self.integrate_to(time)?;
        self.next_sample += 1;

        let y = self.solver.state().y;
        Ok(Some(Sample {
            time,
            state: SimulationState {
                blood_concentration: y[0],
                dialysate_concentration: y[1],
                dialysate_volume: self.params.profile.volume(time),
            },
        }))
    }
}
