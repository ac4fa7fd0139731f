//! Patient and regimen inputs, and the derivation of absolute simulation parameters
//!
//! Inputs are expressed per kilogram of body weight (volumes, surface area) or per
//! unit of peritoneal surface area (the full-diffusion volume). [`CyclicRegimen::derive`]
//! and [`ContinuousRegimen::derive`] turn them into an immutable [`DerivedParameters`]
//! bundle that the phase drivers consume.
//!
//! All validation happens here, before any simulation work starts.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, ensure_positive, DialysisError};
use crate::simulator::transport::TransportParameters;

/// Per-patient physiological inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Patient {
    /// Body weight (kg)
    pub weight: f64,
    /// Blood volume per kg of body weight (mL/kg)
    pub blood_volume_per_kg: f64,
    /// Peritoneal surface area per kg of body weight (cm²/kg)
    pub surface_area_per_kg: f64,
    /// Dialysate volume needed to wet the whole surface, per cm² of surface area (mL/cm²)
    pub full_diffusion_volume_per_area: f64,
    /// Membrane permeability (mL/min/cm²)
    pub permeability: f64,
    /// Initial blood solute concentration (mg/mL)
    pub initial_blood_concentration: f64,
}

impl Default for Patient {
    /// A 5 kg infant, creatinine-like solute
    fn default() -> Self {
        Self {
            weight: 5.0,
            blood_volume_per_kg: 80.0,
            surface_area_per_kg: 533.0,
            full_diffusion_volume_per_area: 800.0 / 10_000.0,
            permeability: 0.0005,
            initial_blood_concentration: 1.0,
        }
    }
}

impl Patient {
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_blood_volume_per_kg(mut self, ratio: f64) -> Self {
        self.blood_volume_per_kg = ratio;
        self
    }

    pub fn with_surface_area_per_kg(mut self, ratio: f64) -> Self {
        self.surface_area_per_kg = ratio;
        self
    }

    pub fn with_full_diffusion_volume_per_area(mut self, ratio: f64) -> Self {
        self.full_diffusion_volume_per_area = ratio;
        self
    }

    pub fn with_permeability(mut self, permeability: f64) -> Self {
        self.permeability = permeability;
        self
    }

    pub fn with_initial_blood_concentration(mut self, concentration: f64) -> Self {
        self.initial_blood_concentration = concentration;
        self
    }

    /// Peritoneal surface area (cm²)
    pub fn surface_area(&self) -> f64 {
        self.surface_area_per_kg * self.weight
    }

    fn validate(&self) -> Result<(), DialysisError> {
        ensure_positive("weight", self.weight)?;
        ensure_positive("blood_volume_per_kg", self.blood_volume_per_kg)?;
        ensure_positive("surface_area_per_kg", self.surface_area_per_kg)?;
        ensure_positive(
            "full_diffusion_volume_per_area",
            self.full_diffusion_volume_per_area,
        )?;
        ensure_positive("permeability", self.permeability)?;
        ensure_non_negative(
            "initial_blood_concentration",
            self.initial_blood_concentration,
        )?;
        Ok(())
    }

    /// Volumes and diffusion constant shared by both regimens
    fn transport(&self) -> Result<TransportParameters, DialysisError> {
        self.validate()?;
        let surface_area = ensure_positive("surface_area", self.surface_area())?;
        Ok(TransportParameters {
            max_blood_volume: ensure_positive(
                "max_blood_volume",
                self.blood_volume_per_kg * self.weight,
            )?,
            full_diffusion_volume: ensure_positive(
                "full_diffusion_volume",
                self.full_diffusion_volume_per_area * surface_area,
            )?,
            diffusion_rate_constant: ensure_positive(
                "diffusion_rate_constant",
                self.permeability * surface_area,
            )?,
        })
    }
}

/// Durations of the three phases of one exchange (min)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseDurations {
    pub fill: f64,
    pub dwell: f64,
    pub drain: f64,
}

impl PhaseDurations {
    pub fn total(&self) -> f64 {
        self.fill + self.dwell + self.drain
    }
}

/// The immutable parameter bundle handed to the phase drivers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedParameters {
    pub transport: TransportParameters,
    /// Dialysate volume at the end of a fill (mL)
    pub max_dialysate_volume: f64,
    /// Inflow rate during fill (mL/min)
    pub fill_rate: f64,
    /// Outflow rate during drain and continuous exchange (mL/min)
    pub drain_rate: f64,
    pub durations: PhaseDurations,
    /// Time increment of one tick (min)
    pub dt: f64,
    pub initial_blood_concentration: f64,
}

impl DerivedParameters {
    pub fn max_blood_volume(&self) -> f64 {
        self.transport.max_blood_volume
    }

    pub fn full_diffusion_volume(&self) -> f64 {
        self.transport.full_diffusion_volume
    }

    pub fn diffusion_rate_constant(&self) -> f64 {
        self.transport.diffusion_rate_constant
    }

    fn warn_on_overfill(&self) {
        let coverage = self.max_dialysate_volume / self.transport.full_diffusion_volume;
        if coverage > 1.0 {
            tracing::warn!(
                coverage,
                max_dialysate_volume = self.max_dialysate_volume,
                full_diffusion_volume = self.transport.full_diffusion_volume,
                "Dialysate volume exceeds the full-diffusion volume"
            );
        }
    }
}

/// Intermittent exchange: fill, dwell and drain repeated `num_cycles` times
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CyclicRegimen {
    /// Dialysate fill volume per kg of body weight (mL/kg)
    pub dialysate_volume_per_kg: f64,
    pub num_cycles: usize,
    pub fill_duration: f64,
    pub dwell_duration: f64,
    pub drain_duration: f64,
    pub dt: f64,
}

impl Default for CyclicRegimen {
    fn default() -> Self {
        Self {
            dialysate_volume_per_kg: 30.0,
            num_cycles: 10,
            fill_duration: 5.0,
            dwell_duration: 45.0,
            drain_duration: 10.0,
            dt: 0.1,
        }
    }
}

impl CyclicRegimen {
    pub fn with_dialysate_volume_per_kg(mut self, ratio: f64) -> Self {
        self.dialysate_volume_per_kg = ratio;
        self
    }

    pub fn with_cycles(mut self, num_cycles: usize) -> Self {
        self.num_cycles = num_cycles;
        self
    }

    pub fn with_durations(mut self, fill: f64, dwell: f64, drain: f64) -> Self {
        self.fill_duration = fill;
        self.dwell_duration = dwell;
        self.drain_duration = drain;
        self
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Total simulated time (min)
    pub fn total_time(&self) -> f64 {
        (self.fill_duration + self.dwell_duration + self.drain_duration) * self.num_cycles as f64
    }

    /// Derive the absolute parameter bundle for `patient`
    pub fn derive(&self, patient: &Patient) -> Result<DerivedParameters, DialysisError> {
        let transport = patient.transport()?;
        if self.num_cycles == 0 {
            return Err(DialysisError::invalid("num_cycles", 0.0));
        }
        let dt = ensure_positive("dt", self.dt)?;
        let durations = PhaseDurations {
            fill: ensure_positive("fill_duration", self.fill_duration)?,
            dwell: ensure_positive("dwell_duration", self.dwell_duration)?,
            drain: ensure_positive("drain_duration", self.drain_duration)?,
        };
        let max_dialysate_volume = ensure_positive(
            "max_dialysate_volume",
            self.dialysate_volume_per_kg * patient.weight,
        )?;

        let derived = DerivedParameters {
            transport,
            max_dialysate_volume,
            fill_rate: ensure_positive("fill_rate", max_dialysate_volume / durations.fill)?,
            drain_rate: ensure_positive("drain_rate", max_dialysate_volume / durations.drain)?,
            durations,
            dt,
            initial_blood_concentration: patient.initial_blood_concentration,
        };
        derived.warn_on_overfill();
        Ok(derived)
    }
}

/// Continuous-flow exchange: one fill, a long exchange with constant outflow, one drain
///
/// The drain duration and the exchange (dwell) duration are back-derived from
/// the drain rate and the total run time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuousRegimen {
    /// Dialysate fill volume per kg of body weight (mL/kg)
    pub dialysate_volume_per_kg: f64,
    pub fill_duration: f64,
    /// Outflow rate (mL/min)
    pub drain_rate: f64,
    pub total_time: f64,
    pub dt: f64,
}

impl Default for ContinuousRegimen {
    fn default() -> Self {
        Self {
            dialysate_volume_per_kg: 23.0,
            fill_duration: 5.0,
            drain_rate: 20.0,
            total_time: 600.0,
            dt: 0.1,
        }
    }
}

impl ContinuousRegimen {
    pub fn with_dialysate_volume_per_kg(mut self, ratio: f64) -> Self {
        self.dialysate_volume_per_kg = ratio;
        self
    }

    pub fn with_fill_duration(mut self, fill: f64) -> Self {
        self.fill_duration = fill;
        self
    }

    pub fn with_drain_rate(mut self, drain_rate: f64) -> Self {
        self.drain_rate = drain_rate;
        self
    }

    pub fn with_total_time(mut self, total_time: f64) -> Self {
        self.total_time = total_time;
        self
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Derive the absolute parameter bundle for `patient`
    ///
    /// Fails with [`DialysisError::NegativeDwell`] when fill and drain together
    /// take longer than `total_time`.
    pub fn derive(&self, patient: &Patient) -> Result<DerivedParameters, DialysisError> {
        let transport = patient.transport()?;
        let dt = ensure_positive("dt", self.dt)?;
        let fill = ensure_positive("fill_duration", self.fill_duration)?;
        let drain_rate = ensure_positive("drain_rate", self.drain_rate)?;
        let total_time = ensure_positive("total_time", self.total_time)?;
        let max_dialysate_volume = ensure_positive(
            "max_dialysate_volume",
            self.dialysate_volume_per_kg * patient.weight,
        )?;

        let drain = ensure_positive("drain_duration", max_dialysate_volume / drain_rate)?;
        let dwell = total_time - fill - drain;
        if !dwell.is_finite() || dwell < 0.0 {
            return Err(DialysisError::NegativeDwell {
                dwell,
                total_time,
                fill,
                drain,
            });
        }

        let outflow = drain_rate * dt;
        if outflow >= max_dialysate_volume {
            return Err(DialysisError::OutflowExceedsVolume {
                outflow,
                volume: max_dialysate_volume,
            });
        }

        let derived = DerivedParameters {
            transport,
            max_dialysate_volume,
            fill_rate: ensure_positive("fill_rate", max_dialysate_volume / fill)?,
            drain_rate,
            durations: PhaseDurations { fill, dwell, drain },
            dt,
            initial_blood_concentration: patient.initial_blood_concentration,
        };
        derived.warn_on_overfill();
        Ok(derived)
    }
}
