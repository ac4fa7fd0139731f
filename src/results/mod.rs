//! Structured output of a simulation run
//!
//! A [`SimulationResult`] holds the three time series produced by a run and the
//! scalars a report needs. Rendering (console, plots) is left to the caller;
//! [`SimulationResult::summary`] and [`SimulationResult::write_csv`] cover the
//! common cases.

use csv::WriterBuilder;
use serde::Serialize;
use std::io::Write;

use crate::error::DialysisError;
use crate::simulator::{Regimen, Sample};

/// Equal-length, append-only series, one entry per tick or output sample
///
/// [`TimeSeries::push`] is the only writer, so all five series always have the
/// same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    blood_concentration: Vec<f64>,
    dialysate_concentration: Vec<f64>,
    dialysate_volume: Vec<f64>,
    concentration_time: Vec<f64>,
    volume_time: Vec<f64>,
}

impl TimeSeries {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            blood_concentration: Vec::with_capacity(capacity),
            dialysate_concentration: Vec::with_capacity(capacity),
            dialysate_volume: Vec::with_capacity(capacity),
            concentration_time: Vec::with_capacity(capacity),
            volume_time: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.blood_concentration.push(sample.state.blood_concentration);
        self.dialysate_concentration
            .push(sample.state.dialysate_concentration);
        self.dialysate_volume.push(sample.state.dialysate_volume);
        self.concentration_time.push(sample.time);
        self.volume_time.push(sample.time);
    }

    pub fn blood_concentration(&self) -> &[f64] {
        &self.blood_concentration
    }

    pub fn dialysate_concentration(&self) -> &[f64] {
        &self.dialysate_concentration
    }

    pub fn dialysate_volume(&self) -> &[f64] {
        &self.dialysate_volume
    }

    /// Time axis of the concentration series (min)
    pub fn concentration_time(&self) -> &[f64] {
        &self.concentration_time
    }

    /// Time axis of the volume series (min)
    pub fn volume_time(&self) -> &[f64] {
        &self.volume_time
    }

    pub fn len(&self) -> usize {
        self.blood_concentration.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blood_concentration.is_empty()
    }

    /// Dialysate to blood concentration ratio at every sample
    ///
    /// Undefined entries (blood concentration of zero) are `NaN`.
    pub fn dp_ratio(&self) -> Vec<f64> {
        self.blood_concentration
            .iter()
            .zip(&self.dialysate_concentration)
            .map(|(&blood, &dialysate)| dp_ratio(dialysate, blood))
            .collect()
    }
}

/// Dialysate to plasma ratio, `NaN` when the plasma concentration is zero
#[inline(always)]
pub fn dp_ratio(dialysate: f64, blood: f64) -> f64 {
    if blood == 0.0 {
        f64::NAN
    } else {
        dialysate / blood
    }
}

/// The outcome of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    regimen: Regimen,
    initial_blood_concentration: f64,
    series: TimeSeries,
}

impl SimulationResult {
    pub fn new(regimen: Regimen, initial_blood_concentration: f64, series: TimeSeries) -> Self {
        Self {
            regimen,
            initial_blood_concentration,
            series,
        }
    }

    pub fn regimen(&self) -> Regimen {
        self.regimen
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    pub fn into_series(self) -> TimeSeries {
        self.series
    }

    pub fn initial_blood_concentration(&self) -> f64 {
        self.initial_blood_concentration
    }

    /// Blood concentration at the last sample, `None` for an empty run
    pub fn final_blood_concentration(&self) -> Option<f64> {
        self.series.blood_concentration().last().copied()
    }

    /// Fraction of the initial blood solute removed by the end of the run
    pub fn fractional_clearance(&self) -> Option<f64> {
        let last = self.final_blood_concentration()?;
        if self.initial_blood_concentration == 0.0 {
            return None;
        }
        Some(1.0 - last / self.initial_blood_concentration)
    }

    pub fn dp_ratio(&self) -> Vec<f64> {
        self.series.dp_ratio()
    }

    /// Console line reporting the final blood concentration, e.g. `Cycle = 0.42`
    pub fn summary(&self) -> String {
        match self.final_blood_concentration() {
            Some(value) => format!("{} = {}", self.regimen, value),
            None => format!("{} = n/a", self.regimen),
        }
    }

    /// Write every sample as a CSV row
    ///
    /// Columns: time, blood and dialysate concentration, dialysate volume and the D/P ratio.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), DialysisError> {
        let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
        writer.write_record(["TIME", "CB", "CD", "VD", "DP"])?;

        let series = &self.series;
        for index in 0..series.len() {
            let blood = series.blood_concentration()[index];
            let dialysate = series.dialysate_concentration()[index];
            writer.write_record(&[
                series.concentration_time()[index].to_string(),
                blood.to_string(),
                dialysate.to_string(),
                series.dialysate_volume()[index].to_string(),
                dp_ratio(dialysate, blood).to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}
