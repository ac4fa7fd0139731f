//! Periodic piecewise-linear dialysate volume

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, ensure_positive, DialysisError};

/// Tolerance (min) used to snap times onto profile breakpoints
pub const BREAKPOINT_TOLERANCE: f64 = 1e-9;

/// Piecewise-linear dialysate volume, repeated every period
///
/// Within one period the volume rises linearly from zero to the plateau during
/// the fill, stays flat during the dwell and falls linearly back to zero during
/// the drain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeProfile {
    /// min
    pub fill_duration: f64,
    /// min
    pub dwell_duration: f64,
    /// min
    pub drain_duration: f64,
    /// mL
    pub plateau_volume: f64,
}

impl Default for VolumeProfile {
    fn default() -> Self {
        Self {
            fill_duration: 10.0,
            dwell_duration: 30.0,
            drain_duration: 20.0,
            plateau_volume: 300.0,
        }
    }
}

/// Segment of a period a point in time falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Fill,
    Dwell,
    Drain,
}

impl VolumeProfile {
    pub fn with_durations(mut self, fill: f64, dwell: f64, drain: f64) -> Self {
        self.fill_duration = fill;
        self.dwell_duration = dwell;
        self.drain_duration = drain;
        self
    }

    pub fn with_plateau_volume(mut self, volume: f64) -> Self {
        self.plateau_volume = volume;
        self
    }

    pub fn validate(&self) -> Result<(), DialysisError> {
        ensure_positive("fill_duration", self.fill_duration)?;
        ensure_non_negative("dwell_duration", self.dwell_duration)?;
        ensure_positive("drain_duration", self.drain_duration)?;
        ensure_positive("plateau_volume", self.plateau_volume)?;
        Ok(())
    }

    pub fn period(&self) -> f64 {
        self.fill_duration + self.dwell_duration + self.drain_duration
    }

    /// Time since the start of the current period
    ///
    /// Times within [`BREAKPOINT_TOLERANCE`] of a period boundary map to zero.
    pub fn offset(&self, t: f64) -> f64 {
        let period = self.period();
        let offset = t.rem_euclid(period);
        if period - offset <= BREAKPOINT_TOLERANCE {
            0.0
        } else {
            offset
        }
    }

    /// Segment active just after `t`
    pub fn segment(&self, t: f64) -> Segment {
        let offset = self.offset(t) + BREAKPOINT_TOLERANCE;
        if offset < self.fill_duration {
            Segment::Fill
        } else if offset < self.fill_duration + self.dwell_duration {
            Segment::Dwell
        } else {
            Segment::Drain
        }
    }

    /// Dialysate volume V2(t) (mL)
    pub fn volume(&self, t: f64) -> f64 {
        let offset = self.offset(t);
        match self.segment(t) {
            Segment::Fill => self.plateau_volume * offset / self.fill_duration,
            Segment::Dwell => self.plateau_volume,
            Segment::Drain => {
                let drained = offset - self.fill_duration - self.dwell_duration;
                (self.plateau_volume * (1.0 - drained / self.drain_duration)).max(0.0)
            }
        }
    }

    /// Volume rate dV2/dt (mL/min), right-continuous at breakpoints
    pub fn rate(&self, t: f64) -> f64 {
        match self.segment(t) {
            Segment::Fill => self.plateau_volume / self.fill_duration,
            Segment::Dwell => 0.0,
            Segment::Drain => -self.plateau_volume / self.drain_duration,
        }
    }

    /// First breakpoint (fill end, dwell end or period end) strictly after `t`
    pub fn next_breakpoint(&self, t: f64) -> f64 {
        let start = t - self.offset(t);
        [
            self.fill_duration,
            self.fill_duration + self.dwell_duration,
            self.period(),
        ]
        .into_iter()
        .map(|boundary| start + boundary)
        .find(|&boundary| boundary > t + BREAKPOINT_TOLERANCE)
        .unwrap_or(start + self.period())
    }

    /// Whether `t` is the start of a period after the first
    pub fn is_period_start(&self, t: f64, tolerance: f64) -> bool {
        if t <= tolerance {
            return false;
        }
        let offset = t.rem_euclid(self.period());
        offset <= tolerance || self.period() - offset <= tolerance
    }
}
