//! Diffusive solute transport between blood and dialysate
//!
//! Flux over one time increment is
//!
//! ```text
//! coverage = Vd / Vd_full
//! flux     = k * coverage * (Cb - Cd) * dt
//! Cb'      = Cb - flux / Vb
//! Cd'      = Cd + flux / Vd
//! ```
//!
//! The blood volume `Vb` is held constant. Coverage is not clamped: a dialysate
//! volume above the full-diffusion volume gives a coverage above 1.

use serde::{Deserialize, Serialize};

/// Parameters of the diffusion law shared by every tick of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportParameters {
    /// Blood volume (mL), held constant
    pub max_blood_volume: f64,
    /// Dialysate volume that wets the whole peritoneal surface (mL)
    pub full_diffusion_volume: f64,
    /// Permeability times surface area (mL/min)
    pub diffusion_rate_constant: f64,
}

/// Blood and dialysate solute concentrations
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Concentrations {
    pub blood: f64,
    pub dialysate: f64,
}

impl Concentrations {
    pub fn new(blood: f64, dialysate: f64) -> Self {
        Self { blood, dialysate }
    }
}

/// Fraction of the full-diffusion volume currently present
#[inline(always)]
pub fn surface_coverage(dialysate_volume: f64, full_diffusion_volume: f64) -> f64 {
    dialysate_volume / full_diffusion_volume
}

/// Solute mass moved from blood to dialysate over `dt`
///
/// Zero when the cavity is empty.
#[inline(always)]
pub fn solute_flux(
    params: &TransportParameters,
    concentrations: Concentrations,
    dialysate_volume: f64,
    dt: f64,
) -> f64 {
    if dialysate_volume > 0.0 {
        let coverage = surface_coverage(dialysate_volume, params.full_diffusion_volume);
        params.diffusion_rate_constant
            * coverage
            * (concentrations.blood - concentrations.dialysate)
            * dt
    } else {
        0.0
    }
}

/// Advance both concentrations by one diffusive step
///
/// With `dialysate_volume <= 0` no diffusion happens and the input is returned
/// unchanged.
#[inline(always)]
pub fn transport_step(
    params: &TransportParameters,
    concentrations: Concentrations,
    dialysate_volume: f64,
    dt: f64,
) -> Concentrations {
    if dialysate_volume <= 0.0 {
        return concentrations;
    }
    let flux = solute_flux(params, concentrations, dialysate_volume, dt);
    Concentrations {
        blood: concentrations.blood - flux / params.max_blood_volume,
        dialysate: concentrations.dialysate + flux / dialysate_volume,
    }
}

/// Concentration after the solute in `old_volume` is spread over `new_volume`
///
/// The incoming fluid carries no solute, so `result * new_volume == concentration * old_volume`.
#[inline(always)]
pub fn dilute(concentration: f64, old_volume: f64, new_volume: f64) -> f64 {
    if new_volume > 0.0 {
        concentration * old_volume / new_volume
    } else {
        concentration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn params() -> TransportParameters {
        TransportParameters {
            max_blood_volume: 400.0,
            full_diffusion_volume: 213.2,
            diffusion_rate_constant: 1.3325,
        }
    }

    #[test]
    fn zero_volume_is_a_no_op() {
        let c = Concentrations::new(1.0, 0.3);
        assert_eq!(transport_step(&params(), c, 0.0, 0.1), c);
        assert_eq!(solute_flux(&params(), c, 0.0, 0.1), 0.0);
    }

    #[test]
    fn flux_follows_the_diffusion_law() {
        let c = Concentrations::new(1.0, 0.2);
        let volume = 100.0;
        let dt = 0.1;

        let expected_flux = 1.3325 * (100.0 / 213.2) * 0.8 * 0.1;
        let next = transport_step(&params(), c, volume, dt);

        assert_relative_eq!(solute_flux(&params(), c, volume, dt), expected_flux);
        assert_relative_eq!(next.blood, 1.0 - expected_flux / 400.0);
        assert_relative_eq!(next.dialysate, 0.2 + expected_flux / volume);
    }

    #[test]
    fn conserves_total_solute() {
        let c = Concentrations::new(0.9, 0.1);
        let volume = 150.0;
        let next = transport_step(&params(), c, volume, 0.1);

        let before = c.blood * 400.0 + c.dialysate * volume;
        let after = next.blood * 400.0 + next.dialysate * volume;
        assert_abs_diff_eq!(before, after, epsilon = 1e-12);
    }

    #[test]
    fn coverage_is_not_clamped() {
        assert_relative_eq!(surface_coverage(300.0, 200.0), 1.5);
    }

    #[test]
    fn equilibrium_has_no_flux() {
        let c = Concentrations::new(0.5, 0.5);
        assert_eq!(transport_step(&params(), c, 150.0, 0.1), c);
    }

    #[test]
    fn step_is_deterministic() {
        let c = Concentrations::new(0.7, 0.2);
        assert_eq!(
            transport_step(&params(), c, 120.0, 0.1),
            transport_step(&params(), c, 120.0, 0.1)
        );
    }

    #[test]
    fn dilution_conserves_mass() {
        let diluted = dilute(0.4, 30.0, 33.0);
        assert_relative_eq!(diluted * 33.0, 0.4 * 30.0, epsilon = 1e-12);
        assert_eq!(dilute(0.4, 0.0, 0.0), 0.4);
    }
}
