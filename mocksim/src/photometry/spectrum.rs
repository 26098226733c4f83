//! Band definitions and synthetic AB photometry of spectral energy distributions
//!
//! Spectra in this crate are flux densities per unit wavelength, f_λ, in
//! erg s⁻¹ cm⁻² Å⁻¹ sampled on a wavelength grid in Ångström. Band fluxes are
//! reported in nanomaggies, the linear AB unit of the imaging surveys
//! (1 nanomaggy is AB magnitude 22.5).

use super::trapezoid::{linspace, trap_integrate, TrapezoidError};

/// Constants in CGS units
pub struct CGS {}

impl CGS {
    /// AB magnitude system zero-point flux density
    /// Units: 3631e-23 erg s⁻¹ cm⁻² Hz⁻¹
    pub const AB_ZERO_POINT_FLUX_DENSITY: f64 = 3631e-23;

    /// Speed of light in vacuum
    /// Units: 2.99792458e10 cm/s
    pub const SPEED_OF_LIGHT: f64 = 2.99792458e10;

    /// Speed of light in Ångström per second
    pub const SPEED_OF_LIGHT_ANGSTROM: f64 = 2.99792458e18;

    /// Speed of light in km/s, for velocity broadening
    pub const SPEED_OF_LIGHT_KMS: f64 = 2.99792458e5;
}

/// Top-hat wavelength band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Lower wavelength bound in nanometers
    pub lower_nm: f64,

    /// Upper wavelength bound in nanometers
    pub upper_nm: f64,
}

impl Band {
    /// Create a new Band directly from lower and upper bounds
    ///
    /// # Arguments
    ///
    /// * `lower_nm` - Lower wavelength bound in nanometers
    /// * `upper_nm` - Upper wavelength bound in nanometers
    pub fn from_nm_bounds(lower_nm: f64, upper_nm: f64) -> Self {
        // These are programming errors, so we don't return Result
        if !lower_nm.is_finite() || !upper_nm.is_finite() {
            panic!("Wavelength range cannot contain non-finite values");
        }
        if lower_nm >= upper_nm {
            panic!(
                "Invalid wavelength range: start must be less than end, got {}..{}",
                lower_nm, upper_nm,
            );
        }
        if lower_nm < 0.0 {
            panic!("Wavelengths must be non-negative");
        }

        Self { lower_nm, upper_nm }
    }

    pub fn width(&self) -> f64 {
        self.upper_nm - self.lower_nm
    }

    pub fn center(&self) -> f64 {
        (self.lower_nm + self.upper_nm) / 2.0
    }

    /// Band edges in Ångström
    pub fn angstrom_bounds(&self) -> (f64, f64) {
        (self.lower_nm * 10.0, self.upper_nm * 10.0)
    }

    /// Whether the whole band lies inside a wavelength grid given in Ångström
    pub fn covered_by(&self, wave_min: f64, wave_max: f64) -> bool {
        let (lo, hi) = self.angstrom_bounds();
        lo >= wave_min && hi <= wave_max
    }
}

/// Number of integration corners per band
const BAND_SAMPLES: usize = 65;

/// AB flux in nanomaggies of an SED seen through a top-hat band.
///
/// The band-averaged f_ν of a photon-counting top-hat filter is
///
/// ```text
/// <f_ν> = ∫ f_λ λ dλ / (c ∫ dλ / λ)
/// ```
///
/// # Arguments
///
/// * `sed` - f_λ in erg s⁻¹ cm⁻² Å⁻¹ as a function of wavelength in Å
/// * `band` - The band to integrate over
pub fn sed_band_flux<F>(sed: F, band: &Band) -> Result<f64, TrapezoidError>
where
    F: Fn(f64) -> f64,
{
    let (lo, hi) = band.angstrom_bounds();
    let corners = linspace(lo, hi, BAND_SAMPLES);
    let numerator = trap_integrate(&corners, |w| sed(w) * w)?;
    let denominator = CGS::SPEED_OF_LIGHT_ANGSTROM * (hi / lo).ln();
    let fnu = numerator / denominator;
    Ok(fnu / CGS::AB_ZERO_POINT_FLUX_DENSITY * 1e9)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_band_geometry() {
        let band = Band::from_nm_bounds(400.0, 550.0);
        assert_relative_eq!(band.width(), 150.0);
        assert_relative_eq!(band.center(), 475.0);
        assert_eq!(band.angstrom_bounds(), (4000.0, 5500.0));
        assert!(band.covered_by(3600.0, 9800.0));
        assert!(!band.covered_by(4100.0, 9800.0));
    }

    #[test]
    #[should_panic]
    fn test_inverted_band_panics() {
        Band::from_nm_bounds(700.0, 400.0);
    }

    #[test]
    fn test_flat_fnu_source_is_exact() {
        // f_ν = 3631 Jy at every frequency is AB magnitude 0 = 10^9 nanomaggies;
        // the matching f_λ is f_ν c / λ²
        let fnu = CGS::AB_ZERO_POINT_FLUX_DENSITY;
        let sed = |w: f64| fnu * CGS::SPEED_OF_LIGHT_ANGSTROM / (w * w);
        let band = Band::from_nm_bounds(560.0, 710.0);
        let flux = sed_band_flux(sed, &band).unwrap();
        assert_relative_eq!(flux, 1e9, max_relative = 1e-4);
    }

    #[test]
    fn test_flux_is_linear_in_sed() {
        let band = Band::from_nm_bounds(850.0, 1000.0);
        let one = sed_band_flux(|w| 1e-17 * (w / 5000.0), &band).unwrap();
        let two = sed_band_flux(|w| 2e-17 * (w / 5000.0), &band).unwrap();
        assert_relative_eq!(two, 2.0 * one, max_relative = 1e-12);
    }
}
