//! Photometric bands, AB magnitudes and synthetic photometry

pub mod filters;
pub mod spectrum;
pub mod trapezoid;

pub use filters::{BandFluxes, PhotometricBand};
pub use spectrum::{sed_band_flux, Band, CGS};
pub use trapezoid::{trap_integrate, TrapezoidError};

/// AB magnitude of one nanomaggy
pub const NANOMAGGY_ZERO_POINT: f64 = 22.5;

/// Flux in nanomaggies of an object with AB magnitude `mag`
pub fn mag_to_nanomaggies(mag: f64) -> f64 {
    10f64.powf(-0.4 * (mag - NANOMAGGY_ZERO_POINT))
}

/// AB magnitude of a flux in nanomaggies; non-positive fluxes map to 0.
pub fn flux2mag(flux: f64) -> f64 {
    if flux > 0.0 {
        -2.5 * flux.log10() + NANOMAGGY_ZERO_POINT
    } else {
        0.0
    }
}

/// Galactic transmission `10^(-0.4 R E(B-V))` in one band
pub fn mw_transmission(ebv: f64, band: PhotometricBand) -> f64 {
    10f64.powf(-0.4 * band.extinction_coefficient() * ebv)
}
