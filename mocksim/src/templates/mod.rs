//! Spectral template synthesis
//!
//! The pipeline asks a [`TemplateEngine`] for one spectrum per object on the
//! shared output wavelength grid. Every object carries its own random seed,
//! so the same request always produces the same spectra regardless of batch
//! composition or ordering.

pub mod analytic;

pub use analytic::AnalyticTemplates;

use ndarray::Array1;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generator::ObjectClass;
use crate::photometry::{BandFluxes, PhotometricBand, TrapezoidError};
use crate::table::{Table, TableError};

/// Units of the output flux arrays, erg s⁻¹ cm⁻² Å⁻¹
pub const FLUX_UNIT: f64 = 1e-17;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template request field {field} has {got} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("No spectral templates for class {0}")]
    UnsupportedClass(ObjectClass),

    #[error("Invalid wavelength grid: {0}")]
    InvalidWave(String),

    #[error("Template {index} has no flux in the normalisation band")]
    NonPositiveNormalisation { index: usize },

    #[error("Photometry error: {0}")]
    Photometry(#[from] TrapezoidError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

/// Output wavelength grid in Ångström, `wavemin` inclusive, `wavemax` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveConfig {
    pub wavemin: f64,
    pub wavemax: f64,
    pub dw: f64,
}

impl Default for WaveConfig {
    /// Spectrograph b-arm minimum minus 10 Å to z-arm maximum plus 10 Å
    fn default() -> Self {
        Self {
            wavemin: 3590.0,
            wavemax: 9834.0,
            dw: 0.2,
        }
    }
}

/// Evenly spaced grid from `wavemin` (rounded to 0.1 Å) up to but not
/// including `wavemax`.
pub fn default_wave(config: &WaveConfig) -> Result<Array1<f64>, TemplateError> {
    let WaveConfig { wavemin, wavemax, dw } = *config;
    if dw.is_nan() || dw <= 0.0 || !wavemin.is_finite() || !wavemax.is_finite() {
        return Err(TemplateError::InvalidWave(format!(
            "wavemin {wavemin}, wavemax {wavemax}, dw {dw}"
        )));
    }
    let start = (wavemin * 10.0).round() / 10.0;
    if wavemax <= start {
        return Err(TemplateError::InvalidWave(format!(
            "wavemax {wavemax} must exceed wavemin {start}"
        )));
    }
    let n = ((wavemax - start) / dw).ceil() as usize;
    Ok(Array1::from_shape_fn(n, |i| start + i as f64 * dw))
}

/// Per-object inputs to template synthesis
#[derive(Debug, Clone)]
pub struct TemplateRequest {
    pub class: ObjectClass,
    pub redshift: Vec<f64>,
    /// AB magnitude in `normfilter`
    pub mag: Vec<f64>,
    pub seed: Vec<u32>,
    /// Velocity dispersion in km/s; class default when absent
    pub vdisp: Option<Vec<f64>>,
    pub normfilter: PhotometricBand,
}

impl TemplateRequest {
    pub fn len(&self) -> usize {
        self.redshift.len()
    }

    pub fn is_empty(&self) -> bool {
        self.redshift.is_empty()
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        let n = self.len();
        let check = |field: &'static str, got: usize| {
            if got == n {
                Ok(())
            } else {
                Err(TemplateError::LengthMismatch {
                    field,
                    expected: n,
                    got,
                })
            }
        };
        check("mag", self.mag.len())?;
        check("seed", self.seed.len())?;
        if let Some(vdisp) = &self.vdisp {
            check("vdisp", vdisp.len())?;
        }
        Ok(())
    }
}

/// Synthesized spectra with their band photometry and template parameters
#[derive(Debug, Clone)]
pub struct TemplateOutput {
    /// (object, wavelength) in units of [`FLUX_UNIT`]
    pub flux: Array2<f32>,
    /// Intrinsic (unreddened) band fluxes in nanomaggies
    pub fluxes: Vec<BandFluxes>,
    /// Class-specific template parameters, one row per object
    pub objtruth: Table,
}

pub trait TemplateEngine: Send + Sync {
    fn make_templates(
        &self,
        request: &TemplateRequest,
        wave: &Array1<f64>,
    ) -> Result<TemplateOutput, TemplateError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_wave() {
        let wave = default_wave(&WaveConfig::default()).unwrap();
        assert_relative_eq!(wave[0], 3590.0);
        assert_relative_eq!(wave[1] - wave[0], 0.2, epsilon = 1e-9);
        assert!(*wave.last().unwrap() < 9834.0);
        assert!(*wave.last().unwrap() > 9833.0);
    }

    #[test]
    fn test_wave_rounds_start() {
        let wave = default_wave(&WaveConfig {
            wavemin: 3600.04,
            wavemax: 3601.0,
            dw: 0.5,
        })
        .unwrap();
        assert_eq!(wave.len(), 2);
        assert_relative_eq!(wave[0], 3600.0);
        assert_relative_eq!(wave[1], 3600.5);
    }

    #[test]
    fn test_invalid_wave() {
        let bad = WaveConfig {
            wavemin: 5000.0,
            wavemax: 4000.0,
            dw: 1.0,
        };
        assert!(matches!(default_wave(&bad), Err(TemplateError::InvalidWave(_))));
        let zero_step = WaveConfig {
            dw: 0.0,
            ..WaveConfig::default()
        };
        assert!(default_wave(&zero_step).is_err());
    }

    #[test]
    fn test_request_validation() {
        let request = TemplateRequest {
            class: ObjectClass::Qso,
            redshift: vec![1.0, 2.0],
            mag: vec![22.0, 22.0],
            seed: vec![1],
            vdisp: None,
            normfilter: PhotometricBand::G,
        };
        assert!(matches!(
            request.validate(),
            Err(TemplateError::LengthMismatch { field: "seed", expected: 2, got: 1 })
        ));
    }
}
