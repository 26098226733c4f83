//! Closed-form template spectra
//!
//! Each object class is a continuum shape plus a handful of Gaussian lines,
//! with class-specific parameters drawn from the object's own seed:
//!
//! - QSO: blue power law with velocity-broadened emission lines
//! - LRG: red continuum with a strong 4000 Å break and absorption features
//! - ELG: blue continuum with narrow [OII], Hβ, [OIII] and Hα emission
//! - BGS: intermediate continuum, moderate break, weak emission
//!
//! Spectra are normalised to the requested magnitude in the normalisation
//! band before being sampled on the output grid.

use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;

use super::{TemplateEngine, TemplateError, TemplateOutput, TemplateRequest, FLUX_UNIT};
use crate::generator::ObjectClass;
use crate::photometry::{mag_to_nanomaggies, sed_band_flux, BandFluxes, PhotometricBand, CGS};
use crate::table::Table;

/// Rest wavelengths in Å
mod lines {
    pub const LYA: f64 = 1215.67;
    pub const CIV: f64 = 1549.06;
    pub const CIII: f64 = 1908.73;
    pub const MGII: f64 = 2798.75;
    pub const OII_3726: f64 = 3726.03;
    pub const OII_3729: f64 = 3728.82;
    pub const CA_K: f64 = 3933.66;
    pub const CA_H: f64 = 3968.47;
    pub const G_BAND: f64 = 4304.4;
    pub const HBETA: f64 = 4861.33;
    pub const OIII_4959: f64 = 4958.91;
    pub const OIII_5007: f64 = 5006.84;
    pub const MGB: f64 = 5175.4;
    pub const NAD: f64 = 5892.9;
    pub const HALPHA: f64 = 6562.8;
}

/// Default velocity dispersions (km/s) when the request carries none
const LRG_VDISP: f64 = 199.5;
const GALAXY_VDISP: f64 = 79.4;
/// Broad-line width of quasars (σ, km/s)
const QSO_LINE_SIGMA: f64 = 1700.0;

const BREAK_CENTER: f64 = 4000.0;
const BREAK_WIDTH: f64 = 25.0;

#[derive(Debug, Clone, Copy)]
struct Line {
    center: f64,
    /// Rest equivalent width in Å; positive for emission
    ew: f64,
}

/// Rest-frame SED of one object, in arbitrary f_λ units
#[derive(Debug, Clone)]
struct SedModel {
    slope: f64,
    d4000: f64,
    sigma_kms: f64,
    absorption_depth: f64,
    absorption: Vec<f64>,
    emission: Vec<Line>,
}

impl SedModel {
    fn continuum(&self, rest: f64) -> f64 {
        let power = (rest / 5500.0).powf(self.slope);
        if self.d4000 <= 1.0 {
            return power;
        }
        let step = 1.0 / (1.0 + (-(rest - BREAK_CENTER) / BREAK_WIDTH).exp());
        let blue = 1.0 / self.d4000;
        power * (blue + (1.0 - blue) * step)
    }

    fn sigma_angstrom(&self, center: f64) -> f64 {
        (center * self.sigma_kms / CGS::SPEED_OF_LIGHT_KMS).max(0.5)
    }

    fn rest_flux(&self, rest: f64) -> f64 {
        let mut flux = self.continuum(rest);

        if self.absorption_depth > 0.0 {
            let mut absorbed = 0.0;
            for &center in &self.absorption {
                let sigma = self.sigma_angstrom(center);
                let x = (rest - center) / sigma;
                if x.abs() < 8.0 {
                    absorbed += (-0.5 * x * x).exp();
                }
            }
            flux *= (1.0 - self.absorption_depth * absorbed).max(0.0);
        }

        for line in &self.emission {
            let sigma = self.sigma_angstrom(line.center);
            let x = (rest - line.center) / sigma;
            if x.abs() < 8.0 {
                let profile = (-0.5 * x * x).exp() / (sigma * (2.0 * std::f64::consts::PI).sqrt());
                flux += self.continuum(line.center) * line.ew * profile;
            }
        }
        flux
    }

    /// Integrated flux of the emission lines at `centers`, in the model's f_λ
    /// units times Å, as seen at redshift `z`
    fn line_flux(&self, centers: &[f64], z: f64) -> f64 {
        self.emission
            .iter()
            .filter(|l| centers.contains(&l.center))
            .map(|l| self.continuum(l.center) * l.ew * (1.0 + z))
            .sum()
    }
}

/// Class-specific parameters drawn for one object
#[derive(Debug, Clone)]
struct Drawn {
    model: SedModel,
    ewscale: f64,
}

fn uniform(rng: &mut ChaCha8Rng, lo: f64, hi: f64) -> f64 {
    rng.random_range(lo..hi)
}

fn lognormal10(rng: &mut ChaCha8Rng, mean: f64, sigma: f64) -> f64 {
    let exponent = Normal::new(mean, sigma).map_or(mean, |n| n.sample(rng));
    10f64.powf(exponent)
}

fn draw(class: ObjectClass, vdisp: Option<f64>, seed: u32) -> Result<Drawn, TemplateError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);

    let drawn = match class {
        ObjectClass::Qso => {
            let slope = Normal::new(-1.5, 0.3).map_or(-1.5, |n| n.sample(&mut rng));
            let ewscale = uniform(&mut rng, 0.5, 1.5);
            let emission = [
                (lines::LYA, 90.0),
                (lines::CIV, 35.0),
                (lines::CIII, 20.0),
                (lines::MGII, 35.0),
                (lines::HBETA, 45.0),
                (lines::OIII_5007, 15.0),
                (lines::HALPHA, 200.0),
            ]
            .into_iter()
            .map(|(center, ew)| Line {
                center,
                ew: ew * ewscale,
            })
            .collect();
            Drawn {
                model: SedModel {
                    slope,
                    d4000: 1.0,
                    sigma_kms: QSO_LINE_SIGMA,
                    absorption_depth: 0.0,
                    absorption: Vec::new(),
                    emission,
                },
                ewscale,
            }
        }
        ObjectClass::Lrg => Drawn {
            model: SedModel {
                slope: uniform(&mut rng, -0.5, 0.5),
                d4000: uniform(&mut rng, 1.6, 2.2),
                sigma_kms: vdisp.unwrap_or(LRG_VDISP),
                absorption_depth: 0.3,
                absorption: vec![lines::CA_K, lines::CA_H, lines::G_BAND, lines::MGB, lines::NAD],
                emission: Vec::new(),
            },
            ewscale: 0.0,
        },
        ObjectClass::Elg => {
            let oii = lognormal10(&mut rng, 1.3, 0.25);
            let hbeta = oii * uniform(&mut rng, 0.3, 0.8);
            let oiii = hbeta * uniform(&mut rng, 0.5, 2.0);
            Drawn {
                model: SedModel {
                    slope: uniform(&mut rng, -2.5, -1.5),
                    d4000: uniform(&mut rng, 1.0, 1.2),
                    sigma_kms: vdisp.unwrap_or(GALAXY_VDISP),
                    absorption_depth: 0.0,
                    absorption: Vec::new(),
                    emission: vec![
                        Line { center: lines::OII_3726, ew: 0.45 * oii },
                        Line { center: lines::OII_3729, ew: 0.55 * oii },
                        Line { center: lines::HBETA, ew: hbeta },
                        Line { center: lines::OIII_4959, ew: oiii / 2.98 },
                        Line { center: lines::OIII_5007, ew: oiii },
                        Line { center: lines::HALPHA, ew: 2.86 * hbeta },
                    ],
                },
                ewscale: 0.0,
            }
        }
        ObjectClass::Bgs => {
            let hbeta = lognormal10(&mut rng, 0.5, 0.3);
            Drawn {
                model: SedModel {
                    slope: uniform(&mut rng, -1.0, 0.5),
                    d4000: uniform(&mut rng, 1.2, 1.9),
                    sigma_kms: vdisp.unwrap_or(GALAXY_VDISP),
                    absorption_depth: 0.2,
                    absorption: vec![lines::CA_K, lines::CA_H, lines::MGB, lines::NAD],
                    emission: vec![
                        Line { center: lines::OII_3729, ew: 1.5 * hbeta },
                        Line { center: lines::HBETA, ew: hbeta },
                        Line { center: lines::HALPHA, ew: 3.0 * hbeta },
                    ],
                },
                ewscale: 0.0,
            }
        }
        ObjectClass::Sky => return Err(TemplateError::UnsupportedClass(class)),
    };
    Ok(drawn)
}

/// Deterministic analytic spectra, one random stream per object seed
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticTemplates;

impl AnalyticTemplates {
    pub fn new() -> Self {
        Self
    }
}

struct Prepared {
    drawn: Drawn,
    redshift: f64,
    /// Multiplies the model f_λ to give erg s⁻¹ cm⁻² Å⁻¹
    scale: f64,
}

impl TemplateEngine for AnalyticTemplates {
    fn make_templates(
        &self,
        request: &TemplateRequest,
        wave: &Array1<f64>,
    ) -> Result<TemplateOutput, TemplateError> {
        request.validate()?;
        if request.class == ObjectClass::Sky {
            return Err(TemplateError::UnsupportedClass(request.class));
        }

        let n = request.len();
        let norm_band = request.normfilter.band();
        let mut prepared = Vec::with_capacity(n);
        let mut fluxes = Vec::with_capacity(n);

        for i in 0..n {
            let vdisp = request.vdisp.as_ref().map(|v| v[i]);
            let drawn = draw(request.class, vdisp, request.seed[i])?;
            let z = request.redshift[i];
            let sed = |w: f64| drawn.model.rest_flux(w / (1.0 + z));

            let raw = sed_band_flux(sed, &norm_band)?;
            if raw.is_nan() || raw <= 0.0 {
                return Err(TemplateError::NonPositiveNormalisation { index: i });
            }
            let scale = mag_to_nanomaggies(request.mag[i]) / raw;

            let mut band_fluxes = BandFluxes::default();
            for band in PhotometricBand::ALL {
                band_fluxes.set(band, scale * sed_band_flux(sed, &band.band())?);
            }
            fluxes.push(band_fluxes);
            prepared.push(Prepared {
                drawn,
                redshift: z,
                scale,
            });
        }

        let mut flux = Array2::<f32>::zeros((n, wave.len()));
        flux.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(i, mut row)| {
                let object = &prepared[i];
                let factor = object.scale / FLUX_UNIT;
                for (value, &w) in row.iter_mut().zip(wave.iter()) {
                    let rest = w / (1.0 + object.redshift);
                    *value = (factor * object.drawn.model.rest_flux(rest)) as f32;
                }
            });

        let objtruth = objtruth_table(request.class, &prepared)?;
        Ok(TemplateOutput {
            flux,
            fluxes,
            objtruth,
        })
    }
}

fn objtruth_table(class: ObjectClass, prepared: &[Prepared]) -> Result<Table, TemplateError> {
    let column = |f: &dyn Fn(&Prepared) -> f64| prepared.iter().map(f).collect::<Vec<f64>>();
    let vdisp = column(&|p| p.drawn.model.sigma_kms);
    let d4000 = column(&|p| p.drawn.model.d4000);
    let hbeta = column(&|p| p.scale * p.drawn.model.line_flux(&[lines::HBETA], p.redshift));

    let mut table = Table::new();
    match class {
        ObjectClass::Qso => {
            table.add_column("SLOPE", column(&|p| p.drawn.model.slope))?;
            table.add_column("EWSCALE", column(&|p| p.drawn.ewscale))?;
        }
        ObjectClass::Lrg => {
            table.add_column("VDISP", vdisp)?;
            table.add_column("D4000", d4000)?;
        }
        ObjectClass::Elg => {
            let oii = column(&|p| {
                p.scale
                    * p.drawn
                        .model
                        .line_flux(&[lines::OII_3726, lines::OII_3729], p.redshift)
            });
            table.add_column("VDISP", vdisp)?;
            table.add_column("OIIFLUX", oii)?;
            table.add_column("HBETAFLUX", hbeta)?;
        }
        ObjectClass::Bgs => {
            table.add_column("VDISP", vdisp)?;
            table.add_column("D4000", d4000)?;
            table.add_column("HBETAFLUX", hbeta)?;
        }
        ObjectClass::Sky => return Err(TemplateError::UnsupportedClass(class)),
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::flux2mag;
    use crate::templates::{default_wave, WaveConfig};
    use approx::assert_relative_eq;

    fn wave() -> Array1<f64> {
        default_wave(&WaveConfig {
            wavemin: 3600.0,
            wavemax: 9800.0,
            dw: 2.0,
        })
        .unwrap()
    }

    fn request(class: ObjectClass, n: usize, normfilter: PhotometricBand) -> TemplateRequest {
        TemplateRequest {
            class,
            redshift: (0..n).map(|i| 0.3 + 0.1 * i as f64).collect(),
            mag: vec![20.0; n],
            seed: (0..n as u32).map(|i| 1000 + i).collect(),
            vdisp: None,
            normfilter,
        }
    }

    #[test]
    fn test_shapes_and_columns() {
        let wave = wave();
        for (class, cols) in [
            (ObjectClass::Qso, vec!["SLOPE", "EWSCALE"]),
            (ObjectClass::Lrg, vec!["VDISP", "D4000"]),
            (ObjectClass::Elg, vec!["VDISP", "OIIFLUX", "HBETAFLUX"]),
            (ObjectClass::Bgs, vec!["VDISP", "D4000", "HBETAFLUX"]),
        ] {
            let out = AnalyticTemplates
                .make_templates(&request(class, 3, PhotometricBand::R), &wave)
                .unwrap();
            assert_eq!(out.flux.dim(), (3, wave.len()));
            assert_eq!(out.fluxes.len(), 3);
            assert_eq!(out.objtruth.nrows(), 3);
            assert_eq!(out.objtruth.column_names(), cols);
        }
    }

    #[test]
    fn test_normalised_to_requested_magnitude() {
        let out = AnalyticTemplates
            .make_templates(&request(ObjectClass::Lrg, 4, PhotometricBand::Z), &wave())
            .unwrap();
        for f in &out.fluxes {
            assert_relative_eq!(flux2mag(f.z), 20.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_same_seed_same_spectrum() {
        let wave = wave();
        let a = AnalyticTemplates
            .make_templates(&request(ObjectClass::Elg, 3, PhotometricBand::R), &wave)
            .unwrap();
        let mut req = request(ObjectClass::Elg, 3, PhotometricBand::R);
        // Reordering objects reorders spectra but does not change them
        req.redshift.reverse();
        req.seed.reverse();
        let b = AnalyticTemplates.make_templates(&req, &wave).unwrap();
        assert_eq!(a.flux.row(0), b.flux.row(2));
        assert_eq!(a.flux.row(2), b.flux.row(0));
    }

    #[test]
    fn test_lrg_is_red_and_elg_is_blue() {
        let wave = wave();
        let lrg = AnalyticTemplates
            .make_templates(&request(ObjectClass::Lrg, 5, PhotometricBand::Z), &wave)
            .unwrap();
        let elg = AnalyticTemplates
            .make_templates(&request(ObjectClass::Elg, 5, PhotometricBand::R), &wave)
            .unwrap();
        for (l, e) in lrg.fluxes.iter().zip(&elg.fluxes) {
            let lrg_rz = flux2mag(l.r) - flux2mag(l.z);
            let elg_rz = flux2mag(e.r) - flux2mag(e.z);
            assert!(lrg_rz > elg_rz, "LRG r-z {lrg_rz} vs ELG r-z {elg_rz}");
        }
    }

    #[test]
    fn test_fluxes_are_finite_and_positive() {
        let out = AnalyticTemplates
            .make_templates(&request(ObjectClass::Qso, 6, PhotometricBand::G), &wave())
            .unwrap();
        assert!(out.flux.iter().all(|v| v.is_finite() && *v > 0.0));
        for f in &out.fluxes {
            for band in PhotometricBand::ALL {
                assert!(f.get(band) > 0.0);
            }
        }
    }

    #[test]
    fn test_vdisp_is_carried() {
        let mut req = request(ObjectClass::Bgs, 2, PhotometricBand::R);
        req.vdisp = Some(vec![120.0, 240.0]);
        let out = AnalyticTemplates.make_templates(&req, &wave()).unwrap();
        assert_eq!(out.objtruth.floats("VDISP").unwrap(), &[120.0, 240.0]);
    }

    #[test]
    fn test_empty_request() {
        let wave = wave();
        let out = AnalyticTemplates
            .make_templates(&request(ObjectClass::Qso, 0, PhotometricBand::G), &wave)
            .unwrap();
        assert_eq!(out.flux.dim(), (0, wave.len()));
        assert!(out.fluxes.is_empty());
        assert_eq!(out.objtruth.nrows(), 0);
        assert_eq!(out.objtruth.column_names(), vec!["SLOPE", "EWSCALE"]);
    }

    #[test]
    fn test_sky_is_unsupported() {
        let result = AnalyticTemplates.make_templates(
            &request(ObjectClass::Sky, 1, PhotometricBand::R),
            &wave(),
        );
        assert!(matches!(result, Err(TemplateError::UnsupportedClass(ObjectClass::Sky))));
    }
}
