//! Velocity dispersion assignment for galaxy classes
//!
//! Objects are grouped by a coarse HEALPix pixel. Each group draws a small
//! pool of log-normal dispersions and every member picks one from the pool
//! with replacement, so neighbours tend to share a value. This models a
//! spatially correlated systematic, not per-object measurements.

use std::collections::BTreeMap;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use skyindex::pixel_of;

use super::{GeneratorError, ObjectClass};

/// Parameters of the grouped log-normal dispersion draw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VdispParams {
    /// Mean of log10(vdisp / km s⁻¹)
    pub mean: f64,
    /// Standard deviation of log10(vdisp / km s⁻¹)
    pub sigma: f64,
    /// Pool size as a fraction of the group size
    pub frac: f64,
    /// Largest pool size
    pub ceiling: usize,
    /// Resolution of the grouping pixels
    pub nside_chunk: u64,
}

impl VdispParams {
    pub const DEFAULT_FRAC: f64 = 0.1;
    pub const DEFAULT_CEILING: usize = 1;
    pub const DEFAULT_NSIDE_CHUNK: u64 = 128;

    pub const fn lognormal(mean: f64, sigma: f64) -> Self {
        Self {
            mean,
            sigma,
            frac: Self::DEFAULT_FRAC,
            ceiling: Self::DEFAULT_CEILING,
            nside_chunk: Self::DEFAULT_NSIDE_CHUNK,
        }
    }

    pub const LRG: VdispParams = VdispParams::lognormal(2.3, 0.1);
    pub const GALAXY: VdispParams = VdispParams::lognormal(1.9, 0.15);

    /// Class default, `None` for classes without a dispersion
    pub fn for_class(class: ObjectClass) -> Option<Self> {
        match class {
            ObjectClass::Lrg => Some(Self::LRG),
            ObjectClass::Elg | ObjectClass::Bgs => Some(Self::GALAXY),
            ObjectClass::Qso | ObjectClass::Sky => None,
        }
    }

    /// Pool size for a group of `n` objects, between 1 and `ceiling`
    pub fn pool_size(&self, n: usize) -> usize {
        ((n as f64 * self.frac).round() as usize)
            .min(self.ceiling)
            .max(1)
    }
}

/// Velocity dispersion in km/s for every (ra, dec) position
pub fn sample_vdisp<R: Rng + ?Sized>(
    ra: &[f64],
    dec: &[f64],
    params: &VdispParams,
    rng: &mut R,
) -> Result<Vec<f64>, GeneratorError> {
    let invalid = || GeneratorError::InvalidVdisp {
        mean: params.mean,
        sigma: params.sigma,
    };
    if !params.mean.is_finite() || !params.sigma.is_finite() {
        return Err(invalid());
    }
    let normal = Normal::new(params.mean, params.sigma).map_err(|_| invalid())?;

    let pixels = pixel_of(ra, dec, params.nside_chunk)?;
    let mut groups: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    for (i, pix) in pixels.into_iter().enumerate() {
        groups.entry(pix).or_default().push(i);
    }

    let mut vdisp = vec![0.0; ra.len()];
    for members in groups.values() {
        let npool = params.pool_size(members.len());
        let pool: Vec<f64> = (0..npool)
            .map(|_| 10f64.powf(normal.sample(rng)))
            .collect();
        for &i in members {
            vdisp[i] = pool[rng.random_range(0..npool)];
        }
    }
    Ok(vdisp)
}
