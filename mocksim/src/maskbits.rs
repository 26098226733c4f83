//! Imaging mask bits at target positions
//!
//! Each brick of an imaging release may carry a mask raster. Positions are
//! mapped onto the raster linearly in RA and Dec across the brick bounds.
//! Positions in bricks with no raster get the [`BAILOUT`] bit.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::table::{Table, TableError};

/// Set where no mask raster exists for the brick
pub const BAILOUT: i64 = 1 << 10;

pub const MASKBITS: &str = "MASKBITS";

#[derive(Debug, Error)]
pub enum MaskbitsError {
    #[error("Brick {0} has no positions to look up")]
    EmptyBrick(String),

    #[error("Mask raster has no pixels")]
    EmptyRaster,

    #[error("Positions differ in length ({ra} RA vs {dec} Dec)")]
    LengthMismatch { ra: usize, dec: usize },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

/// Mask bits over one brick, indexed `[dec row, ra column]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskRaster {
    pub ramin: f64,
    pub ramax: f64,
    pub decmin: f64,
    pub decmax: f64,
    pub bits: Array2<i16>,
}

impl MaskRaster {
    pub fn new(
        bounds: (f64, f64, f64, f64),
        bits: Array2<i16>,
    ) -> Result<Self, MaskbitsError> {
        if bits.is_empty() {
            return Err(MaskbitsError::EmptyRaster);
        }
        let (ramin, ramax, decmin, decmax) = bounds;
        Ok(Self {
            ramin,
            ramax,
            decmin,
            decmax,
            bits,
        })
    }

    /// Raster file of `brickname` under a release root
    pub fn path(dr_dir: &Path, brickname: &str) -> PathBuf {
        let prefix: String = brickname.chars().take(3).collect();
        dr_dir
            .join("coadd")
            .join(prefix)
            .join(brickname)
            .join(format!("legacysurvey-{brickname}-maskbits.json"))
    }

    /// The brick's raster, or `None` when the release has none for it
    pub fn load(dr_dir: &Path, brickname: &str) -> Result<Option<Self>, MaskbitsError> {
        let path = Self::path(dr_dir, brickname);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|source| MaskbitsError::Io {
            path: path.clone(),
            source,
        })?;
        let raster: MaskRaster =
            serde_json::from_str(&json).map_err(|source| MaskbitsError::Parse {
                path: path.clone(),
                source,
            })?;
        if raster.bits.is_empty() {
            return Err(MaskbitsError::EmptyRaster);
        }
        Ok(Some(raster))
    }

    pub fn save(&self, dr_dir: &Path, brickname: &str) -> Result<PathBuf, MaskbitsError> {
        let path = Self::path(dr_dir, brickname);
        let io_error = |source| MaskbitsError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let json = serde_json::to_string(self).map_err(|source| MaskbitsError::Parse {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(io_error)?;
        Ok(path)
    }

    fn index(value: f64, lo: f64, hi: f64, n: usize) -> usize {
        let scaled = ((value - lo) / (hi - lo) * n as f64).floor();
        if scaled.is_nan() || scaled < 0.0 {
            0
        } else {
            (scaled as usize).min(n - 1)
        }
    }

    /// Raster pixel `(row, column)` holding (ra, dec); off-raster positions
    /// clamp to the nearest edge
    pub fn pixel(&self, ra: f64, dec: f64) -> (usize, usize) {
        let (ny, nx) = self.bits.dim();
        (
            Self::index(dec, self.decmin, self.decmax, ny),
            Self::index(ra, self.ramin, self.ramax, nx),
        )
    }

    pub fn bits_at(&self, ra: f64, dec: f64) -> i64 {
        self.bits[self.pixel(ra, dec)] as i64
    }
}

/// Mask bits at positions inside one brick
pub fn maskbits_at_positions(
    ra: &[f64],
    dec: &[f64],
    brickname: &str,
    raster: Option<&MaskRaster>,
) -> Result<Vec<i64>, MaskbitsError> {
    if ra.len() != dec.len() {
        return Err(MaskbitsError::LengthMismatch {
            ra: ra.len(),
            dec: dec.len(),
        });
    }
    if ra.is_empty() {
        return Err(MaskbitsError::EmptyBrick(brickname.to_string()));
    }
    Ok(match raster {
        Some(raster) => ra
            .iter()
            .zip(dec)
            .map(|(&r, &d)| raster.bits_at(r, d))
            .collect(),
        None => vec![BAILOUT; ra.len()],
    })
}

/// Set the `MASKBITS` column of a targets table from the rasters under
/// `dr_dir`, one brick at a time
pub fn add_maskbits(targets: &mut Table, dr_dir: &Path) -> Result<(), MaskbitsError> {
    let ra = targets.floats("RA")?;
    let dec = targets.floats("DEC")?;
    let mut by_brick: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, brick) in targets.texts("BRICKNAME")?.iter().enumerate() {
        by_brick.entry(brick.as_str()).or_default().push(i);
    }

    let mut maskbits = vec![0i64; targets.nrows()];
    let mut missing = 0;
    for (brick, rows) in &by_brick {
        let raster = MaskRaster::load(dr_dir, brick)?;
        if raster.is_none() {
            missing += 1;
        }
        let brick_ra: Vec<f64> = rows.iter().map(|&i| ra[i]).collect();
        let brick_dec: Vec<f64> = rows.iter().map(|&i| dec[i]).collect();
        let bits = maskbits_at_positions(&brick_ra, &brick_dec, brick, raster.as_ref())?;
        for (&i, b) in rows.iter().zip(bits) {
            maskbits[i] = b;
        }
    }
    if missing > 0 {
        log::warn!(
            "No mask raster for {} of {} bricks under {}",
            missing,
            by_brick.len(),
            dr_dir.display()
        );
    }

    targets.set_column(MASKBITS, maskbits)?;
    Ok(())
}
