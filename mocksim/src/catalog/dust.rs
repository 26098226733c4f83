//! Galactic reddening lookups

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use skyindex::{order_of, pixel_of, PixelError};

use super::CatalogError;

/// File name of the reddening map inside a dust directory
pub const DUST_MAP_FILE: &str = "ebv_healpix.json";

/// Source of E(B-V) at sky positions
pub trait DustMap: Send + Sync {
    /// E(B-V) in magnitudes at each (ra, dec) in degrees
    fn ebv(&self, ra: &[f64], dec: &[f64]) -> Result<Vec<f64>, CatalogError>;
}

/// Reddening sampled on a nested HEALPix grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealpixDustMap {
    nside: u64,
    ebv: Vec<f64>,
}

impl HealpixDustMap {
    pub fn new(nside: u64, ebv: Vec<f64>) -> Result<Self, CatalogError> {
        order_of(nside)?;
        let npix = skyindex::healpix::npix(nside) as usize;
        if ebv.len() != npix {
            return Err(CatalogError::Configuration(format!(
                "dust map at nside {} needs {} pixels, got {}",
                nside,
                npix,
                ebv.len()
            )));
        }
        Ok(Self { nside, ebv })
    }

    /// Read [`DUST_MAP_FILE`] from `dir`
    pub fn open(dir: &Path) -> Result<Self, CatalogError> {
        let path = dir.join(DUST_MAP_FILE);
        if !path.exists() {
            return Err(CatalogError::NotFound(path));
        }
        let json = fs::read_to_string(&path)?;
        let map: HealpixDustMap =
            serde_json::from_str(&json).map_err(|source| CatalogError::Parse {
                path: path.clone(),
                source,
            })?;
        log::debug!("Read dust map {} at nside {}", path.display(), map.nside);
        Self::new(map.nside, map.ebv)
    }

    /// Write the map as [`DUST_MAP_FILE`] into `dir`
    pub fn save(&self, dir: &Path) -> Result<(), CatalogError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(DUST_MAP_FILE);
        let json = serde_json::to_string(self).map_err(|source| CatalogError::Parse {
            path: path.clone(),
            source,
        })?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn nside(&self) -> u64 {
        self.nside
    }
}

impl DustMap for HealpixDustMap {
    fn ebv(&self, ra: &[f64], dec: &[f64]) -> Result<Vec<f64>, CatalogError> {
        // `new` guarantees one value per pixel at this nside
        let pixels = pixel_of(ra, dec, self.nside)?;
        Ok(pixels.into_iter().map(|p| self.ebv[p as usize]).collect())
    }
}

/// The same E(B-V) everywhere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformDustMap(pub f64);

impl DustMap for UniformDustMap {
    fn ebv(&self, ra: &[f64], dec: &[f64]) -> Result<Vec<f64>, CatalogError> {
        if ra.len() != dec.len() {
            return Err(PixelError::LengthMismatch {
                ra: ra.len(),
                dec: dec.len(),
            }
            .into());
        }
        Ok(vec![self.0; ra.len()])
    }
}
