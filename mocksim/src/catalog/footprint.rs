//! Survey footprint as a set of HEALPix pixels

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use skyindex::healpix::{max_pixel_radius_deg, npix, pix2ang_nest};
use skyindex::sphere::{angular_distance, radec_to_xyz};
use skyindex::{order_of, PixelSet};

use super::CatalogError;

/// Provider of the default pixel set used when a read names no pixels
pub trait Footprint: Send + Sync {
    fn pixels(&self, nside: u64) -> Result<PixelSet, CatalogError>;

    /// Identity of the footprint's geometry; equal ids must give equal pixels
    fn cache_id(&self) -> String;
}

/// Every pixel on the sky
#[derive(Debug, Clone, Copy, Default)]
pub struct FullSky;

impl Footprint for FullSky {
    fn pixels(&self, nside: u64) -> Result<PixelSet, CatalogError> {
        order_of(nside)?;
        Ok((0..npix(nside)).collect())
    }

    fn cache_id(&self) -> String {
        "fullsky".to_string()
    }
}

/// Telescope pointing centre in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub ra: f64,
    pub dec: f64,
}

/// Union of circular tiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileFootprint {
    pub tiles: Vec<Tile>,
    #[serde(default = "TileFootprint::default_radius")]
    pub radius_deg: f64,
}

impl TileFootprint {
    /// Radius of the focal plane in degrees
    pub const DEFAULT_RADIUS_DEG: f64 = 1.605;

    fn default_radius() -> f64 {
        Self::DEFAULT_RADIUS_DEG
    }

    pub fn new(tiles: Vec<Tile>) -> Self {
        Self {
            tiles,
            radius_deg: Self::DEFAULT_RADIUS_DEG,
        }
    }

    /// Load a JSON tile list: `{"tiles": [{"ra": .., "dec": ..}], "radius_deg": ..}`
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            return Err(CatalogError::NotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Footprint for TileFootprint {
    /// Pixels whose centre lies within the tile radius plus one pixel radius
    /// of any tile centre
    fn pixels(&self, nside: u64) -> Result<PixelSet, CatalogError> {
        let order = order_of(nside)?;
        let reach = (self.radius_deg + max_pixel_radius_deg(nside)).to_radians();
        let centres: Vec<[f64; 3]> = self
            .tiles
            .iter()
            .map(|t| radec_to_xyz(t.ra.to_radians(), t.dec.to_radians()))
            .collect();

        let pixels: Vec<u64> = (0..npix(nside))
            .into_par_iter()
            .filter(|&pix| {
                let (ra, dec) = pix2ang_nest(order, pix);
                let xyz = radec_to_xyz(ra.to_radians(), dec.to_radians());
                centres.iter().any(|&c| angular_distance(c, xyz) <= reach)
            })
            .collect();
        Ok(pixels.into_iter().collect())
    }

    fn cache_id(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.radius_deg.to_bits().hash(&mut hasher);
        for tile in &self.tiles {
            tile.ra.to_bits().hash(&mut hasher);
            tile.dec.to_bits().hash(&mut hasher);
        }
        format!("tiles-{}-{:016x}", self.tiles.len(), hasher.finish())
    }
}
