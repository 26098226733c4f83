//! Pipeline configuration
//!
//! Stored as JSON. Every field has a default, so a config file only needs to
//! name what it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use skyindex::{order_of, BrickGeometry};
use thiserror::Error;

use crate::generator::{ObjectClass, VdispParams};
use crate::selection::Region;
use crate::templates::WaveConfig;

/// Environment variable naming the dust map directory
pub const DUST_DIR_ENV: &str = "DUST_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// One object class to generate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassConfig {
    pub class: ObjectClass,
    pub mockfile: PathBuf,
    /// Down-sample to this many objects; all of them when unset
    #[serde(default)]
    pub nrand: Option<usize>,
}

/// Log-normal velocity dispersion models by class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VdispConfig {
    pub frac: f64,
    pub ceiling: usize,
    /// (mean, sigma) of log10(vdisp) for red galaxies
    pub lrg: (f64, f64),
    /// (mean, sigma) of log10(vdisp) for the other galaxy classes
    pub galaxy: (f64, f64),
}

impl Default for VdispConfig {
    fn default() -> Self {
        Self {
            frac: VdispParams::DEFAULT_FRAC,
            ceiling: VdispParams::DEFAULT_CEILING,
            lrg: (VdispParams::LRG.mean, VdispParams::LRG.sigma),
            galaxy: (VdispParams::GALAXY.mean, VdispParams::GALAXY.sigma),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// HEALPix resolution for partitioning
    pub nside: u64,
    /// HEALPix resolution for grouping velocity dispersions
    pub nside_chunk: u64,
    /// Brick size in degrees
    pub bricksize: f64,
    pub dust_dir: Option<PathBuf>,
    /// Imaging release root, for mask bits
    pub dr_dir: Option<PathBuf>,
    /// JSON tile list defining the default footprint
    pub footprint: Option<PathBuf>,
    /// Pixels to generate; the footprint when empty
    pub healpixels: Vec<u64>,
    pub seed: Option<u64>,
    pub region: Region,
    /// Keep only objects brighter than this magnitude
    pub magcut: Option<f64>,
    pub wave: WaveConfig,
    pub vdisp: VdispConfig,
    pub classes: Vec<ClassConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            nside: 64,
            nside_chunk: VdispParams::DEFAULT_NSIDE_CHUNK,
            bricksize: BrickGeometry::DEFAULT_BRICKSIZE,
            dust_dir: None,
            dr_dir: None,
            footprint: None,
            healpixels: Vec::new(),
            seed: None,
            region: Region::default(),
            magcut: None,
            wave: WaveConfig::default(),
            vdisp: VdispConfig::default(),
            classes: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Fill unset fields from the environment
    pub fn apply_env(&mut self) {
        if self.dust_dir.is_none() {
            if let Some(dir) = std::env::var_os(DUST_DIR_ENV) {
                self.dust_dir = Some(PathBuf::from(dir));
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, nside) in [("nside", self.nside), ("nside_chunk", self.nside_chunk)] {
            order_of(nside).map_err(|e| ConfigError::Invalid(format!("{name}: {e}")))?;
        }
        BrickGeometry::new(self.bricksize)
            .map_err(|e| ConfigError::Invalid(format!("bricksize: {e}")))?;
        let npix = skyindex::healpix::npix(self.nside);
        if let Some(&pix) = self.healpixels.iter().find(|&&p| p >= npix) {
            return Err(ConfigError::Invalid(format!(
                "healpixel {pix} does not exist at nside {}",
                self.nside
            )));
        }
        if self.vdisp.frac.is_nan() || self.vdisp.frac <= 0.0 || self.vdisp.ceiling == 0 {
            return Err(ConfigError::Invalid(format!(
                "velocity dispersion pool needs frac > 0 and ceiling >= 1, got {} and {}",
                self.vdisp.frac, self.vdisp.ceiling
            )));
        }
        let mut seen = Vec::new();
        for entry in &self.classes {
            if seen.contains(&entry.class) {
                return Err(ConfigError::Invalid(format!(
                    "class {} is listed twice",
                    entry.class
                )));
            }
            seen.push(entry.class);
        }
        Ok(())
    }

    /// Velocity dispersion model for `class`, if it has one
    pub fn vdisp_params(&self, class: ObjectClass) -> Option<VdispParams> {
        let (mean, sigma) = match class {
            ObjectClass::Lrg => self.vdisp.lrg,
            ObjectClass::Elg | ObjectClass::Bgs => self.vdisp.galaxy,
            ObjectClass::Qso | ObjectClass::Sky => return None,
        };
        Some(VdispParams {
            mean,
            sigma,
            frac: self.vdisp.frac,
            ceiling: self.vdisp.ceiling,
            nside_chunk: self.nside_chunk,
        })
    }
}
