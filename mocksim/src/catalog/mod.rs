//! Mock catalog ingestion
//!
//! A mock catalog file holds positions and redshift components for one object
//! class. [`GaussianFieldReader`] turns it into a [`MockBatch`]: every row gets
//! a packed identifier, a HEALPix pixel and a brick name, rows outside the
//! requested pixels are dropped, and the Galactic dust transmission in each
//! photometric band is looked up for the survivors.

pub mod dust;
pub mod footprint;
pub mod reader;

pub use dust::{DustMap, HealpixDustMap, UniformDustMap, DUST_MAP_FILE};
pub use footprint::{Footprint, FullSky, Tile, TileFootprint};
pub use reader::{GaussianFieldReader, MockColumns, PLACEHOLDER_MAG};

use std::path::PathBuf;

use skyindex::{IdError, MockId, PixelError};
use thiserror::Error;

use crate::generator::ObjectClass;
use crate::photometry::BandFluxes;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Mock catalog {0} not found")]
    NotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{path} has no column {column}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Column {column} of {path} has {got} rows, expected {expected}")]
    RaggedColumn {
        path: PathBuf,
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Pixel error: {0}")]
    Pixel(#[from] PixelError),

    #[error("Identifier error: {0}")]
    Id(#[from] IdError),
}

/// One ingested catalog row
#[derive(Debug, Clone, PartialEq)]
pub struct MockRecord {
    /// Row number in the originating file
    pub objid: usize,
    pub mockid: MockId,
    /// Degrees, wrapped into [0, 360)
    pub ra: f64,
    pub dec: f64,
    pub brickname: String,
    /// Nested HEALPix pixel at the read resolution
    pub hpxpixel: u64,
    pub z: f64,
    pub mag: f64,
    pub ebv: f64,
    pub mw_transmission: BandFluxes,
    /// Per-object synthesis seed, drawn by the generator after reading
    pub seed: u32,
    /// Velocity dispersion in km/s for galaxy classes
    pub vdisp: Option<f64>,
}

/// Records of one object class read from one or more files
#[derive(Debug, Clone, PartialEq)]
pub struct MockBatch {
    pub class: ObjectClass,
    pub files: Vec<PathBuf>,
    /// Rows in each file before any filtering
    pub n_per_file: Vec<usize>,
    /// Resolution the `hpxpixel` values were computed at
    pub nside: u64,
    pub records: Vec<MockRecord>,
}

impl MockBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ra(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.ra).collect()
    }

    pub fn dec(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.dec).collect()
    }

    /// Whether every record's identifier names a file in `files`
    pub fn ids_match_files(&self) -> bool {
        self.records
            .iter()
            .all(|r| (r.mockid.file() as usize) < self.files.len())
    }

    /// Copy of the batch restricted to `index`, in the given order
    pub fn subset(&self, index: &[usize]) -> Option<MockBatch> {
        let records = index
            .iter()
            .map(|&i| self.records.get(i).cloned())
            .collect::<Option<Vec<_>>>()?;
        Some(MockBatch {
            class: self.class,
            files: self.files.clone(),
            n_per_file: self.n_per_file.clone(),
            nside: self.nside,
            records,
        })
    }
}
