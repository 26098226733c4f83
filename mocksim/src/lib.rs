//! Mock spectra and target catalogs from simulated sky catalogs
//!
//! Reads Gaussian-field mock catalogs one object class at a time, restricts
//! them to a set of HEALPix pixels, synthesizes noiseless spectra, and applies
//! color-cut target selection. Per-class batches are merged into a single
//! output with a shared wavelength grid.
//!
//! # Layout
//!
//! - [`catalog`]: mock catalog reading, dust and footprint lookups
//! - [`generator`]: per-class generators and the batch they produce
//! - [`templates`]: spectral template engines
//! - [`selection`]: target bit masks and color cuts
//! - [`pipeline`]: orchestration across classes
//! - [`merge`], [`io`]: combining and persisting batches

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod generator;
pub mod io;
pub mod maskbits;
pub mod merge;
pub mod photometry;
pub mod pipeline;
pub mod release;
pub mod selection;
pub mod shared_args;
pub mod table;
pub mod templates;

pub use cache::ResourceCache;
pub use catalog::{CatalogError, GaussianFieldReader, MockBatch, MockRecord};
pub use config::{ConfigError, PipelineConfig};
pub use error::MockError;
pub use generator::{
    Generator, GeneratorError, GeneratorSettings, ObjectClass, ObjectGenerator, SpectraBatch,
};
pub use merge::{merge, MergeError, MergeOptions};
pub use pipeline::{run_all, run_class, ClassOutcome, ClassStatus, PipelineReport, RunOptions};
pub use table::{Column, Table, TableError};
pub use templates::{AnalyticTemplates, TemplateEngine};
