//! Orchestration of per-class generator runs
//!
//! [`run_class`] drives one generator through read, down-sampling, spectra and
//! selection. [`run_all`] runs every configured class in parallel, each from
//! its own seed, then merges whatever completed. A class that fails is logged
//! and reported without affecting the others.

use std::path::Path;
use std::sync::Arc;

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use skyindex::{BrickGeometry, PixelSet};

use crate::cache::ResourceCache;
use crate::catalog::{Footprint, FullSky, GaussianFieldReader, TileFootprint};
use crate::config::{ConfigError, PipelineConfig};
use crate::error::MockError;
use crate::generator::{
    Generator, GeneratorSettings, ObjectClass, ObjectGenerator, SpectraBatch,
};
use crate::maskbits::add_maskbits;
use crate::merge::{merge, MergeOptions};
use crate::release::annotate_release;
use crate::templates::{default_wave, TemplateEngine};

/// Stream of the per-class generator seed used for down-sampling
const DOWNSAMPLE_STREAM: u64 = 2;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions<'a> {
    pub nside: u64,
    /// Pixels to read; the reader's footprint when `None`
    pub allowed: Option<&'a PixelSet>,
    /// Keep at most this many objects
    pub nrand: Option<usize>,
    pub seed: u64,
}

/// Sorted indices of `nrand` of `n` objects drawn without replacement, or
/// `None` when every object is kept
pub fn downsample(n: usize, nrand: Option<usize>, seed: u64) -> Option<Vec<usize>> {
    let nrand = nrand.filter(|&k| k < n)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(DOWNSAMPLE_STREAM);
    let mut picked = index::sample(&mut rng, n, nrand).into_vec();
    picked.sort_unstable();
    Some(picked)
}

/// Read, down-sample, synthesize and select one class.
///
/// # Returns
///
/// `Ok(None)` when no object of the class falls in the allowed pixels.
pub fn run_class(
    generator: &mut Generator,
    reader: &GaussianFieldReader,
    mockfile: &Path,
    options: &RunOptions,
) -> Result<Option<SpectraBatch>, MockError> {
    let class = generator.class();
    log::info!("Reading the mock catalog for {}s", class);
    let Some(data) = generator.read(reader, mockfile, options.nside, options.allowed)? else {
        return Ok(None);
    };

    let index = downsample(data.len(), options.nrand, options.seed);
    if let Some(index) = &index {
        log::info!("Down-sampled {} {}s to {}", data.len(), class, index.len());
    }

    let mut batch = generator.make_spectra(&data, index.as_deref())?;
    generator.select_targets(&mut batch.targets, &batch.truth)?;
    Ok(Some(batch))
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassStatus {
    Completed { ntargets: usize },
    /// No objects in the requested pixels
    Empty,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassOutcome {
    pub class: ObjectClass,
    pub seed: u64,
    pub status: ClassStatus,
}

/// Result of a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub seed: u64,
    pub outcomes: Vec<ClassOutcome>,
    /// Completed batches in configuration order
    pub batches: Vec<(ObjectClass, SpectraBatch)>,
    /// All completed batches merged, if any completed
    pub merged: Option<SpectraBatch>,
}

impl PipelineReport {
    pub fn failures(&self) -> impl Iterator<Item = &ClassOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, ClassStatus::Failed(_)))
    }
}

fn build_reader(
    config: &PipelineConfig,
    cache: &ResourceCache,
) -> Result<(GaussianFieldReader, Arc<dyn Footprint>), MockError> {
    let bricks = BrickGeometry::new(config.bricksize)
        .map_err(|e| ConfigError::Invalid(format!("bricksize: {e}")))?;
    let footprint: Arc<dyn Footprint> = match &config.footprint {
        Some(path) => Arc::new(TileFootprint::from_file(path)?),
        None => Arc::new(FullSky),
    };
    let mut reader = GaussianFieldReader::new(bricks).with_footprint(footprint.clone());
    match &config.dust_dir {
        Some(dir) => reader = reader.with_dust(cache.dust_map(dir)?),
        None => log::warn!("No dust map directory configured; reads will fail"),
    }
    Ok((reader, footprint))
}

/// Run every configured class and merge the results.
///
/// `on_class_done` is called from worker threads as each class finishes.
pub fn run_all<F>(
    config: &PipelineConfig,
    engine: Arc<dyn TemplateEngine>,
    cache: &ResourceCache,
    on_class_done: F,
) -> Result<PipelineReport, MockError>
where
    F: Fn(&ClassOutcome) + Sync,
{
    config.validate()?;
    let wave = default_wave(&config.wave)?;
    let (reader, footprint) = build_reader(config, cache)?;

    let allowed: Arc<PixelSet> = if config.healpixels.is_empty() {
        cache.footprint_pixels(footprint.as_ref(), config.nside)?
    } else {
        Arc::new(config.healpixels.iter().copied().collect())
    };

    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    log::info!("Master seed {}", seed);
    let mut master = ChaCha8Rng::seed_from_u64(seed);
    let jobs: Vec<(usize, u64)> = (0..config.classes.len())
        .map(|i| (i, master.random::<u64>()))
        .collect();

    let results: Vec<(ClassOutcome, Option<SpectraBatch>)> = jobs
        .par_iter()
        .map(|&(i, class_seed)| {
            let entry = &config.classes[i];
            let settings = GeneratorSettings {
                vdisp: config.vdisp_params(entry.class),
                region: config.region,
                magcut: config.magcut,
                ..GeneratorSettings::new(entry.class, class_seed, wave.clone(), engine.clone())
            };
            let mut generator = Generator::new(entry.class, settings);
            let options = RunOptions {
                nside: config.nside,
                allowed: Some(allowed.as_ref()),
                nrand: entry.nrand,
                seed: class_seed,
            };

            let (status, batch) = match run_class(&mut generator, &reader, &entry.mockfile, &options)
            {
                Ok(Some(batch)) => (
                    ClassStatus::Completed {
                        ntargets: batch.len(),
                    },
                    Some(batch),
                ),
                Ok(None) => (ClassStatus::Empty, None),
                Err(e) => {
                    log::error!("{} generation failed: {}", entry.class, e);
                    (ClassStatus::Failed(e.to_string()), None)
                }
            };
            let outcome = ClassOutcome {
                class: entry.class,
                seed: class_seed,
                status,
            };
            on_class_done(&outcome);
            (outcome, batch)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(results.len());
    let mut batches = Vec::new();
    for (outcome, batch) in results {
        if let Some(batch) = batch {
            batches.push((outcome.class, batch));
        }
        outcomes.push(outcome);
    }

    let merged = if batches.is_empty() {
        log::warn!("No class produced any targets");
        None
    } else {
        let spectra: Vec<SpectraBatch> = batches.iter().map(|(_, b)| b.clone()).collect();
        let mut merged = merge(&spectra, MergeOptions::default())?;
        if let Some(dr_dir) = &config.dr_dir {
            add_maskbits(&mut merged.targets, dr_dir)?;
        }
        annotate_release(&mut merged.targets)?;
        Some(merged)
    };

    Ok(PipelineReport {
        seed,
        outcomes,
        batches,
        merged,
    })
}
