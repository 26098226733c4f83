//! Per-class target generators
//!
//! Every object class runs the same three steps: read a mock catalog, make
//! spectra for (a subset of) the objects, and flag the ones passing the class
//! selection. [`ObjectGenerator`] is that capability set; [`Generator`]
//! dispatches over the concrete class implementations.
//!
//! Randomness flows from a single seeded stream per generator. Reading draws
//! each object's synthesis seed (and, for galaxies, its velocity dispersion)
//! from that stream; spectra and subpriorities derive from the per-object
//! seed alone, so they do not depend on which other objects share a batch.

pub mod bgs;
pub mod elg;
pub mod lrg;
pub mod qso;
pub mod sky;
pub mod vdisp;

pub use bgs::BgsGenerator;
pub use elg::ElgGenerator;
pub use lrg::LrgGenerator;
pub use qso::QsoGenerator;
pub use sky::SkyGenerator;
pub use vdisp::{sample_vdisp, VdispParams};

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use skyindex::{PixelError, PixelSet};
use thiserror::Error;

use crate::catalog::{CatalogError, GaussianFieldReader, MockBatch};
use crate::photometry::{BandFluxes, PhotometricBand};
use crate::selection::{Region, BGS_TARGET, DESI_TARGET, MWS_TARGET, OBSCONDITIONS};
use crate::table::{Table, TableError};
use crate::templates::{TemplateEngine, TemplateError, TemplateRequest};

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Unknown object class {0:?}")]
    UnknownClass(String),

    #[error("Invalid velocity dispersion distribution: mean {mean}, sigma {sigma}")]
    InvalidVdisp { mean: f64, sigma: f64 },

    #[error("Index {index} out of range for {len} records")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("{generator} generator cannot process a {batch} batch")]
    WrongClass {
        generator: ObjectClass,
        batch: ObjectClass,
    },

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Pixel error: {0}")]
    Pixel(#[from] PixelError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

/// Object classes with mock catalogs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObjectClass {
    Qso,
    Lrg,
    Elg,
    Bgs,
    Sky,
}

impl ObjectClass {
    pub const ALL: [ObjectClass; 5] = [
        ObjectClass::Qso,
        ObjectClass::Lrg,
        ObjectClass::Elg,
        ObjectClass::Bgs,
        ObjectClass::Sky,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ObjectClass::Qso => "QSO",
            ObjectClass::Lrg => "LRG",
            ObjectClass::Elg => "ELG",
            ObjectClass::Bgs => "BGS",
            ObjectClass::Sky => "SKY",
        }
    }

    /// Blank-sky positions: zero redshift, no spectrum
    pub fn is_placeholder(&self) -> bool {
        matches!(self, ObjectClass::Sky)
    }

    /// Spectral type recorded in the truth table
    pub fn spectype(&self) -> &'static str {
        match self {
            ObjectClass::Qso => "QSO",
            ObjectClass::Lrg | ObjectClass::Elg | ObjectClass::Bgs => "GALAXY",
            ObjectClass::Sky => "SKY",
        }
    }

    /// Band the template magnitude refers to
    pub fn normfilter(&self) -> Option<PhotometricBand> {
        match self {
            ObjectClass::Qso => Some(PhotometricBand::G),
            ObjectClass::Lrg => Some(PhotometricBand::Z),
            ObjectClass::Elg | ObjectClass::Bgs => Some(PhotometricBand::R),
            ObjectClass::Sky => None,
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ObjectClass {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectClass::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| GeneratorError::UnknownClass(s.to_string()))
    }
}

/// Spectra and tables for one generator run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectraBatch {
    /// (object, wavelength) in 10⁻¹⁷ erg s⁻¹ cm⁻² Å⁻¹
    pub flux: Array2<f32>,
    /// Å
    pub wave: Array1<f64>,
    pub targets: Table,
    pub truth: Table,
    pub objtruth: Table,
}

impl SpectraBatch {
    pub fn len(&self) -> usize {
        self.flux.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.flux.nrows() == 0
    }
}

/// Read, synthesize, select
pub trait ObjectGenerator: Send {
    fn class(&self) -> ObjectClass;

    /// Shared output wavelength grid
    fn wave(&self) -> &Array1<f64>;

    /// Read a mock catalog and attach per-object seeds and class-specific
    /// quantities. `Ok(None)` when no object falls in the allowed pixels.
    fn read(
        &mut self,
        reader: &GaussianFieldReader,
        mockfile: &Path,
        nside: u64,
        allowed: Option<&PixelSet>,
    ) -> Result<Option<MockBatch>, GeneratorError>;

    /// Spectra and target/truth tables for `index` into `data`, or all of it
    fn make_spectra(
        &self,
        data: &MockBatch,
        index: Option<&[usize]>,
    ) -> Result<SpectraBatch, GeneratorError>;

    /// OR this class's target bits into `targets` for every selected row
    fn select_targets(&self, targets: &mut Table, truth: &Table) -> Result<(), GeneratorError>;
}

/// Everything a generator needs besides its class
#[derive(Clone)]
pub struct GeneratorSettings {
    pub seed: u64,
    pub wave: Array1<f64>,
    pub engine: Arc<dyn TemplateEngine>,
    pub region: Region,
    pub vdisp: Option<VdispParams>,
    pub magcut: Option<f64>,
}

impl GeneratorSettings {
    /// Settings with the class's default dispersion model, southern
    /// photometry and no magnitude cut
    pub fn new(
        class: ObjectClass,
        seed: u64,
        wave: Array1<f64>,
        engine: Arc<dyn TemplateEngine>,
    ) -> Self {
        Self {
            seed,
            wave,
            engine,
            region: Region::default(),
            vdisp: VdispParams::for_class(class),
            magcut: None,
        }
    }
}

/// State and table building shared by the class generators
pub(crate) struct GeneratorCore {
    class: ObjectClass,
    settings: GeneratorSettings,
    rng: ChaCha8Rng,
}

impl GeneratorCore {
    pub(crate) fn new(class: ObjectClass, settings: GeneratorSettings) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(settings.seed);
        Self {
            class,
            settings,
            rng,
        }
    }

    pub(crate) fn class(&self) -> ObjectClass {
        self.class
    }

    pub(crate) fn wave(&self) -> &Array1<f64> {
        &self.settings.wave
    }

    pub(crate) fn region(&self) -> Region {
        self.settings.region
    }

    /// Read `mockfile`, then draw a seed for every object and, when the
    /// class has a dispersion model, a velocity dispersion.
    pub(crate) fn read(
        &mut self,
        reader: &GaussianFieldReader,
        mockfile: &Path,
        nside: u64,
        allowed: Option<&PixelSet>,
    ) -> Result<Option<MockBatch>, GeneratorError> {
        let Some(mut data) =
            reader.load(mockfile, self.class, nside, allowed, self.settings.magcut)?
        else {
            return Ok(None);
        };

        for record in &mut data.records {
            record.seed = self.rng.random::<u32>();
        }

        if let Some(params) = self.settings.vdisp {
            let vdisp = sample_vdisp(&data.ra(), &data.dec(), &params, &mut self.rng)?;
            for (record, v) in data.records.iter_mut().zip(vdisp) {
                record.vdisp = Some(v);
            }
        }
        Ok(Some(data))
    }

    /// Records of `data` picked by `index`, checking the class and bounds
    pub(crate) fn subset(
        &self,
        data: &MockBatch,
        index: Option<&[usize]>,
    ) -> Result<MockBatch, GeneratorError> {
        if data.class != self.class {
            return Err(GeneratorError::WrongClass {
                generator: self.class,
                batch: data.class,
            });
        }
        match index {
            None => Ok(data.clone()),
            Some(index) => data.subset(index).ok_or_else(|| {
                let bad = index
                    .iter()
                    .copied()
                    .find(|&i| i >= data.len())
                    .unwrap_or_default();
                GeneratorError::IndexOutOfRange {
                    index: bad,
                    len: data.len(),
                }
            }),
        }
    }

    /// Synthesize template spectra through the configured engine
    pub(crate) fn template_spectra(
        &self,
        data: &MockBatch,
        index: Option<&[usize]>,
    ) -> Result<SpectraBatch, GeneratorError> {
        let data = self.subset(data, index)?;
        let normfilter = self
            .class
            .normfilter()
            .ok_or(TemplateError::UnsupportedClass(self.class))?;

        log::info!("Generating {} random spectra", data.len());
        let request = TemplateRequest {
            class: self.class,
            redshift: data.records.iter().map(|r| r.z).collect(),
            mag: data.records.iter().map(|r| r.mag).collect(),
            seed: data.records.iter().map(|r| r.seed).collect(),
            vdisp: self
                .settings
                .vdisp
                .map(|_| data.records.iter().map(|r| r.vdisp.unwrap_or(0.0)).collect()),
            normfilter,
        };
        let output = self.settings.engine.make_templates(&request, &self.settings.wave)?;

        let (targets, truth) = self.build_tables(&data, &output.fluxes)?;
        let mut objtruth = Table::new();
        objtruth.add_column("TARGETID", targetids(&data))?;
        objtruth.append_columns(output.objtruth)?;

        Ok(SpectraBatch {
            flux: output.flux,
            wave: self.settings.wave.clone(),
            targets,
            truth,
            objtruth,
        })
    }

    /// All-zero spectra of the right shape, for classes with no templates
    pub(crate) fn zero_spectra(
        &self,
        data: &MockBatch,
        index: Option<&[usize]>,
    ) -> Result<SpectraBatch, GeneratorError> {
        let data = self.subset(data, index)?;
        let fluxes = vec![BandFluxes::default(); data.len()];
        let (targets, truth) = self.build_tables(&data, &fluxes)?;
        let mut objtruth = Table::new();
        objtruth.add_column("TARGETID", targetids(&data))?;

        Ok(SpectraBatch {
            flux: Array2::zeros((data.len(), self.settings.wave.len())),
            wave: self.settings.wave.clone(),
            targets,
            truth,
            objtruth,
        })
    }

    /// Targets and truth tables from intrinsic band fluxes
    fn build_tables(
        &self,
        data: &MockBatch,
        fluxes: &[BandFluxes],
    ) -> Result<(Table, Table), TableError> {
        let n = data.len();
        let records = &data.records;
        let floats = |f: &dyn Fn(usize) -> f64| (0..n).map(f).collect::<Vec<f64>>();

        let mut targets = Table::new();
        targets.add_column("TARGETID", targetids(data))?;
        targets.add_column("MOCKID", targetids(data))?;
        targets.add_column("RA", floats(&|i| records[i].ra))?;
        targets.add_column("DEC", floats(&|i| records[i].dec))?;
        targets.add_column(
            "BRICKNAME",
            records.iter().map(|r| r.brickname.clone()).collect::<Vec<_>>(),
        )?;
        targets.add_column(
            "HPXPIXEL",
            records.iter().map(|r| r.hpxpixel as i64).collect::<Vec<_>>(),
        )?;
        for band in PhotometricBand::ALL {
            targets.add_column(
                band.flux_column(),
                floats(&|i| fluxes[i].get(band) * records[i].mw_transmission.get(band)),
            )?;
        }
        for band in PhotometricBand::ALL {
            targets.add_column(
                band.transmission_column(),
                floats(&|i| records[i].mw_transmission.get(band)),
            )?;
        }
        targets.add_column("EBV", floats(&|i| records[i].ebv))?;
        targets.add_column("PHOTSYS", vec![self.region().photsys().to_string(); n])?;
        for column in [DESI_TARGET, BGS_TARGET, MWS_TARGET, OBSCONDITIONS] {
            targets.add_column(column, vec![0i64; n])?;
        }
        targets.add_column("SUBPRIORITY", floats(&|i| subpriority(records[i].seed)))?;

        let magfilter = self
            .class
            .normfilter()
            .map_or("", |band| band.decam_filter());
        let mut truth = Table::new();
        truth.add_column("TARGETID", targetids(data))?;
        truth.add_column("MOCKID", targetids(data))?;
        truth.add_column("TRUEZ", floats(&|i| records[i].z))?;
        truth.add_column("TRUESPECTYPE", vec![self.class.spectype().to_string(); n])?;
        truth.add_column("TEMPLATETYPE", vec![self.class.name().to_string(); n])?;
        truth.add_column("TEMPLATESUBTYPE", vec![String::new(); n])?;
        truth.add_column("MAG", floats(&|i| records[i].mag))?;
        truth.add_column("MAGFILTER", vec![magfilter.to_string(); n])?;
        for band in PhotometricBand::ALL {
            truth.add_column(band.flux_column(), floats(&|i| fluxes[i].get(band)))?;
        }
        truth.add_column(
            "SEED",
            records.iter().map(|r| r.seed as i64).collect::<Vec<_>>(),
        )?;

        Ok((targets, truth))
    }
}

fn targetids(data: &MockBatch) -> Vec<i64> {
    data.records.iter().map(|r| r.mockid.as_i64()).collect()
}

/// Fiber-assignment tie breaker in [0, 1), fixed by the object seed
fn subpriority(seed: u32) -> f64 {
    let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
    rng.set_stream(1);
    rng.random::<f64>()
}

/// Generator for any object class
pub enum Generator {
    Qso(QsoGenerator),
    Lrg(LrgGenerator),
    Elg(ElgGenerator),
    Bgs(BgsGenerator),
    Sky(SkyGenerator),
}

impl Generator {
    pub fn new(class: ObjectClass, settings: GeneratorSettings) -> Self {
        match class {
            ObjectClass::Qso => Generator::Qso(QsoGenerator::new(settings)),
            ObjectClass::Lrg => Generator::Lrg(LrgGenerator::new(settings)),
            ObjectClass::Elg => Generator::Elg(ElgGenerator::new(settings)),
            ObjectClass::Bgs => Generator::Bgs(BgsGenerator::new(settings)),
            ObjectClass::Sky => Generator::Sky(SkyGenerator::new(settings)),
        }
    }

    fn inner(&self) -> &dyn ObjectGenerator {
        match self {
            Generator::Qso(g) => g,
            Generator::Lrg(g) => g,
            Generator::Elg(g) => g,
            Generator::Bgs(g) => g,
            Generator::Sky(g) => g,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ObjectGenerator {
        match self {
            Generator::Qso(g) => g,
            Generator::Lrg(g) => g,
            Generator::Elg(g) => g,
            Generator::Bgs(g) => g,
            Generator::Sky(g) => g,
        }
    }
}

impl ObjectGenerator for Generator {
    fn class(&self) -> ObjectClass {
        self.inner().class()
    }

    fn wave(&self) -> &Array1<f64> {
        self.inner().wave()
    }

    fn read(
        &mut self,
        reader: &GaussianFieldReader,
        mockfile: &Path,
        nside: u64,
        allowed: Option<&PixelSet>,
    ) -> Result<Option<MockBatch>, GeneratorError> {
        self.inner_mut().read(reader, mockfile, nside, allowed)
    }

    fn make_spectra(
        &self,
        data: &MockBatch,
        index: Option<&[usize]>,
    ) -> Result<SpectraBatch, GeneratorError> {
        self.inner().make_spectra(data, index)
    }

    fn select_targets(&self, targets: &mut Table, truth: &Table) -> Result<(), GeneratorError> {
        log::info!("Selecting targets");
        self.inner().select_targets(targets, truth)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::{MockColumns, UniformDustMap};
    use crate::templates::{default_wave, AnalyticTemplates, WaveConfig};
    use skyindex::BrickGeometry;
    use std::path::PathBuf;
    use tempfile::TempDir;

    pub(crate) fn small_wave() -> Array1<f64> {
        default_wave(&WaveConfig {
            wavemin: 3600.0,
            wavemax: 9800.0,
            dw: 2.0,
        })
        .unwrap()
    }

    pub(crate) fn settings(class: ObjectClass, seed: u64) -> GeneratorSettings {
        GeneratorSettings::new(class, seed, small_wave(), Arc::new(AnalyticTemplates))
    }

    pub(crate) fn reader() -> GaussianFieldReader {
        GaussianFieldReader::new(BrickGeometry::default()).with_dust(Arc::new(UniformDustMap(0.02)))
    }

    /// Mock file with `n` objects scattered over a small patch
    pub(crate) fn write_mock(dir: &TempDir, n: usize, mag: Option<f64>) -> PathBuf {
        let path = dir.path().join("mock.json");
        let mut columns = MockColumns::new()
            .with("RA", (0..n).map(|i| 150.0 + 0.05 * i as f64).collect())
            .with("DEC", (0..n).map(|i| 2.0 + 0.03 * i as f64).collect())
            .with("Z_COSMO", (0..n).map(|i| 0.2 + 0.05 * i as f64).collect())
            .with("DZ_RSD", vec![0.001; n]);
        if let Some(mag) = mag {
            columns = columns.with("MAG", vec![mag; n]);
        }
        columns.write(&path).unwrap();
        path
    }

    #[test]
    fn test_class_names() {
        for class in ObjectClass::ALL {
            assert_eq!(class.name().parse::<ObjectClass>().unwrap(), class);
        }
        assert_eq!("lrg".parse::<ObjectClass>().unwrap(), ObjectClass::Lrg);
        assert!("STAR".parse::<ObjectClass>().is_err());
        assert_eq!(
            serde_json::to_string(&ObjectClass::Bgs).unwrap(),
            "\"BGS\""
        );
    }

    #[test]
    fn test_subpriority_is_stable() {
        assert_eq!(subpriority(42), subpriority(42));
        assert_ne!(subpriority(42), subpriority(43));
        assert!((0.0..1.0).contains(&subpriority(7)));
    }

    #[test]
    fn test_read_draws_seeds_and_vdisp() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_mock(&dir, 5, None);
        let mut lrg = Generator::new(ObjectClass::Lrg, settings(ObjectClass::Lrg, 1));
        let data = lrg.read(&reader(), &path, 64, None).unwrap().unwrap();
        assert!(data.records.iter().all(|r| r.vdisp.is_some()));

        let mut again = Generator::new(ObjectClass::Lrg, settings(ObjectClass::Lrg, 1));
        assert_eq!(again.read(&reader(), &path, 64, None).unwrap().unwrap(), data);

        let mut qso = Generator::new(ObjectClass::Qso, settings(ObjectClass::Qso, 1));
        let data = qso.read(&reader(), &path, 64, None).unwrap().unwrap();
        assert!(data.records.iter().all(|r| r.vdisp.is_none()));
    }

    #[test]
    fn test_make_spectra_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_mock(&dir, 4, Some(21.0));
        let mut elg = Generator::new(ObjectClass::Elg, settings(ObjectClass::Elg, 9));
        let data = elg.read(&reader(), &path, 64, None).unwrap().unwrap();
        let batch = elg.make_spectra(&data, Some(&[3, 1])).unwrap();

        assert_eq!(batch.flux.dim(), (2, small_wave().len()));
        assert_eq!(batch.targets.nrows(), 2);
        assert_eq!(batch.truth.nrows(), 2);
        assert_eq!(batch.objtruth.nrows(), 2);
        assert_eq!(
            batch.targets.ints("TARGETID").unwrap(),
            &[data.records[3].mockid.as_i64(), data.records[1].mockid.as_i64()]
        );
        assert_eq!(batch.truth.texts("TRUESPECTYPE").unwrap()[0], "GALAXY");
        assert_eq!(batch.truth.texts("MAGFILTER").unwrap()[0], "decam2014-r");
        assert_eq!(batch.objtruth.column_names()[0], "TARGETID");

        // Observed flux is intrinsic flux dimmed by dust
        let observed = batch.targets.floats("FLUX_R").unwrap();
        let intrinsic = batch.truth.floats("FLUX_R").unwrap();
        let transmission = batch.targets.floats("MW_TRANSMISSION_R").unwrap();
        for i in 0..2 {
            approx::assert_relative_eq!(observed[i], intrinsic[i] * transmission[i]);
            assert!(transmission[i] < 1.0);
        }
    }

    #[test]
    fn test_index_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_mock(&dir, 2, None);
        let mut qso = Generator::new(ObjectClass::Qso, settings(ObjectClass::Qso, 2));
        let data = qso.read(&reader(), &path, 64, None).unwrap().unwrap();
        assert!(matches!(
            qso.make_spectra(&data, Some(&[0, 5])),
            Err(GeneratorError::IndexOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn test_empty_index_gives_empty_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_mock(&dir, 3, None);
        for class in ObjectClass::ALL {
            let mut generator = Generator::new(class, settings(class, 4));
            let data = generator.read(&reader(), &path, 64, None).unwrap().unwrap();
            let batch = generator.make_spectra(&data, Some(&[])).unwrap();
            assert_eq!(batch.flux.dim(), (0, small_wave().len()), "{class}");
            assert_eq!(batch.targets.nrows(), 0);
            assert!(batch.targets.has_column("DESI_TARGET"));
            assert!(batch.truth.has_column("TRUEZ"));
            assert!(batch.objtruth.has_column("TARGETID"));
        }
    }

    #[test]
    fn test_wrong_class_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_mock(&dir, 2, None);
        let mut qso = Generator::new(ObjectClass::Qso, settings(ObjectClass::Qso, 2));
        let data = qso.read(&reader(), &path, 64, None).unwrap().unwrap();
        let lrg = Generator::new(ObjectClass::Lrg, settings(ObjectClass::Lrg, 2));
        assert!(matches!(
            lrg.make_spectra(&data, None),
            Err(GeneratorError::WrongClass { .. })
        ));
    }
}
