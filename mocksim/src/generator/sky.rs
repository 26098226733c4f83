//! Blank sky positions
//!
//! Sky fibers carry no spectrum: the flux array is all zeros and every
//! position is a target.

use std::path::Path;

use ndarray::Array1;
use skyindex::PixelSet;

use super::{
    GeneratorCore, GeneratorError, GeneratorSettings, ObjectClass, ObjectGenerator, SpectraBatch,
};
use crate::catalog::{GaussianFieldReader, MockBatch};
use crate::selection::{or_target_bits, DesiMask, TargetBits};
use crate::table::Table;

pub struct SkyGenerator {
    core: GeneratorCore,
}

impl SkyGenerator {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self {
            core: GeneratorCore::new(ObjectClass::Sky, settings),
        }
    }
}

impl ObjectGenerator for SkyGenerator {
    fn class(&self) -> ObjectClass {
        self.core.class()
    }

    fn wave(&self) -> &Array1<f64> {
        self.core.wave()
    }

    fn read(
        &mut self,
        reader: &GaussianFieldReader,
        mockfile: &Path,
        nside: u64,
        allowed: Option<&PixelSet>,
    ) -> Result<Option<MockBatch>, GeneratorError> {
        self.core.read(reader, mockfile, nside, allowed)
    }

    fn make_spectra(
        &self,
        data: &MockBatch,
        index: Option<&[usize]>,
    ) -> Result<SpectraBatch, GeneratorError> {
        self.core.zero_spectra(data, index)
    }

    fn select_targets(&self, targets: &mut Table, _truth: &Table) -> Result<(), GeneratorError> {
        let everything = vec![true; targets.nrows()];
        or_target_bits(targets, &everything, &TargetBits::new(&[DesiMask::SKY], &[]))?;
        Ok(())
    }
}
