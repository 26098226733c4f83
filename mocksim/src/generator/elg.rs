//! Emission line galaxies

use std::path::Path;

use ndarray::Array1;
use skyindex::PixelSet;

use super::{
    GeneratorCore, GeneratorError, GeneratorSettings, ObjectClass, ObjectGenerator, SpectraBatch,
};
use crate::catalog::{GaussianFieldReader, MockBatch};
use crate::selection::{select_with_cut, DesiMask, ElgColors};
use crate::table::Table;

pub struct ElgGenerator {
    core: GeneratorCore,
}

impl ElgGenerator {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self {
            core: GeneratorCore::new(ObjectClass::Elg, settings),
        }
    }
}

impl ObjectGenerator for ElgGenerator {
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
        self.core.template_spectra(data, index)
    }

    fn select_targets(&self, targets: &mut Table, _truth: &Table) -> Result<(), GeneratorError> {
        select_with_cut(targets, &ElgColors, DesiMask::ELG, self.core.region())?;
        Ok(())
    }
}
