//! Quasars

use std::path::Path;

use ndarray::Array1;
use skyindex::PixelSet;

use super::{
    GeneratorCore, GeneratorError, GeneratorSettings, ObjectClass, ObjectGenerator, SpectraBatch,
};
use crate::catalog::{GaussianFieldReader, MockBatch};
use crate::selection::{select_with_cut, DesiMask, QsoColors};
use crate::table::Table;

pub struct QsoGenerator {
    core: GeneratorCore,
}

impl QsoGenerator {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self {
            core: GeneratorCore::new(ObjectClass::Qso, settings),
        }
    }
}

impl ObjectGenerator for QsoGenerator {
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

    /// Optical color box only; mock fluxes carry no reliable WISE colors
    fn select_targets(&self, targets: &mut Table, _truth: &Table) -> Result<(), GeneratorError> {
        select_with_cut(
            targets,
            &QsoColors { optical: true },
            DesiMask::QSO,
            self.core.region(),
        )?;
        Ok(())
    }
}
