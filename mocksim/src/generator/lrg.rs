//! Luminous red galaxies

use std::path::Path;

use ndarray::Array1;
use skyindex::PixelSet;

use super::{
    GeneratorCore, GeneratorError, GeneratorSettings, ObjectClass, ObjectGenerator, SpectraBatch,
};
use crate::catalog::{GaussianFieldReader, MockBatch};
use crate::selection::{select_with_cut, DesiMask, LrgColors};
use crate::table::Table;

/// Red galaxies with grouped velocity dispersions (log-normal, mean 10^2.3 km/s
/// by default)
pub struct LrgGenerator {
    core: GeneratorCore,
}

impl LrgGenerator {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self {
            core: GeneratorCore::new(ObjectClass::Lrg, settings),
        }
    }
}

impl ObjectGenerator for LrgGenerator {
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
        select_with_cut(targets, &LrgColors, DesiMask::LRG, self.core.region())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::tests::{reader, settings, write_mock};
    use crate::selection::{Region, DESI_TARGET};

    #[test]
    fn test_bright_lrgs_are_selected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_mock(&dir, 5, Some(19.5));
        let mut s = settings(ObjectClass::Lrg, 5);
        s.region = Region::North;
        let mut lrg = LrgGenerator::new(s);
        let data = lrg.read(&reader(), &path, 64, None).unwrap().unwrap();
        let mut batch = lrg.make_spectra(&data, None).unwrap();
        lrg.select_targets(&mut batch.targets, &batch.truth).unwrap();

        assert_eq!(batch.targets.texts("PHOTSYS").unwrap()[0], "N");
        assert_eq!(batch.truth.texts("MAGFILTER").unwrap()[0], "decam2014-z");
        for &bits in batch.targets.ints(DESI_TARGET).unwrap() {
            assert_eq!(DesiMask::LRG.is_set(bits), DesiMask::LRG_NORTH.is_set(bits));
            assert!(!DesiMask::LRG_SOUTH.is_set(bits));
        }
    }
}
