//! Bright galaxy survey targets

use std::path::Path;

use ndarray::Array1;
use skyindex::PixelSet;

use super::{
    GeneratorCore, GeneratorError, GeneratorSettings, ObjectClass, ObjectGenerator, SpectraBatch,
};
use crate::catalog::{GaussianFieldReader, MockBatch};
use crate::selection::{
    band_fluxes, or_target_bits, BgsColors, BgsMask, ColorCut, DesiMask, TargetBits,
};
use crate::table::Table;

pub struct BgsGenerator {
    core: GeneratorCore,
}

impl BgsGenerator {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self {
            core: GeneratorCore::new(ObjectClass::Bgs, settings),
        }
    }
}

impl ObjectGenerator for BgsGenerator {
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

    /// Bright and faint samples each set their `BGS_TARGET` bit with its
    /// regional variant, plus `BGS_ANY` in `DESI_TARGET`.
    fn select_targets(&self, targets: &mut Table, _truth: &Table) -> Result<(), GeneratorError> {
        let fluxes = band_fluxes(targets)?;
        let region = self.core.region();

        for (cut, bit) in [
            (BgsColors { faint: false }, BgsMask::BGS_BRIGHT),
            (BgsColors { faint: true }, BgsMask::BGS_FAINT),
        ] {
            let passes = cut.apply(&fluxes);
            let mut bgs = vec![bit];
            bgs.extend(region.variant(bit));
            let bits = TargetBits::new(&[DesiMask::BGS_ANY], &bgs);
            let nselected = or_target_bits(targets, &passes, &bits)?;
            log::debug!("{} cut selected {} of {} targets", cut.name(), nselected, passes.len());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::tests::{reader, settings, write_mock};
    use crate::photometry::{flux2mag, PhotometricBand};
    use crate::selection::{ObsConditions, BGS_TARGET, DESI_TARGET, OBSCONDITIONS};
    use rstest::rstest;

    #[rstest]
    #[case(18.0, BgsMask::BGS_BRIGHT, BgsMask::BGS_BRIGHT_SOUTH)]
    #[case(19.8, BgsMask::BGS_FAINT, BgsMask::BGS_FAINT_SOUTH)]
    fn test_bright_and_faint(
        #[case] mag: f64,
        #[case] primary: crate::selection::TargetBit,
        #[case] variant: crate::selection::TargetBit,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = write_mock(&dir, 3, Some(mag));
        let mut bgs = BgsGenerator::new(settings(ObjectClass::Bgs, 8));
        let data = bgs.read(&reader(), &path, 64, None).unwrap().unwrap();
        let mut batch = bgs.make_spectra(&data, None).unwrap();
        bgs.select_targets(&mut batch.targets, &batch.truth).unwrap();

        let observed_r = batch.targets.floats(&PhotometricBand::R.flux_column()).unwrap();
        for (i, &bits) in batch.targets.ints(BGS_TARGET).unwrap().iter().enumerate() {
            // Dust dims the template magnitude slightly
            let r = flux2mag(observed_r[i]);
            assert!(r > mag && r < mag + 0.1);
            assert!(primary.is_set(bits));
            assert!(variant.is_set(bits));
            assert!(DesiMask::BGS_ANY.is_set(batch.targets.ints(DESI_TARGET).unwrap()[i]));
            assert_eq!(
                batch.targets.ints(OBSCONDITIONS).unwrap()[i] as u64,
                ObsConditions::BRIGHT
            );
        }
    }
}
