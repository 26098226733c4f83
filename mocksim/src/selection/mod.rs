//! Target selection: bit definitions, color cuts and bit accumulation
//!
//! Selection only ever ORs bits into the `DESI_TARGET`, `BGS_TARGET`,
//! `MWS_TARGET` and `OBSCONDITIONS` columns of a targets table, so running
//! the same selection twice leaves the table unchanged.

pub mod cuts;
pub mod masks;

pub use cuts::{BgsColors, ColorCut, ElgColors, LrgColors, QsoColors};
pub use masks::{BgsMask, DesiMask, ObsConditions, Region, TargetBit};

use crate::photometry::{BandFluxes, PhotometricBand};
use crate::table::{Table, TableError};

pub const DESI_TARGET: &str = "DESI_TARGET";
pub const BGS_TARGET: &str = "BGS_TARGET";
pub const MWS_TARGET: &str = "MWS_TARGET";
pub const OBSCONDITIONS: &str = "OBSCONDITIONS";

/// Bits to set on every row that passes a selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetBits {
    pub desi: u64,
    pub bgs: u64,
    pub obsconditions: u64,
}

impl TargetBits {
    /// Combine primary-mask and BGS-mask bits along with their conditions
    pub fn new(desi: &[TargetBit], bgs: &[TargetBit]) -> Self {
        let mut bits = TargetBits::default();
        for bit in desi {
            bits.desi |= bit.mask();
            bits.obsconditions |= bit.obsconditions;
        }
        for bit in bgs {
            bits.bgs |= bit.mask();
            bits.obsconditions |= bit.obsconditions;
        }
        bits
    }
}

/// Observed band fluxes of every row of a targets table
pub fn band_fluxes(targets: &Table) -> Result<Vec<BandFluxes>, TableError> {
    let columns = PhotometricBand::ALL
        .iter()
        .map(|b| targets.floats(&b.flux_column()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((0..targets.nrows())
        .map(|i| {
            let mut f = BandFluxes::default();
            for (band, column) in PhotometricBand::ALL.iter().zip(&columns) {
                f.set(*band, column[i]);
            }
            f
        })
        .collect())
}

/// OR `bits` into every row where `passes` is true; returns the number of
/// selected rows.
pub fn or_target_bits(
    targets: &mut Table,
    passes: &[bool],
    bits: &TargetBits,
) -> Result<usize, TableError> {
    if passes.len() != targets.nrows() {
        return Err(TableError::LengthMismatch {
            name: "selection".to_string(),
            expected: targets.nrows(),
            got: passes.len(),
        });
    }

    for (column, value) in [
        (DESI_TARGET, bits.desi),
        (BGS_TARGET, bits.bgs),
        (OBSCONDITIONS, bits.obsconditions),
    ] {
        if value == 0 {
            continue;
        }
        let values = targets.ints_mut(column)?;
        for (v, &keep) in values.iter_mut().zip(passes) {
            if keep {
                *v |= value as i64;
            }
        }
    }
    Ok(passes.iter().filter(|&&keep| keep).count())
}

/// Run a color cut over a targets table and OR in the primary bit and its
/// regional variant for every passing row.
pub fn select_with_cut(
    targets: &mut Table,
    cut: &dyn ColorCut,
    primary: TargetBit,
    region: Region,
) -> Result<usize, TableError> {
    let passes = cut.apply(&band_fluxes(targets)?);
    let mut desi = vec![primary];
    desi.extend(region.variant(primary));
    let nselected = or_target_bits(targets, &passes, &TargetBits::new(&desi, &[]))?;
    log::debug!(
        "{} cut selected {} of {} targets",
        cut.name(),
        nselected,
        targets.nrows()
    );
    Ok(nselected)
}
