//! Photometric color cuts for the target classes
//!
//! Each cut works on fluxes in nanomaggies. Magnitudes and colors are only
//! formed from positive fluxes; an object with a non-positive flux in a band
//! a cut needs never passes that cut.

use crate::photometry::{flux2mag, BandFluxes};

/// Membership predicate over the five band fluxes
pub trait ColorCut: Send + Sync {
    fn name(&self) -> &'static str;

    fn passes(&self, fluxes: &BandFluxes) -> bool;

    fn apply(&self, fluxes: &[BandFluxes]) -> Vec<bool> {
        fluxes.iter().map(|f| self.passes(f)).collect()
    }
}

fn positive(values: &[f64]) -> bool {
    values.iter().all(|&v| v > 0.0 && v.is_finite())
}

/// Quasar colors. `optical` skips the WISE infrared cuts.
#[derive(Debug, Clone, Copy)]
pub struct QsoColors {
    pub optical: bool,
}

impl ColorCut for QsoColors {
    fn name(&self) -> &'static str {
        "QSO"
    }

    fn passes(&self, f: &BandFluxes) -> bool {
        if !positive(&[f.g, f.r, f.z]) {
            return false;
        }
        let (g, r, z) = (flux2mag(f.g), flux2mag(f.r), flux2mag(f.z));
        let grz_flux = (f.g + 0.8 * f.r + 0.5 * f.z) / 2.3;
        let grz = flux2mag(grz_flux);

        let mut qso = r < 22.7 && grz > 17.0;
        qso &= g - r < 1.3;
        qso &= r - z > -0.4 && r - z < 1.1;

        if !self.optical {
            if !positive(&[f.w1, f.w2]) {
                return false;
            }
            let (w1, w2) = (flux2mag(f.w1), flux2mag(f.w2));
            let w = flux2mag(0.75 * f.w1 + 0.25 * f.w2);
            qso &= w1 - w2 > -0.4;
            qso &= grz - w > (g - z) - 1.0;
        }
        qso
    }
}

/// Luminous red galaxy colors
#[derive(Debug, Clone, Copy, Default)]
pub struct LrgColors;

impl ColorCut for LrgColors {
    fn name(&self) -> &'static str {
        "LRG"
    }

    fn passes(&self, f: &BandFluxes) -> bool {
        if !positive(&[f.r, f.z, f.w1]) {
            return false;
        }
        let (r, z, w1) = (flux2mag(f.r), flux2mag(f.z), flux2mag(f.w1));
        z < 20.4 && r - z > 0.65 && z - w1 > 0.8 * (r - z) - 0.6
    }
}

/// Emission line galaxy colors
#[derive(Debug, Clone, Copy, Default)]
pub struct ElgColors;

impl ColorCut for ElgColors {
    fn name(&self) -> &'static str {
        "ELG"
    }

    fn passes(&self, f: &BandFluxes) -> bool {
        if !positive(&[f.g, f.r, f.z]) {
            return false;
        }
        let (g, r, z) = (flux2mag(f.g), flux2mag(f.r), flux2mag(f.z));
        let (gr, rz) = (g - r, r - z);
        g > 20.0
            && g < 23.4
            && rz > 0.3
            && rz < 1.6
            && gr < 1.15 * rz - 0.15
            && gr < 1.6 - 1.2 * rz
    }
}

/// Bright galaxy survey magnitude limits, bright (r < 19.5) or faint
/// (19.5 <= r < 20)
#[derive(Debug, Clone, Copy)]
pub struct BgsColors {
    pub faint: bool,
}

impl BgsColors {
    pub const BRIGHT_LIMIT: f64 = 19.5;
    pub const FAINT_LIMIT: f64 = 20.0;
}

impl ColorCut for BgsColors {
    fn name(&self) -> &'static str {
        if self.faint {
            "BGS_FAINT"
        } else {
            "BGS_BRIGHT"
        }
    }

    fn passes(&self, f: &BandFluxes) -> bool {
        if !positive(&[f.r]) {
            return false;
        }
        let r = flux2mag(f.r);
        if self.faint {
            (Self::BRIGHT_LIMIT..Self::FAINT_LIMIT).contains(&r)
        } else {
            r < Self::BRIGHT_LIMIT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::mag_to_nanomaggies;
    use rstest::rstest;

    fn from_mags(g: f64, r: f64, z: f64, w1: f64, w2: f64) -> BandFluxes {
        BandFluxes {
            g: mag_to_nanomaggies(g),
            r: mag_to_nanomaggies(r),
            z: mag_to_nanomaggies(z),
            w1: mag_to_nanomaggies(w1),
            w2: mag_to_nanomaggies(w2),
        }
    }

    #[rstest]
    #[case(from_mags(21.2, 21.0, 20.6, 19.5, 19.0), true)]
    #[case(from_mags(23.5, 23.0, 22.6, 21.0, 20.5), false)] // too faint in r
    #[case(from_mags(22.8, 21.0, 20.6, 19.5, 19.0), false)] // g - r too red
    #[case(from_mags(21.2, 21.0, 19.5, 19.5, 19.0), false)] // r - z too red
    #[case(from_mags(16.0, 15.8, 15.5, 15.0, 14.5), false)] // grz too bright
    fn test_qso_optical(#[case] fluxes: BandFluxes, #[case] expected: bool) {
        assert_eq!(QsoColors { optical: true }.passes(&fluxes), expected);
    }

    #[test]
    fn test_qso_infrared_cut_is_stricter() {
        // Passes the optical box but is blue in W1 - W2
        let f = from_mags(21.2, 21.0, 20.6, 19.5, 20.5);
        assert!(QsoColors { optical: true }.passes(&f));
        assert!(!QsoColors { optical: false }.passes(&f));
    }

    #[rstest]
    #[case(from_mags(22.5, 20.8, 19.8, 18.6, 18.9), true)]
    #[case(from_mags(22.5, 21.5, 20.6, 19.0, 19.3), false)] // z too faint
    #[case(from_mags(20.5, 20.2, 19.8, 18.6, 18.9), false)] // r - z too blue
    #[case(from_mags(22.5, 20.8, 19.8, 19.7, 20.0), false)] // no infrared excess
    fn test_lrg(#[case] fluxes: BandFluxes, #[case] expected: bool) {
        assert_eq!(LrgColors.passes(&fluxes), expected);
    }

    #[rstest]
    #[case(from_mags(22.8, 22.5, 21.8, 21.0, 21.0), true)]
    #[case(from_mags(19.8, 19.5, 18.8, 18.0, 18.0), false)] // too bright in g
    #[case(from_mags(23.6, 23.3, 22.6, 21.0, 21.0), false)] // too faint in g
    #[case(from_mags(23.0, 22.2, 22.0, 21.0, 21.0), false)] // r - z too blue
    fn test_elg(#[case] fluxes: BandFluxes, #[case] expected: bool) {
        assert_eq!(ElgColors.passes(&fluxes), expected);
    }

    #[test]
    fn test_bgs_split_is_exclusive() {
        let bright = BgsColors { faint: false };
        let faint = BgsColors { faint: true };
        for r in [17.0, 19.4, 19.5, 19.9, 20.1] {
            let f = from_mags(r + 0.8, r, r - 0.4, r - 0.5, r - 0.3);
            assert!(!(bright.passes(&f) && faint.passes(&f)), "r = {r}");
        }
        assert!(bright.passes(&from_mags(19.0, 18.2, 17.8, 17.0, 17.0)));
        assert!(faint.passes(&from_mags(20.5, 19.7, 19.3, 18.5, 18.5)));
        assert!(!faint.passes(&from_mags(21.0, 20.1, 19.7, 19.0, 19.0)));
    }

    #[test]
    fn test_non_positive_flux_never_passes() {
        let mut f = from_mags(21.2, 21.0, 20.6, 19.5, 19.0);
        f.r = 0.0;
        assert!(!QsoColors { optical: true }.passes(&f));
        assert!(!LrgColors.passes(&f));
        assert!(!ElgColors.passes(&f));
        assert!(!BgsColors { faint: false }.passes(&f));
    }

    #[test]
    fn test_apply_maps_rows() {
        let rows = [
            from_mags(21.2, 21.0, 20.6, 19.5, 19.0),
            from_mags(23.5, 23.0, 22.6, 21.0, 20.5),
        ];
        assert_eq!(QsoColors { optical: true }.apply(&rows), vec![true, false]);
    }
}
