//! Release annotations for a merged targets table
//!
//! Adds de-reddened colors, the sample each target belongs to, and the
//! magnitude and filter that sample is defined in.

use crate::photometry::{flux2mag, PhotometricBand};
use crate::selection::{DesiMask, TargetBit, DESI_TARGET};
use crate::table::{Table, TableError};

/// Samples in increasing precedence; a target in several keeps the last
const SAMPLE_PRECEDENCE: [(TargetBit, &str); 4] = [
    (DesiMask::BGS_ANY, "BGS"),
    (DesiMask::LRG, "LRG"),
    (DesiMask::ELG, "ELG"),
    (DesiMask::QSO, "QSO"),
];

fn dereddened(targets: &Table, band: PhotometricBand) -> Result<Vec<f64>, TableError> {
    let flux = targets.floats(&band.flux_column())?;
    let transmission = targets.floats(&band.transmission_column())?;
    Ok(flux
        .iter()
        .zip(transmission)
        .map(|(f, t)| if *t > 0.0 { f / t } else { 0.0 })
        .collect())
}

fn sample_of(desi_target: i64) -> &'static str {
    SAMPLE_PRECEDENCE
        .iter()
        .filter(|(bit, _)| bit.is_set(desi_target))
        .map(|(_, name)| *name)
        .last()
        .unwrap_or("")
}

fn magfilter(sample: &str, photsys: &str) -> &'static str {
    match (sample == "LRG", photsys) {
        (true, "N") => "MzLS-z",
        (false, "N") => "BASS-r",
        (true, _) => "decam2014-z",
        (false, _) => "decam2014-r",
    }
}

/// Add `GR`, `RZ`, `ZW1`, `W1W2`, `SAMPLE`, `MAG` and `MAGFILTER` to
/// `targets`, replacing any earlier values.
pub fn annotate_release(targets: &mut Table) -> Result<(), TableError> {
    let mags: Vec<Vec<f64>> = PhotometricBand::ALL
        .iter()
        .map(|&band| {
            dereddened(targets, band).map(|fluxes| fluxes.into_iter().map(flux2mag).collect())
        })
        .collect::<Result<_, _>>()?;
    let [g, r, z, w1, w2] = [&mags[0][..], &mags[1][..], &mags[2][..], &mags[3][..], &mags[4][..]];
    let color = |a: &[f64], b: &[f64]| a.iter().zip(b).map(|(x, y)| x - y).collect::<Vec<f64>>();

    let samples: Vec<&'static str> = targets
        .ints(DESI_TARGET)?
        .iter()
        .map(|&bits| sample_of(bits))
        .collect();
    let photsys = targets.texts("PHOTSYS")?;
    let mag: Vec<f64> = samples
        .iter()
        .enumerate()
        .map(|(i, &s)| if s == "LRG" { z[i] } else { r[i] })
        .collect();
    let filters: Vec<String> = samples
        .iter()
        .zip(photsys)
        .map(|(s, p)| magfilter(s, p).to_string())
        .collect();

    targets.set_column("GR", color(g, r))?;
    targets.set_column("RZ", color(r, z))?;
    targets.set_column("ZW1", color(z, w1))?;
    targets.set_column("W1W2", color(w1, w2))?;
    targets.set_column(
        "SAMPLE",
        samples.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
    )?;
    targets.set_column("MAG", mag)?;
    targets.set_column("MAGFILTER", filters)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::mag_to_nanomaggies;
    use approx::assert_relative_eq;

    fn targets(desi: Vec<i64>, photsys: &[&str]) -> Table {
        let n = desi.len();
        let mut t = Table::new();
        let mags = [21.0, 20.5, 20.0, 19.0, 19.5];
        for (band, mag) in PhotometricBand::ALL.iter().zip(mags) {
            t.add_column(band.flux_column(), vec![mag_to_nanomaggies(mag) * 0.9; n])
                .unwrap();
        }
        for band in PhotometricBand::ALL {
            t.add_column(band.transmission_column(), vec![0.9; n]).unwrap();
        }
        t.add_column(DESI_TARGET, desi).unwrap();
        t.add_column(
            "PHOTSYS",
            photsys.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        )
        .unwrap();
        t
    }

    #[test]
    fn test_colors_are_dereddened() {
        let mut t = targets(vec![DesiMask::ELG.mask() as i64], &["S"]);
        annotate_release(&mut t).unwrap();
        assert_relative_eq!(t.floats("GR").unwrap()[0], 0.5, epsilon = 1e-9);
        assert_relative_eq!(t.floats("RZ").unwrap()[0], 0.5, epsilon = 1e-9);
        assert_relative_eq!(t.floats("ZW1").unwrap()[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(t.floats("W1W2").unwrap()[0], -0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_sample_precedence_and_filters() {
        let both = (DesiMask::LRG.mask() | DesiMask::QSO.mask()) as i64;
        let mut t = targets(
            vec![
                DesiMask::LRG.mask() as i64,
                DesiMask::LRG.mask() as i64,
                both,
                DesiMask::BGS_ANY.mask() as i64,
                0,
            ],
            &["S", "N", "S", "N", "S"],
        );
        annotate_release(&mut t).unwrap();
        assert_eq!(t.texts("SAMPLE").unwrap(), &["LRG", "LRG", "QSO", "BGS", ""]);
        assert_eq!(
            t.texts("MAGFILTER").unwrap(),
            &["decam2014-z", "MzLS-z", "decam2014-r", "BASS-r", "decam2014-r"]
        );
        let mag = t.floats("MAG").unwrap();
        assert_relative_eq!(mag[0], 20.0, epsilon = 1e-9);
        assert_relative_eq!(mag[2], 20.5, epsilon = 1e-9);
    }

    #[test]
    fn test_annotate_twice() {
        let mut t = targets(vec![0, 0], &["S", "S"]);
        annotate_release(&mut t).unwrap();
        let once = t.clone();
        annotate_release(&mut t).unwrap();
        assert_eq!(t, once);
    }

    #[test]
    fn test_zero_flux_maps_to_zero_mag() {
        let mut t = targets(vec![0], &["S"]);
        t.floats_mut("FLUX_R").unwrap()[0] = 0.0;
        annotate_release(&mut t).unwrap();
        assert_eq!(t.floats("MAG").unwrap()[0], 0.0);
    }
}
