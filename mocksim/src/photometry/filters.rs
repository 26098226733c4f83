//! The five imaging bands carried by every mock target

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::spectrum::Band;

/// DECam g, r, z and WISE W1, W2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhotometricBand {
    G,
    R,
    Z,
    W1,
    W2,
}

impl PhotometricBand {
    pub const ALL: [PhotometricBand; 5] = [
        PhotometricBand::G,
        PhotometricBand::R,
        PhotometricBand::Z,
        PhotometricBand::W1,
        PhotometricBand::W2,
    ];

    /// Upper-case name used in column suffixes, e.g. `FLUX_W1`
    pub fn name(&self) -> &'static str {
        match self {
            PhotometricBand::G => "G",
            PhotometricBand::R => "R",
            PhotometricBand::Z => "Z",
            PhotometricBand::W1 => "W1",
            PhotometricBand::W2 => "W2",
        }
    }

    /// Top-hat approximation of the filter response
    pub fn band(&self) -> Band {
        match self {
            PhotometricBand::G => Band::from_nm_bounds(400.0, 550.0),
            PhotometricBand::R => Band::from_nm_bounds(560.0, 710.0),
            PhotometricBand::Z => Band::from_nm_bounds(850.0, 1000.0),
            PhotometricBand::W1 => Band::from_nm_bounds(2950.0, 3850.0),
            PhotometricBand::W2 => Band::from_nm_bounds(4100.0, 5100.0),
        }
    }

    /// Galactic extinction A_band / E(B-V)
    pub fn extinction_coefficient(&self) -> f64 {
        match self {
            PhotometricBand::G => 3.214,
            PhotometricBand::R => 2.165,
            PhotometricBand::Z => 1.221,
            PhotometricBand::W1 => 0.184,
            PhotometricBand::W2 => 0.113,
        }
    }

    /// Survey filter name of the southern (DECam) system
    pub fn decam_filter(&self) -> &'static str {
        match self {
            PhotometricBand::G => "decam2014-g",
            PhotometricBand::R => "decam2014-r",
            PhotometricBand::Z => "decam2014-z",
            PhotometricBand::W1 => "wise2010-W1",
            PhotometricBand::W2 => "wise2010-W2",
        }
    }

    pub fn flux_column(&self) -> String {
        format!("FLUX_{}", self.name())
    }

    pub fn transmission_column(&self) -> String {
        format!("MW_TRANSMISSION_{}", self.name())
    }
}

impl fmt::Display for PhotometricBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PhotometricBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhotometricBand::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown band {s}"))
    }
}

/// Fluxes in nanomaggies in the five bands
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandFluxes {
    pub g: f64,
    pub r: f64,
    pub z: f64,
    pub w1: f64,
    pub w2: f64,
}

impl BandFluxes {
    pub fn get(&self, band: PhotometricBand) -> f64 {
        match band {
            PhotometricBand::G => self.g,
            PhotometricBand::R => self.r,
            PhotometricBand::Z => self.z,
            PhotometricBand::W1 => self.w1,
            PhotometricBand::W2 => self.w2,
        }
    }

    pub fn set(&mut self, band: PhotometricBand, value: f64) {
        match band {
            PhotometricBand::G => self.g = value,
            PhotometricBand::R => self.r = value,
            PhotometricBand::Z => self.z = value,
            PhotometricBand::W1 => self.w1 = value,
            PhotometricBand::W2 => self.w2 = value,
        }
    }

    /// Element-wise product, e.g. intrinsic flux times MW transmission
    pub fn scaled_by(&self, factors: &BandFluxes) -> BandFluxes {
        BandFluxes {
            g: self.g * factors.g,
            r: self.r * factors.r,
            z: self.z * factors.z,
            w1: self.w1 * factors.w1,
            w2: self.w2 * factors.w2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_names_roundtrip() {
        for band in PhotometricBand::ALL {
            assert_eq!(band.name().parse::<PhotometricBand>().unwrap(), band);
        }
        assert_eq!("w2".parse::<PhotometricBand>().unwrap(), PhotometricBand::W2);
        assert!("u".parse::<PhotometricBand>().is_err());
    }

    #[test]
    fn test_bands_are_ordered_in_wavelength() {
        let centers: Vec<f64> = PhotometricBand::ALL.iter().map(|b| b.band().center()).collect();
        assert!(centers.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_extinction_decreases_with_wavelength() {
        let coeffs: Vec<f64> = PhotometricBand::ALL
            .iter()
            .map(|b| b.extinction_coefficient())
            .collect();
        assert!(coeffs.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_band_fluxes_accessors() {
        let mut f = BandFluxes::default();
        f.set(PhotometricBand::W1, 3.0);
        assert_eq!(f.get(PhotometricBand::W1), 3.0);
        let t = BandFluxes {
            g: 0.5,
            r: 0.5,
            z: 0.5,
            w1: 0.5,
            w2: 0.5,
        };
        assert_eq!(f.scaled_by(&t).w1, 1.5);
    }
}
