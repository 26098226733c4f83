//! Rectangular brick layout of the imaging survey.
//!
//! The sky is cut into rows of constant declination height `bricksize`, with
//! row centres at -90, -90 + bricksize, ..., +90. Each row is divided into an
//! even number of equal RA columns chosen so that bricks are no wider than
//! `bricksize` at the row edge closest to the equator. The polar rows are a
//! single brick each.

use thiserror::Error;

/// Errors from brick geometry construction and lookup
#[derive(Debug, Error, PartialEq)]
pub enum BrickError {
    #[error("Brick size must be positive and divide 180 degrees, got {0}")]
    InvalidSize(f64),
}

/// Brick rows and columns for one brick size
#[derive(Debug, Clone)]
pub struct BrickGeometry {
    bricksize: f64,
    ncol_per_row: Vec<usize>,
}

impl BrickGeometry {
    /// Default imaging brick size in degrees
    pub const DEFAULT_BRICKSIZE: f64 = 0.25;

    pub fn new(bricksize: f64) -> Result<Self, BrickError> {
        if !bricksize.is_finite() || bricksize <= 0.0 {
            return Err(BrickError::InvalidSize(bricksize));
        }
        let rows = 180.0 / bricksize;
        if (rows - rows.round()).abs() > 1e-9 {
            return Err(BrickError::InvalidSize(bricksize));
        }
        Ok(Self::build(bricksize))
    }

    fn build(bricksize: f64) -> Self {
        let nrow = (180.0 / bricksize).round() as usize + 1;
        let mut ncol_per_row: Vec<usize> = (0..nrow)
            .map(|i| {
                let center_dec = -90.0 + i as f64 * bricksize;
                let declo = center_dec.abs() - bricksize / 2.0;
                let n = 360.0 / bricksize * declo.to_radians().cos();
                ((n / 2.0).ceil() * 2.0) as usize
            })
            .collect();

        ncol_per_row[0] = 1;
        ncol_per_row[nrow - 1] = 1;

        Self {
            bricksize,
            ncol_per_row,
        }
    }

    pub fn bricksize(&self) -> f64 {
        self.bricksize
    }

    pub fn nrows(&self) -> usize {
        self.ncol_per_row.len()
    }

    /// Number of RA columns in brick row `row`
    pub fn ncols(&self, row: usize) -> usize {
        self.ncol_per_row[row]
    }

    /// Total number of bricks on the sky
    pub fn nbricks(&self) -> usize {
        self.ncol_per_row.iter().sum()
    }

    fn row_col(&self, ra: f64, dec: f64) -> (usize, usize) {
        let row = ((dec + 90.0 + self.bricksize / 2.0) / self.bricksize).max(0.0) as usize;
        let row = row.min(self.nrows() - 1);

        let ncol = self.ncol_per_row[row];
        let ra = ra.rem_euclid(360.0);
        let col = ((ra / 360.0 * ncol as f64) as usize).min(ncol - 1);
        (row, col)
    }

    fn center_of(&self, row: usize, col: usize) -> (f64, f64) {
        let ncol = self.ncol_per_row[row] as f64;
        let width = 360.0 / ncol;
        let ra = (col as f64 + 0.5) * width;
        let dec = -90.0 + row as f64 * self.bricksize;
        (ra, dec)
    }

    /// Centre (ra, dec) in degrees of the brick containing a position
    pub fn brick_center(&self, ra: f64, dec: f64) -> (f64, f64) {
        let (row, col) = self.row_col(ra, dec);
        self.center_of(row, col)
    }

    /// (ra_min, ra_max, dec_min, dec_max) of the brick containing a position
    pub fn brick_bounds(&self, ra: f64, dec: f64) -> (f64, f64, f64, f64) {
        let (row, col) = self.row_col(ra, dec);
        let width = 360.0 / self.ncol_per_row[row] as f64;
        let (_, center_dec) = self.center_of(row, col);
        let half = self.bricksize / 2.0;
        (
            col as f64 * width,
            (col + 1) as f64 * width,
            (center_dec - half).max(-90.0),
            (center_dec + half).min(90.0),
        )
    }

    /// Name of the brick containing (ra, dec), e.g. `1501p022`
    pub fn brickname(&self, ra: f64, dec: f64) -> String {
        let (row, col) = self.row_col(ra, dec);
        let (cra, cdec) = self.center_of(row, col);
        let pm = if cdec >= 0.0 { 'p' } else { 'm' };
        format!(
            "{:04}{}{:03}",
            (cra * 10.0) as u32,
            pm,
            (cdec.abs() * 10.0) as u32
        )
    }
}

impl Default for BrickGeometry {
    fn default() -> Self {
        Self::build(Self::DEFAULT_BRICKSIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_bricknames() {
        let bricks = BrickGeometry::default();
        assert_eq!(bricks.brickname(0.1, 0.1), "0001p000");
        assert_eq!(bricks.brickname(150.1, 2.2), "1501p022");
        assert_eq!(bricks.brickname(150.1, -2.2), "1501m022");
    }

    #[test]
    fn test_polar_rows_single_brick() {
        let bricks = BrickGeometry::default();
        assert_eq!(bricks.nrows(), 721);
        assert_eq!(bricks.ncols(0), 1);
        assert_eq!(bricks.ncols(720), 1);
        assert_eq!(bricks.brickname(12.0, 90.0), "1800p900");
        assert_eq!(bricks.brickname(250.0, -90.0), "1800m900");
    }

    #[test]
    fn test_equatorial_row_width() {
        let bricks = BrickGeometry::default();
        assert_eq!(bricks.ncols(360), 1440);
        // Rows get narrower toward the poles and always hold an even count
        for row in 1..bricks.nrows() - 1 {
            assert_eq!(bricks.ncols(row) % 2, 0);
            assert!(bricks.ncols(row) <= 1440);
        }
    }

    #[test]
    fn test_bounds_contain_position() {
        let bricks = BrickGeometry::default();
        for &(ra, dec) in &[(10.3, 45.6), (359.99, -30.1), (0.0, 0.0), (180.0, 80.0)] {
            let (ramin, ramax, decmin, decmax) = bricks.brick_bounds(ra, dec);
            assert!(ra >= ramin && ra < ramax, "{ra} not in [{ramin}, {ramax})");
            assert!(dec >= decmin && dec <= decmax);
            let (cra, cdec) = bricks.brick_center(ra, dec);
            assert!(cra > ramin && cra < ramax);
            assert!(cdec >= decmin && cdec <= decmax);
        }
    }

    #[test]
    fn test_ra_wraps() {
        let bricks = BrickGeometry::default();
        assert_eq!(bricks.brickname(-0.1, 5.0), bricks.brickname(359.9, 5.0));
    }

    #[test]
    fn test_invalid_size() {
        assert_eq!(
            BrickGeometry::new(0.0).unwrap_err(),
            BrickError::InvalidSize(0.0)
        );
        assert!(BrickGeometry::new(0.7).is_err());
        assert!(BrickGeometry::new(0.5).is_ok());
    }
}
