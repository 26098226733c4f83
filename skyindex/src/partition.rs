//! Spatial partitioning of catalog positions into HEALPix pixels and bricks.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::bricks::BrickGeometry;
use crate::healpix::{ang2pix_nest, nside_to_order};
use crate::sphere::normalize_ra;

/// Set of nested HEALPix pixel indices
pub type PixelSet = BTreeSet<u64>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PixelError {
    #[error("nside must be a power of two in [1, 2^29], got {0}")]
    InvalidNside(u64),

    #[error("Allowed pixel set is empty")]
    EmptyPixelSet,

    #[error("RA and Dec sequences differ in length ({ra} vs {dec})")]
    LengthMismatch { ra: usize, dec: usize },
}

/// Resolution order for `nside`, or [`PixelError::InvalidNside`]
pub fn order_of(nside: u64) -> Result<u32, PixelError> {
    nside_to_order(nside).ok_or(PixelError::InvalidNside(nside))
}

fn check_lengths(ra: &[f64], dec: &[f64]) -> Result<(), PixelError> {
    if ra.len() != dec.len() {
        return Err(PixelError::LengthMismatch {
            ra: ra.len(),
            dec: dec.len(),
        });
    }
    Ok(())
}

/// Nested pixel index at `nside` for every (ra, dec) position in degrees.
///
/// RA is wrapped into [0, 360) before lookup, so `-10` and `350` land in the
/// same pixel.
pub fn pixel_of(ra: &[f64], dec: &[f64], nside: u64) -> Result<Vec<u64>, PixelError> {
    check_lengths(ra, dec)?;
    let order = order_of(nside)?;
    Ok(ra
        .iter()
        .zip(dec)
        .map(|(&r, &d)| ang2pix_nest(order, normalize_ra(r), d))
        .collect())
}

/// Membership mask of `pixels` in `allowed`.
///
/// # Errors
///
/// [`PixelError::EmptyPixelSet`] if `allowed` is empty. A non-empty set that
/// shares no pixel with the input gives an all-false mask.
pub fn filter_to_pixels(pixels: &[u64], allowed: &PixelSet) -> Result<Vec<bool>, PixelError> {
    if allowed.is_empty() {
        return Err(PixelError::EmptyPixelSet);
    }
    Ok(pixels.iter().map(|p| allowed.contains(p)).collect())
}

/// Brick name for every (ra, dec) position
pub fn brick_of(
    ra: &[f64],
    dec: &[f64],
    geometry: &BrickGeometry,
) -> Result<Vec<String>, PixelError> {
    check_lengths(ra, dec)?;
    Ok(ra
        .iter()
        .zip(dec)
        .map(|(&r, &d)| geometry.brickname(r, d))
        .collect())
}
