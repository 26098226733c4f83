//! HEALPix (Hierarchical Equal Area isoLatitude Pixelisation), NESTED scheme.
//!
//! Pixel numbering follows the HEALPix reference library (`ang2pix` /
//! `pix2ang` with `nest=True`), so indices are directly comparable with pixel
//! lists produced by the rest of the survey software.
//!
//! The 12 base pixels (faces) are laid out as:
//! - 0–3: north polar cap
//! - 4–7: equatorial belt
//! - 8–11: south polar cap
//!
//! Within a face, `ix` occupies the even bits and `iy` the odd bits of the
//! sub-index.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Largest supported resolution order (nside = 2^29)
pub const MAX_ORDER: u32 = 29;

const JRLL: [i64; 12] = [2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4];
const JPLL: [i64; 12] = [1, 3, 5, 7, 0, 2, 4, 6, 1, 3, 5, 7];

/// Resolution order for `nside`, or `None` if `nside` is not a power of two
/// in `[1, 2^29]`.
pub fn nside_to_order(nside: u64) -> Option<u32> {
    if nside == 0 || !nside.is_power_of_two() {
        return None;
    }
    let order = nside.trailing_zeros();
    (order <= MAX_ORDER).then_some(order)
}

/// Total number of pixels: 12 * nside^2.
pub fn npix(nside: u64) -> u64 {
    12 * nside * nside
}

/// Solid angle (steradians) of a single pixel.
pub fn pixel_area(nside: u64) -> f64 {
    4.0 * PI / npix(nside) as f64
}

/// Upper bound on the angular distance (degrees) from a pixel centre to any
/// point inside that pixel.
pub fn max_pixel_radius_deg(nside: u64) -> f64 {
    1.5 * pixel_area(nside).sqrt().to_degrees()
}

/// Nested pixel index containing (ra, dec) in degrees.
///
/// `order` must come from [`nside_to_order`].
pub fn ang2pix_nest(order: u32, ra_deg: f64, dec_deg: f64) -> u64 {
    let nside = 1i64 << order;
    let z = dec_deg.to_radians().sin();
    let za = z.abs();

    let mut tt = (ra_deg.to_radians() / FRAC_PI_2).rem_euclid(4.0);
    if tt >= 4.0 {
        tt = 0.0;
    }

    if za <= 2.0 / 3.0 {
        // Equatorial belt
        let temp1 = nside as f64 * (0.5 + tt);
        let temp2 = nside as f64 * (z * 0.75);
        let jp = (temp1 - temp2) as i64;
        let jm = (temp1 + temp2) as i64;
        let ifp = jp >> order;
        let ifm = jm >> order;

        let face = if ifp == ifm {
            ifp | 4
        } else if ifp < ifm {
            ifp
        } else {
            ifm + 8
        };

        let ix = jm & (nside - 1);
        let iy = nside - (jp & (nside - 1)) - 1;
        xyf_to_nest(ix as u64, iy as u64, face as u64, order)
    } else {
        // Polar caps
        let ntt = (tt as i64).min(3);
        let tp = tt - ntt as f64;
        let tmp = nside as f64 * (3.0 * (1.0 - za)).sqrt();

        let jp = ((tp * tmp) as i64).min(nside - 1);
        let jm = (((1.0 - tp) * tmp) as i64).min(nside - 1);

        if z >= 0.0 {
            xyf_to_nest(
                (nside - jm - 1) as u64,
                (nside - jp - 1) as u64,
                ntt as u64,
                order,
            )
        } else {
            xyf_to_nest(jp as u64, jm as u64, (ntt + 8) as u64, order)
        }
    }
}

/// Centre of a nested pixel as (ra, dec) in degrees, RA in [0, 360).
pub fn pix2ang_nest(order: u32, pix: u64) -> (f64, f64) {
    let nside = 1i64 << order;
    let nl4 = 4 * nside;
    let fact2 = 4.0 / npix(nside as u64) as f64;
    let fact1 = (2 * nside) as f64 * fact2;

    let (ix, iy, face) = nest_to_xyf(pix, order);
    let (ix, iy, face) = (ix as i64, iy as i64, face as usize);

    let jr = (JRLL[face] << order) - ix - iy - 1;

    let (nr, z, kshift) = if jr < nside {
        let nr = jr;
        (nr, 1.0 - (nr * nr) as f64 * fact2, 0)
    } else if jr > 3 * nside {
        let nr = nl4 - jr;
        (nr, (nr * nr) as f64 * fact2 - 1.0, 0)
    } else {
        (nside, (2 * nside - jr) as f64 * fact1, (jr - nside) & 1)
    };

    let mut jp = (JPLL[face] * nr + ix - iy + 1 + kshift) / 2;
    if jp > nl4 {
        jp -= nl4;
    }
    if jp < 1 {
        jp += nl4;
    }

    let phi = (jp as f64 - (kshift + 1) as f64 * 0.5) * (FRAC_PI_2 / nr as f64);
    let ra = phi.rem_euclid(TAU).to_degrees();
    let dec = z.clamp(-1.0, 1.0).asin().to_degrees();
    (ra, dec)
}

// ---------------------------------------------------------------------------
// Internal: (ix, iy, face) <-> nested bit-interleaving
// ---------------------------------------------------------------------------

fn xyf_to_nest(ix: u64, iy: u64, face: u64, order: u32) -> u64 {
    (face << (2 * order)) + xy_to_nested_sub(ix, iy)
}

fn nest_to_xyf(pix: u64, order: u32) -> (u64, u64, u64) {
    let npface = 1u64 << (2 * order);
    let face = pix >> (2 * order);
    let (ix, iy) = nested_sub_to_xy(pix & (npface - 1));
    (ix, iy, face)
}

/// Bit-interleave (x, y) → sub-index. x provides even bits, y provides odd bits.
fn xy_to_nested_sub(x: u64, y: u64) -> u64 {
    let mut result = 0u64;
    let mut xx = x;
    let mut yy = y;
    let mut bit = 0;
    while xx > 0 || yy > 0 {
        result |= (xx & 1) << bit;
        bit += 1;
        result |= (yy & 1) << bit;
        bit += 1;
        xx >>= 1;
        yy >>= 1;
    }
    result
}

/// De-interleave sub-index → (x, y).
fn nested_sub_to_xy(sub: u64) -> (u64, u64) {
    let mut x = 0u64;
    let mut y = 0u64;
    let mut s = sub;
    let mut bit = 0;
    while s > 0 {
        x |= (s & 1) << bit;
        s >>= 1;
        y |= (s & 1) << bit;
        s >>= 1;
        bit += 1;
    }
    (x, y)
}
