//! Sky indexing primitives for mock catalogs
//!
//! Leaf components shared by the mock pipeline: the packed 52-bit mock
//! identifier, HEALPix nested pixelization with pixel-set filtering, and the
//! rectangular brick layout used by the imaging survey.

pub mod bricks;
pub mod healpix;
pub mod mockid;
pub mod partition;
pub mod sphere;

pub use bricks::{BrickError, BrickGeometry};
pub use mockid::{assign_ids, decode, encode, IdError, MockId};
pub use partition::{brick_of, filter_to_pixels, order_of, pixel_of, PixelError, PixelSet};
