//! Reader for Gaussian random field mock catalogs

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use skyindex::sphere::normalize_ra;
use skyindex::{assign_ids, filter_to_pixels, pixel_of, BrickGeometry, PixelError, PixelSet};

use super::{CatalogError, DustMap, Footprint, FullSky, MockBatch, MockRecord};
use crate::generator::ObjectClass;
use crate::photometry::{mw_transmission, BandFluxes, PhotometricBand};

/// Magnitude assigned to every object until templates set a real one
pub const PLACEHOLDER_MAG: f64 = 22.0;

/// Raw numeric columns of a mock catalog file, keyed by upper-cased name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MockColumns(BTreeMap<String, Vec<f64>>);

impl MockColumns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, values: Vec<f64>) -> Self {
        self.0.insert(name.to_ascii_uppercase(), values);
        self
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.0.get(&name.to_ascii_uppercase()).map(Vec::as_slice)
    }

    pub fn read(path: &Path) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path)?;
        let raw: BTreeMap<String, Vec<f64>> =
            serde_json::from_str(&json).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self(
            raw.into_iter()
                .map(|(k, v)| (k.to_ascii_uppercase(), v))
                .collect(),
        ))
    }

    pub fn write(&self, path: &Path) -> Result<(), CatalogError> {
        let json = serde_json::to_string(self).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json)?;
        Ok(())
    }
}

struct ColumnSource<'a> {
    path: &'a Path,
    columns: &'a MockColumns,
    nrows: usize,
}

impl ColumnSource<'_> {
    fn required(&self, name: &str) -> Result<&[f64], CatalogError> {
        self.optional(name)?
            .ok_or_else(|| CatalogError::MissingColumn {
                path: self.path.to_path_buf(),
                column: name.to_string(),
            })
    }

    fn optional(&self, name: &str) -> Result<Option<&[f64]>, CatalogError> {
        match self.columns.get(name) {
            Some(values) if values.len() != self.nrows => Err(CatalogError::RaggedColumn {
                path: self.path.to_path_buf(),
                column: name.to_string(),
                expected: self.nrows,
                got: values.len(),
            }),
            other => Ok(other),
        }
    }
}

fn describe_pixels(pixels: &PixelSet) -> String {
    if pixels.len() > 8 {
        return format!("<{} pixels>", pixels.len());
    }
    pixels
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reads mock catalogs and derives per-object quantities
#[derive(Clone)]
pub struct GaussianFieldReader {
    bricks: BrickGeometry,
    dust: Option<Arc<dyn DustMap>>,
    footprint: Arc<dyn Footprint>,
}

impl GaussianFieldReader {
    /// Reader with no dust map and a full-sky default footprint
    pub fn new(bricks: BrickGeometry) -> Self {
        Self {
            bricks,
            dust: None,
            footprint: Arc::new(FullSky),
        }
    }

    pub fn with_dust(mut self, dust: Arc<dyn DustMap>) -> Self {
        self.dust = Some(dust);
        self
    }

    pub fn with_footprint(mut self, footprint: Arc<dyn Footprint>) -> Self {
        self.footprint = footprint;
        self
    }

    pub fn bricks(&self) -> &BrickGeometry {
        &self.bricks
    }

    /// Read one mock catalog file.
    ///
    /// # Arguments
    ///
    /// * `path` - Mock catalog file
    /// * `class` - Object class the file holds
    /// * `nside` - HEALPix resolution used to partition the objects
    /// * `allowed` - Pixels to keep; the footprint's pixels when `None`
    /// * `magcut` - Keep only objects brighter than this magnitude
    ///
    /// # Returns
    ///
    /// `Ok(None)` when no object survives the pixel and magnitude cuts.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] if the file is missing,
    /// [`CatalogError::Configuration`] if the allowed pixel set is empty or no
    /// dust map is configured.
    pub fn load(
        &self,
        path: &Path,
        class: ObjectClass,
        nside: u64,
        allowed: Option<&PixelSet>,
        magcut: Option<f64>,
    ) -> Result<Option<MockBatch>, CatalogError> {
        if !path.exists() {
            return Err(CatalogError::NotFound(path.to_path_buf()));
        }

        log::info!("Reading {}", path.display());
        let columns = MockColumns::read(path)?;
        let nrows = columns.get("RA").map_or(0, <[f64]>::len);
        let source = ColumnSource {
            path,
            columns: &columns,
            nrows,
        };
        let ra = source.required("RA")?;
        let dec = source.required("DEC")?;

        let objid: Vec<i64> = (0..nrows as i64).collect();
        let mockid = assign_ids(&objid, &[nrows])?;

        log::info!("Assigning healpix pixels with nside = {}", nside);
        let pixels = pixel_of(ra, dec, nside)?;

        let footprint_pixels;
        let allowed = match allowed {
            Some(set) => set,
            None => {
                footprint_pixels = self.footprint.pixels(nside)?;
                &footprint_pixels
            }
        };
        let keep = filter_to_pixels(&pixels, allowed).map_err(|e| match e {
            PixelError::EmptyPixelSet => CatalogError::Configuration(format!(
                "no healpixels to read {} from at nside {}",
                path.display(),
                nside
            )),
            other => other.into(),
        })?;

        let mut index: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(i, &k)| k.then_some(i))
            .collect();
        if index.is_empty() {
            log::warn!("No {}s in healpixels {}!", class, describe_pixels(allowed));
            return Ok(None);
        }
        log::info!(
            "Trimmed to {} {}s in healpixel(s) {}",
            index.len(),
            class,
            describe_pixels(allowed)
        );

        let z: Vec<f64> = if class.is_placeholder() {
            vec![0.0; nrows]
        } else {
            let z_cosmo = source.required("Z_COSMO")?;
            let dz_rsd = source.required("DZ_RSD")?;
            z_cosmo.iter().zip(dz_rsd).map(|(c, d)| c + d).collect()
        };
        let mag: Vec<f64> = match source.optional("MAG")? {
            Some(values) if !class.is_placeholder() => values.to_vec(),
            _ => vec![PLACEHOLDER_MAG; nrows],
        };

        if let Some(cut) = magcut {
            index.retain(|&i| mag[i] < cut);
            if index.is_empty() {
                log::warn!("No {}s brighter than magnitude {}!", class, cut);
                return Ok(None);
            }
            log::debug!("{} {}s brighter than magnitude {}", index.len(), class, cut);
        }

        let dust = self.dust.as_ref().ok_or_else(|| {
            CatalogError::Configuration(
                "a dust map directory is required to compute MW transmission".to_string(),
            )
        })?;

        let ra_kept: Vec<f64> = index.iter().map(|&i| normalize_ra(ra[i])).collect();
        let dec_kept: Vec<f64> = index.iter().map(|&i| dec[i]).collect();
        let ebv = dust.ebv(&ra_kept, &dec_kept)?;

        let records = index
            .iter()
            .enumerate()
            .map(|(k, &i)| {
                let mut transmission = BandFluxes::default();
                for band in PhotometricBand::ALL {
                    transmission.set(band, mw_transmission(ebv[k], band));
                }
                MockRecord {
                    objid: i,
                    mockid: mockid[i],
                    ra: ra_kept[k],
                    dec: dec_kept[k],
                    brickname: self.bricks.brickname(ra_kept[k], dec_kept[k]),
                    hpxpixel: pixels[i],
                    z: z[i],
                    mag: mag[i],
                    ebv: ebv[k],
                    mw_transmission: transmission,
                    seed: 0,
                    vdisp: None,
                }
            })
            .collect();

        Ok(Some(MockBatch {
            class,
            files: vec![PathBuf::from(path)],
            n_per_file: vec![nrows],
            nside,
            records,
        }))
    }
}
