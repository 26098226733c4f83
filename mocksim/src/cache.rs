//! Caller-owned cache for expensive shared resources
//!
//! Footprint pixel sets and dust maps are costly to build and identical across
//! every class run that shares their parameters. The cache is an explicit
//! value handed to whoever needs it, keyed by what the resource was built
//! from, with explicit invalidation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use skyindex::PixelSet;

use crate::catalog::{CatalogError, DustMap, Footprint, HealpixDustMap};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    /// Pixel set of the footprint with a given [`Footprint::cache_id`] at a
    /// resolution
    FootprintPixels { footprint: String, nside: u64 },
    /// Dust map read from a directory
    DustMap { dir: PathBuf },
}

#[derive(Clone)]
pub enum Resource {
    Pixels(Arc<PixelSet>),
    Dust(Arc<dyn DustMap>),
}

/// Thread-safe map from [`ResourceKey`] to shared resources
#[derive(Default)]
pub struct ResourceCache {
    entries: Mutex<HashMap<ResourceKey, Resource>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached resource for `key`, building it with `build` on a miss.
    ///
    /// The lock is not held while building, so two threads missing on the
    /// same key may both build; the first insert wins.
    pub fn get_or_try_insert_with<E, F>(&self, key: ResourceKey, build: F) -> Result<Resource, E>
    where
        F: FnOnce() -> Result<Resource, E>,
    {
        if let Some(found) = self.lock().get(&key) {
            return Ok(found.clone());
        }
        let built = build()?;
        Ok(self.lock().entry(key).or_insert(built).clone())
    }

    /// Drop one entry; returns whether it was present
    pub fn invalidate(&self, key: &ResourceKey) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.lock().contains_key(key)
    }

    /// Pixel set of `footprint` at `nside`
    pub fn footprint_pixels(
        &self,
        footprint: &dyn Footprint,
        nside: u64,
    ) -> Result<Arc<PixelSet>, CatalogError> {
        let key = ResourceKey::FootprintPixels {
            footprint: footprint.cache_id(),
            nside,
        };
        let resource = self.get_or_try_insert_with(key, || {
            log::debug!("Building footprint pixels at nside {}", nside);
            footprint.pixels(nside).map(|p| Resource::Pixels(Arc::new(p)))
        })?;
        match resource {
            Resource::Pixels(pixels) => Ok(pixels),
            Resource::Dust(_) => Err(CatalogError::Configuration(format!(
                "cache entry for footprint pixels at nside {nside} is not a pixel set"
            ))),
        }
    }

    /// HEALPix dust map read from `dir`
    pub fn dust_map(&self, dir: &Path) -> Result<Arc<dyn DustMap>, CatalogError> {
        let key = ResourceKey::DustMap {
            dir: dir.to_path_buf(),
        };
        let resource = self.get_or_try_insert_with(key, || {
            let map: Arc<dyn DustMap> = Arc::new(HealpixDustMap::open(dir)?);
            Ok::<_, CatalogError>(Resource::Dust(map))
        })?;
        match resource {
            Resource::Dust(map) => Ok(map),
            Resource::Pixels(_) => Err(CatalogError::Configuration(format!(
                "cache entry for dust map {} is not a dust map",
                dir.display()
            ))),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ResourceKey, Resource>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
