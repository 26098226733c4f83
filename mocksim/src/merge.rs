//! Combining spectra batches from independent runs
//!
//! Batches from different classes or pixels are stacked row-wise. The three
//! tables are outer-joined, so a column present in only some batches is kept
//! and filled with nulls elsewhere. All batches must share one wavelength
//! grid.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{concatenate, Array1, Array2, ArrayView2, Axis};
use thiserror::Error;

use crate::generator::SpectraBatch;
use crate::io::{load_batch, write_batch, PersistError};
use crate::table::{Table, TableError};

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Nothing to merge")]
    NoBatches,

    #[error("Batch {batch} has a different wavelength grid")]
    WavelengthMismatch { batch: usize },

    #[error("Batch {batch} has {got} wavelengths per spectrum, grid has {expected}")]
    FluxShape {
        batch: usize,
        expected: usize,
        got: usize,
    },

    #[error("Column types differ between batches: {0}")]
    ColumnTypeMismatch(TableError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Keep only the first row of each `TARGETID`
    pub dedup: bool,
}

fn same_grid(a: &Array1<f64>, b: &Array1<f64>) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

fn stack_tables<'a>(tables: impl Iterator<Item = &'a Table>) -> Result<Table, MergeError> {
    let tables: Vec<Table> = tables.cloned().collect();
    Table::vstack_outer(&tables).map_err(|e| match e {
        e @ TableError::TypeMismatch { .. } => MergeError::ColumnTypeMismatch(e),
        other => MergeError::Table(other),
    })
}

/// Stack `batches` in order.
///
/// # Errors
///
/// [`MergeError::NoBatches`] for an empty slice,
/// [`MergeError::WavelengthMismatch`] when any grid differs from the first,
/// [`MergeError::ColumnTypeMismatch`] when a column changes type.
pub fn merge(batches: &[SpectraBatch], options: MergeOptions) -> Result<SpectraBatch, MergeError> {
    let first = batches.first().ok_or(MergeError::NoBatches)?;
    let wave = &first.wave;
    for (i, batch) in batches.iter().enumerate() {
        if !same_grid(wave, &batch.wave) {
            return Err(MergeError::WavelengthMismatch { batch: i });
        }
        if batch.flux.ncols() != wave.len() {
            return Err(MergeError::FluxShape {
                batch: i,
                expected: wave.len(),
                got: batch.flux.ncols(),
            });
        }
    }

    let views: Vec<ArrayView2<f32>> = batches.iter().map(|b| b.flux.view()).collect();
    let flux: Array2<f32> = concatenate(Axis(0), &views)
        .map_err(|_| MergeError::FluxShape {
            batch: 0,
            expected: wave.len(),
            got: first.flux.ncols(),
        })?;

    let merged = SpectraBatch {
        flux,
        wave: wave.clone(),
        targets: stack_tables(batches.iter().map(|b| &b.targets))?,
        truth: stack_tables(batches.iter().map(|b| &b.truth))?,
        objtruth: stack_tables(batches.iter().map(|b| &b.objtruth))?,
    };
    log::info!(
        "Merged {} batches into {} spectra",
        batches.len(),
        merged.len()
    );

    if options.dedup {
        dedup_targets(merged)
    } else {
        Ok(merged)
    }
}

/// Drop every row whose `TARGETID` already appeared, keeping flux rows and
/// all three tables aligned
fn dedup_targets(batch: SpectraBatch) -> Result<SpectraBatch, MergeError> {
    let ids = batch.targets.ints("TARGETID")?;
    let mut seen = HashSet::with_capacity(ids.len());
    let keep: Vec<usize> = ids
        .iter()
        .enumerate()
        .filter_map(|(i, id)| seen.insert(*id).then_some(i))
        .collect();
    if keep.len() == ids.len() {
        return Ok(batch);
    }
    log::info!("Removed {} duplicate targets", ids.len() - keep.len());

    Ok(SpectraBatch {
        flux: batch.flux.select(Axis(0), &keep),
        wave: batch.wave,
        targets: batch.targets.take(&keep)?,
        truth: batch.truth.take(&keep)?,
        objtruth: batch.objtruth.take(&keep)?,
    })
}

/// Merge persisted batches into `out`, optionally deleting the inputs
/// afterwards
pub fn merge_files(
    paths: &[PathBuf],
    out: &Path,
    options: MergeOptions,
    remove: bool,
) -> Result<SpectraBatch, MergeError> {
    let batches = paths
        .iter()
        .map(|p| {
            log::info!("Reading {}", p.display());
            load_batch(p)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let merged = merge(&batches, options)?;
    write_batch(&merged, out)?;
    log::info!("Wrote {}", out.display());

    if remove {
        for path in paths {
            if path != out {
                log::info!("Removing {}", path.display());
                fs::remove_file(path)?;
            }
        }
    }
    Ok(merged)
}

/// Files under `dir`, at any depth, whose name contains "templates"
pub fn find_template_files(dir: &Path) -> Result<Vec<PathBuf>, MergeError> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains("templates"))
            {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    fn batch(ids: &[i64], wave: Array1<f64>, extra: Option<&str>) -> SpectraBatch {
        let n = ids.len();
        let mut targets = Table::new();
        targets.add_column("TARGETID", ids.to_vec()).unwrap();
        targets.add_column("RA", vec![1.0; n]).unwrap();
        let mut truth = Table::new();
        truth.add_column("TARGETID", ids.to_vec()).unwrap();
        let mut objtruth = Table::new();
        objtruth.add_column("TARGETID", ids.to_vec()).unwrap();
        if let Some(name) = extra {
            objtruth.add_column(name, vec![2.5; n]).unwrap();
        }
        let nwave = wave.len();
        SpectraBatch {
            flux: Array2::from_shape_fn((n, nwave), |(i, j)| (ids[i] * 10 + j as i64) as f32),
            wave,
            targets,
            truth,
            objtruth,
        }
    }

    #[test]
    fn test_merge_preserves_order_and_fills_nulls() {
        let wave = array![4000.0, 4001.0, 4002.0];
        let a = batch(&[1, 2], wave.clone(), Some("VDISP"));
        let b = batch(&[3], wave.clone(), None);
        let merged = merge(&[a, b], MergeOptions::default()).unwrap();

        assert_eq!(merged.flux.dim(), (3, 3));
        assert_eq!(merged.flux[[2, 0]], 30.0);
        assert_eq!(merged.targets.ints("TARGETID").unwrap(), &[1, 2, 3]);
        assert!(!merged.objtruth.is_null("VDISP", 0).unwrap());
        assert!(merged.objtruth.is_null("VDISP", 2).unwrap());
        assert!(merged.objtruth.floats("VDISP").unwrap()[2].is_nan());
    }

    #[test]
    fn test_wavelength_mismatch() {
        let a = batch(&[1], array![4000.0, 4001.0], None);
        let b = batch(&[2], array![4000.0, 4001.5], None);
        assert!(matches!(
            merge(&[a, b], MergeOptions::default()),
            Err(MergeError::WavelengthMismatch { batch: 1 })
        ));
    }

    #[test]
    fn test_no_batches() {
        assert!(matches!(
            merge(&[], MergeOptions::default()),
            Err(MergeError::NoBatches)
        ));
    }

    #[test]
    fn test_duplicates_kept_unless_requested() {
        let wave = array![4000.0, 4001.0];
        let a = batch(&[1, 2], wave.clone(), None);
        let b = batch(&[2, 3], wave.clone(), None);

        let kept = merge(&[a.clone(), b.clone()], MergeOptions::default()).unwrap();
        assert_eq!(kept.len(), 4);

        let deduped = merge(&[a, b], MergeOptions { dedup: true }).unwrap();
        assert_eq!(deduped.targets.ints("TARGETID").unwrap(), &[1, 2, 3]);
        assert_eq!(deduped.truth.nrows(), 3);
        assert_eq!(deduped.flux.nrows(), 3);
        assert_eq!(deduped.flux[[2, 0]], 30.0);
    }

    #[test]
    fn test_column_type_mismatch() {
        let wave = array![4000.0];
        let a = batch(&[1], wave.clone(), None);
        let mut b = batch(&[2], wave, None);
        b.targets.set_column("RA", vec!["ten".to_string()]).unwrap();
        assert!(matches!(
            merge(&[a, b], MergeOptions::default()),
            Err(MergeError::ColumnTypeMismatch(_))
        ));
    }

    #[test]
    fn test_merge_files_and_search() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("pix1");
        fs::create_dir(&sub).unwrap();
        let wave = array![4000.0, 4001.0];
        let a = dir.path().join("qso-templates.json");
        let b = sub.join("lrg-templates.json");
        write_batch(&batch(&[1], wave.clone(), None), &a).unwrap();
        write_batch(&batch(&[2, 3], wave, Some("D4000")), &b).unwrap();
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let files = find_template_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);

        let out = dir.path().join("merged.json");
        let merged = merge_files(&files, &out, MergeOptions::default(), true).unwrap();
        assert_eq!(merged.len(), 3);
        assert!(out.exists());
        assert!(!a.exists() && !b.exists());
        let reloaded = load_batch(&out).unwrap();
        assert_eq!(reloaded.flux, merged.flux);
        assert_eq!(reloaded.targets, merged.targets);
        // Exactly one end of the stack came from the batch without D4000
        assert_ne!(
            reloaded.objtruth.is_null("D4000", 0).unwrap(),
            reloaded.objtruth.is_null("D4000", 2).unwrap()
        );
    }
}
