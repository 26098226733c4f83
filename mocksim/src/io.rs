//! Persisting spectra batches as JSON

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::generator::SpectraBatch;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// First of `name.ext`, `name(1).ext`, `name(2).ext`, … that does not exist
pub fn numbered_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (1..)
        .map(|i| path.with_file_name(format!("{stem}({i}){ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Write `batch` to `path`, replacing any existing file
pub fn write_batch(batch: &SpectraBatch, path: &Path) -> Result<(), PersistError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PersistError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string(batch).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `batch` next to any existing file of the same name, never over it.
///
/// # Returns
///
/// The path actually written.
pub fn save_batch(batch: &SpectraBatch, path: &Path) -> Result<PathBuf, PersistError> {
    let target = numbered_path(path);
    write_batch(batch, &target)?;
    log::info!("Writing {}", target.display());
    Ok(target)
}

pub fn load_batch(path: &Path) -> Result<SpectraBatch, PersistError> {
    let json = fs::read_to_string(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use ndarray::{array, Array2};
    use tempfile::tempdir;

    fn tiny() -> SpectraBatch {
        let mut targets = Table::new();
        targets.add_column("TARGETID", vec![7i64]).unwrap();
        targets
            .add_column("BRICKNAME", vec!["1501p022".to_string()])
            .unwrap();
        SpectraBatch {
            flux: Array2::from_elem((1, 2), 1.5),
            wave: array![4000.0, 4000.5],
            targets: targets.clone(),
            truth: targets.clone(),
            objtruth: targets,
        }
    }

    #[test]
    fn test_save_never_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("qso-templates.json");
        let first = save_batch(&tiny(), &path).unwrap();
        let second = save_batch(&tiny(), &path).unwrap();
        let third = save_batch(&tiny(), &path).unwrap();
        assert_eq!(first, path);
        assert_eq!(second, dir.path().join("qso-templates(1).json"));
        assert_eq!(third, dir.path().join("qso-templates(2).json"));
    }

    #[test]
    fn test_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("batch.json");
        write_batch(&tiny(), &path).unwrap();
        assert_eq!(load_batch(&path).unwrap(), tiny());
    }

    #[test]
    fn test_numbered_path_without_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spectra");
        fs::write(&path, "x").unwrap();
        assert_eq!(numbered_path(&path), dir.path().join("spectra(1)"));
    }

    #[test]
    fn test_load_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_batch(&path), Err(PersistError::Json { .. })));
    }
}
