//! File-level entry points

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::backup::{with_backup, BackupOutcome};
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::document::{decode_bytes, DecodedDocument};
use crate::error::{Error, Result};
use crate::relocate::{relocate_buffer, GridCoord, RelocationRequest, RelocationSummary};
use crate::validate::{validate_bytes, ValidationReport};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelocationResult {
    pub success: bool,
    pub backup_path: PathBuf,
    pub summary: Option<RelocationSummary>,
    /// Why the change was rolled back
    pub failure: Option<String>,
    pub diagnostics: Diagnostics,
}

pub fn decode(path: impl AsRef<Path>, config: &Config) -> Result<DecodedDocument> {
    let data = std::fs::read(path.as_ref())?;
    Ok(decode_bytes(&data, config))
}

pub fn validate(path: impl AsRef<Path>, config: &Config) -> Result<ValidationReport> {
    let data = std::fs::read(path.as_ref())?;
    Ok(validate_bytes(&data, config))
}

/// Relocate a tile file in place under backup protection.
///
/// When the file name carries a coordinate it must name either the source
/// or the target tile; a tile renamed ahead of the fix is accepted.
pub fn relocate(path: impl AsRef<Path>, request: &RelocationRequest, config: &Config) -> Result<RelocationResult> {
    let path = path.as_ref();
    if let Some(named) = GridCoord::from_file_name(path) {
        if named != request.from && named != request.to {
            return Err(Error::CoordinateMismatch { expected: request.from, found: named });
        }
    }

    let outcome = with_backup(path, config, |data| relocate_buffer(data, request, config))?;
    Ok(match outcome {
        BackupOutcome::Committed { value, backup } => RelocationResult {
            success: true,
            backup_path: backup,
            diagnostics: value.diagnostics.clone(),
            summary: Some(value),
            failure: None,
        },
        BackupOutcome::RolledBack { backup, reason } => RelocationResult {
            success: false,
            backup_path: backup,
            summary: None,
            failure: Some(reason),
            diagnostics: Diagnostics::new(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TileBuilder;

    #[test]
    fn test_relocate_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Azeroth_3_5.adt");
        std::fs::write(&path, TileBuilder::new(GridCoord::new(3, 5)).cells(4).build()).unwrap();
        let config = Config::default();

        let request = RelocationRequest::new(GridCoord::new(3, 5), GridCoord::new(4, 5));
        let result = relocate(&path, &request, &config).unwrap();
        assert!(result.success);
        assert!(result.backup_path.exists());
        assert_eq!(result.summary.unwrap().cells_patched, 4);

        let doc = decode(&path, &config).unwrap();
        assert_eq!(doc.cell(3).unwrap().grid(), Some(GridCoord::new(4, 5)));
    }

    #[test]
    fn test_file_name_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Azeroth_7_7.adt");
        std::fs::write(&path, TileBuilder::new(GridCoord::new(3, 5)).cells(1).build()).unwrap();

        let request = RelocationRequest::new(GridCoord::new(3, 5), GridCoord::new(4, 5));
        let err = relocate(&path, &request, &Config::default()).unwrap_err();
        assert!(matches!(err, Error::CoordinateMismatch { found, .. } if found == GridCoord::new(7, 7)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_refused_relocation_leaves_only_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.adt");
        let data = TileBuilder::new(GridCoord::new(3, 5)).cells(2).build();
        std::fs::write(&path, &data).unwrap();

        let request = RelocationRequest::new(GridCoord::new(9, 9), GridCoord::new(4, 5));
        let err = relocate(&path, &request, &Config::default()).unwrap_err();
        assert!(matches!(err, Error::CoordinateMismatch { found, .. } if found == GridCoord::new(3, 5)));

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(files, vec![std::ffi::OsString::from("tile.adt")]);
        assert_eq!(std::fs::read(&path).unwrap(), data);
    }

    #[test]
    fn test_validate_file_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.adt");
        std::fs::write(&path, TileBuilder::new(GridCoord::new(3, 5)).build()).unwrap();
        let config = Config::default();
        assert_eq!(validate(&path, &config).unwrap(), validate(&path, &config).unwrap());
    }
}
