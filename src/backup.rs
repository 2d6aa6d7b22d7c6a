//! Snapshot, mutate, re-validate, restore
//!
//! The operation only ever sees an in-memory copy of the file and runs
//! before the snapshot is taken, so a refused operation leaves nothing on
//! disk. The live file is written once, then checked from disk; any failure
//! after that write restores the snapshot. Snapshots are never deleted here.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::validate::validate_bytes;

const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3f";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BackupOutcome<T> {
    Committed { value: T, backup: PathBuf },
    RolledBack { backup: PathBuf, reason: String },
}

impl<T> BackupOutcome<T> {
    pub fn backup(&self) -> &Path {
        match self {
            Self::Committed { backup, .. } | Self::RolledBack { backup, .. } => backup,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// `<file>.<timestamp>.<ext>` next to the original
pub fn backup_path(path: &Path, extension: &str, now: DateTime<Local>) -> PathBuf {
    let stamp = now.format(STAMP_FORMAT);
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".{stamp}.{extension}"));
    path.with_file_name(name)
}

fn unused_backup_path(path: &Path, extension: &str) -> PathBuf {
    let base = backup_path(path, extension, Local::now());
    if !base.exists() {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = base.with_extension(format!("{n}.{extension}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

fn restore(backup: &Path, path: &Path) -> Result<()> {
    fs::copy(backup, path)?;
    Ok(())
}

/// Run `op` against the file at `path` under backup protection.
///
/// Returns `Err` without side effects when the file fails its structural
/// pre-check or when `op` itself fails; no snapshot exists in either case.
/// Returns `RolledBack` when the written result fails post-validation and
/// the original was restored.
pub fn with_backup<T, F>(path: &Path, config: &Config, op: F) -> Result<BackupOutcome<T>>
where
    F: FnOnce(&mut Vec<u8>) -> Result<T>,
{
    let original = fs::read(path)?;
    let before = validate_bytes(&original, config);
    if !before.passes(config.misaligned_tolerance) {
        return Err(Error::PrecheckFailed(before.failure_reason(config.misaligned_tolerance)));
    }

    let mut working = original;
    let value = op(&mut working)?;

    let backup = unused_backup_path(path, &config.backup_extension);
    fs::copy(path, &backup)?;
    if crc32fast::hash(&fs::read(&backup)?) != before.checksum {
        return Err(Error::PrecheckFailed(format!("backup {} does not match original", backup.display())));
    }
    tracing::debug!(backup = %backup.display(), "snapshot taken");

    if let Err(err) = fs::write(path, &working) {
        tracing::warn!(path = %path.display(), %err, "write failed, restoring");
        restore(&backup, path)?;
        return Ok(BackupOutcome::RolledBack { backup, reason: format!("write failed: {err}") });
    }

    let after = validate_bytes(&fs::read(path)?, config);
    let failure = if !after.passes(config.misaligned_tolerance) {
        Some(after.failure_reason(config.misaligned_tolerance))
    } else {
        before.structural_change(&after)
    };

    match failure {
        None => {
            tracing::info!(path = %path.display(), backup = %backup.display(), "change committed");
            Ok(BackupOutcome::Committed { value, backup })
        }
        Some(reason) => {
            tracing::warn!(path = %path.display(), %reason, "post-check failed, restoring");
            restore(&backup, path)?;
            Ok(BackupOutcome::RolledBack { backup, reason: format!("validation failed: {reason}") })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TileBuilder;
    use crate::relocate::GridCoord;
    use adtkit_layout::tags;
    use chrono::TimeZone;

    fn write_tile(dir: &Path) -> PathBuf {
        let path = dir.join("Test_1_1.adt");
        fs::write(&path, TileBuilder::new(GridCoord::new(1, 1)).cells(2).build()).unwrap();
        path
    }

    #[test]
    fn test_backup_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 6).unwrap();
        let path = backup_path(Path::new("/maps/Test_1_1.adt"), "bak", now);
        assert_eq!(path, PathBuf::from("/maps/Test_1_1.adt.20240309T140506000.bak"));
    }

    #[test]
    fn test_commit_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tile(dir.path());
        let original = fs::read(&path).unwrap();

        let outcome = with_backup(&path, &Config::default(), |data| {
            // last byte of the final layer record
            let n = data.len();
            data[n - 1] ^= 1;
            Ok(n)
        })
        .unwrap();

        assert!(outcome.is_committed());
        assert_eq!(fs::read(outcome.backup()).unwrap(), original);
        assert_ne!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn test_size_change_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tile(dir.path());
        let original = fs::read(&path).unwrap();

        let outcome = with_backup(&path, &Config::default(), |data| {
            data.extend_from_slice(b"REVM\x04\0\0\0\x12\0\0\0");
            Ok(())
        })
        .unwrap();

        match &outcome {
            BackupOutcome::RolledBack { reason, .. } => assert!(reason.contains("file length")),
            other => panic!("expected rollback, got {other:?}"),
        }
        assert_eq!(fs::read(&path).unwrap(), original);
        assert!(outcome.backup().exists());
    }

    #[test]
    fn test_precheck_refuses_without_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Broken_1_1.adt");
        let mut data = TileBuilder::new(GridCoord::new(1, 1)).cells(1).build();
        data.truncate(data.len() - 3);
        fs::write(&path, &data).unwrap();

        let err = with_backup(&path, &Config::default(), |_| Ok(())).unwrap_err();
        assert!(matches!(err, Error::PrecheckFailed(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_op_error_leaves_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tile(dir.path());
        let original = fs::read(&path).unwrap();

        let err = with_backup::<(), _>(&path, &Config::default(), |_| Err(Error::MissingChunk("MCIN"))).unwrap_err();
        assert!(matches!(err, Error::MissingChunk(_)));
        assert_eq!(fs::read(&path).unwrap(), original);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_misaligned_array_tolerance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Test_1_1.adt");
        // six bytes of u32 texture flags: one misaligned array
        let data = TileBuilder::new(GridCoord::new(1, 1))
            .cells(2)
            .extra_chunk(tags::MTXF, vec![0u8; 6])
            .build();
        fs::write(&path, &data).unwrap();

        let err = with_backup(&path, &Config::default(), |_| Ok(())).unwrap_err();
        assert!(matches!(&err, Error::PrecheckFailed(reason) if reason.contains("misaligned")), "{err:?}");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

        let lenient = Config { misaligned_tolerance: 1, ..Config::default() };
        let outcome = with_backup(&path, &lenient, |_| Ok(())).unwrap();
        assert!(outcome.is_committed());
        assert_eq!(fs::read(&path).unwrap(), data);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
