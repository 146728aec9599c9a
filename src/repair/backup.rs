use chrono::{DateTime, Local};
use std::io;
use std::path::{Path, PathBuf};

use crate::common::errors::{BackupOp, FixError};
use crate::common::permissions;

/// Timestamp format embedded in backup file names
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// A full copy of the metadata store taken before it was modified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupArtifact {
    /// Where the copy lives
    pub path: PathBuf,
    /// The store it was copied from
    pub original: PathBuf,
    /// Size of the copy in bytes
    pub size_bytes: u64,
}

/// File operations around the metadata store
pub trait BackupManager {
    /// Clear the read-only flag on the store. Returns whether it was set.
    fn acquire_writable_access(&self, store: &Path) -> Result<bool, FixError>;

    /// Copy the store to a fresh timestamped sibling
    fn create_backup(&self, store: &Path) -> Result<BackupArtifact, FixError>;

    /// Delete the backup once it is no longer wanted
    fn discard(&self, backup: &BackupArtifact) -> Result<(), FixError>;

    /// Put the backup back in place of `original` and then delete it
    fn restore(&self, backup: &BackupArtifact, original: &Path) -> Result<(), FixError>;
}

/// Backups kept as plain sibling files next to the store
#[derive(Debug, Default, Clone, Copy)]
pub struct FileBackups;

impl BackupManager for FileBackups {
    fn acquire_writable_access(&self, store: &Path) -> Result<bool, FixError> {
        permissions::make_writable(store)
    }

    fn create_backup(&self, store: &Path) -> Result<BackupArtifact, FixError> {
        create_backup_at(store, Local::now())
    }

    fn discard(&self, backup: &BackupArtifact) -> Result<(), FixError> {
        discard_backup(backup)
    }

    fn restore(&self, backup: &BackupArtifact, original: &Path) -> Result<(), FixError> {
        restore_backup(backup, original)
    }
}

/// Backup name for a store at a given moment: `wc.db` becomes `wc_<stamp>.db.bak`
pub fn backup_path_for(store: &Path, now: DateTime<Local>) -> PathBuf {
    let stem = store
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = store
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let name = format!("{}_{}{}.bak", stem, now.format(TIMESTAMP_FORMAT), ext);
    store.with_file_name(name)
}

/// Copy `store` to its timestamped backup name.
///
/// The destination is opened with `create_new`, so an existing file of the
/// same name makes this fail rather than being overwritten.
pub fn create_backup_at(store: &Path, now: DateTime<Local>) -> Result<BackupArtifact, FixError> {
    let backup = backup_path_for(store, now);
    let fail = |source: io::Error| FixError::BackupCreateFailed {
        path: store.to_path_buf(),
        backup: backup.clone(),
        source,
    };

    let mut src = std::fs::File::open(store).map_err(fail)?;
    let mut dst = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&backup)
        .map_err(fail)?;

    let copied = io::copy(&mut src, &mut dst).and_then(|n| dst.sync_all().map(|()| n));
    let size_bytes = match copied {
        Ok(n) => n,
        Err(e) => {
            // A half-written copy is not a backup
            drop(dst);
            let _ = std::fs::remove_file(&backup);
            return Err(fail(e));
        }
    };

    tracing::info!(
        store = %store.display(),
        backup = %backup.display(),
        size_bytes,
        "created backup"
    );

    Ok(BackupArtifact {
        path: backup,
        original: store.to_path_buf(),
        size_bytes,
    })
}

/// Delete a backup file
pub fn discard_backup(backup: &BackupArtifact) -> Result<(), FixError> {
    std::fs::remove_file(&backup.path).map_err(|source| FixError::BackupOperationFailed {
        op: BackupOp::Delete,
        path: backup.path.clone(),
        source,
    })?;
    tracing::info!(backup = %backup.path.display(), "deleted backup");
    Ok(())
}

/// Replace `original` with the backup's contents, then delete the backup.
///
/// Every step that fails returns before the backup is touched, so the last
/// good copy is always left on disk.
pub fn restore_backup(backup: &BackupArtifact, original: &Path) -> Result<(), FixError> {
    if !backup.path.is_file() {
        return Err(FixError::BackupOperationFailed {
            op: BackupOp::Copy,
            path: backup.path.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, "backup file is missing"),
        });
    }

    if original.exists() {
        // A read-only store cannot be removed on Windows
        let _ = permissions::make_writable(original);
        std::fs::remove_file(original).map_err(|source| FixError::BackupOperationFailed {
            op: BackupOp::RemoveOriginal,
            path: original.to_path_buf(),
            source,
        })?;
    }

    std::fs::copy(&backup.path, original).map_err(|source| FixError::BackupOperationFailed {
        op: BackupOp::Copy,
        path: backup.path.clone(),
        source,
    })?;

    discard_backup(backup)?;

    tracing::info!(
        store = %original.display(),
        backup = %backup.path.display(),
        "restored store from backup"
    );
    Ok(())
}
