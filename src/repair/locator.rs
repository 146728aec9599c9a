use std::path::{Path, PathBuf};

/// Directory under a working-copy root that holds client metadata
pub const METADATA_DIR: &str = ".svn";

/// File name of the metadata store inside [`METADATA_DIR`]
pub const STORE_FILE: &str = "wc.db";

/// A located working copy: its root directory and the metadata store under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
    pub root: PathBuf,
    pub store: PathBuf,
}

impl WorkingCopy {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let store = store_path(&root);
        Self { root, store }
    }
}

/// Finds the working copy that encloses a directory
pub trait RootLocator {
    fn locate(&self, start: &Path) -> Option<WorkingCopy>;
}

/// Locates working copies by looking for `.svn/wc.db` on disk
#[derive(Debug, Default, Clone, Copy)]
pub struct StoreLocator;

impl RootLocator for StoreLocator {
    fn locate(&self, start: &Path) -> Option<WorkingCopy> {
        find_working_copy_root(start).map(WorkingCopy::new)
    }
}

/// Where the metadata store lives for a given root
pub fn store_path(root: &Path) -> PathBuf {
    root.join(METADATA_DIR).join(STORE_FILE)
}

/// Walk upward from `start` to the nearest directory holding a metadata store.
///
/// `start` itself and the filesystem root are both checked. Returns `None`
/// when no ancestor qualifies.
pub fn find_working_copy_root(start: &Path) -> Option<PathBuf> {
    // Relative paths have no parent past their first component
    let start = dunce::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());

    let mut current = Some(start.as_path());
    while let Some(dir) = current {
        if store_path(dir).is_file() {
            tracing::debug!(root = %dir.display(), "found working copy root");
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }

    tracing::debug!(start = %start.display(), "no working copy root above start");
    None
}

/// Pick the directory a run should start from.
///
/// A directory argument is used as given. A file argument (the store itself,
/// when launched from the `.db` context menu) resolves to its parent. Anything
/// else falls back to `cwd`.
pub fn resolve_start_dir(arg: Option<&Path>, cwd: &Path) -> PathBuf {
    match arg {
        Some(p) if p.is_dir() => p.to_path_buf(),
        Some(p) if p.is_file() => p
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf()),
        _ => cwd.to_path_buf(),
    }
}
