use std::path::Path;

use crate::common::errors::FixError;

/// Clear the read-only flag on a file if it is set.
///
/// Returns `true` when the flag was actually cleared, `false` when the
/// file was already writable.
#[allow(clippy::permissions_set_readonly_false)]
pub fn make_writable(path: &Path) -> Result<bool, FixError> {
    let metadata = std::fs::metadata(path).map_err(|source| FixError::ReadOnlyAccessDenied {
        path: path.to_path_buf(),
        source,
    })?;

    let mut perms = metadata.permissions();
    if !perms.readonly() {
        return Ok(false);
    }

    perms.set_readonly(false);
    std::fs::set_permissions(path, perms).map_err(|source| FixError::ReadOnlyAccessDenied {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(path = %path.display(), "cleared read-only flag");
    Ok(true)
}

/// Get a helpful message for permission issues
pub fn permission_hint() -> &'static str {
    if cfg!(windows) {
        "Please run as administrator and try again."
    } else {
        "Check file ownership and permissions, then try again."
    }
}
