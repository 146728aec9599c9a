use std::path::PathBuf;

use thiserror::Error;

/// Custom error types for svnfix operations.
/// We use `anyhow` at the top level for CLI error handling,
/// but these typed errors let the repair workflow decide what each failure means.
#[derive(Debug, Error)]
pub enum FixError {
    /// No ancestor of the start directory holds a metadata store
    #[error("No SVN working copy found at or above '{}'", start.display())]
    RootNotFound { start: PathBuf },

    /// The store is read-only and the flag could not be cleared
    #[error("Cannot make '{}' writable: {source}", path.display())]
    ReadOnlyAccessDenied {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Copying the store to its backup failed
    #[error("Backup of '{}' to '{}' failed: {source}", path.display(), backup.display())]
    BackupCreateFailed {
        path: PathBuf,
        backup: PathBuf,
        source: std::io::Error,
    },

    /// Deleting or restoring a backup failed
    #[error("Backup {op} failed for '{}': {source}", path.display())]
    BackupOperationFailed {
        op: BackupOp,
        path: PathBuf,
        source: std::io::Error,
    },

    /// The metadata store could not be opened
    #[error("Cannot open database '{}': {source}", path.display())]
    StoreOpenFailed {
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// A statement against the metadata store failed
    #[error("Clearing table {table} failed: {source}")]
    StoreQueryFailed {
        table: String,
        source: rusqlite::Error,
    },

    /// No installed repair tool could be discovered
    #[error("TortoiseSVN not found. Please install TortoiseSVN first")]
    ExternalToolNotFound,

    /// The repair tool was found but could not be started
    #[error("Failed to launch '{}': {source}", program.display())]
    ExternalToolLaunchFailed {
        program: PathBuf,
        source: std::io::Error,
    },

    /// The repair tool ran but did not exit cleanly
    #[error("'{}' exited with {}", program.display(), describe_code(*code))]
    ExternalToolNonZeroExit { program: PathBuf, code: Option<i32> },

    /// An answer that matched no known choice
    #[error("Unrecognized input: '{input}'")]
    UserInputInvalid { input: String },

    /// Reading an answer from the console failed
    #[error("Failed to read answer: {0}")]
    PromptFailed(#[source] std::io::Error),

    /// Registering or removing the context menu failed
    #[error("Context menu {action} failed: {source}")]
    ShellIntegrationFailed {
        action: &'static str,
        source: std::io::Error,
    },

    /// Context menu integration exists only on Windows
    #[error("Context menu integration is only available on Windows")]
    ShellIntegrationUnsupported,

    /// Configuration file is invalid
    #[error("Config error in '{}': {message}", path.display())]
    Config { path: PathBuf, message: String },
}

/// The step of backup handling that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupOp {
    /// Removing the current store before copying the backup over it
    RemoveOriginal,
    /// Copying the backup over the store
    Copy,
    /// Deleting the backup file
    Delete,
}

impl std::fmt::Display for BackupOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupOp::RemoveOriginal => write!(f, "remove-original"),
            BackupOp::Copy => write!(f, "copy"),
            BackupOp::Delete => write!(f, "delete"),
        }
    }
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {}", c),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
