use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use crate::common::errors::FixError;

/// Registry keys under HKLM that TortoiseSVN records its install in, in lookup order
pub const TORTOISE_REGISTRY_KEYS: [&str; 2] =
    [r"SOFTWARE\TortoiseSVN", r"SOFTWARE\Wow6432Node\TortoiseSVN"];

/// Registry value naming the TortoiseProc executable
pub const TORTOISE_PROC_VALUE: &str = "ProcPath";

/// One place the repair tool may be installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCandidate {
    /// An explicit path to the executable
    Path(PathBuf),
    /// A string value under `HKEY_LOCAL_MACHINE`
    Registry { key: &'static str, value: &'static str },
}

impl ToolCandidate {
    /// The executable path this candidate points at, if any
    fn resolve(&self) -> Option<PathBuf> {
        match self {
            ToolCandidate::Path(p) => Some(p.clone()),
            ToolCandidate::Registry { key, value } => read_registry_path(key, value),
        }
    }
}

/// An ordered list of install locations; the first one that exists wins
#[derive(Debug, Clone, Default)]
pub struct ToolLookup {
    pub candidates: Vec<ToolCandidate>,
}

impl ToolLookup {
    pub fn new(candidates: Vec<ToolCandidate>) -> Self {
        Self { candidates }
    }

    /// Configured path first, then both registry views
    pub fn tortoise_svn(configured: Option<PathBuf>) -> Self {
        let mut candidates: Vec<ToolCandidate> =
            configured.into_iter().map(ToolCandidate::Path).collect();
        candidates.extend(TORTOISE_REGISTRY_KEYS.into_iter().map(|key| ToolCandidate::Registry {
            key,
            value: TORTOISE_PROC_VALUE,
        }));
        Self { candidates }
    }

    pub fn locate(&self) -> Option<PathBuf> {
        self.candidates.iter().find_map(|candidate| {
            let path = candidate.resolve()?;
            if path.is_file() {
                tracing::debug!(?candidate, path = %path.display(), "repair tool found");
                Some(path)
            } else {
                tracing::debug!(?candidate, path = %path.display(), "candidate does not exist");
                None
            }
        })
    }
}

#[cfg(windows)]
fn read_registry_path(key: &str, value: &str) -> Option<PathBuf> {
    use winreg::enums::HKEY_LOCAL_MACHINE;
    use winreg::RegKey;

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let subkey = hklm.open_subkey(key).ok()?;
    let path: String = subkey.get_value(value).ok()?;
    Some(PathBuf::from(path))
}

#[cfg(not(windows))]
fn read_registry_path(_key: &str, _value: &str) -> Option<PathBuf> {
    None
}

/// Runs the client's own consistency repair against a working copy
pub trait RepairInvoker {
    fn run_cleanup(&self, root: &Path) -> Result<(), FixError>;
}

/// Runs `TortoiseProc /command:cleanup` and waits for it
#[derive(Debug, Clone)]
pub struct TortoiseCleanup {
    lookup: ToolLookup,
    show_progress: bool,
}

impl TortoiseCleanup {
    pub fn new(lookup: ToolLookup, show_progress: bool) -> Self {
        Self {
            lookup,
            show_progress,
        }
    }
}

impl RepairInvoker for TortoiseCleanup {
    fn run_cleanup(&self, root: &Path) -> Result<(), FixError> {
        let program = self.lookup.locate().ok_or(FixError::ExternalToolNotFound)?;

        let pb = if self.show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("  {spinner:.cyan} Running TortoiseSVN cleanup... {elapsed}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        let started = Instant::now();
        let result = run_cleanup_with(&program, root);

        if let Some(ref pb) = pb {
            pb.finish_and_clear();
        }
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "repair tool finished"
        );
        result
    }
}

/// Launch `program` against `root` and map its exit status.
///
/// Output is captured so it cannot interleave with our console text. There
/// is no timeout.
pub fn run_cleanup_with(program: &Path, root: &Path) -> Result<(), FixError> {
    let mut cmd = cleanup_command(program, root);
    tracing::info!(program = %program.display(), root = %root.display(), "launching repair tool");

    let output = cmd
        .output()
        .map_err(|source| FixError::ExternalToolLaunchFailed {
            program: program.to_path_buf(),
            source,
        })?;

    log_output(&output);

    if output.status.success() {
        Ok(())
    } else {
        Err(FixError::ExternalToolNonZeroExit {
            program: program.to_path_buf(),
            code: output.status.code(),
        })
    }
}

/// Build the cleanup invocation: select the command, the target, and no UI
pub fn cleanup_command(program: &Path, root: &Path) -> Command {
    let mut cmd = Command::new(program);
    cmd.arg("/command:cleanup");
    push_path_arg(&mut cmd, root);
    cmd.arg("/nodialog")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

#[cfg(windows)]
fn push_path_arg(cmd: &mut Command, root: &Path) {
    use std::os::windows::process::CommandExt;

    // TortoiseProc expects the quotes after the colon, not around the whole argument
    cmd.raw_arg(format!("/path:\"{}\"", root.display()));
    cmd.creation_flags(0x0800_0000); // CREATE_NO_WINDOW
}

#[cfg(not(windows))]
fn push_path_arg(cmd: &mut Command, root: &Path) {
    cmd.arg(format!("/path:{}", root.display()));
}

fn log_output(output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stdout.trim().is_empty() {
        tracing::debug!(stdout = %stdout.trim(), "repair tool output");
    }
    if !stderr.trim().is_empty() {
        tracing::debug!(stderr = %stderr.trim(), "repair tool errors");
    }
}
