//! The repair run as an explicit state machine.
//!
//! `Start → RootFound → BackupTaken | BackupSkipped → Cleaned | CleanFailed
//! → RepairOk | RepairFailed → Done`
//!
//! Each state owns exactly the data later states need, so the backup is
//! handed along as a value rather than kept anywhere global. Side effects go
//! through the four component traits and the [`Prompter`], which lets every
//! transition run against fakes.

use std::path::{Path, PathBuf};
use std::time::Instant;

use super::backup::{BackupArtifact, BackupManager};
use super::external::RepairInvoker;
use super::locator::{RootLocator, WorkingCopy};
use super::queue::{PartialClear, QueueCleaner, TableReport};
use crate::cli::output;
use crate::cli::prompt::{Answer, Prompter};
use crate::common::errors::{BackupOp, FixError};

pub const PROCEED_WITHOUT_BACKUP: &str = "Continue without a backup? (y/n):";
pub const CONFIRM_REPAIR: &str =
    "Did the repair work? (y = delete backup / n = restore from backup):";
pub const CONFIRM_RESTORE: &str = "Restore the database from the backup? (y/n):";

/// Everything a run touches outside its own state
pub struct Collaborators<'a> {
    pub locator: &'a dyn RootLocator,
    pub backups: &'a dyn BackupManager,
    pub cleaner: &'a dyn QueueCleaner,
    pub repair: &'a dyn RepairInvoker,
    pub prompter: &'a mut dyn Prompter,
}

/// How far the clean-and-repair got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    CleanedAndRepaired,
    CleanedButRepairFailed,
    CleanFailed,
}

impl RepairOutcome {
    /// The question asked before the backup is dispositioned
    pub fn question(&self) -> &'static str {
        match self {
            RepairOutcome::CleanedAndRepaired => CONFIRM_REPAIR,
            RepairOutcome::CleanedButRepairFailed | RepairOutcome::CleanFailed => CONFIRM_RESTORE,
        }
    }
}

/// What to do with the backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Discard,
    Restore,
    Keep,
    /// The answer matched nothing; keep everything and say so
    KeepUnrecognized(String),
}

/// Map an outcome and the operator's answer to a backup decision.
///
/// Only an explicit answer ever deletes or restores.
pub fn decide(outcome: RepairOutcome, answer: &Answer) -> Decision {
    match (outcome, answer) {
        (RepairOutcome::CleanedAndRepaired, Answer::Yes) => Decision::Discard,
        (RepairOutcome::CleanedAndRepaired, Answer::No) => Decision::Restore,
        (_, Answer::Yes) => Decision::Restore,
        (_, Answer::No) => Decision::Keep,
        (_, Answer::Other(input)) => Decision::KeepUnrecognized(input.clone()),
    }
}

/// The final fate of the backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// No backup was taken, or it was gone by the end of the run
    NoBackup,
    Discarded { backup: PathBuf },
    Restored { backup: PathBuf },
    Kept {
        backup: PathBuf,
        unrecognized: Option<String>,
    },
    /// Deleting failed; the backup is still on disk
    DiscardFailed { backup: PathBuf },
    /// Restoring failed; the backup is still on disk
    RestoreFailed { backup: PathBuf },
    /// The store was restored but the backup could not be deleted afterwards
    RestoredBackupLeft { backup: PathBuf },
}

impl Disposition {
    /// The backup file that still exists after the run, if any
    pub fn surviving_backup(&self) -> Option<&Path> {
        match self {
            Disposition::Kept { backup, .. }
            | Disposition::DiscardFailed { backup }
            | Disposition::RestoreFailed { backup }
            | Disposition::RestoredBackupLeft { backup } => Some(backup),
            Disposition::NoBackup
            | Disposition::Discarded { .. }
            | Disposition::Restored { .. } => None,
        }
    }
}

/// How a run ended
#[derive(Debug)]
pub enum Finish {
    /// No working copy encloses the start directory
    NoRoot { start: PathBuf },
    /// The store could not be prepared; nothing was modified
    Aborted { error: FixError },
    /// The operator declined to continue without a backup, or answered
    /// something that was neither yes nor no
    Cancelled { unrecognized: Option<String> },
    Resolved {
        outcome: RepairOutcome,
        tables: Vec<TableReport>,
        disposition: Disposition,
    },
}

#[derive(Debug)]
pub enum State {
    Start {
        start_dir: PathBuf,
    },
    RootFound {
        wc: WorkingCopy,
    },
    BackupTaken {
        wc: WorkingCopy,
        backup: BackupArtifact,
    },
    BackupSkipped {
        wc: WorkingCopy,
    },
    Cleaned {
        wc: WorkingCopy,
        backup: Option<BackupArtifact>,
        tables: Vec<TableReport>,
    },
    CleanFailed {
        wc: WorkingCopy,
        backup: Option<BackupArtifact>,
        tables: Vec<TableReport>,
        error: FixError,
    },
    RepairOk {
        wc: WorkingCopy,
        backup: Option<BackupArtifact>,
        tables: Vec<TableReport>,
    },
    RepairFailed {
        wc: WorkingCopy,
        backup: Option<BackupArtifact>,
        tables: Vec<TableReport>,
        error: FixError,
    },
    Done(Finish),
}

impl State {
    pub fn start(start_dir: impl Into<PathBuf>) -> Self {
        State::Start {
            start_dir: start_dir.into(),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, State::Done(_))
    }

    /// Perform one transition
    pub fn advance(self, collab: &mut Collaborators<'_>) -> State {
        match self {
            State::Start { start_dir } => locate(start_dir, collab),
            State::RootFound { wc } => take_backup(wc, collab),
            State::BackupTaken { wc, backup } => clean(wc, Some(backup), collab),
            State::BackupSkipped { wc } => clean(wc, None, collab),
            State::Cleaned { wc, backup, tables } => repair(wc, backup, tables, collab),
            State::CleanFailed {
                wc,
                backup,
                tables,
                error,
            } => {
                tracing::warn!(error = %error, cleared = tables.len(), "queue cleaning failed");
                settle(RepairOutcome::CleanFailed, wc, backup, tables, collab)
            }
            State::RepairOk { wc, backup, tables } => {
                settle(RepairOutcome::CleanedAndRepaired, wc, backup, tables, collab)
            }
            State::RepairFailed {
                wc,
                backup,
                tables,
                error,
            } => {
                tracing::warn!(error = %error, "repair tool failed");
                settle(RepairOutcome::CleanedButRepairFailed, wc, backup, tables, collab)
            }
            done @ State::Done(_) => done,
        }
    }
}

/// Drive a run from `start_dir` to its end
pub fn run(start_dir: &Path, collab: &mut Collaborators<'_>) -> Finish {
    let mut state = State::start(start_dir);
    loop {
        state = state.advance(collab);
        if let State::Done(finish) = state {
            return finish;
        }
    }
}

fn locate(start_dir: PathBuf, collab: &mut Collaborators<'_>) -> State {
    match collab.locator.locate(&start_dir) {
        Some(wc) => {
            tracing::info!(root = %wc.root.display(), store = %wc.store.display(), "working copy located");
            output::print_store_found(&wc.store);
            State::RootFound { wc }
        }
        None => {
            tracing::info!(start = %start_dir.display(), "no working copy found");
            State::Done(Finish::NoRoot { start: start_dir })
        }
    }
}

fn take_backup(wc: WorkingCopy, collab: &mut Collaborators<'_>) -> State {
    match collab.backups.acquire_writable_access(&wc.store) {
        Ok(true) => output::print_made_writable(),
        Ok(false) => {}
        Err(error) => return State::Done(Finish::Aborted { error }),
    }

    match collab.backups.create_backup(&wc.store) {
        Ok(backup) => {
            output::print_backup_created(&backup);
            State::BackupTaken { wc, backup }
        }
        Err(error) => {
            output::print_backup_failed(&error);
            let answer = ask(collab, PROCEED_WITHOUT_BACKUP);
            if answer.is_yes() {
                tracing::warn!(store = %wc.store.display(), "proceeding without a backup");
                output::print_proceeding_without_backup();
                State::BackupSkipped { wc }
            } else {
                tracing::info!(?answer, "run cancelled after backup failure");
                let unrecognized = match answer {
                    Answer::Other(input) => Some(input),
                    Answer::Yes | Answer::No => None,
                };
                State::Done(Finish::Cancelled { unrecognized })
            }
        }
    }
}

fn clean(wc: WorkingCopy, backup: Option<BackupArtifact>, collab: &mut Collaborators<'_>) -> State {
    output::print_clean_start();
    match collab.cleaner.clear_queues(&wc.store) {
        Ok(tables) => {
            for report in &tables {
                output::print_table_cleared(report);
            }
            output::print_clean_done();
            State::Cleaned { wc, backup, tables }
        }
        Err(PartialClear { cleared, error }) => {
            for report in &cleared {
                output::print_table_cleared(report);
            }
            output::print_clean_failed(&error);
            State::CleanFailed {
                wc,
                backup,
                tables: cleared,
                error,
            }
        }
    }
}

fn repair(
    wc: WorkingCopy,
    backup: Option<BackupArtifact>,
    tables: Vec<TableReport>,
    collab: &mut Collaborators<'_>,
) -> State {
    output::print_repair_start();
    let started = Instant::now();
    match collab.repair.run_cleanup(&wc.root) {
        Ok(()) => {
            output::print_repair_ok(started.elapsed().as_secs_f64());
            State::RepairOk { wc, backup, tables }
        }
        Err(error) => {
            output::print_repair_failed(&error);
            State::RepairFailed {
                wc,
                backup,
                tables,
                error,
            }
        }
    }
}

fn settle(
    outcome: RepairOutcome,
    wc: WorkingCopy,
    backup: Option<BackupArtifact>,
    tables: Vec<TableReport>,
    collab: &mut Collaborators<'_>,
) -> State {
    let disposition = resolve_backup(outcome, backup, &wc.store, collab);
    output::print_disposition(&disposition);
    tracing::info!(?outcome, ?disposition, "run resolved");
    State::Done(Finish::Resolved {
        outcome,
        tables,
        disposition,
    })
}

/// Ask the operator what to do with the backup and carry it out.
///
/// Failures while deleting or restoring leave the backup where it is.
pub fn resolve_backup(
    outcome: RepairOutcome,
    backup: Option<BackupArtifact>,
    store: &Path,
    collab: &mut Collaborators<'_>,
) -> Disposition {
    let backup = match backup {
        Some(b) if b.path.is_file() => b,
        _ => return Disposition::NoBackup,
    };

    let answer = ask(collab, outcome.question());
    match decide(outcome, &answer) {
        Decision::Discard => match collab.backups.discard(&backup) {
            Ok(()) => Disposition::Discarded {
                backup: backup.path,
            },
            Err(error) => {
                output::print_error(&error);
                Disposition::DiscardFailed {
                    backup: backup.path,
                }
            }
        },
        Decision::Restore => match collab.backups.restore(&backup, store) {
            Ok(()) => Disposition::Restored {
                backup: backup.path,
            },
            Err(
                error @ FixError::BackupOperationFailed {
                    op: BackupOp::Delete,
                    ..
                },
            ) => {
                // Delete is the last step, so the store is already back in place
                output::print_error(&error);
                Disposition::RestoredBackupLeft {
                    backup: backup.path,
                }
            }
            Err(error) => {
                output::print_error(&error);
                Disposition::RestoreFailed {
                    backup: backup.path,
                }
            }
        },
        Decision::Keep => Disposition::Kept {
            backup: backup.path,
            unrecognized: None,
        },
        Decision::KeepUnrecognized(input) => {
            let error = FixError::UserInputInvalid {
                input: input.clone(),
            };
            tracing::warn!(%error, backup = %backup.path.display(), "keeping backup");
            Disposition::Kept {
                backup: backup.path,
                unrecognized: Some(input),
            }
        }
    }
}

/// A prompt that cannot be read counts as an unrecognized answer
fn ask(collab: &mut Collaborators<'_>, question: &str) -> Answer {
    collab.prompter.ask(question).unwrap_or_else(|error| {
        tracing::warn!(error = %error, "prompt failed");
        Answer::Other(String::new())
    })
}
