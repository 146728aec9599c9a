use colored::*;
use std::path::Path;

use crate::common::errors::FixError;
use crate::common::format::{self, format_path, format_size};
use crate::common::permissions;
use crate::repair::backup::BackupArtifact;
use crate::repair::queue::TableReport;
use crate::repair::workflow::{Disposition, Finish};

/// Print the run header
pub fn print_banner(start_dir: &Path) {
    println!();
    println!("{}  svnfix", "🔧");
    println!("{}", "─".repeat(60).dimmed());
    println!("  Starting from {}", format_path(start_dir).cyan());
    println!("{}", "─".repeat(60).dimmed());
}

pub fn print_store_found(store: &Path) {
    println!("  {} Found SVN database: {}", "✓".green(), format_path(store).cyan());
}

pub fn print_made_writable() {
    println!("  {} Database was read-only; made it writable", "✓".green());
}

pub fn print_backup_created(backup: &BackupArtifact) {
    println!(
        "  {} Backup created: {} ({})",
        "✓".green(),
        format_path(&backup.path).cyan(),
        format_size(backup.size_bytes)
    );
}

pub fn print_backup_failed(error: &FixError) {
    println!("  {} {}", "✗".red(), error);
}

pub fn print_proceeding_without_backup() {
    println!(
        "  {} {}",
        "⚠".yellow(),
        "Continuing WITHOUT a backup. Changes cannot be undone by svnfix.".yellow()
    );
}

pub fn print_clean_start() {
    println!();
    println!("  {} Clearing work queue tables...", "🧹");
}

pub fn print_table_cleared(report: &TableReport) {
    println!(
        "    {} {:<12} {}",
        "•".dimmed(),
        report.table,
        format!("{} deleted", format::format_rows(report.rows_deleted)).dimmed()
    );
}

pub fn print_clean_done() {
    println!("  {} Queue tables cleared", "✓".green());
}

pub fn print_clean_failed(error: &FixError) {
    println!("  {} Database operation failed: {}", "✗".red(), error);
}

pub fn print_repair_start() {
    println!();
    println!("  {} Running TortoiseSVN cleanup...", "⚙️");
}

pub fn print_repair_ok(secs: f64) {
    println!(
        "  {} TortoiseSVN cleanup completed in {}",
        "✓".green(),
        format::format_duration(secs).cyan()
    );
}

pub fn print_repair_failed(error: &FixError) {
    println!("  {} TortoiseSVN cleanup failed: {}", "✗".red(), error);
}

pub fn print_error(error: &FixError) {
    println!("  {} {}", "✗".red(), error);
}

/// Print what happened to the backup, and where it is if it survived
pub fn print_disposition(disposition: &Disposition) {
    println!();
    match disposition {
        Disposition::NoBackup => {
            println!("  {} No backup file to process", "ℹ️");
        }
        Disposition::Discarded { backup } => {
            println!("  {} Backup deleted: {}", "🗑️", format_path(backup).dimmed());
        }
        Disposition::Restored { .. } => {
            println!(
                "  {} Database restored from backup; the run has been undone",
                "↩".green()
            );
        }
        Disposition::Kept {
            backup,
            unrecognized,
        } => {
            if let Some(input) = unrecognized {
                print_unrecognized(input, "nothing was deleted or restored");
            }
            println!("  {} Backup kept at: {}", "📦", backup.display().to_string().cyan());
        }
        Disposition::DiscardFailed { backup } => {
            println!(
                "  {} Please delete the backup manually: {}",
                "⚠".yellow(),
                backup.display().to_string().cyan()
            );
        }
        Disposition::RestoredBackupLeft { backup } => {
            println!("  {} Database restored from backup", "↩".green());
            println!(
                "  {} Please delete the backup manually: {}",
                "⚠".yellow(),
                backup.display().to_string().cyan()
            );
        }
        Disposition::RestoreFailed { backup } => {
            println!(
                "  {} Please restore manually from: {}",
                "⚠".yellow(),
                backup.display().to_string().cyan()
            );
        }
    }
}

fn print_unrecognized(input: &str, consequence: &str) {
    println!(
        "  {} Unrecognized answer '{}'; {}",
        "⚠".yellow(),
        input,
        consequence
    );
}

/// Print the closing lines for runs that stopped early
pub fn print_finish(finish: &Finish) {
    match finish {
        Finish::NoRoot { start } => {
            let error = FixError::RootNotFound {
                start: start.clone(),
            };
            println!("  {} {}", "✗".red(), error);
            println!("  {} Run svnfix inside a directory managed by SVN", "💡");
        }
        Finish::Aborted { error } => {
            println!("  {} {}", "✗".red(), error);
            println!("  Cannot continue. {}", permissions::permission_hint());
        }
        Finish::Cancelled { unrecognized } => {
            if let Some(input) = unrecognized {
                print_unrecognized(input, "nothing was changed");
            }
            println!("  {} Cancelled; the database was not modified", "✗".red());
        }
        Finish::Resolved { .. } => {}
    }
}

/// A config file that failed to load; the run continues on defaults
pub fn print_config_error(error: &anyhow::Error) {
    println!("  {} {:#}", "⚠".yellow(), error);
    println!("  {}", "Continuing with default settings".dimmed());
}

pub fn print_shell_result(action: &str, result: &Result<(), FixError>) {
    match result {
        Ok(()) => println!("  {} Context menu {}ed", "✓".green(), action),
        Err(FixError::ShellIntegrationUnsupported) => {
            println!("  {} {}", "✗".red(), FixError::ShellIntegrationUnsupported)
        }
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            println!("  {}", permissions::permission_hint());
        }
    }
}

pub fn print_press_any_key() {
    println!();
    println!("  {}", "Press any key to exit...".dimmed());
}
