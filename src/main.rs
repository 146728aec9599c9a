use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;

use svnfix::cli::args::{self, Cli};
use svnfix::cli::output;
use svnfix::cli::prompt::ConsolePrompter;
use svnfix::common::config::Config;
use svnfix::common::logging;
use svnfix::repair::{
    self, locator, Collaborators, FileBackups, SqliteQueueCleaner, StoreLocator, ToolLookup,
    TortoiseCleanup,
};
use svnfix::shell;

fn main() -> Result<()> {
    let cli = Cli::parse_from(args::normalize_legacy_flags(std::env::args_os()));

    if cli.no_color {
        colored::control::set_override(false);
    }

    // An unreadable config falls back to defaults
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(error) => (Config::default(), Some(error)),
    };
    let log_dir = config.log_to_file.then(Config::logs_dir);
    let _guard = logging::init(cli.verbose, log_dir.as_deref());

    if let Some(error) = &config_error {
        tracing::warn!(error = %error, "config not loaded, using defaults");
        output::print_config_error(error);
    }

    // Shell integration runs on its own and never touches a store
    if cli.install {
        let result = shell::install();
        output::print_shell_result("install", &result);
        return Ok(());
    }
    if cli.uninstall {
        let result = shell::uninstall();
        output::print_shell_result("uninstall", &result);
        return Ok(());
    }

    cmd_repair(&cli, &config)?;

    if should_pause(&cli, &config) {
        pause()?;
    }
    Ok(())
}

// ─── Repair ───────────────────────────────────────────────────────────────────

fn cmd_repair(cli: &Cli, config: &Config) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let start_dir = locator::resolve_start_dir(cli.path.as_deref(), &cwd);
    tracing::info!(start = %start_dir.display(), "starting repair run");

    output::print_banner(&start_dir);

    let lookup = ToolLookup::tortoise_svn(config.repair_tool_override(cli.repair_tool.as_deref()));
    let show_progress = !cli.quiet && std::io::stderr().is_terminal();
    let repair_tool = TortoiseCleanup::new(lookup, show_progress);
    let mut prompter = ConsolePrompter;

    let mut collab = Collaborators {
        locator: &StoreLocator,
        backups: &FileBackups,
        cleaner: &SqliteQueueCleaner,
        repair: &repair_tool,
        prompter: &mut prompter,
    };

    let finish = repair::run(&start_dir, &mut collab);
    output::print_finish(&finish);

    Ok(())
}

// ─── Exit pause ───────────────────────────────────────────────────────────────

fn should_pause(cli: &Cli, config: &Config) -> bool {
    !cli.no_pause && config.pause_on_exit && std::io::stdin().is_terminal()
}

/// Block until any key is pressed, so a console opened from Explorer stays readable
fn pause() -> Result<()> {
    use crossterm::event::{self, Event, KeyEventKind};
    use crossterm::terminal;

    output::print_press_any_key();

    terminal::enable_raw_mode()?;
    let result = loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => break Ok(()),
            Ok(_) => continue,
            Err(e) => break Err(e),
        }
    };
    terminal::disable_raw_mode()?;

    result.map_err(Into::into)
}
