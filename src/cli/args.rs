use clap::{ArgGroup, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// svnfix: unstick a Subversion working copy
#[derive(Parser, Debug)]
#[command(
    name = "svnfix",
    version,
    about = "Clears a stuck SVN work queue and runs TortoiseSVN cleanup",
    long_about = "svnfix finds the working copy above PATH, backs up .svn/wc.db, empties its\n\
                  WORK_QUEUE and WC_LOCK tables, and runs TortoiseSVN cleanup. You decide\n\
                  afterwards whether to keep the result or restore the backup.",
    after_help = "EXAMPLES:\n  \
        svnfix                             Repair the working copy around the current directory\n  \
        svnfix D:\\src\\project              Repair the working copy containing a folder\n  \
        svnfix --install                   Add 'Clear SVN Work Queue' to the Explorer menu\n  \
        svnfix --uninstall                 Remove the Explorer menu entry"
)]
#[command(group(ArgGroup::new("mode").args(["install", "uninstall"])))]
pub struct Cli {
    /// Directory inside the working copy (or the wc.db file itself)
    #[arg(value_name = "PATH", conflicts_with = "mode")]
    pub path: Option<PathBuf>,

    /// Register the Explorer context menu and exit
    #[arg(long)]
    pub install: bool,

    /// Remove the Explorer context menu and exit
    #[arg(long)]
    pub uninstall: bool,

    /// Path to TortoiseProc, tried before the registry
    #[arg(long, env = "SVNFIX_REPAIR_TOOL", value_name = "EXE")]
    pub repair_tool: Option<PathBuf>,

    /// Do not wait for a key press before exiting
    #[arg(long)]
    pub no_pause: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Verbose output
    #[arg(long, short)]
    pub verbose: bool,

    /// Quiet mode: no progress spinner
    #[arg(long, short)]
    pub quiet: bool,
}

/// Rewrite the legacy `/install` and `/uninstall` switches to their long forms.
///
/// The context-menu installer has always been invoked this way, in any case.
pub fn normalize_legacy_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            if i == 0 {
                return arg;
            }
            match arg.to_str().map(str::to_ascii_lowercase).as_deref() {
                Some("/install") => OsString::from("--install"),
                Some("/uninstall") => OsString::from("--uninstall"),
                _ => arg,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(normalize_legacy_flags(args.iter().map(OsString::from)))
    }

    #[test]
    fn test_no_arguments() {
        let cli = parse(&["svnfix"]).unwrap();
        assert!(cli.path.is_none());
        assert!(!cli.install && !cli.uninstall);
    }

    #[test]
    fn test_positional_path() {
        let cli = parse(&["svnfix", "/work/project"]).unwrap();
        assert_eq!(cli.path, Some(PathBuf::from("/work/project")));
    }

    #[test]
    fn test_legacy_switches() {
        assert!(parse(&["svnfix", "/install"]).unwrap().install);
        assert!(parse(&["svnfix", "/UnInstall"]).unwrap().uninstall);
    }

    #[test]
    fn test_legacy_rewrite_leaves_program_and_paths() {
        let args = normalize_legacy_flags(
            ["/install", "/work/install", "/INSTALL"].map(OsString::from),
        );
        assert_eq!(args, ["/install", "/work/install", "--install"].map(OsString::from));
    }

    #[test]
    fn test_modes_conflict() {
        assert!(parse(&["svnfix", "--install", "--uninstall"]).is_err());
        assert!(parse(&["svnfix", "--install", "/work/project"]).is_err());
    }
}
