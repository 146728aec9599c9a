use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use svnfix::cli::prompt::{Answer, ScriptedPrompter};
use svnfix::common::errors::FixError;
use svnfix::repair::backup::{BackupArtifact, BackupManager, FileBackups};
use svnfix::repair::external::{RepairInvoker, ToolCandidate, ToolLookup, TortoiseCleanup};
use svnfix::repair::locator::StoreLocator;
use svnfix::repair::queue::SqliteQueueCleaner;
use svnfix::repair::workflow::{
    self, Collaborators, Disposition, Finish, RepairOutcome, CONFIRM_REPAIR, CONFIRM_RESTORE,
    PROCEED_WITHOUT_BACKUP,
};

/// Build `<dir>/.svn/wc.db` with the given number of queued work items and locks
fn create_working_copy(dir: &Path, work_items: usize, locks: usize) -> PathBuf {
    let svn = dir.join(".svn");
    std::fs::create_dir_all(&svn).unwrap();
    let store = svn.join("wc.db");

    let conn = Connection::open(&store).unwrap();
    conn.execute_batch(
        "CREATE TABLE WORK_QUEUE (id INTEGER PRIMARY KEY AUTOINCREMENT, work BLOB NOT NULL);
         CREATE TABLE WC_LOCK (wc_id INTEGER NOT NULL, local_dir_relpath TEXT NOT NULL,
                               locked_levels INTEGER NOT NULL DEFAULT -1,
                               PRIMARY KEY (wc_id, local_dir_relpath));
         CREATE TABLE NODES (local_relpath TEXT PRIMARY KEY);
         INSERT INTO NODES VALUES ('trunk'), ('trunk/main.c');",
    )
    .unwrap();
    for i in 0..work_items {
        conn.execute("INSERT INTO WORK_QUEUE (work) VALUES (?1)", [format!("(sync-file-flags {})", i)])
            .unwrap();
    }
    for i in 0..locks {
        conn.execute(
            "INSERT INTO WC_LOCK (wc_id, local_dir_relpath) VALUES (1, ?1)",
            [format!("trunk/dir{}", i)],
        )
        .unwrap();
    }
    store
}

fn count_rows(store: &Path, table: &str) -> i64 {
    let conn = Connection::open(store).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
}

fn backups_in(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "bak"))
        .collect()
}

/// Repair tool stand-in with a fixed result
struct StubRepair(bool);

impl RepairInvoker for StubRepair {
    fn run_cleanup(&self, _root: &Path) -> Result<(), FixError> {
        if self.0 {
            Ok(())
        } else {
            Err(FixError::ExternalToolNonZeroExit {
                program: PathBuf::from("TortoiseProc.exe"),
                code: Some(1),
            })
        }
    }
}

/// Real file backups, except that creating one always fails
struct BrokenBackups;

impl BackupManager for BrokenBackups {
    fn acquire_writable_access(&self, store: &Path) -> Result<bool, FixError> {
        FileBackups.acquire_writable_access(store)
    }

    fn create_backup(&self, store: &Path) -> Result<BackupArtifact, FixError> {
        Err(FixError::BackupCreateFailed {
            path: store.to_path_buf(),
            backup: store.with_extension("db.bak"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no space"),
        })
    }

    fn discard(&self, backup: &BackupArtifact) -> Result<(), FixError> {
        FileBackups.discard(backup)
    }

    fn restore(&self, backup: &BackupArtifact, original: &Path) -> Result<(), FixError> {
        FileBackups.restore(backup, original)
    }
}

fn run_with(
    start: &Path,
    backups: &dyn BackupManager,
    repair: &dyn RepairInvoker,
    prompter: &mut ScriptedPrompter,
) -> Finish {
    let mut collab = Collaborators {
        locator: &StoreLocator,
        backups,
        cleaner: &SqliteQueueCleaner,
        repair,
        prompter,
    };
    workflow::run(start, &mut collab)
}

#[test]
fn test_successful_repair_clears_queues_and_deletes_backup() {
    let wc = TempDir::new().unwrap();
    let store = create_working_copy(wc.path(), 3, 0);
    let nested = wc.path().join("trunk").join("src");
    std::fs::create_dir_all(&nested).unwrap();

    let mut prompter = ScriptedPrompter::new([Answer::Yes]);
    let finish = run_with(&nested, &FileBackups, &StubRepair(true), &mut prompter);

    match finish {
        Finish::Resolved {
            outcome,
            tables,
            disposition,
        } => {
            assert_eq!(outcome, RepairOutcome::CleanedAndRepaired);
            let counts: Vec<(String, usize)> =
                tables.into_iter().map(|t| (t.table, t.rows_deleted)).collect();
            assert_eq!(
                counts,
                vec![("WORK_QUEUE".to_string(), 3), ("WC_LOCK".to_string(), 0)]
            );
            assert!(matches!(disposition, Disposition::Discarded { .. }));
        }
        other => panic!("unexpected finish: {:?}", other),
    }

    assert_eq!(prompter.asked, vec![CONFIRM_REPAIR]);
    assert_eq!(count_rows(&store, "WORK_QUEUE"), 0);
    assert_eq!(count_rows(&store, "WC_LOCK"), 0);
    assert_eq!(count_rows(&store, "NODES"), 2);
    assert!(backups_in(store.parent().unwrap()).is_empty());
}

#[test]
fn test_rejected_repair_restores_original_bytes() {
    let wc = TempDir::new().unwrap();
    let store = create_working_copy(wc.path(), 5, 2);
    let before = std::fs::read(&store).unwrap();

    let mut prompter = ScriptedPrompter::new([Answer::No]);
    let finish = run_with(wc.path(), &FileBackups, &StubRepair(true), &mut prompter);

    assert!(matches!(
        finish,
        Finish::Resolved {
            disposition: Disposition::Restored { .. },
            ..
        }
    ));
    assert_eq!(std::fs::read(&store).unwrap(), before);
    assert_eq!(count_rows(&store, "WORK_QUEUE"), 5);
    assert_eq!(count_rows(&store, "WC_LOCK"), 2);
    assert!(backups_in(store.parent().unwrap()).is_empty());
}

#[test]
fn test_failed_repair_keeps_backup_until_asked() {
    let wc = TempDir::new().unwrap();
    let store = create_working_copy(wc.path(), 1, 1);

    let mut prompter = ScriptedPrompter::new([Answer::No]);
    let finish = run_with(wc.path(), &FileBackups, &StubRepair(false), &mut prompter);

    let disposition = match finish {
        Finish::Resolved {
            outcome,
            disposition,
            ..
        } => {
            assert_eq!(outcome, RepairOutcome::CleanedButRepairFailed);
            disposition
        }
        other => panic!("unexpected finish: {:?}", other),
    };
    assert_eq!(prompter.asked, vec![CONFIRM_RESTORE]);

    // Both the cleaned store and the backup are left in place
    let surviving = disposition.surviving_backup().unwrap().to_path_buf();
    assert!(surviving.exists());
    assert_eq!(backups_in(store.parent().unwrap()), vec![surviving]);
    assert_eq!(count_rows(&store, "WORK_QUEUE"), 0);
}

#[test]
fn test_failed_repair_restore_reproduces_original() {
    let wc = TempDir::new().unwrap();
    let store = create_working_copy(wc.path(), 4, 0);
    let before = std::fs::read(&store).unwrap();

    let mut prompter = ScriptedPrompter::new([Answer::Yes]);
    run_with(wc.path(), &FileBackups, &StubRepair(false), &mut prompter);

    assert_eq!(std::fs::read(&store).unwrap(), before);
    assert!(backups_in(store.parent().unwrap()).is_empty());
}

#[test]
fn test_missing_tool_goes_to_restore_prompt() {
    let wc = TempDir::new().unwrap();
    let store = create_working_copy(wc.path(), 2, 0);
    let tools = TempDir::new().unwrap();

    let lookup = ToolLookup::new(vec![
        ToolCandidate::Path(tools.path().join("TortoiseSVN").join("TortoiseProc.exe")),
        ToolCandidate::Path(tools.path().join("Wow6432Node").join("TortoiseProc.exe")),
    ]);
    let repair = TortoiseCleanup::new(lookup, false);

    let mut prompter = ScriptedPrompter::new([Answer::Yes]);
    let finish = run_with(wc.path(), &FileBackups, &repair, &mut prompter);

    assert!(matches!(
        finish,
        Finish::Resolved {
            outcome: RepairOutcome::CleanedButRepairFailed,
            disposition: Disposition::Restored { .. },
            ..
        }
    ));
    assert_eq!(prompter.asked, vec![CONFIRM_RESTORE]);
    assert_eq!(count_rows(&store, "WORK_QUEUE"), 2);
}

#[test]
fn test_declined_after_backup_failure_leaves_store_untouched() {
    let wc = TempDir::new().unwrap();
    let store = create_working_copy(wc.path(), 3, 1);
    let before = std::fs::read(&store).unwrap();

    let mut prompter = ScriptedPrompter::new([Answer::No]);
    let finish = run_with(wc.path(), &BrokenBackups, &StubRepair(true), &mut prompter);

    assert!(matches!(finish, Finish::Cancelled { unrecognized: None }));
    assert_eq!(prompter.asked, vec![PROCEED_WITHOUT_BACKUP]);
    assert_eq!(std::fs::read(&store).unwrap(), before);
    assert_eq!(count_rows(&store, "WORK_QUEUE"), 3);
}

#[test]
fn test_proceeding_without_backup_still_cleans() {
    let wc = TempDir::new().unwrap();
    let store = create_working_copy(wc.path(), 3, 1);

    let mut prompter = ScriptedPrompter::new([Answer::Yes]);
    let finish = run_with(wc.path(), &BrokenBackups, &StubRepair(true), &mut prompter);

    assert!(matches!(
        finish,
        Finish::Resolved {
            disposition: Disposition::NoBackup,
            ..
        }
    ));
    assert_eq!(count_rows(&store, "WORK_QUEUE"), 0);
    assert_eq!(count_rows(&store, "WC_LOCK"), 0);
}

#[test]
fn test_corrupt_store_fails_clean_and_offers_restore() {
    let wc = TempDir::new().unwrap();
    let svn = wc.path().join(".svn");
    std::fs::create_dir_all(&svn).unwrap();
    let store = svn.join("wc.db");
    std::fs::write(&store, b"this is not a sqlite database, just some text bytes").unwrap();

    let mut prompter = ScriptedPrompter::new([Answer::Other("later".into())]);
    let finish = run_with(wc.path(), &FileBackups, &StubRepair(true), &mut prompter);

    match finish {
        Finish::Resolved {
            outcome,
            disposition,
            ..
        } => {
            assert_eq!(outcome, RepairOutcome::CleanFailed);
            assert!(matches!(
                disposition,
                Disposition::Kept {
                    unrecognized: Some(ref s),
                    ..
                } if s == "later"
            ));
        }
        other => panic!("unexpected finish: {:?}", other),
    }
    assert_eq!(backups_in(&svn).len(), 1);
}

#[test]
fn test_partial_clean_reports_emptied_tables() {
    let wc = TempDir::new().unwrap();
    let svn = wc.path().join(".svn");
    std::fs::create_dir_all(&svn).unwrap();
    let store = svn.join("wc.db");
    let conn = Connection::open(&store).unwrap();
    conn.execute_batch(
        "CREATE TABLE WORK_QUEUE (id INTEGER PRIMARY KEY, work BLOB);
         INSERT INTO WORK_QUEUE (work) VALUES ('a'), ('b');",
    )
    .unwrap();
    drop(conn);

    let mut prompter = ScriptedPrompter::new([Answer::No]);
    let finish = run_with(wc.path(), &FileBackups, &StubRepair(true), &mut prompter);

    match finish {
        Finish::Resolved { outcome, tables, .. } => {
            assert_eq!(outcome, RepairOutcome::CleanFailed);
            let counts: Vec<(String, usize)> =
                tables.into_iter().map(|t| (t.table, t.rows_deleted)).collect();
            assert_eq!(counts, vec![("WORK_QUEUE".to_string(), 2)]);
        }
        other => panic!("unexpected finish: {:?}", other),
    }
    assert_eq!(prompter.asked, vec![CONFIRM_RESTORE]);
    assert_eq!(count_rows(&store, "WORK_QUEUE"), 0);
}

#[test]
fn test_unrecognized_answer_after_backup_failure_is_reported() {
    let wc = TempDir::new().unwrap();
    let store = create_working_copy(wc.path(), 1, 0);
    let before = std::fs::read(&store).unwrap();

    let mut prompter = ScriptedPrompter::new([Answer::Other("maybe".into())]);
    let finish = run_with(wc.path(), &BrokenBackups, &StubRepair(true), &mut prompter);

    match finish {
        Finish::Cancelled { unrecognized } => assert_eq!(unrecognized.as_deref(), Some("maybe")),
        other => panic!("unexpected finish: {:?}", other),
    }
    assert_eq!(std::fs::read(&store).unwrap(), before);
}

#[test]
fn test_no_working_copy() {
    let dir = TempDir::new().unwrap();
    let mut prompter = ScriptedPrompter::default();
    let finish = run_with(dir.path(), &FileBackups, &StubRepair(true), &mut prompter);
    assert!(matches!(finish, Finish::NoRoot { .. }));
}
