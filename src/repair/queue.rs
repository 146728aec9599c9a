use rusqlite::{Connection, OpenFlags};
use std::path::Path;

use crate::common::errors::FixError;

/// Tables holding pending work items and locks, cleared in this order
pub const QUEUE_TABLES: [&str; 2] = ["WORK_QUEUE", "WC_LOCK"];

/// Rows removed from one queue table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: String,
    pub rows_deleted: usize,
}

/// A clear that stopped at a failing table.
///
/// Tables emptied before the failure stay emptied, and are listed in `cleared`.
#[derive(Debug)]
pub struct PartialClear {
    pub cleared: Vec<TableReport>,
    pub error: FixError,
}

impl From<FixError> for PartialClear {
    fn from(error: FixError) -> Self {
        Self {
            cleared: Vec::new(),
            error,
        }
    }
}

/// Empties the queue tables of a metadata store
pub trait QueueCleaner {
    fn clear_queues(&self, store: &Path) -> Result<Vec<TableReport>, PartialClear>;
}

/// Clears queue tables through SQLite
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteQueueCleaner;

impl QueueCleaner for SqliteQueueCleaner {
    fn clear_queues(&self, store: &Path) -> Result<Vec<TableReport>, PartialClear> {
        let conn = open_store(store)?;
        let result = clear_tables(&conn, &QUEUE_TABLES);

        // The repair tool needs the file to itself once we return
        let closed = conn.close().map_err(|(_, source)| FixError::StoreOpenFailed {
            path: store.to_path_buf(),
            source,
        });

        match (result, closed) {
            (Ok(cleared), Err(error)) => Err(PartialClear { cleared, error }),
            (Err(partial), Err(error)) => {
                tracing::warn!(%error, "closing store after failed clear");
                Err(partial)
            }
            (result, Ok(())) => result,
        }
    }
}

/// Open an existing store for writing. Never creates a new file.
pub fn open_store(store: &Path) -> Result<Connection, FixError> {
    Connection::open_with_flags(
        store,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| FixError::StoreOpenFailed {
        path: store.to_path_buf(),
        source,
    })
}

/// Delete every row of each table, in order.
///
/// The first failure stops the run; tables already cleared stay cleared and
/// come back inside the error.
pub fn clear_tables(conn: &Connection, tables: &[&str]) -> Result<Vec<TableReport>, PartialClear> {
    let mut reports = Vec::with_capacity(tables.len());

    for table in tables {
        let rows_deleted = match conn.execute(&format!("DELETE FROM {}", table), []) {
            Ok(n) => n,
            Err(source) => {
                return Err(PartialClear {
                    cleared: reports,
                    error: FixError::StoreQueryFailed {
                        table: table.to_string(),
                        source,
                    },
                })
            }
        };

        tracing::info!(table, rows = rows_deleted, "cleared queue table");
        reports.push(TableReport {
            table: table.to_string(),
            rows_deleted,
        });
    }

    Ok(reports)
}
