pub mod backup;
pub mod external;
pub mod locator;
pub mod queue;
pub mod workflow;

pub use backup::{BackupArtifact, BackupManager, FileBackups};
pub use external::{RepairInvoker, ToolCandidate, ToolLookup, TortoiseCleanup};
pub use locator::{find_working_copy_root, RootLocator, StoreLocator, WorkingCopy};
pub use queue::{PartialClear, QueueCleaner, SqliteQueueCleaner, TableReport, QUEUE_TABLES};
pub use workflow::{run, Collaborators, Disposition, Finish, RepairOutcome, State};
