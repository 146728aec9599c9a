//! # svnfix
//!
//! Unsticks a Subversion working copy whose commands keep failing with
//! "run cleanup" or "working copy locked" errors.
//!
//! A run:
//!
//! - **Locates** the working copy root above the start directory (`.svn/wc.db`)
//! - **Backs up** the metadata store next to itself, never overwriting an older backup
//! - **Clears** the `WORK_QUEUE` and `WC_LOCK` tables
//! - **Repairs** by running TortoiseSVN's own `cleanup` command
//! - **Resolves** the backup: you confirm the result, or restore it
//!
//! On Windows it can also register itself in the Explorer context menu.

pub mod cli;
pub mod common;
pub mod repair;
pub mod shell;
