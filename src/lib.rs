//! mediasync - Media Library Backup to S3-Compatible Storage
//!
//! This library lists a local media library or document tree, diffs it
//! against a bucket listing by name and size, and uploads what is missing
//! while reporting progress as a lazy stream of snapshots.

pub mod cli;
pub mod config;
pub mod error;
pub mod progress;
pub mod retry;
pub mod source;
pub mod storage;
pub mod sync;
pub mod types;
mod walk;

pub use config::Config;
pub use error::{Error, Result};
pub use source::{ContentSource, SourceKind};
pub use storage::ObjectStore;
pub use sync::{BackupEngine, Diff, RestorePlan, SyncExecutor};
pub use types::*;
