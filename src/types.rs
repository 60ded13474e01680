//! Core domain types for mediasync

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Opaque reference used by a content source to open an item's bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHandle(PathBuf);

impl ContentHandle {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub(crate) fn path(&self) -> &Path {
        &self.0
    }
}

/// A local file or media record eligible for transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// Unique key within the source ('/'-separated path relative to the root)
    pub name: String,

    /// Size in bytes
    pub size: u64,

    /// MIME type, e.g. `image/jpeg`
    pub content_type: String,

    /// Handle for opening the item's byte stream
    pub handle: ContentHandle,
}

impl ContentItem {
    /// Create a new content item
    pub fn new(
        name: impl Into<String>,
        size: u64,
        content_type: impl Into<String>,
        handle: ContentHandle,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            content_type: content_type.into(),
            handle,
        }
    }

    /// Collection the item belongs to (first path component, "" at the root)
    pub fn collection(&self) -> &str {
        collection_of(&self.name)
    }
}

/// An object already present in the destination bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Object key
    pub name: String,

    /// Size in bytes
    pub size: u64,
}

impl RemoteObject {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Snapshot of cumulative transfer state during a run
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TransferProgress {
    /// Items completed so far
    pub items_transferred: u64,

    /// Bytes written so far
    pub bytes_transferred: u64,

    /// Completion ratio in [0, 1]
    pub percentage: f64,
}

/// Statistics for a backup or restore run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// Items listed on the local side
    pub local_items: u64,

    /// Objects listed in the bucket
    pub remote_objects: u64,

    /// Items transferred
    pub items_transferred: u64,

    /// Items skipped because name and size already match
    pub items_skipped: u64,

    /// Bytes transferred
    pub bytes_transferred: u64,

    /// Bytes the plan called for
    pub bytes_total: u64,

    /// Duration in seconds
    pub duration_secs: f64,
}

impl SyncStats {
    /// Calculate transfer rate in bytes per second
    pub fn transfer_rate(&self) -> f64 {
        if self.duration_secs == 0.0 {
            0.0
        } else {
            self.bytes_transferred as f64 / self.duration_secs
        }
    }
}

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Local to bucket
    Upload,

    /// Bucket to local
    Download,
}

pub(crate) fn collection_of(name: &str) -> &str {
    match name.split_once('/') {
        Some((first, _)) => first,
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> ContentItem {
        ContentItem::new(name, 1, "image/jpeg", ContentHandle::new(PathBuf::from(name)))
    }

    #[test]
    fn test_collection() {
        assert_eq!(item("DCIM/Camera/a.jpg").collection(), "DCIM");
        assert_eq!(item("Pictures/b.png").collection(), "Pictures");
        assert_eq!(item("c.jpg").collection(), "");
    }

    #[test]
    fn test_transfer_rate() {
        let stats = SyncStats {
            bytes_transferred: 1000,
            duration_secs: 2.0,
            ..Default::default()
        };
        assert!((stats.transfer_rate() - 500.0).abs() < f64::EPSILON);
        assert_eq!(SyncStats::default().transfer_rate(), 0.0);
    }
}
