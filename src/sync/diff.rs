//! Diff computation between local content and the bucket listing
//!
//! Names are joined by exact string match. A local item is transferred when
//! no remote object has its name or when the sizes differ. Sizes are the
//! only change signal; nothing is hashed.

use crate::types::{ContentItem, RemoteObject};
use std::collections::HashMap;

/// The transfer plan for one upload run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    /// Bucket listing the diff was computed against
    pub remotes: Vec<RemoteObject>,
    /// Local items the diff was computed from
    pub locals: Vec<ContentItem>,
    /// Items to upload, in the order `locals` were supplied
    pub to_transfer: Vec<ContentItem>,
    /// Sum of the sizes in `to_transfer`
    pub total_bytes: u64,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.to_transfer.is_empty()
    }

    /// Number of local items already present with the same size
    pub fn skipped(&self) -> usize {
        self.locals.len() - self.to_transfer.len()
    }
}

/// The transfer plan for one download run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestorePlan {
    /// Bucket listing the plan was computed from
    pub remotes: Vec<RemoteObject>,
    /// Items already present in the restore target
    pub locals: Vec<ContentItem>,
    /// Objects to download, in listing order
    pub to_fetch: Vec<RemoteObject>,
    /// Sum of the sizes in `to_fetch`
    pub total_bytes: u64,
}

impl RestorePlan {
    pub fn is_empty(&self) -> bool {
        self.to_fetch.is_empty()
    }

    /// Number of remote objects already present locally with the same size
    pub fn skipped(&self) -> usize {
        self.remotes.len() - self.to_fetch.len()
    }
}

/// Compute which local items must be uploaded
pub fn compute(locals: Vec<ContentItem>, remotes: Vec<RemoteObject>) -> Diff {
    let remote_sizes = size_index(remotes.iter().map(|r| (r.name.as_str(), r.size)));

    let to_transfer: Vec<ContentItem> = locals
        .iter()
        .filter(|item| differs(&remote_sizes, &item.name, item.size))
        .cloned()
        .collect();
    let total_bytes = to_transfer.iter().map(|item| item.size).sum();

    tracing::debug!(
        locals = locals.len(),
        remotes = remotes.len(),
        to_transfer = to_transfer.len(),
        total_bytes,
        "Diff computed"
    );

    Diff {
        remotes,
        locals,
        to_transfer,
        total_bytes,
    }
}

/// Compute which remote objects must be downloaded into a local target
pub fn compute_restore(remotes: Vec<RemoteObject>, locals: Vec<ContentItem>) -> RestorePlan {
    let local_sizes = size_index(locals.iter().map(|l| (l.name.as_str(), l.size)));

    let to_fetch: Vec<RemoteObject> = remotes
        .iter()
        .filter(|obj| differs(&local_sizes, &obj.name, obj.size))
        .cloned()
        .collect();
    let total_bytes = to_fetch.iter().map(|obj| obj.size).sum();

    tracing::debug!(
        remotes = remotes.len(),
        locals = locals.len(),
        to_fetch = to_fetch.len(),
        total_bytes,
        "Restore plan computed"
    );

    RestorePlan {
        remotes,
        locals,
        to_fetch,
        total_bytes,
    }
}

/// Later entries win when a name repeats
fn size_index<'a>(entries: impl Iterator<Item = (&'a str, u64)>) -> HashMap<&'a str, u64> {
    entries.collect()
}

fn differs(other_side: &HashMap<&str, u64>, name: &str, size: u64) -> bool {
    match other_side.get(name) {
        None => true,
        Some(&other_size) => other_size != size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentHandle;
    use std::path::PathBuf;

    fn local(name: &str, size: u64) -> ContentItem {
        ContentItem::new(name, size, "image/jpeg", ContentHandle::new(PathBuf::from(name)))
    }

    fn remote(name: &str, size: u64) -> RemoteObject {
        RemoteObject::new(name, size)
    }

    fn names(items: &[ContentItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_new_item_is_transferred() {
        let diff = compute(vec![local("a.jpg", 100)], vec![]);
        assert_eq!(names(&diff.to_transfer), vec!["a.jpg"]);
        assert_eq!(diff.total_bytes, 100);
    }

    #[test]
    fn test_same_name_and_size_is_skipped() {
        let diff = compute(vec![local("a.jpg", 100)], vec![remote("a.jpg", 100)]);
        assert!(diff.is_empty());
        assert_eq!(diff.total_bytes, 0);
        assert_eq!(diff.skipped(), 1);
    }

    #[test]
    fn test_size_change_is_transferred() {
        let diff = compute(vec![local("a.jpg", 120)], vec![remote("a.jpg", 100)]);
        assert_eq!(names(&diff.to_transfer), vec!["a.jpg"]);
        assert_eq!(diff.total_bytes, 120);
    }

    #[test]
    fn test_names_match_exactly() {
        let diff = compute(
            vec![local("A.jpg", 1), local("dir/b.jpg", 2)],
            vec![remote("a.jpg", 1), remote("dir//b.jpg", 2)],
        );
        assert_eq!(names(&diff.to_transfer), vec!["A.jpg", "dir/b.jpg"]);
    }

    #[test]
    fn test_order_follows_locals() {
        let diff = compute(
            vec![local("z.jpg", 1), local("m.jpg", 2), local("a.jpg", 3)],
            vec![remote("m.jpg", 2)],
        );
        assert_eq!(names(&diff.to_transfer), vec!["z.jpg", "a.jpg"]);
        assert_eq!(diff.total_bytes, 4);
    }

    #[test]
    fn test_empty_inputs() {
        let diff = compute(vec![], vec![]);
        assert!(diff.is_empty());
        assert_eq!(diff.total_bytes, 0);

        let diff = compute(vec![], vec![remote("a.jpg", 1)]);
        assert!(diff.is_empty());
        assert_eq!(diff.remotes.len(), 1);
    }

    #[test]
    fn test_repeated_remote_name_last_wins() {
        let diff = compute(
            vec![local("a.jpg", 5)],
            vec![remote("a.jpg", 1), remote("a.jpg", 5)],
        );
        assert!(diff.is_empty());
    }

    #[test]
    fn test_restore_plan() {
        let plan = compute_restore(
            vec![remote("a.jpg", 10), remote("b.jpg", 20), remote("c.jpg", 30)],
            vec![local("a.jpg", 10), local("b.jpg", 5)],
        );
        let fetch: Vec<_> = plan.to_fetch.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(fetch, vec!["b.jpg", "c.jpg"]);
        assert_eq!(plan.total_bytes, 50);
        assert_eq!(plan.skipped(), 1);
    }
}
