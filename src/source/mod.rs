//! Local content sources
//!
//! A source enumerates items under a root directory and opens fresh byte
//! streams for them. The variant is picked once from [`SourceKind`] and every
//! item of a run goes through the same one.

pub mod media;
pub mod tree;

use crate::error::{Error, Result};
use crate::storage::ByteStream;
use crate::types::{ContentHandle, ContentItem};
use crate::walk::WalkedFile;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;

pub use media::MediaStoreSource;
pub use tree::DocumentTreeSource;

/// Discriminator for the source variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Media library: images and videos only
    Media,
    /// Document tree: every regular file
    Document,
}

/// Content source enum for unified access to the source variants
#[derive(Debug, Clone)]
pub enum ContentSource {
    MediaStore(MediaStoreSource),
    DocumentTree(DocumentTreeSource),
}

impl ContentSource {
    /// Create a source of the given kind rooted at `root`
    pub fn new(kind: SourceKind, root: PathBuf) -> Self {
        match kind {
            SourceKind::Media => ContentSource::MediaStore(MediaStoreSource::new(root)),
            SourceKind::Document => ContentSource::DocumentTree(DocumentTreeSource::new(root)),
        }
    }

    /// Get the name of this source (for logging)
    pub fn name(&self) -> &'static str {
        match self {
            ContentSource::MediaStore(_) => "media",
            ContentSource::DocumentTree(_) => "document",
        }
    }

    /// List items in the given collections (empty filter = all collections)
    pub async fn list(&self, collections: &[String]) -> Result<Vec<ContentItem>> {
        let mut items = match self {
            ContentSource::MediaStore(s) => s.list().await?,
            ContentSource::DocumentTree(s) => s.list().await?,
        };

        if !collections.is_empty() {
            items.retain(|item| collections.iter().any(|c| c == item.collection()));
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::debug!(
            source = self.name(),
            items = items.len(),
            "Listed local content"
        );
        Ok(items)
    }

    /// Open a fresh stream over the item's bytes, positioned at offset 0
    pub async fn open(&self, handle: &ContentHandle) -> Result<ByteStream> {
        open_file(handle.path()).await
    }
}

/// MIME type guessed from the file extension
pub(crate) fn guess_content_type(path: &Path) -> mime_guess::Mime {
    mime_guess::from_path(path).first_or_octet_stream()
}

pub(crate) fn item_from(file: WalkedFile, content_type: &mime_guess::Mime) -> ContentItem {
    ContentItem::new(
        file.name,
        file.size,
        content_type.essence_str(),
        ContentHandle::new(file.path),
    )
}

async fn open_file(path: &Path) -> Result<ByteStream> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::SourceUnavailable {
            name: path.display().to_string(),
            source: e,
        })?;

    let name = path.display().to_string();
    let stream = ReaderStream::new(file).map(move |chunk| {
        chunk.map_err(|e| Error::SourceUnavailable {
            name: name.clone(),
            source: e,
        })
    });

    Ok(Box::pin(stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_file(dir: &TempDir, name: &str, content: &[u8]) {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    async fn read_all(mut stream: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_collection_filter() {
        let tmp = TempDir::new().unwrap();
        create_file(&tmp, "DCIM/Camera/a.jpg", b"aaa");
        create_file(&tmp, "Pictures/b.png", b"bb");
        create_file(&tmp, "c.mp4", b"c");

        let source = ContentSource::new(SourceKind::Media, tmp.path().to_path_buf());

        let all = source.list(&[]).await.unwrap();
        let names: Vec<_> = all.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["DCIM/Camera/a.jpg", "Pictures/b.png", "c.mp4"]);

        let dcim = source.list(&["DCIM".to_string()]).await.unwrap();
        assert_eq!(dcim.len(), 1);
        assert_eq!(dcim[0].name, "DCIM/Camera/a.jpg");
        assert_eq!(dcim[0].size, 3);

        let root_only = source.list(&[String::new()]).await.unwrap();
        assert_eq!(root_only.len(), 1);
        assert_eq!(root_only[0].name, "c.mp4");

        let none = source.list(&["Movies".to_string()]).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_hidden_files_skipped() {
        let tmp = TempDir::new().unwrap();
        create_file(&tmp, ".thumbnails/x.jpg", b"x");
        create_file(&tmp, "DCIM/.pending.jpg", b"p");
        create_file(&tmp, "DCIM/a.jpg", b"a");

        let source = ContentSource::new(SourceKind::Document, tmp.path().to_path_buf());
        let items = source.list(&[]).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "DCIM/a.jpg");
    }

    #[tokio::test]
    async fn test_open_yields_independent_streams() {
        let tmp = TempDir::new().unwrap();
        create_file(&tmp, "doc.txt", b"hello world");

        let source = ContentSource::new(SourceKind::Document, tmp.path().to_path_buf());
        let items = source.list(&[]).await.unwrap();

        let first = source.open(&items[0].handle).await.unwrap();
        let second = source.open(&items[0].handle).await.unwrap();
        assert_eq!(read_all(first).await, b"hello world");
        assert_eq!(read_all(second).await, b"hello world");
    }

    #[tokio::test]
    async fn test_open_vanished_file() {
        let tmp = TempDir::new().unwrap();
        create_file(&tmp, "doc.txt", b"hello");

        let source = ContentSource::new(SourceKind::Document, tmp.path().to_path_buf());
        let items = source.list(&[]).await.unwrap();
        fs::remove_file(tmp.path().join("doc.txt")).unwrap();

        let err = source.open(&items[0].handle).await.err().unwrap();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_missing_root() {
        let tmp = TempDir::new().unwrap();
        let source = ContentSource::new(SourceKind::Media, tmp.path().join("absent"));
        assert!(matches!(source.list(&[]).await, Err(Error::Io { .. })));
    }
}
