//! Local directory bucket backend
//!
//! Each bucket is a subdirectory of `base`; object names map to relative
//! paths inside it. Uploads go to a hidden `.partial` sibling and are renamed
//! into place once the announced size has been written.

use crate::error::{Error, Result};
use crate::storage::ByteStream;
use crate::types::RemoteObject;
use crate::walk::{relative_path, walk_files};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

/// Local directory bucket backend
#[derive(Clone, Debug)]
pub struct LocalStore {
    /// Directory holding one subdirectory per bucket
    base: PathBuf,
    /// Bucket name
    bucket: String,
}

impl LocalStore {
    pub fn new(base: PathBuf, bucket: String) -> Self {
        Self { base, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Directory backing the bucket
    pub fn root(&self) -> PathBuf {
        self.base.join(&self.bucket)
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root().join(relative_path(name)?))
    }

    /// List every object in the bucket
    pub async fn list(&self) -> Result<Vec<RemoteObject>> {
        let root = self.root();
        if !fs::try_exists(&root).await.unwrap_or(false) {
            return Err(Error::store(format!(
                "bucket '{}' does not exist at {}",
                self.bucket,
                self.base.display()
            )));
        }

        let files = walk_files(&root).await?;
        Ok(files
            .into_iter()
            .map(|f| RemoteObject::new(f.name, f.size))
            .collect())
    }

    /// Get object metadata
    pub async fn head(&self, name: &str) -> Result<Option<RemoteObject>> {
        let path = self.resolve(name)?;

        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(RemoteObject::new(name, metadata.len()))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io("reading metadata", e)),
        }
    }

    /// Open an object as a stream of chunks
    pub async fn get(&self, name: &str) -> Result<ByteStream> {
        let path = self.resolve(name)?;

        let file = match fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound {
                    name: name.to_string(),
                })
            }
            Err(e) => return Err(Error::io("opening object", e)),
        };

        let stream = ReaderStream::new(file)
            .map(|chunk| chunk.map_err(|e| Error::io("reading object", e)));
        Ok(Box::pin(stream))
    }

    /// Write exactly `size` bytes from the stream, replacing any existing object
    pub async fn put(&self, name: &str, stream: ByteStream, size: u64) -> Result<u64> {
        let path = self.resolve(name)?;
        let written = write_file(&path, name, stream, size).await?;
        tracing::trace!(name = %name, size, "Stored object");
        Ok(written)
    }

    /// Delete an object
    pub async fn delete(&self, name: &str) -> Result<()> {
        let path = self.resolve(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(Error::io("removing object", e)),
        }
    }

    /// Create a bucket directory next to this one
    pub async fn create_bucket(&self, name: &str) -> Result<()> {
        let dir = self.base.join(relative_path(name)?);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::io("creating bucket directory", e))
    }
}

/// Stream exactly `size` bytes into `path` via a hidden `.partial` sibling
///
/// The target is only replaced once the full size has been written; on any
/// failure the partial file is removed.
pub(crate) async fn write_file(
    path: &Path,
    name: &str,
    mut stream: ByteStream,
    size: u64,
) -> Result<u64> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io("creating directories", e))?;
    }

    let partial = partial_path(path);
    let mut file = fs::File::create(&partial)
        .await
        .map_err(|e| Error::io("creating partial file", e))?;

    let mut written = 0u64;
    let result: Result<()> = async {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            if written > size {
                break;
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io("writing file", e))?;
        }
        if written != size {
            return Err(Error::SizeMismatch {
                name: name.to_string(),
                expected: size,
                actual: written,
            });
        }
        file.flush().await.map_err(|e| Error::io("flushing file", e))?;
        Ok(())
    }
    .await;
    drop(file);

    if let Err(e) = result {
        let _ = fs::remove_file(&partial).await;
        return Err(e);
    }

    fs::rename(&partial, path)
        .await
        .map_err(|e| Error::io("renaming partial file", e))?;

    Ok(written)
}

fn partial_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|s| format!(".{}.partial", s.to_string_lossy()))
        .unwrap_or_else(|| ".partial".to_string());
    path.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::bytes_stream;
    use tempfile::TempDir;

    async fn store_with_bucket(tmp: &TempDir) -> LocalStore {
        let store = LocalStore::new(tmp.path().to_path_buf(), "bucket".to_string());
        store.create_bucket("bucket").await.unwrap();
        store
    }

    async fn read_all(mut stream: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_put_get_list() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_bucket(&tmp).await;

        let written = store
            .put("DCIM/a.jpg", bytes_stream("hello world"), 11)
            .await
            .unwrap();
        assert_eq!(written, 11);

        let data = read_all(store.get("DCIM/a.jpg").await.unwrap()).await;
        assert_eq!(data, b"hello world");

        let objects = store.list().await.unwrap();
        assert_eq!(objects, vec![RemoteObject::new("DCIM/a.jpg", 11)]);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_bucket(&tmp).await;

        store.put("a.txt", bytes_stream("old"), 3).await.unwrap();
        store.put("a.txt", bytes_stream("newer"), 5).await.unwrap();

        let head = store.head("a.txt").await.unwrap().unwrap();
        assert_eq!(head.size, 5);
    }

    #[tokio::test]
    async fn test_put_size_mismatch_leaves_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_bucket(&tmp).await;

        let err = store.put("a.txt", bytes_stream("short"), 10).await.unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { expected: 10, actual: 5, .. }));

        let err = store.put("b.txt", bytes_stream("too long"), 3).await.unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { expected: 3, .. }));

        assert!(store.list().await.unwrap().is_empty());
        assert!(store.head("a.txt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_bucket(&tmp).await;
        assert!(matches!(
            store.get("missing.jpg").await.err().unwrap(),
            Error::NotFound { .. }
        ));
        assert!(store.head("missing.jpg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_missing_bucket() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path().to_path_buf(), "absent".to_string());
        let err = store.list().await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let tmp = TempDir::new().unwrap();
        let store = store_with_bucket(&tmp).await;
        let err = store.put("../outside.txt", bytes_stream("x"), 1).await.unwrap_err();
        assert!(matches!(err, Error::InvalidUri { .. }));
    }
}
