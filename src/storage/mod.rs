//! Object store backends for mediasync

pub mod local;
pub mod s3;

use crate::config::BucketConfig;
use crate::error::{Error, Result};
use crate::types::RemoteObject;
use bytes::Bytes;
use futures::Stream;
use std::path::PathBuf;
use std::pin::Pin;
use url::Url;

pub use local::LocalStore;
pub use s3::S3Store;

/// A stream of byte chunks, used for both uploads and downloads
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Object store enum for unified access to bucket backends
#[derive(Clone)]
pub enum ObjectStore {
    S3(S3Store),
    Local(LocalStore),
}

impl ObjectStore {
    /// Create a store from bucket configuration
    ///
    /// `file://` endpoints select a local directory holding one subdirectory
    /// per bucket; `http(s)://` endpoints select an S3-compatible service.
    pub async fn from_config(config: &BucketConfig) -> Result<Self> {
        let url = Url::parse(&config.endpoint).map_err(|e| Error::InvalidUri {
            uri: config.endpoint.clone(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "file" => {
                let base = url.to_file_path().map_err(|_| Error::InvalidUri {
                    uri: config.endpoint.clone(),
                    reason: "not a local path".to_string(),
                })?;
                Ok(Self::local(base, config.bucket.clone()))
            }
            "http" | "https" => Ok(ObjectStore::S3(S3Store::new(config).await?)),
            other => Err(Error::InvalidUri {
                uri: config.endpoint.clone(),
                reason: format!("unsupported scheme '{}'", other),
            }),
        }
    }

    /// Create a local store for `bucket` under `base`
    pub fn local(base: PathBuf, bucket: String) -> Self {
        ObjectStore::Local(LocalStore::new(base, bucket))
    }

    /// Get the name of this backend (for logging)
    pub fn name(&self) -> &'static str {
        match self {
            ObjectStore::S3(_) => "s3",
            ObjectStore::Local(_) => "local",
        }
    }

    /// Bucket this store addresses
    pub fn bucket(&self) -> &str {
        match self {
            ObjectStore::S3(b) => b.bucket(),
            ObjectStore::Local(b) => b.bucket(),
        }
    }

    /// List every object in the bucket
    pub async fn list(&self) -> Result<Vec<RemoteObject>> {
        match self {
            ObjectStore::S3(b) => b.list().await,
            ObjectStore::Local(b) => b.list().await,
        }
    }

    /// Get object metadata
    pub async fn head(&self, name: &str) -> Result<Option<RemoteObject>> {
        match self {
            ObjectStore::S3(b) => b.head(name).await,
            ObjectStore::Local(b) => b.head(name).await,
        }
    }

    /// Check if an object exists
    pub async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.head(name).await?.is_some())
    }

    /// Open an object as a stream of chunks
    pub async fn get(&self, name: &str) -> Result<ByteStream> {
        match self {
            ObjectStore::S3(b) => b.get(name).await,
            ObjectStore::Local(b) => b.get(name).await,
        }
    }

    /// Upload exactly `size` bytes from `stream`, replacing any existing object
    pub async fn put(&self, name: &str, stream: ByteStream, size: u64) -> Result<u64> {
        match self {
            ObjectStore::S3(b) => b.put(name, stream, size).await,
            ObjectStore::Local(b) => b.put(name, stream, size).await,
        }
    }

    /// Delete an object
    pub async fn delete(&self, name: &str) -> Result<()> {
        match self {
            ObjectStore::S3(b) => b.delete(name).await,
            ObjectStore::Local(b) => b.delete(name).await,
        }
    }

    /// Create a bucket (setup and test paths only)
    pub async fn create_bucket(&self, name: &str) -> Result<()> {
        match self {
            ObjectStore::S3(b) => b.create_bucket(name).await,
            ObjectStore::Local(b) => b.create_bucket(name).await,
        }
    }
}

/// Wrap an in-memory buffer as a [`ByteStream`]
pub fn bytes_stream(data: impl Into<Bytes>) -> ByteStream {
    let data: Bytes = data.into();
    Box::pin(futures::stream::once(async move { Ok(data) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_from_config_file_endpoint() {
        let tmp = TempDir::new().unwrap();
        let config = BucketConfig {
            endpoint: Url::from_directory_path(tmp.path()).unwrap().to_string(),
            bucket: "photos".to_string(),
            ..Default::default()
        };

        let store = ObjectStore::from_config(&config).await.unwrap();
        assert_eq!(store.name(), "local");
        assert_eq!(store.bucket(), "photos");
    }

    #[tokio::test]
    async fn test_from_config_rejects_unknown_scheme() {
        let config = BucketConfig {
            endpoint: "ftp://example.com".to_string(),
            bucket: "photos".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ObjectStore::from_config(&config).await,
            Err(Error::InvalidUri { .. })
        ));

        let config = BucketConfig {
            endpoint: "not a url".to_string(),
            ..config
        };
        assert!(matches!(
            ObjectStore::from_config(&config).await,
            Err(Error::InvalidUri { .. })
        ));
    }
}
