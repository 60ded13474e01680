//! Configuration management for mediasync

use crate::error::{Error, Result};
use crate::source::SourceKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Region used when the bucket config leaves it empty
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default number of items transferred at once
pub const DEFAULT_JOBS: usize = 1;

/// Environment variable overriding the access key
pub const ACCESS_KEY_ENV: &str = "MEDIASYNC_ACCESS_KEY";

/// Environment variable overriding the secret key
pub const SECRET_KEY_ENV: &str = "MEDIASYNC_SECRET_KEY";

/// Bucket credentials and addressing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    /// Endpoint URL (`https://...` for S3-compatible, `file:///dir` for a local bucket)
    pub endpoint: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// Bucket name
    pub bucket: String,

    /// Region, `us-east-1` when unset
    pub region: Option<String>,

    /// Use virtual-hosted-style addressing instead of path-style
    pub virtual_host_style: bool,
}

impl BucketConfig {
    /// Region to sign requests for
    pub fn effective_region(&self) -> &str {
        self.region
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REGION)
    }

    /// Fill credentials from the environment when set
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(ACCESS_KEY_ENV) {
            self.access_key = key;
        }
        if let Ok(secret) = std::env::var(SECRET_KEY_ENV) {
            self.secret_key = secret;
        }
    }
}

/// Local content source selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Which source variant enumerates the root
    pub kind: SourceKind,

    /// Root directory of the media library or document tree
    pub root: PathBuf,

    /// Collections to include (empty = all)
    pub collections: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Media,
            root: PathBuf::from("."),
            collections: Vec::new(),
        }
    }
}

/// Main configuration struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Destination bucket
    pub bucket: BucketConfig,

    /// Local content source
    pub source: SourceConfig,

    /// Items transferred at once (1 = strictly sequential)
    pub jobs: usize,

    /// Compute and print the plan without transferring
    pub dry_run: bool,

    /// Show progress bars
    pub progress: bool,

    /// Times a failed run is recomputed and re-run from scratch
    pub max_retries: u32,

    /// Retry delay base in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket: BucketConfig::default(),
            source: SourceConfig::default(),
            jobs: DEFAULT_JOBS,
            dry_run: false,
            progress: true,
            max_retries: 0,
            retry_delay_ms: 1000,
        }
    }
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io("reading config", e))?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io("creating config dir", e))?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("serializing config: {}", e)))?;
        std::fs::write(path, contents).map_err(|e| Error::io("writing config", e))?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("mediasync").join("config.toml"))
            .ok_or_else(|| Error::config("could not determine config directory"))
    }

    /// Get the effective number of jobs (0 is treated as 1)
    pub fn effective_jobs(&self) -> usize {
        self.jobs.max(1)
    }

    /// Check that the bucket section can address a bucket
    pub fn validate(&self) -> Result<()> {
        if self.bucket.endpoint.is_empty() {
            return Err(Error::config("bucket.endpoint is not set"));
        }
        if self.bucket.bucket.is_empty() {
            return Err(Error::config("bucket.bucket is not set"));
        }
        Ok(())
    }
}
