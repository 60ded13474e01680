//! Error types for mediasync

use thiserror::Error;

/// Result type alias for mediasync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mediasync
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors outside of item transfer (config files, restore targets)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// A local item could not be opened (vanished, permission revoked)
    #[error("Source unavailable: {name}: {source}")]
    SourceUnavailable {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Object store call failed (connectivity, bad host, bad credentials)
    #[error("Store unreachable: {message}")]
    StoreUnreachable { message: String },

    /// Object not present in the store
    #[error("Object not found: {name}")]
    NotFound { name: String },

    /// Stream yielded a different number of bytes than announced
    #[error("Size mismatch for {name}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    /// First failure of a sync run, attributed to the offending item
    #[error("Transfer of {name} failed: {source}")]
    Transfer {
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid endpoint or object name
    #[error("Invalid URI: {uri} - {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Run was cancelled between items
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreUnreachable {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Attribute an error to the item being transferred
    pub fn transfer(name: impl Into<String>, source: Error) -> Self {
        Self::Transfer {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Name of the item a transfer failure is attributed to
    pub fn item_name(&self) -> Option<&str> {
        match self {
            Error::Transfer { name, .. }
            | Error::SourceUnavailable { name, .. }
            | Error::NotFound { name }
            | Error::SizeMismatch { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Check if re-running the whole sync could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::StoreUnreachable { .. } => true,
            Error::Transfer { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config {
            message: format!("TOML parse error: {}", err),
        }
    }
}
