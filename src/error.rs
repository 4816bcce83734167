//! Error types for cache-pull
//!
//! All modules use `CacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cache-pull operations
pub type CacheResult<T> = Result<T, CacheError>;

/// All errors that can occur while restoring a cache archive
#[derive(Error, Debug)]
pub enum CacheError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    // Source errors
    #[error("Failed to open cache archive file {path}: {source}")]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("Non success response code from {url}: {status}, body: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Build cache not found (http-code: {status})")]
    CacheNotFound { status: u16 },

    #[error("Invalid cache API response ({body}): {reason}")]
    LookupResponseInvalid { body: String, reason: String },

    // Format errors
    #[error("Cache archive too short or corrupt: {0}")]
    ArchiveTruncated(String),

    #[error("Not a valid cache archive: {0}")]
    ArchiveInvalid(String),

    #[error("Failed to parse archive info: {0}")]
    MetadataInvalid(#[source] serde_json::Error),

    #[error("Archive reader was already restored")]
    ReaderAlreadyRestored,

    // Extraction errors
    #[error("Unsupported archive entry {path}: {kind}")]
    UnsupportedEntry { path: PathBuf, kind: String },

    #[error("Archive entry escapes the destination: {0}")]
    EntryOutsideDestination(PathBuf),

    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    ToolFailed { command: String, stderr: String },

    #[error("Fallback failed after streaming extraction error ({stream_error}): {source}")]
    FallbackFailed {
        stream_error: String,
        #[source]
        source: Box<CacheError>,
    },

    // IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an HTTP transport error for the given URL
    pub fn http(url: impl Into<String>, source: ureq::Error) -> Self {
        Self::Http {
            url: url.into(),
            source: Box::new(source),
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CacheNotFound { .. } => Some(
                "Probably the cache is not initialised yet (the first cache push initialises it), nothing to worry about",
            ),
            Self::CommandFailed { .. } => {
                Some("Make sure a tar binary is installed, or point --tar-command at one")
            }
            Self::FallbackFailed { source, .. } => source.hint(),
            _ => None,
        }
    }
}
