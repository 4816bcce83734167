//! Where the cache archive comes from
//!
//! A cache URI is either a `file://` path to a local archive or the URL of
//! the cache API, which answers with the real download URL.

pub mod http;

pub use http::HttpFetcher;

use crate::error::{CacheError, CacheResult};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const FILE_SCHEME: &str = "file://";

/// Parsed cache URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLocation {
    /// Archive on local disk
    Local(PathBuf),
    /// Cache API endpoint to ask for a download URL
    Remote(String),
}

impl CacheLocation {
    pub fn parse(uri: &str) -> Self {
        match uri.strip_prefix(FILE_SCHEME) {
            Some(path) => Self::Local(PathBuf::from(path)),
            None => Self::Remote(uri.to_string()),
        }
    }
}

/// Network side of archive acquisition
pub trait Fetcher {
    /// Ask the cache API for the archive download URL
    fn resolve_download_url(&self, api_url: &str) -> CacheResult<String>;

    /// Start downloading `url` and return the response body
    fn open(&self, url: &str) -> CacheResult<Box<dyn Read>>;

    /// Download `url` to `dest`, replacing it, and return the byte count
    fn download(&self, url: &str, dest: &Path) -> CacheResult<u64>;
}

/// Open a local archive for reading
pub fn open_local(path: &Path) -> CacheResult<File> {
    File::open(path).map_err(|e| CacheError::SourceOpen {
        path: path.to_path_buf(),
        source: e,
    })
}
