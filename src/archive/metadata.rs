//! Archive info record stored as the first entry of a cache archive

use crate::error::{CacheError, CacheResult};
use serde::Deserialize;

/// File name of the metadata entry written by the cache saver
pub const ARCHIVE_INFO_FILE: &str = "archive_info.json";

/// Contents of `archive_info.json`; unknown fields are ignored
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArchiveInfo {
    /// Stack the archive was created on
    pub stack_id: String,
}

/// Parse the stack id out of an `archive_info.json` payload.
///
/// Returns an empty string when the record has no stack id.
pub fn parse_stack_id(bytes: &[u8]) -> CacheResult<String> {
    let info: ArchiveInfo = serde_json::from_slice(bytes).map_err(CacheError::MetadataInvalid)?;
    Ok(info.stack_id)
}
