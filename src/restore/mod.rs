//! The restore pipeline
//!
//! Opens the archive stream, optionally checks the stack it was built on,
//! and extracts it: streaming first, then once more from a local file
//! through the fallback extractor if streaming fails.
//!
//! # Outcomes
//!
//! | Situation | Result |
//! |-----------|--------|
//! | no cache URI configured | `Ok(NotConfigured)` |
//! | archive stack differs from current stack | `Ok(StackMismatch)`, nothing extracted |
//! | streaming extraction succeeds | `Ok(Extracted { tier: Streaming })` |
//! | streaming fails, fallback succeeds | `Ok(Extracted { tier: Fallback })` |
//! | anything else | `Err(..)` |

use crate::archive::inspect::has_file_name;
use crate::archive::{
    compression, parse_stack_id, read_first_entry, ArchiveInput, Extractor, RestoreReader,
    ARCHIVE_INFO_FILE,
};
use crate::error::{CacheError, CacheResult};
use crate::source::{self, CacheLocation, Fetcher};
use crate::ui::{self, TaskSpinner, UiContext};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// Default location for the fallback copy of a remote archive
pub const DEFAULT_STAGING_PATH: &str = "/tmp/cache-archive.tar";

/// Which extractor produced the files on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionTier {
    Streaming,
    Fallback,
}

impl fmt::Display for ExtractionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Streaming => write!(f, "streaming"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Successful end of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Extracted { tier: ExtractionTier },
    StackMismatch { archive: String, current: String },
    NotConfigured,
}

/// Result of comparing the archive's stack with the current one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackCheck {
    /// First entry is not `archive_info.json`
    Untagged,
    Compatible { archive: String },
    Mismatch { archive: String },
}

/// Settings for one restore run
#[derive(Debug, Clone)]
pub struct RestoreSettings {
    /// Stack id of this machine; blank disables the stack check
    pub stack_id: Option<String>,
    /// Root that archive paths are extracted under
    pub destination: PathBuf,
    /// Where a remote archive is downloaded for the fallback
    pub staging_path: PathBuf,
}

impl RestoreSettings {
    fn current_stack(&self) -> Option<&str> {
        self.stack_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

impl Default for RestoreSettings {
    fn default() -> Self {
        Self {
            stack_id: None,
            destination: PathBuf::from("/"),
            staging_path: PathBuf::from(DEFAULT_STAGING_PATH),
        }
    }
}

/// Where the archive bytes came from, for re-acquiring them in the fallback
#[derive(Debug, Clone)]
enum ArchiveOrigin {
    Local(PathBuf),
    Remote(String),
}

/// Compare the stack recorded in the archive's first entry with `current`.
///
/// Reads the first entry through `reader`, so call this before the reader is
/// restored. A missing `archive_info.json` is not an error; a broken one is.
pub fn check_stack<R: Read>(reader: &mut RestoreReader<R>, current: &str) -> CacheResult<StackCheck> {
    let (compression, mut tar) = compression::decompressed(&mut *reader)
        .map_err(|e| CacheError::io("reading cache archive", e))?;
    debug!("Archive compression: {}", compression);

    let entry = read_first_entry(&mut tar)?;
    debug!("First archive entry: {}", entry.header.path.display());
    if !has_file_name(&entry.header.path, ARCHIVE_INFO_FILE) {
        return Ok(StackCheck::Untagged);
    }

    let declared = entry.header.size;
    let mut body = Vec::new();
    let mut payload = entry.payload;
    payload
        .read_to_end(&mut body)
        .map_err(|e| CacheError::io("reading archive info", e))?;
    if (body.len() as u64) < declared {
        return Err(CacheError::ArchiveTruncated(format!(
            "{} ended after {} of {} bytes",
            ARCHIVE_INFO_FILE,
            body.len(),
            declared
        )));
    }

    let archive = parse_stack_id(&body)?;
    if archive == current {
        Ok(StackCheck::Compatible { archive })
    } else {
        Ok(StackCheck::Mismatch { archive })
    }
}

/// Runs one restore from a cache URI to files on disk
pub struct Restorer<'a> {
    fetcher: &'a dyn Fetcher,
    streaming: &'a dyn Extractor,
    fallback: &'a dyn Extractor,
    ui: &'a UiContext,
    settings: RestoreSettings,
}

impl<'a> Restorer<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        streaming: &'a dyn Extractor,
        fallback: &'a dyn Extractor,
        ui: &'a UiContext,
        settings: RestoreSettings,
    ) -> Self {
        Self {
            fetcher,
            streaming,
            fallback,
            ui,
            settings,
        }
    }

    /// Restore the archive behind `cache_uri`
    pub fn run(&self, cache_uri: &str) -> CacheResult<Outcome> {
        let cache_uri = cache_uri.trim();
        if cache_uri.is_empty() {
            ui::step_warn(
                self.ui,
                "No Cache API URL specified, there's no cache to use, exiting.",
            );
            return Ok(Outcome::NotConfigured);
        }

        let started = Instant::now();
        let (origin, stream) = self.open(CacheLocation::parse(cache_uri))?;
        let mut reader = RestoreReader::new(stream);

        if let Some(current) = self.settings.current_stack() {
            if let Some(outcome) = self.stack_gate(&mut reader, current)? {
                return Ok(outcome);
            }
        }

        reader.restore()?;
        debug!("Replaying {} inspected bytes", reader.captured_len());

        ui::section(self.ui, "Extracting cache archive");
        let tier = self.extract(reader, &origin)?;

        ui::outro_success(self.ui, "Done");
        ui::remark(self.ui, &format!("Took: {:.2?}", started.elapsed()));
        Ok(Outcome::Extracted { tier })
    }

    fn open(&self, location: CacheLocation) -> CacheResult<(ArchiveOrigin, Box<dyn Read>)> {
        match location {
            CacheLocation::Local(path) => {
                ui::section(self.ui, "Using local cache archive");
                let file = source::open_local(&path)?;
                Ok((ArchiveOrigin::Local(path), Box::new(file)))
            }
            CacheLocation::Remote(api_url) => {
                ui::section(self.ui, "Downloading remote cache archive");
                let url = self.fetcher.resolve_download_url(&api_url)?;
                ui::step_info(self.ui, &url);
                let stream = self.fetcher.open(&url)?;
                Ok((ArchiveOrigin::Remote(url), stream))
            }
        }
    }

    /// Returns an outcome when the run should stop here
    fn stack_gate<R: Read>(
        &self,
        reader: &mut RestoreReader<R>,
        current: &str,
    ) -> CacheResult<Option<Outcome>> {
        ui::section(self.ui, "Checking archive and current stacks");
        ui::key_value(self.ui, "current stack id", current);

        match check_stack(reader, current)? {
            StackCheck::Untagged => {
                ui::step_warn(
                    self.ui,
                    "cache archive does not contain stack information, skipping stack check",
                );
                Ok(None)
            }
            StackCheck::Compatible { archive } => {
                ui::key_value(self.ui, "archive stack id", &archive);
                Ok(None)
            }
            StackCheck::Mismatch { archive } => {
                ui::key_value(self.ui, "archive stack id", &archive);
                ui::step_warn(
                    self.ui,
                    &format!(
                        "Cache was created on stack: {}, current stack: {}",
                        archive, current
                    ),
                );
                ui::outro_warn(
                    self.ui,
                    "Skipping cache pull, because of the stack has changed",
                );
                Ok(Some(Outcome::StackMismatch {
                    archive,
                    current: current.to_string(),
                }))
            }
        }
    }

    /// Stream the archive, falling back to a file-based extraction once
    fn extract<R: Read>(
        &self,
        mut reader: RestoreReader<R>,
        origin: &ArchiveOrigin,
    ) -> CacheResult<ExtractionTier> {
        let destination = &self.settings.destination;

        let mut spinner = TaskSpinner::new(self.ui);
        spinner.start(&format!("Extracting to {}", destination.display()));
        let streamed = self
            .streaming
            .extract(ArchiveInput::Stream(&mut reader), destination);
        // Close the source before the fallback opens a new one.
        drop(reader);

        let stream_error = match streamed {
            Ok(()) => {
                spinner.stop("Cache archive extracted");
                return Ok(ExtractionTier::Streaming);
            }
            Err(e) => e,
        };

        spinner.stop_warn(&format!(
            "Failed to uncompress cache archive stream: {}",
            stream_error
        ));
        warn!("{} extractor failed: {}", self.streaming.name(), stream_error);
        ui::step_warn(
            self.ui,
            "Downloading the archive file and trying to uncompress using tar tool",
        );

        self.fallback_extract(origin, destination)
            .map(|()| ExtractionTier::Fallback)
            .map_err(|e| CacheError::FallbackFailed {
                stream_error: stream_error.to_string(),
                source: Box::new(e),
            })
    }

    fn fallback_extract(&self, origin: &ArchiveOrigin, destination: &Path) -> CacheResult<()> {
        let path = match origin {
            ArchiveOrigin::Local(path) => path.clone(),
            ArchiveOrigin::Remote(url) => {
                let staging = &self.settings.staging_path;
                let bytes = self.fetcher.download(url, staging)?;
                debug!("Downloaded {} bytes to {}", bytes, staging.display());
                staging.clone()
            }
        };

        debug!(
            "Running {} extractor on {}",
            self.fallback.name(),
            path.display()
        );
        self.fallback.extract(ArchiveInput::File(&path), destination)?;
        ui::step_ok(self.ui, "Cache archive extracted with the fallback extractor");
        Ok(())
    }
}
