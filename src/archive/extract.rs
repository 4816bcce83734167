//! In-process streaming extraction
//!
//! Decompression and unpacking happen in one pass over the stream; no copy
//! of the archive is written to disk.

use super::compression;
use super::inspect::EntryKind;
use crate::error::{CacheError, CacheResult};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

/// Archive handed to an [`Extractor`]
pub enum ArchiveInput<'a> {
    /// Forward-only byte stream, positioned at the start of the archive
    Stream(&'a mut dyn Read),
    /// Archive already on local disk
    File(&'a Path),
}

/// Something that can materialize a cache archive under a destination root
pub trait Extractor {
    /// Short name for log output
    fn name(&self) -> &'static str;

    /// Extract `input` under `destination`
    fn extract(&self, input: ArchiveInput<'_>, destination: &Path) -> CacheResult<()>;
}

/// Streaming extractor built on the `tar` and `flate2` crates.
///
/// Entry types other than files, directories and links abort extraction.
#[derive(Debug, Default)]
pub struct StreamExtractor {
    _private: (),
}

impl StreamExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    fn unpack(&self, reader: &mut dyn Read, destination: &Path) -> CacheResult<u64> {
        let (compression, tar_stream) = compression::decompressed(reader)
            .map_err(|e| CacheError::io("reading cache archive", e))?;
        debug!("Archive compression: {}", compression);

        fs::create_dir_all(destination).map_err(|e| {
            CacheError::io(format!("creating destination {}", destination.display()), e)
        })?;

        let mut archive = tar::Archive::new(tar_stream);
        archive.set_preserve_permissions(true);
        archive.set_preserve_mtime(true);
        archive.set_overwrite(true);

        let entries = archive
            .entries()
            .map_err(|e| CacheError::io("reading archive entries", e))?;

        let mut count = 0u64;
        for entry in entries {
            let mut entry = entry.map_err(|e| CacheError::io("reading archive entry", e))?;
            let path = entry
                .path()
                .map_err(|e| CacheError::io("decoding entry path", e))?
                .into_owned();

            let entry_type = entry.header().entry_type();
            if entry_type.is_pax_global_extensions() {
                continue;
            }
            let kind = EntryKind::from(entry_type);
            if let EntryKind::Other(_) = kind {
                return Err(CacheError::UnsupportedEntry {
                    path,
                    kind: kind.to_string(),
                });
            }

            // `unpack_in` strips the root and refuses `..` components.
            let unpacked = entry
                .unpack_in(destination)
                .map_err(|e| CacheError::io(format!("extracting {}", path.display()), e))?;
            if !unpacked {
                return Err(CacheError::EntryOutsideDestination(path));
            }
            count += 1;
        }

        // The tar reader stops at the end-of-archive blocks; read on to EOF so
        // the gzip trailer (CRC32 and length) is checked.
        io::copy(&mut archive.into_inner(), &mut io::sink())
            .map_err(|e| CacheError::io("verifying archive stream", e))?;

        Ok(count)
    }
}

impl Extractor for StreamExtractor {
    fn name(&self) -> &'static str {
        "stream"
    }

    fn extract(&self, input: ArchiveInput<'_>, destination: &Path) -> CacheResult<()> {
        let count = match input {
            ArchiveInput::Stream(reader) => self.unpack(reader, destination)?,
            ArchiveInput::File(path) => {
                let mut file = File::open(path).map_err(|e| CacheError::SourceOpen {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                self.unpack(&mut file, destination)?
            }
        };
        debug!("Extracted {} entries to {}", count, destination.display());
        Ok(())
    }
}
