//! Fallback extraction through an external `tar` binary
//!
//! Slower than streaming (the archive must be on disk) but tolerant of
//! archives the in-process decoder rejects. `tar` detects the compression
//! on its own.

use super::extract::{ArchiveInput, Extractor};
use crate::error::{CacheError, CacheResult};
use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Extracts an archive file by running `tar -x -f <file> -C <destination>`
#[derive(Debug, Clone)]
pub struct TarCommandExtractor {
    program: String,
}

impl TarCommandExtractor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, archive: &Path, destination: &Path) -> CacheResult<()> {
        fs::create_dir_all(destination).map_err(|e| {
            CacheError::io(format!("creating destination {}", destination.display()), e)
        })?;

        let command_line = format!(
            "{} -x -f {} -C {}",
            self.program,
            archive.display(),
            destination.display()
        );
        debug!("Running: {}", command_line);

        let output = Command::new(&self.program)
            .arg("-x")
            .arg("-f")
            .arg(archive)
            .arg("-C")
            .arg(destination)
            .output()
            .map_err(|e| CacheError::command_failed(&command_line, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CacheError::ToolFailed {
                command: command_line,
                stderr,
            });
        }
        Ok(())
    }
}

impl Default for TarCommandExtractor {
    fn default() -> Self {
        Self::new("tar")
    }
}

impl Extractor for TarCommandExtractor {
    fn name(&self) -> &'static str {
        "tar"
    }

    fn extract(&self, input: ArchiveInput<'_>, destination: &Path) -> CacheResult<()> {
        match input {
            ArchiveInput::File(path) => self.run(path, destination),
            ArchiveInput::Stream(reader) => {
                let mut spool = tempfile::NamedTempFile::new()
                    .map_err(|e| CacheError::io("creating spool file for archive", e))?;
                io::copy(reader, spool.as_file_mut())
                    .map_err(|e| CacheError::io("spooling archive to disk", e))?;
                self.run(spool.path(), destination)
            }
        }
    }
}
