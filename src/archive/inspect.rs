//! Decode the first entry of a tar stream without consuming the rest
//!
//! Header blocks are read one at a time and the payload is handed back as a
//! reader limited to the declared size, so nothing beyond the first entry is
//! pulled from the source. GNU long-name and PAX records in front of the
//! entry are folded into its path.

use crate::error::{CacheError, CacheResult};
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tar::{EntryType, Header};

const BLOCK_SIZE: usize = 512;

/// Upper bound for GNU long-name and PAX extension payloads
const MAX_EXTENSION_SIZE: u64 = 1024 * 1024;

/// Kind of archive entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    HardLink,
    Other(u8),
}

impl From<EntryType> for EntryKind {
    fn from(entry_type: EntryType) -> Self {
        match entry_type {
            EntryType::Regular | EntryType::Continuous => Self::File,
            EntryType::Directory => Self::Directory,
            EntryType::Symlink => Self::Symlink,
            EntryType::Link => Self::HardLink,
            other => Self::Other(other.as_byte()),
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
            Self::Symlink => write!(f, "symlink"),
            Self::HardLink => write!(f, "hard link"),
            Self::Other(byte) => write!(f, "type '{}'", char::from(*byte)),
        }
    }
}

/// Decoded header of an archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    pub path: PathBuf,
    pub kind: EntryKind,
    pub size: u64,
    pub mode: u32,
}

impl EntryHeader {
    /// Final path segment, if any
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}

/// The first entry of an archive and a reader over exactly its payload
pub struct FirstEntry<'a, R> {
    pub header: EntryHeader,
    pub payload: io::Take<&'a mut R>,
}

impl<R> fmt::Debug for FirstEntry<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirstEntry")
            .field("header", &self.header)
            .field("remaining", &self.payload.limit())
            .finish()
    }
}

/// Decode the first entry of the tar stream in `reader`.
///
/// Consumes only the header block(s) of that entry; its payload is left for
/// the caller to read through [`FirstEntry::payload`].
pub fn read_first_entry<R: Read>(reader: &mut R) -> CacheResult<FirstEntry<'_, R>> {
    let mut long_path: Option<Vec<u8>> = None;
    let mut block = [0u8; BLOCK_SIZE];

    loop {
        read_block(reader, &mut block)?;

        if block.iter().all(|&b| b == 0) {
            return Err(CacheError::ArchiveInvalid(
                "archive contains no entries".to_string(),
            ));
        }

        let header = Header::from_byte_slice(&block);
        verify_checksum(header, &block)?;

        let entry_type = header.entry_type();
        let size = header
            .entry_size()
            .map_err(|e| CacheError::ArchiveInvalid(format!("bad entry size: {}", e)))?;

        match entry_type {
            EntryType::GNULongName => {
                let mut name = read_extension(reader, size)?;
                while name.last() == Some(&0) {
                    name.pop();
                }
                long_path = Some(name);
            }
            EntryType::XHeader => {
                let records = read_extension(reader, size)?;
                if let Some(path) = pax_path(&records)? {
                    long_path = Some(path);
                }
            }
            EntryType::XGlobalHeader | EntryType::GNULongLink => {
                read_extension(reader, size)?;
            }
            _ => {
                let path_bytes = match long_path {
                    Some(bytes) => bytes,
                    None => header.path_bytes().into_owned(),
                };
                let mode = header.mode().unwrap_or(0o644);
                let entry = EntryHeader {
                    path: PathBuf::from(String::from_utf8_lossy(&path_bytes).into_owned()),
                    kind: EntryKind::from(entry_type),
                    size,
                    mode,
                };
                return Ok(FirstEntry {
                    header: entry,
                    payload: reader.take(size),
                });
            }
        }
    }
}

/// Whether `path` ends in the given file name
pub fn has_file_name(path: &Path, name: &str) -> bool {
    path.file_name().is_some_and(|f| f == name)
}

fn read_block<R: Read>(reader: &mut R, block: &mut [u8; BLOCK_SIZE]) -> CacheResult<()> {
    reader.read_exact(block).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            CacheError::ArchiveTruncated("stream ended inside an entry header".to_string())
        }
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
            CacheError::ArchiveInvalid(e.to_string())
        }
        _ => CacheError::io("reading archive header", e),
    })
}

fn verify_checksum(header: &Header, block: &[u8; BLOCK_SIZE]) -> CacheResult<()> {
    let stored = header
        .cksum()
        .map_err(|e| CacheError::ArchiveInvalid(format!("bad header checksum field: {}", e)))?;

    // The checksum field itself counts as eight spaces.
    let computed: u32 = block
        .iter()
        .enumerate()
        .map(|(i, &b)| if (148..156).contains(&i) { u32::from(b' ') } else { u32::from(b) })
        .sum();

    if stored != computed {
        return Err(CacheError::ArchiveInvalid(format!(
            "header checksum mismatch: stored {}, computed {}",
            stored, computed
        )));
    }
    Ok(())
}

/// Read an extension payload plus its block padding
fn read_extension<R: Read>(reader: &mut R, size: u64) -> CacheResult<Vec<u8>> {
    if size > MAX_EXTENSION_SIZE {
        return Err(CacheError::ArchiveInvalid(format!(
            "extension header of {} bytes exceeds {} bytes",
            size, MAX_EXTENSION_SIZE
        )));
    }

    let padded = size.next_multiple_of(BLOCK_SIZE as u64);
    let mut data = Vec::with_capacity(padded as usize);
    reader
        .take(padded)
        .read_to_end(&mut data)
        .map_err(|e| CacheError::io("reading archive extension header", e))?;
    if (data.len() as u64) < padded {
        return Err(CacheError::ArchiveTruncated(
            "stream ended inside an extension header".to_string(),
        ));
    }

    data.truncate(size as usize);
    Ok(data)
}

/// Pull the `path` record out of PAX extended header data.
///
/// Records have the form `"<len> <key>=<value>\n"`, where `len` covers the
/// whole record.
fn pax_path(mut data: &[u8]) -> CacheResult<Option<Vec<u8>>> {
    let invalid = || CacheError::ArchiveInvalid("malformed PAX extended header".to_string());
    let mut path = None;

    while !data.is_empty() {
        let space = data.iter().position(|&b| b == b' ').ok_or_else(invalid)?;
        let len: usize = std::str::from_utf8(&data[..space])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(invalid)?;
        if len <= space + 1 || len > data.len() || data[len - 1] != b'\n' {
            return Err(invalid());
        }

        let record = &data[space + 1..len - 1];
        if let Some(value) = record.strip_prefix(b"path=") {
            path = Some(value.to_vec());
        }
        data = &data[len..];
    }

    Ok(path)
}
