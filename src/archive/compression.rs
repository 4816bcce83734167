//! Compression detection for cache archives
//!
//! Archives are saved either gzip-compressed (the default) or as plain tar.

use flate2::read::GzDecoder;
use std::fmt;
use std::io::{self, Cursor, Read};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression layer wrapped around the tar stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    None,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gzip => write!(f, "gzip"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Peek at the first bytes of `reader` and return the detected compression
/// together with a reader that yields the full, untouched stream.
pub fn sniff<'a, R: Read + 'a>(mut reader: R) -> io::Result<(Compression, impl Read + 'a)> {
    let mut magic = [0u8; GZIP_MAGIC.len()];
    let mut filled = 0;
    while filled < magic.len() {
        match reader.read(&mut magic[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    let compression = if magic[..filled] == GZIP_MAGIC {
        Compression::Gzip
    } else {
        Compression::None
    };
    let prefix = Cursor::new(magic[..filled].to_vec());
    Ok((compression, prefix.chain(reader)))
}

/// Layer the matching decoder over `reader`, yielding the raw tar stream
pub fn decompressed<'a, R: Read + 'a>(reader: R) -> io::Result<(Compression, Box<dyn Read + 'a>)> {
    let (compression, stream) = sniff(reader)?;
    let tar: Box<dyn Read + 'a> = match compression {
        Compression::Gzip => Box::new(GzDecoder::new(stream)),
        Compression::None => Box::new(stream),
    };
    Ok((compression, tar))
}
