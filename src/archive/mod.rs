//! Cache archive handling
//!
//! Reading a cache archive happens in two stages over one forward-only
//! stream:
//!
//! 1. **Inspect**: the stream is wrapped in a [`RestoreReader`] and the first
//!    tar entry is decoded to look for `archive_info.json`.
//! 2. **Extract**: the reader is rewound once and the whole archive is
//!    streamed through an [`Extractor`].
//!
//! | Extractor | Input | Used for |
//! |-----------|-------|----------|
//! | [`StreamExtractor`] | stream | first attempt, in-process gzip + tar |
//! | [`TarCommandExtractor`] | file | fallback, external `tar` |

pub mod compression;
pub mod extract;
pub mod inspect;
pub mod metadata;
pub mod restore_reader;
pub mod tool;

pub use compression::Compression;
pub use extract::{ArchiveInput, Extractor, StreamExtractor};
pub use inspect::{read_first_entry, EntryHeader, EntryKind, FirstEntry};
pub use metadata::{parse_stack_id, ArchiveInfo, ARCHIVE_INFO_FILE};
pub use restore_reader::{ReaderMode, RestoreReader};
pub use tool::TarCommandExtractor;
