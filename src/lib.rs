//! cache-pull - CI build cache restore
//!
//! Streams a saved cache archive onto disk, checking first that it was built
//! on the same stack, with an external `tar` fallback for archives the
//! in-process decoder cannot handle.

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod restore;
pub mod source;
pub mod ui;

pub use error::{CacheError, CacheResult};
