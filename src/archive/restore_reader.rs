//! A reader that can be rewound to its start exactly once
//!
//! HTTP response bodies cannot seek. `RestoreReader` records every byte
//! handed out before [`RestoreReader::restore`], replays those bytes once,
//! and then hands the caller straight through to the inner source. Memory use
//! is bounded by what was read before the restore point, not by the stream.

use crate::error::{CacheError, CacheResult};
use std::io::{self, Read};

/// Observable state of a [`RestoreReader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderMode {
    /// Recording every byte read
    Capturing,
    /// Serving recorded bytes after a restore
    Replaying,
    /// Forwarding to the inner source, nothing recorded
    Passthrough,
}

#[derive(Debug)]
enum Mode {
    Capturing,
    Replaying { cursor: usize },
    Passthrough,
}

/// Forward-only reader with a single rewind to the start
#[derive(Debug)]
pub struct RestoreReader<R> {
    inner: R,
    captured: Vec<u8>,
    mode: Mode,
    /// Error from the inner source hit while finishing a replay; reported on the next read
    deferred: Option<io::Error>,
}

impl<R: Read> RestoreReader<R> {
    /// Wrap `inner`, starting in capturing mode
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            captured: Vec::new(),
            mode: Mode::Capturing,
            deferred: None,
        }
    }

    /// Rewind to the first byte ever read.
    ///
    /// Allowed once, while capturing. Any later call is a misuse and fails
    /// with [`CacheError::ReaderAlreadyRestored`].
    pub fn restore(&mut self) -> CacheResult<()> {
        match self.mode {
            Mode::Capturing => {
                self.mode = if self.captured.is_empty() {
                    Mode::Passthrough
                } else {
                    Mode::Replaying { cursor: 0 }
                };
                Ok(())
            }
            Mode::Replaying { .. } | Mode::Passthrough => Err(CacheError::ReaderAlreadyRestored),
        }
    }

    /// Current mode
    pub fn mode(&self) -> ReaderMode {
        match self.mode {
            Mode::Capturing => ReaderMode::Capturing,
            Mode::Replaying { .. } => ReaderMode::Replaying,
            Mode::Passthrough => ReaderMode::Passthrough,
        }
    }

    /// Number of bytes held for replay
    pub fn captured_len(&self) -> usize {
        self.captured.len()
    }

    /// Give back the inner source, dropping any unreplayed bytes
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn replay(&mut self, buf: &mut [u8], cursor: usize) -> io::Result<usize> {
        let remaining = &self.captured[cursor..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);

        let cursor = cursor + n;
        if cursor < self.captured.len() {
            self.mode = Mode::Replaying { cursor };
            return Ok(n);
        }

        self.captured = Vec::new();
        self.mode = Mode::Passthrough;

        if n == buf.len() {
            return Ok(n);
        }
        // Replaying always holds at least one unread byte, so `n > 0` here and
        // a source error has to wait for the next call.
        match self.inner.read(&mut buf[n..]) {
            Ok(m) => Ok(n + m),
            Err(e) => {
                self.deferred = Some(e);
                Ok(n)
            }
        }
    }
}

impl<R: Read> Read for RestoreReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(e) = self.deferred.take() {
            return Err(e);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        match self.mode {
            Mode::Capturing => {
                let n = self.inner.read(buf)?;
                self.captured.extend_from_slice(&buf[..n]);
                Ok(n)
            }
            Mode::Replaying { cursor } => self.replay(buf, cursor),
            Mode::Passthrough => self.inner.read(buf),
        }
    }
}
