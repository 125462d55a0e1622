//! A seekable byte-source adapter that shifts every seek by a fixed origin.
//!
//! Used to parse the ELF region embedded inside a fake SELF container
//! without having to rebase every offset the ELF/program-header parsers
//! compute internally.

use std::io::{self, Read, Seek, SeekFrom};

/// Wraps `R`, making position `0` of the adapter alias position `origin` of
/// the underlying stream.
pub struct OffsetStream<R> {
    inner: R,
    origin: u64,
}

impl<R: Seek> OffsetStream<R> {
    /// Creates a new adapter rooted at `origin` in `inner`, seeking there
    /// immediately so the stream starts in a consistent position.
    pub fn new(mut inner: R, origin: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(origin))?;
        Ok(OffsetStream { inner, origin })
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Current position relative to `origin`.
    pub fn pos(&mut self) -> io::Result<u64> {
        Ok(self.inner.stream_position()? - self.origin)
    }

    /// Length of the stream relative to `origin`.
    pub fn end_pos(&mut self) -> io::Result<u64> {
        let cur = self.inner.stream_position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(cur))?;
        Ok(end - self.origin)
    }
}

impl<R: Read> Read for OffsetStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Seek> Seek for OffsetStream<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => SeekFrom::Start(p + self.origin),
            // Relative seeks pass straight through: they don't cross the origin boundary.
            SeekFrom::Current(d) => SeekFrom::Current(d),
            SeekFrom::End(d) => SeekFrom::End(d),
        };
        let absolute = self.inner.seek(target)?;
        Ok(absolute - self.origin)
    }
}
