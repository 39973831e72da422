//! Seekable byte sources for scanning.
//!
//! Scanning is written against `Read + Seek`, so any source works. For files
//! on storage, [`SmfSource::open`] first tries to pull the whole file into
//! memory and falls back to buffered streaming reads when the allocation
//! cannot be made. Both variants yield identical bytes.

use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use tracing::debug;

pub enum SmfSource<R> {
    /// Whole file held in memory.
    Buffered(Cursor<Vec<u8>>),
    /// Reads go through to the underlying source.
    Streaming(BufReader<R>),
}

impl<R: Read + Seek> SmfSource<R> {
    /// Buffer the remainder of `inner` if memory allows, otherwise stream it.
    pub fn open(inner: R) -> io::Result<Self> {
        Self::open_with_limit(inner, usize::MAX)
    }

    /// Like [`open`](Self::open), but never buffers more than `max_buffer` bytes.
    pub fn open_with_limit(mut inner: R, max_buffer: usize) -> io::Result<Self> {
        let start = inner.stream_position()?;
        let end = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(start))?;

        let remaining = end.saturating_sub(start);
        let size = match usize::try_from(remaining) {
            Ok(size) if size <= max_buffer => size,
            _ => {
                debug!(bytes = remaining, "MIDI file exceeds buffer limit, streaming");
                return Ok(Self::streaming(inner));
            }
        };

        let mut buffer = Vec::new();
        if let Err(e) = buffer.try_reserve_exact(size) {
            debug!(bytes = size, error = %e, "could not buffer MIDI file, streaming");
            return Ok(Self::streaming(inner));
        }
        inner.take(remaining).read_to_end(&mut buffer)?;
        Ok(SmfSource::Buffered(Cursor::new(buffer)))
    }

    pub fn streaming(inner: R) -> Self {
        SmfSource::Streaming(BufReader::new(inner))
    }
}

impl SmfSource<io::Empty> {
    pub fn buffered(bytes: Vec<u8>) -> Self {
        SmfSource::Buffered(Cursor::new(bytes))
    }
}

impl<R> SmfSource<R> {
    #[inline]
    pub fn is_buffered(&self) -> bool {
        matches!(self, SmfSource::Buffered(_))
    }
}

impl<R: Read> Read for SmfSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SmfSource::Buffered(cursor) => cursor.read(buf),
            SmfSource::Streaming(reader) => reader.read(buf),
        }
    }
}

impl<R: Seek> Seek for SmfSource<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            SmfSource::Buffered(cursor) => cursor.seek(pos),
            SmfSource::Streaming(reader) => reader.seek(pos),
        }
    }
}
