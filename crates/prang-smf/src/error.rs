//! Error types for Standard MIDI File scanning.

use thiserror::Error;

/// Why a single track event could not be decoded.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("event runs past the end of its track chunk")]
    PastChunkEnd,

    #[error("variable-length quantity longer than 4 bytes")]
    VlqOverflow,

    #[error("data byte {0:#04x} with no running status")]
    NoRunningStatus(u8),

    #[error("unexpected status byte {0:#04x} inside event data")]
    UnexpectedStatus(u8),

    #[error("status byte {0:#04x} is not valid in a MIDI file")]
    UnsupportedStatus(u8),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a file could not be scanned. Every variant is file-specific: callers
/// enumerating many files skip the offending one and carry on.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid MIDI header: {0}")]
    InvalidHeader(String),

    #[error("Truncated MIDI file: {0}")]
    TruncatedFile(String),

    #[error("Malformed event in track {track} at byte {offset}: {source}")]
    MalformedEvent {
        track: usize,
        offset: u64,
        #[source]
        source: DecodeError,
    },
}

impl ScanError {
    #[inline]
    pub fn is_truncated(&self) -> bool {
        matches!(self, ScanError::TruncatedFile(_))
    }

    #[inline]
    pub fn is_malformed(&self) -> bool {
        matches!(self, ScanError::MalformedEvent { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
