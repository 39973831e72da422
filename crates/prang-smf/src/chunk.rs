//! SMF container layout: the `MThd` header and the position of every `MTrk`.

use crate::error::{Result, ScanError};
use crate::metadata::{Division, SmfFormat};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use tracing::debug;

const HEADER_ID: &[u8; 4] = b"MThd";
const TRACK_ID: &[u8; 4] = b"MTrk";
const CHUNK_PREAMBLE: u64 = 8;
const MIN_HEADER_LEN: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmfHeader {
    pub format: SmfFormat,
    pub declared_tracks: u16,
    pub division: Division,
}

/// Byte range of one track chunk's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackChunk {
    /// Absolute stream offset of the first event byte.
    pub offset: u64,
    pub size: u32,
}

impl TrackChunk {
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.size as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmfLayout {
    pub header: SmfHeader,
    pub tracks: Vec<TrackChunk>,
    pub stream_len: u64,
}

fn read_preamble<R: Read>(reader: &mut R) -> std::io::Result<([u8; 4], u32)> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    let id = [buf[0], buf[1], buf[2], buf[3]];
    Ok((id, u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]])))
}

impl SmfLayout {
    /// Read the header and locate the declared number of track chunks.
    ///
    /// Chunks with unknown ids are skipped. Every located chunk is checked to
    /// lie entirely within the stream.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let base = reader.stream_position()?;
        let stream_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(base))?;

        let (id, header_len) = match read_preamble(reader) {
            Ok(preamble) => preamble,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(ScanError::InvalidHeader("file too short".into()))
            }
            Err(e) => return Err(e.into()),
        };
        if &id != HEADER_ID {
            return Err(ScanError::InvalidHeader("missing MThd chunk".into()));
        }
        if header_len < MIN_HEADER_LEN {
            return Err(ScanError::InvalidHeader(format!(
                "header length {header_len} is shorter than {MIN_HEADER_LEN}"
            )));
        }

        let mut fields = [0u8; 6];
        reader.read_exact(&mut fields).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => ScanError::InvalidHeader("header chunk cut short".into()),
            _ => e.into(),
        })?;
        let header = SmfHeader {
            format: SmfFormat::from_raw(u16::from_be_bytes([fields[0], fields[1]])),
            declared_tracks: u16::from_be_bytes([fields[2], fields[3]]),
            division: Division::from_raw(u16::from_be_bytes([fields[4], fields[5]])),
        };

        let mut pos = base + CHUNK_PREAMBLE + header_len as u64;
        if pos > stream_len {
            return Err(ScanError::InvalidHeader("header chunk cut short".into()));
        }

        let mut tracks = Vec::with_capacity(header.declared_tracks as usize);
        while tracks.len() < header.declared_tracks as usize {
            if pos + CHUNK_PREAMBLE > stream_len {
                return Err(ScanError::TruncatedFile(format!(
                    "header declares {} tracks, found {}",
                    header.declared_tracks,
                    tracks.len()
                )));
            }
            if reader.seek(SeekFrom::Start(pos))? != pos {
                return Err(ScanError::TruncatedFile(format!(
                    "chunk at byte {pos} is unreachable"
                )));
            }
            let (id, size) = read_preamble(reader)?;
            let chunk = TrackChunk {
                offset: pos + CHUNK_PREAMBLE,
                size,
            };
            if chunk.end() > stream_len {
                return Err(ScanError::TruncatedFile(format!(
                    "chunk at byte {pos} declares {size} bytes, only {} remain",
                    stream_len - chunk.offset
                )));
            }

            if &id == TRACK_ID {
                tracks.push(chunk);
            } else {
                debug!(
                    "Skipping unknown chunk {:?} at byte {}",
                    String::from_utf8_lossy(&id),
                    pos
                );
            }
            pos = chunk.end();
        }

        Ok(Self {
            header,
            tracks,
            stream_len,
        })
    }
}
