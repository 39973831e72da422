//! File metadata scanning.
//!
//! Walks every track chunk of a Standard MIDI File, decoding each event in
//! place, and reports format, track count and whether the file holds a single
//! tempo. Nothing beyond one event is held in memory, so the same scan runs
//! over an in-memory buffer or straight off storage.

use crate::chunk::{SmfLayout, TrackChunk};
use crate::decoder::{DecodedEvent, EventDecoder};
use crate::error::{Result, ScanError};
use crate::metadata::{FileMetadata, DEFAULT_MICRO_TEMPO, TEMPO_VARIES};
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, trace};

/// Whole-file tempo state.
///
/// The first tempo seen anywhere becomes the candidate; any later tempo that
/// differs locks the file to "varies" for good.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum FileTempo {
    #[default]
    Unset,
    Fixed(u32),
    Varies,
}

impl FileTempo {
    /// Returns `true` if this observation locked the file to "varies".
    fn observe(&mut self, micro_tempo: u32) -> bool {
        match *self {
            FileTempo::Unset => {
                *self = FileTempo::Fixed(micro_tempo);
                false
            }
            FileTempo::Fixed(current) if current != micro_tempo => {
                *self = FileTempo::Varies;
                true
            }
            _ => false,
        }
    }

    fn micro_tempo(self) -> u32 {
        match self {
            FileTempo::Unset => DEFAULT_MICRO_TEMPO,
            FileTempo::Fixed(us) => us,
            FileTempo::Varies => TEMPO_VARIES,
        }
    }
}

/// Position within one track chunk while its events are decoded.
#[derive(Debug)]
pub struct TrackCursor {
    index: usize,
    start: u64,
    end: u64,
    pos: u64,
    ticks: u64,
    found_tempo: bool,
    decoder: EventDecoder,
}

impl TrackCursor {
    /// Seek `reader` to the start of `chunk`.
    pub fn open<R: Seek>(reader: &mut R, index: usize, chunk: &TrackChunk) -> Result<Self> {
        let landed = reader.seek(SeekFrom::Start(chunk.offset))?;
        if landed != chunk.offset {
            return Err(ScanError::TruncatedFile(format!(
                "track {index} at byte {} is unreachable",
                chunk.offset
            )));
        }
        Ok(Self {
            index,
            start: chunk.offset,
            end: chunk.end(),
            pos: chunk.offset,
            ticks: 0,
            found_tempo: false,
            decoder: EventDecoder::new(),
        })
    }

    /// Decode the next event, or `None` at the chunk boundary.
    pub fn next_event<R: Read>(&mut self, reader: &mut R) -> Result<Option<DecodedEvent>> {
        if self.pos >= self.end {
            return Ok(None);
        }
        let event = self
            .decoder
            .decode(reader, self.end - self.pos)
            .map_err(|source| ScanError::MalformedEvent {
                track: self.index,
                offset: self.pos,
                source,
            })?;
        self.pos += event.len;
        self.ticks += event.delta as u64;
        Ok(Some(event))
    }

    /// Absolute tick of the last decoded event.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[inline]
    pub fn bytes_read(&self) -> u64 {
        self.pos - self.start
    }
}

/// Scan a Standard MIDI File starting at the reader's current position.
pub fn scan<R: Read + Seek>(reader: &mut R) -> Result<FileMetadata> {
    let layout = SmfLayout::read(reader)?;
    let mut file_tempo = FileTempo::default();

    for (index, chunk) in layout.tracks.iter().enumerate() {
        let mut cursor = TrackCursor::open(reader, index, chunk)?;
        let mut checking_tempo = true;

        while let Some(decoded) = cursor.next_event(reader)? {
            if !checking_tempo {
                continue;
            }
            let Some(micro_tempo) = decoded.event.tempo() else {
                continue;
            };
            cursor.found_tempo = true;
            if file_tempo.observe(micro_tempo) {
                trace!(
                    track = index,
                    tick = cursor.ticks(),
                    micro_tempo,
                    "tempo differs, file tempo varies"
                );
                checking_tempo = false;
            }
        }

        trace!(
            track = index,
            bytes = cursor.bytes_read(),
            ticks = cursor.ticks(),
            has_tempo = cursor.found_tempo,
            "track scanned"
        );
    }

    let metadata = FileMetadata {
        format: layout.header.format,
        track_count: layout.tracks.len() as u16,
        micro_tempo: file_tempo.micro_tempo(),
        division: layout.header.division,
    };
    debug!(
        "Scanned MIDI file: format {}, {} tracks, tempo {}",
        metadata.format.as_raw(),
        metadata.track_count,
        metadata.tempo()
    );
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::SmfFormat;
    use std::io::Cursor;

    fn smf(tracks: &[&[u8]]) -> Vec<u8> {
        let mut bytes = b"MThd".to_vec();
        bytes.extend(6u32.to_be_bytes());
        bytes.extend(1u16.to_be_bytes());
        bytes.extend((tracks.len() as u16).to_be_bytes());
        bytes.extend(480u16.to_be_bytes());
        for body in tracks {
            bytes.extend(b"MTrk");
            bytes.extend((body.len() as u32).to_be_bytes());
            bytes.extend_from_slice(body);
        }
        bytes
    }

    fn tempo(delta: u8, us: u32) -> Vec<u8> {
        let b = us.to_be_bytes();
        vec![delta, 0xFF, 0x51, 0x03, b[1], b[2], b[3]]
    }

    const EOT: [u8; 4] = [0x00, 0xFF, 0x2F, 0x00];

    fn track(parts: &[Vec<u8>]) -> Vec<u8> {
        let mut body: Vec<u8> = parts.concat();
        body.extend(EOT);
        body
    }

    #[test]
    fn test_file_tempo_policy() {
        let mut t = FileTempo::default();
        assert!(!t.observe(500_000));
        assert!(!t.observe(500_000));
        assert!(t.observe(600_000));
        assert!(!t.observe(500_000));
        assert_eq!(t, FileTempo::Varies);
        assert_eq!(t.micro_tempo(), TEMPO_VARIES);
    }

    #[test]
    fn test_no_tempo_defaults_to_120_bpm() {
        let bytes = smf(&[&track(&[vec![0x00, 0x90, 60, 100, 0x60, 0x80, 60, 0]])]);
        let meta = scan(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(meta.micro_tempo, DEFAULT_MICRO_TEMPO);
        assert_eq!(meta.format, SmfFormat::Parallel);
        assert_eq!(meta.track_count, 1);
    }

    #[test]
    fn test_tempo_change_within_track_varies() {
        let bytes = smf(&[&track(&[tempo(0, 500_000), tempo(0x60, 400_000)])]);
        let meta = scan(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(meta.micro_tempo, TEMPO_VARIES);
    }

    #[test]
    fn test_differing_tempo_locks_even_if_first_tempo_returns() {
        let bytes = smf(&[
            &track(&[tempo(0, 500_000)]),
            &track(&[tempo(0, 600_000)]),
            &track(&[tempo(0, 500_000)]),
        ]);
        let meta = scan(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(meta.micro_tempo, TEMPO_VARIES);
    }

    #[test]
    fn test_malformed_after_varies_still_fails() {
        let bytes = smf(&[&[tempo(0, 500_000), tempo(0, 600_000), vec![0x00, 0x45]].concat()]);
        let err = scan(&mut Cursor::new(bytes)).unwrap_err();
        match err {
            ScanError::MalformedEvent { track, offset, .. } => {
                assert_eq!(track, 0);
                assert_eq!(offset, 22 + 14);
            }
            other => panic!("Expected MalformedEvent, got {other:?}"),
        }
    }

    #[test]
    fn test_event_crossing_chunk_end_is_malformed() {
        // Note-on missing its velocity byte, followed by the next chunk header.
        let bytes = smf(&[&[0x00, 0x90, 60], &EOT]);
        let err = scan(&mut Cursor::new(bytes)).unwrap_err();
        assert!(err.is_malformed(), "got {err:?}");
    }

    #[test]
    fn test_empty_track_chunk() {
        let bytes = smf(&[&[], &track(&[tempo(0, 450_000)])]);
        let meta = scan(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(meta.track_count, 2);
        assert_eq!(meta.micro_tempo, 450_000);
    }

    /// Stream that lands one byte short when asked to seek to `short_at`.
    struct ShortSeek {
        inner: Cursor<Vec<u8>>,
        short_at: u64,
    }

    impl Read for ShortSeek {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Seek for ShortSeek {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            match pos {
                SeekFrom::Start(n) if n == self.short_at => {
                    self.inner.seek(SeekFrom::Start(n - 1))
                }
                other => self.inner.seek(other),
            }
        }
    }

    #[test]
    fn test_unreachable_track_body_is_truncated() {
        let bytes = smf(&[&track(&[tempo(0, 500_000)])]);

        // First track body starts after the 14-byte header and 8-byte preamble.
        let mut short_body = ShortSeek {
            inner: Cursor::new(bytes.clone()),
            short_at: 22,
        };
        match scan(&mut short_body) {
            Err(ScanError::TruncatedFile(msg)) => assert!(msg.contains("track 0"), "{msg}"),
            other => panic!("expected TruncatedFile, got {other:?}"),
        }

        let mut short_preamble = ShortSeek {
            inner: Cursor::new(bytes),
            short_at: 14,
        };
        assert!(matches!(
            scan(&mut short_preamble),
            Err(ScanError::TruncatedFile(_))
        ));
    }
}
