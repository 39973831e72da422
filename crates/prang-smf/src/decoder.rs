//! Track event decoding.
//!
//! Decodes one delta-time prefixed event at a time straight from a reader,
//! never reading past the end of the current track chunk. Running status is
//! honored, including across meta and sysex events as most writers expect.

use crate::error::DecodeError;
use prang_midi::{MessageKind, MidiMessage};
use smallvec::SmallVec;
use std::io::{self, Read};

pub const META_END_OF_TRACK: u8 = 0x2F;
pub const META_TEMPO: u8 = 0x51;

/// Meta payload bytes kept in [`TrackEvent::Meta`]; longer payloads are skipped.
pub const META_CAPTURE_LIMIT: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEvent {
    Channel(MidiMessage),
    Meta {
        kind: u8,
        /// Full payload length.
        len: u32,
        /// Up to [`META_CAPTURE_LIMIT`] leading payload bytes.
        data: SmallVec<[u8; META_CAPTURE_LIMIT]>,
    },
    /// `0xF0` sysex or `0xF7` escape. The payload is skipped.
    SysEx { escape: bool, len: u32 },
}

impl TrackEvent {
    /// Microseconds per quarter note if this is a set-tempo meta event.
    pub fn tempo(&self) -> Option<u32> {
        match self {
            TrackEvent::Meta { kind, data, .. } if *kind == META_TEMPO && data.len() >= 3 => {
                Some((data[0] as u32) << 16 | (data[1] as u32) << 8 | data[2] as u32)
            }
            _ => None,
        }
    }

    pub fn is_end_of_track(&self) -> bool {
        matches!(self, TrackEvent::Meta { kind, .. } if *kind == META_END_OF_TRACK)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub delta: u32,
    pub event: TrackEvent,
    /// Encoded size in bytes, delta-time included. Never zero.
    pub len: u64,
}

/// Reader adapter that refuses to cross the chunk boundary.
struct Bounded<'a, R> {
    inner: &'a mut R,
    remaining: u64,
    consumed: u64,
}

impl<R: Read> Bounded<'_, R> {
    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        if self.remaining == 0 {
            return Err(DecodeError::PastChunkEnd);
        }
        let mut byte = [0u8; 1];
        self.inner.read_exact(&mut byte)?;
        self.remaining -= 1;
        self.consumed += 1;
        Ok(byte[0])
    }

    fn read_data_byte(&mut self) -> Result<u8, DecodeError> {
        let byte = self.read_u8()?;
        if byte & 0x80 != 0 {
            return Err(DecodeError::UnexpectedStatus(byte));
        }
        Ok(byte)
    }

    fn read_vlq(&mut self) -> Result<u32, DecodeError> {
        let mut value = 0u32;
        for _ in 0..4 {
            let byte = self.read_u8()?;
            value = (value << 7) | (byte & 0x7F) as u32;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::VlqOverflow)
    }

    fn skip(&mut self, len: u64) -> Result<(), DecodeError> {
        if len > self.remaining {
            return Err(DecodeError::PastChunkEnd);
        }
        let copied = io::copy(&mut self.inner.by_ref().take(len), &mut io::sink())?;
        if copied != len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        self.remaining -= len;
        self.consumed += len;
        Ok(())
    }
}

/// Stateful decoder for one track. Create a fresh one per track chunk.
#[derive(Debug, Clone, Default)]
pub struct EventDecoder {
    running_status: Option<u8>,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next event, reading at most `limit` bytes.
    pub fn decode<R: Read>(
        &mut self,
        reader: &mut R,
        limit: u64,
    ) -> Result<DecodedEvent, DecodeError> {
        let mut input = Bounded {
            inner: reader,
            remaining: limit,
            consumed: 0,
        };

        let delta = input.read_vlq()?;
        let first = input.read_u8()?;

        let event = match first {
            0xFF => {
                let kind = input.read_data_byte()?;
                let len = input.read_vlq()?;
                let keep = (len as usize).min(META_CAPTURE_LIMIT);
                let mut data = SmallVec::new();
                for _ in 0..keep {
                    data.push(input.read_u8()?);
                }
                input.skip((len as usize - keep) as u64)?;
                TrackEvent::Meta { kind, len, data }
            }
            0xF0 | 0xF7 => {
                let len = input.read_vlq()?;
                input.skip(len as u64)?;
                TrackEvent::SysEx {
                    escape: first == 0xF7,
                    len,
                }
            }
            0xF1..=0xFE => return Err(DecodeError::UnsupportedStatus(first)),
            0x80..=0xEF => {
                self.running_status = Some(first);
                self.channel_event(&mut input, first, None)?
            }
            data => {
                let status = self
                    .running_status
                    .ok_or(DecodeError::NoRunningStatus(data))?;
                self.channel_event(&mut input, status, Some(data))?
            }
        };

        Ok(DecodedEvent {
            delta,
            event,
            len: input.consumed,
        })
    }

    fn channel_event<R: Read>(
        &self,
        input: &mut Bounded<'_, R>,
        status: u8,
        first_data: Option<u8>,
    ) -> Result<TrackEvent, DecodeError> {
        let data_len = MessageKind::from_status(status)
            .map(MessageKind::data_len)
            .unwrap_or(0);

        let mut bytes = [status, 0, 0];
        for (i, slot) in bytes[1..=data_len].iter_mut().enumerate() {
            *slot = match (i, first_data) {
                (0, Some(byte)) => byte,
                _ => input.read_data_byte()?,
            };
        }

        MidiMessage::from_bytes(&bytes[..=data_len])
            .map(TrackEvent::Channel)
            .map_err(|_| DecodeError::UnexpectedStatus(status))
    }
}

/// Decode one event with caller-held running status.
///
/// `running_status` is updated when the event carries a channel status byte.
pub fn decode_event<R: Read>(
    reader: &mut R,
    limit: u64,
    running_status: &mut Option<u8>,
) -> Result<DecodedEvent, DecodeError> {
    let mut decoder = EventDecoder {
        running_status: *running_status,
    };
    let decoded = decoder.decode(reader, limit);
    *running_status = decoder.running_status;
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decode_all(bytes: &[u8]) -> Result<Vec<DecodedEvent>, DecodeError> {
        let mut reader = Cursor::new(bytes.to_vec());
        let mut decoder = EventDecoder::new();
        let mut events = Vec::new();
        let mut remaining = bytes.len() as u64;
        while remaining > 0 {
            let event = decoder.decode(&mut reader, remaining)?;
            remaining -= event.len;
            events.push(event);
        }
        Ok(events)
    }

    #[test]
    fn test_tempo_meta() {
        let events = decode_all(&[0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].len, 7);
        assert_eq!(events[0].event.tempo(), Some(500_000));
    }

    #[test]
    fn test_running_status_and_delta() {
        // delta 0x81 0x40 = 192
        let events = decode_all(&[0x00, 0x90, 60, 100, 0x81, 0x40, 60, 0]).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].delta, 192);
        assert_eq!(events[1].len, 4);
        match &events[1].event {
            TrackEvent::Channel(msg) => {
                assert_eq!(msg.as_bytes(), &[0x90, 60, 0]);
                assert!(msg.is_note_off());
            }
            other => panic!("Expected channel event, got {other:?}"),
        }
    }

    #[test]
    fn test_running_status_survives_meta() {
        let events = decode_all(&[
            0x00, 0xC1, 5, // program change
            0x00, 0xFF, 0x01, 0x02, b'h', b'i', // text
            0x00, 7, // running status program change
        ])
        .unwrap();
        assert_eq!(events.len(), 3);
        match &events[2].event {
            TrackEvent::Channel(msg) => assert_eq!(msg.as_bytes(), &[0xC1, 7]),
            other => panic!("Expected channel event, got {other:?}"),
        }
    }

    #[test]
    fn test_long_meta_is_skipped_but_measured() {
        let mut bytes = vec![0x00, 0xFF, 0x01, 40];
        bytes.extend(std::iter::repeat(b'x').take(40));
        bytes.extend([0x00, 0xFF, 0x2F, 0x00]);
        let events = decode_all(&bytes).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].len, 44);
        match &events[0].event {
            TrackEvent::Meta { len, data, .. } => {
                assert_eq!(*len, 40);
                assert_eq!(data.len(), META_CAPTURE_LIMIT);
            }
            other => panic!("Expected meta event, got {other:?}"),
        }
        assert!(events[1].event.is_end_of_track());
    }

    #[test]
    fn test_sysex_skipped() {
        let events = decode_all(&[0x00, 0xF0, 0x03, 0x7E, 0x01, 0xF7]).unwrap();
        assert_eq!(
            events[0].event,
            TrackEvent::SysEx {
                escape: false,
                len: 3
            }
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            decode_all(&[0x00, 60, 100]),
            Err(DecodeError::NoRunningStatus(60))
        ));
        assert!(matches!(
            decode_all(&[0x00, 0x90, 60]),
            Err(DecodeError::PastChunkEnd)
        ));
        assert!(matches!(
            decode_all(&[0x00, 0xFF, 0x51, 0x03, 0x07]),
            Err(DecodeError::PastChunkEnd)
        ));
        assert!(matches!(
            decode_all(&[0xFF, 0xFF, 0xFF, 0xFF, 0x00]),
            Err(DecodeError::VlqOverflow)
        ));
        assert!(matches!(
            decode_all(&[0x00, 0xF8]),
            Err(DecodeError::UnsupportedStatus(0xF8))
        ));
        assert!(matches!(
            decode_all(&[0x00, 0x90, 0x90, 100]),
            Err(DecodeError::UnexpectedStatus(0x90))
        ));
    }

    #[test]
    fn test_decode_event_threads_running_status() {
        let mut reader = Cursor::new(vec![0x00, 0x90, 60, 100, 0x10, 62, 90]);
        let mut running = None;

        let first = decode_event(&mut reader, 7, &mut running).unwrap();
        assert_eq!(first.len, 4);
        assert_eq!(running, Some(0x90));

        let second = decode_event(&mut reader, 3, &mut running).unwrap();
        assert_eq!(second.delta, 0x10);
        match second.event {
            TrackEvent::Channel(message) => assert_eq!(message.as_bytes(), &[0x90, 62, 90]),
            other => panic!("Expected channel event, got {other:?}"),
        }

        let mut fresh = None;
        let mut reader = Cursor::new(vec![0x00, 62, 90]);
        assert!(matches!(
            decode_event(&mut reader, 3, &mut fresh),
            Err(DecodeError::NoRunningStatus(62))
        ));
    }
}
