//! Wire-level MIDI 1.0 messages.
//!
//! A [`MidiMessage`] owns the exact bytes it was decoded from so that
//! passthrough traffic can be re-emitted verbatim. Channel and system-common
//! messages fit inline; system exclusive payloads spill to the heap.

use crate::error::{Error, Result};
use midly::live::{LiveEvent, SystemCommon, SystemRealtime};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Status byte constants (upper nibble for channel messages).
pub mod status {
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const POLY_PRESSURE: u8 = 0xA0;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const CHANNEL_PRESSURE: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;

    pub const SYSTEM_EXCLUSIVE: u8 = 0xF0;
    pub const TIME_CODE: u8 = 0xF1;
    pub const SONG_POSITION: u8 = 0xF2;
    pub const SONG_SELECT: u8 = 0xF3;
    pub const TUNE_REQUEST: u8 = 0xF6;
    pub const END_SYSTEM_EXCLUSIVE: u8 = 0xF7;

    pub const TIMING_CLOCK: u8 = 0xF8;
    pub const START: u8 = 0xFA;
    pub const CONTINUE: u8 = 0xFB;
    pub const STOP: u8 = 0xFC;
    pub const ACTIVE_SENSING: u8 = 0xFE;
    pub const RESET: u8 = 0xFF;
}

/// Semantic type of a MIDI message, derived from its status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    NoteOff,
    NoteOn,
    PolyPressure,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBend,
    SystemExclusive,
    TimeCodeQuarterFrame,
    SongPosition,
    SongSelect,
    TuneRequest,
    EndSystemExclusive,
    TimingClock,
    Start,
    Continue,
    Stop,
    ActiveSensing,
    Reset,
    /// Reserved status bytes (0xF4, 0xF5, 0xF9, 0xFD).
    Undefined(u8),
}

impl MessageKind {
    /// Returns `None` for data bytes (high bit clear).
    pub fn from_status(status_byte: u8) -> Option<Self> {
        match status_byte {
            0x00..=0x7F => None,
            status::END_SYSTEM_EXCLUSIVE => Some(MessageKind::EndSystemExclusive),
            // Placeholder data bytes satisfy every fixed-length kind.
            _ => LiveEvent::parse(&[status_byte, 0, 0])
                .ok()
                .map(|event| MessageKind::from(&event)),
        }
    }

    /// Number of data bytes following the status byte.
    ///
    /// System exclusive is variable length and reports 0 here.
    pub fn data_len(self) -> usize {
        match self {
            MessageKind::NoteOff
            | MessageKind::NoteOn
            | MessageKind::PolyPressure
            | MessageKind::ControlChange
            | MessageKind::PitchBend
            | MessageKind::SongPosition => 2,
            MessageKind::ProgramChange
            | MessageKind::ChannelPressure
            | MessageKind::TimeCodeQuarterFrame
            | MessageKind::SongSelect => 1,
            _ => 0,
        }
    }

    #[inline]
    pub fn is_channel(self) -> bool {
        matches!(
            self,
            MessageKind::NoteOff
                | MessageKind::NoteOn
                | MessageKind::PolyPressure
                | MessageKind::ControlChange
                | MessageKind::ProgramChange
                | MessageKind::ChannelPressure
                | MessageKind::PitchBend
        )
    }

    #[inline]
    pub fn is_note(self) -> bool {
        matches!(self, MessageKind::NoteOff | MessageKind::NoteOn)
    }

    /// Kinds an output port can carry unchanged.
    ///
    /// MTC quarter frames and reserved status bytes are not transmitted by the
    /// device's USB output and are therefore not forwardable.
    pub fn is_forwardable(self) -> bool {
        !matches!(
            self,
            MessageKind::TimeCodeQuarterFrame | MessageKind::Undefined(_)
        )
    }
}

impl From<&LiveEvent<'_>> for MessageKind {
    fn from(event: &LiveEvent<'_>) -> Self {
        match *event {
            LiveEvent::Midi { message, .. } => match message {
                midly::MidiMessage::NoteOff { .. } => MessageKind::NoteOff,
                midly::MidiMessage::NoteOn { .. } => MessageKind::NoteOn,
                midly::MidiMessage::Aftertouch { .. } => MessageKind::PolyPressure,
                midly::MidiMessage::Controller { .. } => MessageKind::ControlChange,
                midly::MidiMessage::ProgramChange { .. } => MessageKind::ProgramChange,
                midly::MidiMessage::ChannelAftertouch { .. } => MessageKind::ChannelPressure,
                midly::MidiMessage::PitchBend { .. } => MessageKind::PitchBend,
            },
            LiveEvent::Common(common) => match common {
                SystemCommon::SysEx(_) => MessageKind::SystemExclusive,
                SystemCommon::MidiTimeCodeQuarterFrame(..) => MessageKind::TimeCodeQuarterFrame,
                SystemCommon::SongPosition(_) => MessageKind::SongPosition,
                SystemCommon::SongSelect(_) => MessageKind::SongSelect,
                SystemCommon::TuneRequest => MessageKind::TuneRequest,
                SystemCommon::Undefined(status_byte, _) => MessageKind::Undefined(status_byte),
            },
            LiveEvent::Realtime(realtime) => match realtime {
                SystemRealtime::TimingClock => MessageKind::TimingClock,
                SystemRealtime::Start => MessageKind::Start,
                SystemRealtime::Continue => MessageKind::Continue,
                SystemRealtime::Stop => MessageKind::Stop,
                SystemRealtime::ActiveSensing => MessageKind::ActiveSensing,
                SystemRealtime::Reset => MessageKind::Reset,
                SystemRealtime::Undefined(status_byte) => MessageKind::Undefined(status_byte),
            },
        }
    }
}

/// One complete MIDI message, stored as its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MidiMessage {
    kind: MessageKind,
    bytes: SmallVec<[u8; 3]>,
}

impl MidiMessage {
    /// Decode a single message from a packet such as a USB-MIDI callback payload.
    ///
    /// Running status is not accepted here: the first byte must be a status
    /// byte. Trailing bytes after a fixed-length message are ignored.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        match data.first() {
            None => return Err(Error::InvalidMessage("empty packet".into())),
            Some(&status_byte) if status_byte & 0x80 == 0 => {
                return Err(Error::InvalidMessage(format!(
                    "missing status byte (got {status_byte:#04x})"
                )))
            }
            // A lone terminator closes a sysex split across packets.
            Some(&status::END_SYSTEM_EXCLUSIVE) => {
                return Ok(Self {
                    kind: MessageKind::EndSystemExclusive,
                    bytes: SmallVec::from_slice(&data[..1]),
                })
            }
            Some(_) => {}
        }

        let event = LiveEvent::parse(data).map_err(|e| Error::InvalidMessage(e.to_string()))?;
        let len = Self::wire_len(&event, data)?;
        Ok(Self {
            kind: MessageKind::from(&event),
            bytes: SmallVec::from_slice(&data[..len]),
        })
    }

    /// Bytes of `data` that `event` was parsed from, status byte included.
    fn wire_len(event: &LiveEvent<'_>, data: &[u8]) -> Result<usize> {
        let len = match *event {
            LiveEvent::Midi { message, .. } => match message {
                midly::MidiMessage::ProgramChange { .. }
                | midly::MidiMessage::ChannelAftertouch { .. } => 2,
                _ => 3,
            },
            LiveEvent::Common(SystemCommon::SysEx(body)) => {
                let end = 1 + body.len();
                match data.get(end) {
                    None => end,
                    Some(&status::END_SYSTEM_EXCLUSIVE) => end + 1,
                    Some(other) => {
                        return Err(Error::InvalidMessage(format!(
                            "status byte {other:#04x} inside system exclusive"
                        )))
                    }
                }
            }
            // Defined kinds that fell short of their data bytes.
            LiveEvent::Common(SystemCommon::Undefined(
                status_byte @ status::TIME_CODE..=status::SONG_SELECT,
                _,
            )) => {
                return Err(Error::InvalidMessage(format!(
                    "truncated system common message {status_byte:#04x}"
                )))
            }
            LiveEvent::Common(SystemCommon::MidiTimeCodeQuarterFrame(..))
            | LiveEvent::Common(SystemCommon::SongSelect(_)) => 2,
            LiveEvent::Common(SystemCommon::SongPosition(_)) => 3,
            LiveEvent::Common(_) | LiveEvent::Realtime(_) => 1,
        };
        Ok(len)
    }

    #[inline]
    fn channel_message(status_nibble: u8, channel: u8, data: &[u8]) -> Self {
        let status_byte = status_nibble | channel.min(15);
        let mut bytes = SmallVec::new();
        bytes.push(status_byte);
        bytes.extend(data.iter().map(|b| b & 0x7F));
        Self {
            kind: Self::classify(status_byte),
            bytes,
        }
    }

    #[inline]
    fn classify(status_byte: u8) -> MessageKind {
        MessageKind::from_status(status_byte).unwrap_or(MessageKind::Undefined(status_byte))
    }

    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel_message(status::NOTE_ON, channel, &[note, velocity])
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel_message(status::NOTE_OFF, channel, &[note, velocity])
    }

    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Self::channel_message(status::CONTROL_CHANGE, channel, &[controller, value])
    }

    pub fn program_change(channel: u8, program: u8) -> Self {
        Self::channel_message(status::PROGRAM_CHANGE, channel, &[program])
    }

    /// `value`: signed 14-bit (-8192 to 8191).
    pub fn pitch_bend(channel: u8, value: i16) -> Self {
        let unsigned = (value as i32 + 8192).clamp(0, 16383) as u16;
        let lsb = (unsigned & 0x7F) as u8;
        let msb = ((unsigned >> 7) & 0x7F) as u8;
        Self::channel_message(status::PITCH_BEND, channel, &[lsb, msb])
    }

    /// Single-byte system real-time or system-common message.
    ///
    /// Returns `None` if `status_byte` is not a zero-data-byte status.
    pub fn system(status_byte: u8) -> Option<Self> {
        let kind = MessageKind::from_status(status_byte)?;
        if kind.is_channel() || kind.data_len() != 0 || kind == MessageKind::SystemExclusive {
            return None;
        }
        Some(Self {
            kind,
            bytes: SmallVec::from_slice(&[status_byte]),
        })
    }

    #[inline]
    pub fn status(&self) -> u8 {
        self.bytes[0]
    }

    #[inline]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Channel (0-15) for channel-voice messages.
    #[inline]
    pub fn channel(&self) -> Option<u8> {
        self.kind()
            .is_channel()
            .then_some(self.status() & 0x0F)
    }

    /// First data byte, or 0 if the message has none.
    #[inline]
    pub fn data1(&self) -> u8 {
        self.bytes.get(1).copied().unwrap_or(0)
    }

    /// Second data byte, or 0 if the message has none.
    #[inline]
    pub fn data2(&self) -> u8 {
        self.bytes.get(2).copied().unwrap_or(0)
    }

    #[inline]
    pub fn note(&self) -> Option<u8> {
        match self.kind() {
            MessageKind::NoteOn | MessageKind::NoteOff | MessageKind::PolyPressure => {
                Some(self.data1())
            }
            _ => None,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Option<u8> {
        self.kind().is_note().then(|| self.data2())
    }

    /// Note-on with nonzero velocity.
    #[inline]
    pub fn is_note_on(&self) -> bool {
        self.kind() == MessageKind::NoteOn && self.data2() > 0
    }

    /// Note-off, or note-on with zero velocity.
    #[inline]
    pub fn is_note_off(&self) -> bool {
        match self.kind() {
            MessageKind::NoteOff => true,
            MessageKind::NoteOn => self.data2() == 0,
            _ => false,
        }
    }

    /// Payload between 0xF0 and the optional 0xF7 terminator.
    pub fn sysex_data(&self) -> Option<&[u8]> {
        if self.kind() != MessageKind::SystemExclusive {
            return None;
        }
        let body = &self.bytes[1..];
        Some(match body.last() {
            Some(&status::END_SYSTEM_EXCLUSIVE) => &body[..body.len() - 1],
            _ => body,
        })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl TryFrom<&[u8]> for MidiMessage {
    type Error = Error;

    fn try_from(data: &[u8]) -> Result<Self> {
        Self::from_bytes(data)
    }
}

impl AsRef<[u8]> for MidiMessage {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
