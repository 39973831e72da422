//! Structural facts extracted from a Standard MIDI File.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tempo assumed when a file carries no set-tempo event (120 BPM).
pub const DEFAULT_MICRO_TEMPO: u32 = 500_000;

/// `micro_tempo` sentinel: the file changes tempo.
pub const TEMPO_VARIES: u32 = 0;

#[inline]
pub fn micro_tempo_to_bpm(micro_tempo: u32) -> f64 {
    60_000_000.0 / micro_tempo as f64
}

/// SMF header format field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmfFormat {
    /// Format 0: one multi-channel track.
    SingleTrack,
    /// Format 1: simultaneous tracks.
    Parallel,
    /// Format 2: independent sequential patterns.
    Sequential,
    /// Any other value found in the header.
    Unknown(u16),
}

impl SmfFormat {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => SmfFormat::SingleTrack,
            1 => SmfFormat::Parallel,
            2 => SmfFormat::Sequential,
            other => SmfFormat::Unknown(other),
        }
    }

    pub fn as_raw(self) -> u16 {
        match self {
            SmfFormat::SingleTrack => 0,
            SmfFormat::Parallel => 1,
            SmfFormat::Sequential => 2,
            SmfFormat::Unknown(raw) => raw,
        }
    }
}

/// SMF header division field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Division {
    TicksPerQuarter(u16),
    Timecode { frames_per_second: u8, ticks_per_frame: u8 },
}

impl Division {
    pub fn from_raw(raw: u16) -> Self {
        if raw & 0x8000 == 0 {
            Division::TicksPerQuarter(raw)
        } else {
            let fps = (raw >> 8) as u8 as i8;
            Division::Timecode {
                frames_per_second: fps.unsigned_abs(),
                ticks_per_frame: (raw & 0xFF) as u8,
            }
        }
    }
}

/// Tempo summary of a whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tempo {
    /// Microseconds per quarter note, constant for the whole file.
    Fixed(u32),
    Varies,
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tempo::Fixed(us) => write!(f, "{:.1}", micro_tempo_to_bpm(*us)),
            Tempo::Varies => f.write_str("varies"),
        }
    }
}

/// Result of [`scan`](crate::scan).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub format: SmfFormat,
    pub track_count: u16,
    /// Microseconds per quarter note, or [`TEMPO_VARIES`].
    pub micro_tempo: u32,
    pub division: Division,
}

impl FileMetadata {
    pub fn tempo(&self) -> Tempo {
        if self.micro_tempo == TEMPO_VARIES {
            Tempo::Varies
        } else {
            Tempo::Fixed(self.micro_tempo)
        }
    }

    /// `None` when the tempo varies.
    pub fn bpm(&self) -> Option<f64> {
        match self.tempo() {
            Tempo::Fixed(us) => Some(micro_tempo_to_bpm(us)),
            Tempo::Varies => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_round_trip_keeps_unknown() {
        assert_eq!(SmfFormat::from_raw(1), SmfFormat::Parallel);
        assert_eq!(SmfFormat::from_raw(7), SmfFormat::Unknown(7));
        assert_eq!(SmfFormat::Unknown(7).as_raw(), 7);
    }

    #[test]
    fn test_division_timecode() {
        // -25 fps, 40 ticks per frame
        let raw = ((-25i8 as u8 as u16) << 8) | 40;
        assert_eq!(
            Division::from_raw(raw),
            Division::Timecode {
                frames_per_second: 25,
                ticks_per_frame: 40
            }
        );
        assert_eq!(Division::from_raw(480), Division::TicksPerQuarter(480));
    }

    #[test]
    fn test_tempo_display() {
        assert_eq!(Tempo::Fixed(500_000).to_string(), "120.0");
        assert_eq!(Tempo::Fixed(600_000).to_string(), "100.0");
        assert_eq!(Tempo::Varies.to_string(), "varies");
    }

    #[test]
    fn test_varies_has_no_bpm() {
        let meta = FileMetadata {
            format: SmfFormat::Parallel,
            track_count: 2,
            micro_tempo: TEMPO_VARIES,
            division: Division::TicksPerQuarter(480),
        };
        assert_eq!(meta.tempo(), Tempo::Varies);
        assert!(meta.bpm().is_none());
    }
}
