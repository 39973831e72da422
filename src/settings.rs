//! Persisted performance settings.
//!
//! Stored as a single flat line, `<base_octave>,<quantize_beats>`, and read
//! once at boot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

pub const MAX_BASE_OCTAVE: u8 = 10;
pub const MAX_QUANTIZE_BEATS: u8 = 16;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse settings line {0:?}")]
    Parse(String),

    #[error("{field} = {value} is out of range (max {max})")]
    OutOfRange {
        field: &'static str,
        value: u32,
        max: u8,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Settings {
    /// Octave whose C maps to capture slot 0 (0-10).
    pub base_octave: u8,
    /// Quantize grid in beats, 0 = off (0-16).
    pub quantize_beats: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_octave: 4,
            quantize_beats: 4,
        }
    }
}

fn parse_field(text: &str, field: &'static str, max: u8) -> Result<u8, SettingsError> {
    let value: u32 = text
        .trim()
        .parse()
        .map_err(|_| SettingsError::Parse(text.to_string()))?;
    if value > max as u32 {
        return Err(SettingsError::OutOfRange { field, value, max });
    }
    Ok(value as u8)
}

#[inline]
fn step_clamped(value: u8, delta: i64, max: u8) -> u8 {
    (value as i64).saturating_add(delta).clamp(0, max as i64) as u8
}

impl Settings {
    /// MIDI note of capture slot 0. Saturates for octaves past the MIDI range.
    #[inline]
    pub fn base_note(&self) -> u8 {
        self.base_octave.saturating_mul(12)
    }

    /// Parse the flat settings line. A missing second field keeps the default
    /// quantize setting.
    pub fn parse(text: &str) -> Result<Self, SettingsError> {
        let line = text.lines().next().unwrap_or_default().trim();
        if line.is_empty() {
            return Err(SettingsError::Parse(text.to_string()));
        }
        let (octave, beats) = match line.split_once(',') {
            Some((octave, beats)) => (octave, Some(beats)),
            None => (line, None),
        };

        let mut settings = Self {
            base_octave: parse_field(octave, "base_octave", MAX_BASE_OCTAVE)?,
            ..Self::default()
        };
        if let Some(beats) = beats {
            settings.quantize_beats = parse_field(beats, "quantize_beats", MAX_QUANTIZE_BEATS)?;
        }
        Ok(settings)
    }

    /// `Ok(None)` when no settings file exists.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, SettingsError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => {
                let settings = Self::parse(&text)?;
                debug!(?settings, "loaded settings from {}", path.display());
                Ok(Some(settings))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        fs::write(path.as_ref(), self.to_string())?;
        debug!(settings = ?self, "saved settings to {}", path.as_ref().display());
        Ok(())
    }

    /// Remove the settings file. Returns `false` if there was none.
    pub fn reset(path: impl AsRef<Path>) -> Result<bool, SettingsError> {
        match fs::remove_file(path.as_ref()) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn adjust_base_octave(&mut self, delta: i64) {
        self.base_octave = step_clamped(self.base_octave, delta, MAX_BASE_OCTAVE);
    }

    pub fn adjust_quantize_beats(&mut self, delta: i64) {
        self.quantize_beats = step_clamped(self.quantize_beats, delta, MAX_QUANTIZE_BEATS);
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{},{}", self.base_octave, self.quantize_beats)
    }
}

impl FromStr for Settings {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
