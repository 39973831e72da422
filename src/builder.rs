//! Builder for configuring and constructing a [`Session`].

use crate::capture::{CaptureEngine, Encoder};
use crate::rate::{EncoderTracker, PlaybackRate, DEFAULT_ENCODER_DIVISOR};
use crate::router::{RouterState, DEFAULT_FEEDBACK_DURATION};
use crate::settings::{Settings, MAX_BASE_OCTAVE, MAX_QUANTIZE_BEATS};
use crate::{Error, Result, Session};
use prang_midi::{MidiInput, MidiOutput, NoteTracker};
use std::time::Duration;
use tracing::debug;

/// One builder per loaded performance. Building stops every capture slot,
/// pushes the quantize grid and rate to the capture engine, and takes the
/// encoder's current count as the baseline.
///
/// # Example
///
/// ```ignore
/// use prang::prelude::*;
///
/// let settings = Settings::load("prang.csv")?.unwrap_or_default();
/// let mut session = SessionBuilder::new()
///     .settings(&settings)
///     .build(input, output, looper, encoder)?;
///
/// loop {
///     let report = session.tick(Instant::now());
///     if let Some(rate) = report.rate {
///         draw_rate(rate);
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    base_octave: u8,
    quantize_beats: u8,
    rate: PlaybackRate,
    feedback_duration: Duration,
    encoder_divisor: i64,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            base_octave: settings.base_octave,
            quantize_beats: settings.quantize_beats,
            rate: PlaybackRate::UNITY,
            feedback_duration: DEFAULT_FEEDBACK_DURATION,
            encoder_divisor: DEFAULT_ENCODER_DIVISOR,
        }
    }
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take base octave and quantize grid from persisted settings.
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.base_octave = settings.base_octave;
        self.quantize_beats = settings.quantize_beats;
        self
    }

    /// Default: 4 (base note 48)
    pub fn base_octave(mut self, octave: u8) -> Self {
        self.base_octave = octave;
        self
    }

    /// Default: 4. 0 disables quantization.
    pub fn quantize_beats(mut self, beats: u8) -> Self {
        self.quantize_beats = beats;
        self
    }

    /// Default: 1.0. Clamped to `[0.01, 4.99]`.
    pub fn rate(mut self, rate: f32) -> Self {
        self.rate = PlaybackRate::from_f32(rate);
        self
    }

    /// Default: 1 second
    pub fn feedback_duration(mut self, duration: Duration) -> Self {
        self.feedback_duration = duration;
        self
    }

    /// Raw encoder counts per detent. Default: 4
    pub fn encoder_divisor(mut self, divisor: i64) -> Self {
        self.encoder_divisor = divisor;
        self
    }

    pub fn build<I, O, C, E>(
        self,
        input: I,
        output: O,
        mut capture: C,
        mut encoder: E,
    ) -> Result<Session<I, O, C, E>>
    where
        I: MidiInput,
        O: MidiOutput,
        C: CaptureEngine,
        E: Encoder,
    {
        if self.base_octave > MAX_BASE_OCTAVE {
            return Err(Error::InvalidConfig(format!(
                "base octave {} exceeds {MAX_BASE_OCTAVE}",
                self.base_octave
            )));
        }
        if self.quantize_beats > MAX_QUANTIZE_BEATS {
            return Err(Error::InvalidConfig(format!(
                "quantize beats {} exceeds {MAX_QUANTIZE_BEATS}",
                self.quantize_beats
            )));
        }
        if self.encoder_divisor <= 0 {
            return Err(Error::InvalidConfig(format!(
                "encoder divisor must be positive, got {}",
                self.encoder_divisor
            )));
        }

        for slot in 0..capture.slot_count() {
            capture.stop(slot);
        }
        capture.set_quantize_beats(self.quantize_beats);
        capture.set_rate(self.rate.as_f32());

        let tracker = EncoderTracker::new(self.encoder_divisor, encoder.read_count());
        let base_note = self.base_octave.saturating_mul(12);
        let router = RouterState::new(base_note, self.rate, tracker, self.feedback_duration);

        debug!(
            base_note,
            slots = capture.slot_count(),
            quantize_beats = self.quantize_beats,
            rate = %self.rate,
            "session started"
        );

        Ok(Session::from_parts(
            input,
            output,
            capture,
            encoder,
            router,
            NoteTracker::new(),
        ))
    }
}
