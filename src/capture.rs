//! Collaborators driven by the control loop: the capture engine and the rate
//! encoder.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the last capture start landed relative to the quantize grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CaptureTiming {
    #[default]
    None,
    Exact,
    Early,
    Late,
}

impl fmt::Display for CaptureTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CaptureTiming::None => "",
            CaptureTiming::Exact => "exact",
            CaptureTiming::Early => "early",
            CaptureTiming::Late => "late",
        };
        f.write_str(label)
    }
}

/// Multi-slot looper/sampler that records and plays back captured material.
///
/// Slots are addressed `0..slot_count()`. The router only calls `start` and
/// `stop` with in-range slots.
pub trait CaptureEngine {
    fn slot_count(&self) -> usize;

    fn start(&mut self, slot: usize);

    fn stop(&mut self, slot: usize);

    /// Timing of the most recent `start`.
    fn last_timing(&self) -> CaptureTiming;

    fn set_rate(&mut self, rate: f32);

    /// Advance the engine by one control tick.
    fn tick(&mut self);

    /// Quantize grid in beats, 0 = off.
    fn set_quantize_beats(&mut self, _beats: u8) {}
}

impl<T: CaptureEngine + ?Sized> CaptureEngine for &mut T {
    fn slot_count(&self) -> usize {
        (**self).slot_count()
    }

    fn start(&mut self, slot: usize) {
        (**self).start(slot)
    }

    fn stop(&mut self, slot: usize) {
        (**self).stop(slot)
    }

    fn last_timing(&self) -> CaptureTiming {
        (**self).last_timing()
    }

    fn set_rate(&mut self, rate: f32) {
        (**self).set_rate(rate)
    }

    fn tick(&mut self) {
        (**self).tick()
    }

    fn set_quantize_beats(&mut self, beats: u8) {
        (**self).set_quantize_beats(beats)
    }
}

/// Rotary encoder with a raw, monotonically accumulating count.
pub trait Encoder {
    fn read_count(&mut self) -> i64;
}

impl<F: FnMut() -> i64> Encoder for F {
    fn read_count(&mut self) -> i64 {
        self()
    }
}
