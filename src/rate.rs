//! Playback rate and encoder detent tracking.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw encoder counts per detent.
pub const DEFAULT_ENCODER_DIVISOR: i64 = 4;

/// Playback-rate multiplier, held in hundredths so repeated stepping never
/// drifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlaybackRate(u16);

impl PlaybackRate {
    pub const MIN: Self = Self(1);
    pub const MAX: Self = Self(499);
    pub const UNITY: Self = Self(100);

    /// Nearest representable rate, clamped to `[0.01, 4.99]`.
    pub fn from_f32(rate: f32) -> Self {
        if rate.is_nan() {
            return Self::UNITY;
        }
        let hundredths = (rate * 100.0).round().clamp(Self::MIN.0 as f32, Self::MAX.0 as f32);
        Self(hundredths as u16)
    }

    #[inline]
    pub fn as_f32(self) -> f32 {
        self.0 as f32 / 100.0
    }

    #[inline]
    pub fn hundredths(self) -> u16 {
        self.0
    }

    /// Step by `steps` hundredths, stopping at either bound.
    pub fn step(self, steps: i32) -> Self {
        let next = (self.0 as i32)
            .saturating_add(steps)
            .clamp(Self::MIN.0 as i32, Self::MAX.0 as i32);
        Self(next as u16)
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        Self::UNITY
    }
}

impl fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Which way the encoder moved since the last reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    #[inline]
    pub fn signum(self) -> i32 {
        match self {
            Direction::Up => 1,
            Direction::Down => -1,
        }
    }
}

/// Turns raw encoder counts into detent movements.
#[derive(Debug, Clone)]
pub struct EncoderTracker {
    divisor: i64,
    last_detent: i64,
}

impl EncoderTracker {
    /// `divisor` must be positive; `raw_count` is the baseline reading.
    pub fn new(divisor: i64, raw_count: i64) -> Self {
        let divisor = divisor.max(1);
        Self {
            divisor,
            last_detent: raw_count.div_euclid(divisor),
        }
    }

    /// Direction of travel if the detent changed since the previous update.
    pub fn update(&mut self, raw_count: i64) -> Option<Direction> {
        let detent = raw_count.div_euclid(self.divisor);
        let previous = std::mem::replace(&mut self.last_detent, detent);
        match detent.cmp(&previous) {
            std::cmp::Ordering::Greater => Some(Direction::Up),
            std::cmp::Ordering::Less => Some(Direction::Down),
            std::cmp::Ordering::Equal => None,
        }
    }

    #[inline]
    pub fn detent(&self) -> i64 {
        self.last_detent
    }

    #[inline]
    pub fn divisor(&self) -> i64 {
        self.divisor
    }
}
