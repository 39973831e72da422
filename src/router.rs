//! Real-time event routing.
//!
//! One [`RouterState::tick`] per control-loop iteration: at most one inbound
//! message is routed, the encoder is sampled, and the capture engine is
//! advanced. Notes inside the capture window start and stop capture slots;
//! everything else the output can carry is forwarded byte for byte.

use crate::capture::{CaptureEngine, CaptureTiming, Encoder};
use crate::rate::{EncoderTracker, PlaybackRate};
use prang_midi::{MessageKind, MidiInput, MidiMessage, MidiOutput, NoteTracker};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// How long capture timing feedback stays visible.
pub const DEFAULT_FEEDBACK_DURATION: Duration = Duration::from_secs(1);

/// What happened to the message handled in a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    CaptureStarted { slot: usize, timing: CaptureTiming },
    CaptureStopped { slot: usize },
    /// Sent to the output unchanged.
    Forwarded(MessageKind),
    /// The output rejected a passthrough message.
    DropFailed(MessageKind),
    /// Not transmittable, discarded.
    Dropped(MessageKind),
}

/// Transient capture timing indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback {
    pub timing: CaptureTiming,
    pub expires_at: Instant,
}

/// Changes produced by one tick, so a display only redraws what moved.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    pub routed: Option<Routed>,
    /// New playback rate, if it changed.
    pub rate: Option<f32>,
    pub feedback_expired: bool,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.routed.is_none() && self.rate.is_none() && !self.feedback_expired
    }
}

/// Routing state owned by one loaded performance.
#[derive(Debug, Clone)]
pub struct RouterState {
    base_note: u8,
    rate: PlaybackRate,
    encoder: EncoderTracker,
    feedback: Option<Feedback>,
    feedback_duration: Duration,
}

impl RouterState {
    pub fn new(
        base_note: u8,
        rate: PlaybackRate,
        encoder: EncoderTracker,
        feedback_duration: Duration,
    ) -> Self {
        Self {
            base_note,
            rate,
            encoder,
            feedback: None,
            feedback_duration,
        }
    }

    #[inline]
    pub fn base_note(&self) -> u8 {
        self.base_note
    }

    #[inline]
    pub fn rate(&self) -> PlaybackRate {
        self.rate
    }

    #[inline]
    pub fn feedback(&self) -> Option<Feedback> {
        self.feedback
    }

    /// Capture slot addressed by `note`, if it falls inside
    /// `[base_note, base_note + slot_count)`.
    pub fn capture_slot(&self, note: u8, slot_count: usize) -> Option<usize> {
        let slot = note.checked_sub(self.base_note)? as usize;
        (slot < slot_count).then_some(slot)
    }

    /// Run one control tick.
    pub fn tick<I, O, C, E>(
        &mut self,
        input: &mut I,
        output: &mut O,
        capture: &mut C,
        encoder: &mut E,
        tracker: &mut NoteTracker,
        now: Instant,
    ) -> TickReport
    where
        I: MidiInput + ?Sized,
        O: MidiOutput + ?Sized,
        C: CaptureEngine + ?Sized,
        E: Encoder + ?Sized,
    {
        let routed = input
            .poll()
            .map(|message| self.route(&message, output, capture, tracker, now));

        let rate = self
            .update_rate(encoder.read_count(), capture)
            .map(PlaybackRate::as_f32);

        capture.tick();
        let feedback_expired = self.expire_feedback(now);

        TickReport {
            routed,
            rate,
            feedback_expired,
        }
    }

    /// Route a single inbound message.
    pub fn route<O, C>(
        &mut self,
        message: &MidiMessage,
        output: &mut O,
        capture: &mut C,
        tracker: &mut NoteTracker,
        now: Instant,
    ) -> Routed
    where
        O: MidiOutput + ?Sized,
        C: CaptureEngine + ?Sized,
    {
        let kind = message.kind();
        if !kind.is_forwardable() {
            trace!(?kind, "dropping untransmittable message");
            return Routed::Dropped(kind);
        }

        if kind.is_note() {
            if let Some(slot) = self.capture_slot(message.data1(), capture.slot_count()) {
                return if message.is_note_on() {
                    capture.start(slot);
                    let timing = capture.last_timing();
                    self.feedback = Some(Feedback {
                        timing,
                        expires_at: now + self.feedback_duration,
                    });
                    debug!(slot, ?timing, "capture started");
                    Routed::CaptureStarted { slot, timing }
                } else {
                    capture.stop(slot);
                    debug!(slot, "capture stopped");
                    Routed::CaptureStopped { slot }
                };
            }
        }

        match output.send(message) {
            Ok(()) => {
                tracker.process(message);
                trace!(?kind, bytes = message.len(), "forwarded");
                Routed::Forwarded(kind)
            }
            Err(e) => {
                warn!("Failed to forward {:?}: {}", kind, e);
                Routed::DropFailed(kind)
            }
        }
    }

    /// Step the playback rate by one hundredth if the encoder crossed a
    /// detent. Returns the new rate when it changed.
    pub fn update_rate<C>(&mut self, raw_count: i64, capture: &mut C) -> Option<PlaybackRate>
    where
        C: CaptureEngine + ?Sized,
    {
        let direction = self.encoder.update(raw_count)?;
        let next = self.rate.step(direction.signum());
        if next == self.rate {
            return None;
        }
        self.rate = next;
        capture.set_rate(next.as_f32());
        trace!(rate = %next, "playback rate");
        Some(next)
    }

    /// Clear the feedback indicator once its deadline has passed.
    pub fn expire_feedback(&mut self, now: Instant) -> bool {
        match self.feedback {
            Some(feedback) if now >= feedback.expires_at => {
                self.feedback = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::DEFAULT_ENCODER_DIVISOR;

    #[derive(Default)]
    struct Recorder {
        slots: usize,
        started: Vec<usize>,
        stopped: Vec<usize>,
        rates: Vec<f32>,
        ticks: usize,
    }

    impl CaptureEngine for Recorder {
        fn slot_count(&self) -> usize {
            self.slots
        }
        fn start(&mut self, slot: usize) {
            self.started.push(slot);
        }
        fn stop(&mut self, slot: usize) {
            self.stopped.push(slot);
        }
        fn last_timing(&self) -> CaptureTiming {
            CaptureTiming::Late
        }
        fn set_rate(&mut self, rate: f32) {
            self.rates.push(rate);
        }
        fn tick(&mut self) {
            self.ticks += 1;
        }
    }

    fn state(base_note: u8) -> RouterState {
        RouterState::new(
            base_note,
            PlaybackRate::UNITY,
            EncoderTracker::new(DEFAULT_ENCODER_DIVISOR, 0),
            DEFAULT_FEEDBACK_DURATION,
        )
    }

    #[test]
    fn test_capture_window_bounds() {
        let router = state(48);
        assert_eq!(router.capture_slot(47, 8), None);
        assert_eq!(router.capture_slot(48, 8), Some(0));
        assert_eq!(router.capture_slot(55, 8), Some(7));
        assert_eq!(router.capture_slot(56, 8), None);
        assert_eq!(router.capture_slot(48, 0), None);
    }

    #[test]
    fn test_window_note_does_not_reach_output_or_tracker() {
        let mut router = state(48);
        let mut capture = Recorder {
            slots: 8,
            ..Default::default()
        };
        let mut out: Vec<MidiMessage> = Vec::new();
        let mut tracker = NoteTracker::new();
        let now = Instant::now();

        let routed = router.route(
            &MidiMessage::note_on(3, 50, 100),
            &mut out,
            &mut capture,
            &mut tracker,
            now,
        );
        assert_eq!(
            routed,
            Routed::CaptureStarted {
                slot: 2,
                timing: CaptureTiming::Late
            }
        );
        assert!(out.is_empty());
        assert!(tracker.is_empty());
        assert_eq!(
            router.feedback(),
            Some(Feedback {
                timing: CaptureTiming::Late,
                expires_at: now + DEFAULT_FEEDBACK_DURATION
            })
        );
    }

    #[test]
    fn test_zero_velocity_note_on_stops() {
        let mut router = state(0);
        let mut capture = Recorder {
            slots: 4,
            ..Default::default()
        };
        let mut out: Vec<MidiMessage> = Vec::new();
        let mut tracker = NoteTracker::new();

        let routed = router.route(
            &MidiMessage::note_on(0, 1, 0),
            &mut out,
            &mut capture,
            &mut tracker,
            Instant::now(),
        );
        assert_eq!(routed, Routed::CaptureStopped { slot: 1 });
        assert_eq!(capture.stopped, vec![1]);
        assert!(router.feedback().is_none());
    }

    #[test]
    fn test_undefined_status_is_dropped() {
        let mut router = state(48);
        let mut capture = Recorder::default();
        let mut out: Vec<MidiMessage> = Vec::new();
        let mut tracker = NoteTracker::new();

        let undefined = MidiMessage::from_bytes(&[0xF4]).unwrap();
        let routed = router.route(&undefined, &mut out, &mut capture, &mut tracker, Instant::now());
        assert_eq!(routed, Routed::Dropped(MessageKind::Undefined(0xF4)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_rate_only_reported_on_change() {
        let mut router = state(48);
        let mut capture = Recorder::default();

        assert_eq!(router.update_rate(0, &mut capture), None);
        assert_eq!(router.update_rate(4, &mut capture), Some(PlaybackRate::from_f32(1.01)));
        // A large jump still moves a single step.
        assert_eq!(router.update_rate(400, &mut capture), Some(PlaybackRate::from_f32(1.02)));
        assert_eq!(capture.rates, vec![1.01, 1.02]);
    }

    #[test]
    fn test_rate_pinned_at_bound_is_not_reported() {
        let mut router = RouterState::new(
            48,
            PlaybackRate::MAX,
            EncoderTracker::new(1, 0),
            DEFAULT_FEEDBACK_DURATION,
        );
        let mut capture = Recorder::default();
        assert_eq!(router.update_rate(1, &mut capture), None);
        assert!(capture.rates.is_empty());
        assert_eq!(router.rate(), PlaybackRate::MAX);
    }

    #[test]
    fn test_feedback_expiry() {
        let mut router = state(48);
        let mut capture = Recorder {
            slots: 8,
            ..Default::default()
        };
        let mut out: Vec<MidiMessage> = Vec::new();
        let mut tracker = NoteTracker::new();
        let start = Instant::now();

        router.route(
            &MidiMessage::note_on(0, 48, 90),
            &mut out,
            &mut capture,
            &mut tracker,
            start,
        );
        assert!(!router.expire_feedback(start + Duration::from_millis(999)));
        assert!(router.feedback().is_some());
        assert!(router.expire_feedback(start + Duration::from_millis(1000)));
        assert!(router.feedback().is_none());
        assert!(!router.expire_feedback(start + Duration::from_secs(5)));
    }
}
