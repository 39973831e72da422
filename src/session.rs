//! A loaded performance: the router state, the stuck-note tracker, and the
//! collaborators they drive.

use crate::capture::{CaptureEngine, Encoder};
use crate::rate::PlaybackRate;
use crate::router::{Feedback, RouterState, TickReport};
use prang_midi::{FlushReport, MidiInput, MidiOutput, NoteTracker};
use std::time::Instant;
use tracing::debug;

/// Owns everything one performance needs and nothing that outlives it.
///
/// Created by [`SessionBuilder`](crate::SessionBuilder) and consumed by
/// [`Session::close`], so the next performance always starts from fresh
/// routing and note state. Dropping a session without closing it still
/// sends note-offs for held notes and stops every capture slot.
pub struct Session<I, O: MidiOutput, C: CaptureEngine, E> {
    /// `None` only after `close` has taken the collaborators.
    parts: Option<Collaborators<I, O, C, E>>,
    router: RouterState,
    tracker: NoteTracker,
    ticks: u64,
}

struct Collaborators<I, O, C, E> {
    input: I,
    output: O,
    capture: C,
    encoder: E,
}

impl<I, O: MidiOutput, C: CaptureEngine, E> Collaborators<I, O, C, E> {
    /// Flush held notes before stopping capture slots.
    fn shut_down(&mut self, tracker: &mut NoteTracker) -> FlushReport {
        let flush = tracker.send_off(&mut self.output);
        for slot in 0..self.capture.slot_count() {
            self.capture.stop(slot);
        }
        flush
    }
}

/// Collaborators handed back by [`Session::close`].
pub struct SessionParts<I, O, C, E> {
    pub input: I,
    pub output: O,
    pub capture: C,
    pub encoder: E,
    /// Note-offs sent for notes still held at close.
    pub flush: FlushReport,
}

impl<I, O, C, E> Session<I, O, C, E>
where
    I: MidiInput,
    O: MidiOutput,
    C: CaptureEngine,
    E: Encoder,
{
    pub(crate) fn from_parts(
        input: I,
        output: O,
        capture: C,
        encoder: E,
        router: RouterState,
        tracker: NoteTracker,
    ) -> Self {
        Self {
            parts: Some(Collaborators {
                input,
                output,
                capture,
                encoder,
            }),
            router,
            tracker,
            ticks: 0,
        }
    }

    fn parts(&self) -> &Collaborators<I, O, C, E> {
        self.parts
            .as_ref()
            .expect("BUG: session parts are only taken by close")
    }

    /// Run one control-loop iteration. Never blocks.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        self.ticks += 1;
        let Some(parts) = self.parts.as_mut() else {
            return TickReport::default();
        };
        self.router.tick(
            &mut parts.input,
            &mut parts.output,
            &mut parts.capture,
            &mut parts.encoder,
            &mut self.tracker,
            now,
        )
    }

    /// Send note-offs for every forwarded note still held, without ending the
    /// session.
    pub fn release_held_notes(&mut self) -> FlushReport {
        let Some(parts) = self.parts.as_mut() else {
            return FlushReport::default();
        };
        self.tracker.send_off(&mut parts.output)
    }

    /// Flush held notes, stop every capture slot and hand the collaborators
    /// back.
    pub fn close(mut self) -> SessionParts<I, O, C, E> {
        let mut parts = self
            .parts
            .take()
            .expect("BUG: session parts are only taken by close");
        let flush = parts.shut_down(&mut self.tracker);
        debug!(
            ticks = self.ticks,
            released = flush.sent,
            failed = flush.failed,
            "session closed"
        );
        SessionParts {
            input: parts.input,
            output: parts.output,
            capture: parts.capture,
            encoder: parts.encoder,
            flush,
        }
    }

    #[inline]
    pub fn playback_rate(&self) -> PlaybackRate {
        self.router.rate()
    }

    #[inline]
    pub fn feedback(&self) -> Option<Feedback> {
        self.router.feedback()
    }

    #[inline]
    pub fn base_note(&self) -> u8 {
        self.router.base_note()
    }

    pub fn slot_count(&self) -> usize {
        self.parts().capture.slot_count()
    }

    pub fn held_notes(&self) -> &NoteTracker {
        &self.tracker
    }

    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn capture(&self) -> &C {
        &self.parts().capture
    }

    pub fn output(&self) -> &O {
        &self.parts().output
    }
}

impl<I, O: MidiOutput, C: CaptureEngine, E> Drop for Session<I, O, C, E> {
    fn drop(&mut self) {
        if let Some(mut parts) = self.parts.take() {
            let flush = parts.shut_down(&mut self.tracker);
            debug!(
                ticks = self.ticks,
                released = flush.sent,
                failed = flush.failed,
                "session dropped without close"
            );
        }
    }
}
