//! Stuck-note tracking.
//!
//! Keeps one bit per (channel, note) for every note-on that has not yet been
//! matched by a note-off, so a session can silence whatever is still sounding
//! when it is torn down.

use crate::io::MidiOutput;
use crate::message::{MessageKind, MidiMessage};
use tracing::{trace, warn};

const CHANNELS: usize = 16;
const WORDS_PER_CHANNEL: usize = 4;

/// Outcome of [`NoteTracker::send_off`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Note-offs accepted by the output.
    pub sent: usize,
    /// Note-offs the output rejected. Their bits are cleared anyway.
    pub failed: usize,
}

impl FlushReport {
    #[inline]
    pub fn total(&self) -> usize {
        self.sent + self.failed
    }
}

/// 16 channels × 128 notes activity bitmask.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteTracker {
    notes: [[u32; WORDS_PER_CHANNEL]; CHANNELS],
}

impl NoteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn locate(note: u8) -> (usize, u32) {
        let note = (note & 0x7F) as usize;
        (note / 32, 1u32 << (note % 32))
    }

    /// Update activity from one observed message. Non-note messages are ignored.
    pub fn process(&mut self, message: &MidiMessage) {
        let kind = message.kind();
        if !kind.is_note() {
            return;
        }
        let Some(channel) = message.channel() else {
            return;
        };
        let (word, bit) = Self::locate(message.data1());
        let bank = &mut self.notes[channel as usize][word];

        if kind == MessageKind::NoteOff || message.data2() == 0 {
            *bank &= !bit;
        } else {
            *bank |= bit;
        }
    }

    pub fn is_active(&self, channel: u8, note: u8) -> bool {
        let (word, bit) = Self::locate(note);
        self.notes[(channel & 0x0F) as usize][word] & bit != 0
    }

    pub fn active_count(&self) -> usize {
        self.notes
            .iter()
            .flatten()
            .map(|w| w.count_ones() as usize)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.iter().flatten().all(|w| *w == 0)
    }

    /// Send a note-off for every active note, then clear all state.
    ///
    /// Order is channel ascending, then note ascending. Send failures are
    /// counted and logged but never stop the flush, and the mask is cleared
    /// regardless.
    pub fn send_off<O: MidiOutput + ?Sized>(&mut self, output: &mut O) -> FlushReport {
        let notes = std::mem::take(&mut self.notes);
        let mut report = FlushReport::default();

        for (channel, banks) in notes.iter().enumerate() {
            for (word, bank) in banks.iter().enumerate() {
                let mut bits = *bank;
                while bits != 0 {
                    let offset = bits.trailing_zeros();
                    bits &= bits - 1;
                    let note = (word as u32 * 32 + offset) as u8;
                    let off = MidiMessage::note_off(channel as u8, note, 0);
                    match output.send(&off) {
                        Ok(()) => report.sent += 1,
                        Err(e) => {
                            warn!(channel, note, error = %e, "note-off flush send failed");
                            report.failed += 1;
                        }
                    }
                }
            }
        }

        if report.total() > 0 {
            trace!(sent = report.sent, failed = report.failed, "flushed held notes");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};

    struct FailingOutput {
        attempts: usize,
    }

    impl MidiOutput for FailingOutput {
        fn send(&mut self, _message: &MidiMessage) -> Result<()> {
            self.attempts += 1;
            Err(Error::Send("unplugged".into()))
        }
    }

    #[test]
    fn test_note_on_sets_and_note_off_clears() {
        let mut tracker = NoteTracker::new();
        tracker.process(&MidiMessage::note_on(2, 64, 90));
        assert!(tracker.is_active(2, 64));
        assert_eq!(tracker.active_count(), 1);

        tracker.process(&MidiMessage::note_off(2, 64, 40));
        assert!(!tracker.is_active(2, 64));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_zero_velocity_note_on_clears() {
        let mut tracker = NoteTracker::new();
        tracker.process(&MidiMessage::note_on(0, 127, 1));
        tracker.process(&MidiMessage::note_on(0, 127, 0));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_other_messages_ignored() {
        let mut tracker = NoteTracker::new();
        tracker.process(&MidiMessage::control_change(0, 64, 127));
        tracker.process(&MidiMessage::from_bytes(&[0xA0, 60, 50]).unwrap());
        tracker.process(&MidiMessage::program_change(0, 3));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_send_off_order_and_clear() {
        let mut tracker = NoteTracker::new();
        tracker.process(&MidiMessage::note_on(9, 36, 100));
        tracker.process(&MidiMessage::note_on(0, 100, 100));
        tracker.process(&MidiMessage::note_on(0, 3, 100));
        tracker.process(&MidiMessage::note_on(0, 33, 100));
        tracker.process(&MidiMessage::note_on(15, 0, 100));

        let mut out: Vec<MidiMessage> = Vec::new();
        let report = tracker.send_off(&mut out);
        assert_eq!(report, FlushReport { sent: 5, failed: 0 });

        let pairs: Vec<(u8, u8)> = out
            .iter()
            .map(|m| (m.channel().unwrap(), m.note().unwrap()))
            .collect();
        assert_eq!(pairs, vec![(0, 3), (0, 33), (0, 100), (9, 36), (15, 0)]);
        assert!(out.iter().all(|m| m.kind() == MessageKind::NoteOff));
        assert!(out.iter().all(|m| m.velocity() == Some(0)));

        let mut again: Vec<MidiMessage> = Vec::new();
        assert_eq!(tracker.send_off(&mut again).total(), 0);
        assert!(again.is_empty());
    }

    #[test]
    fn test_send_off_clears_even_when_output_fails() {
        let mut tracker = NoteTracker::new();
        tracker.process(&MidiMessage::note_on(1, 60, 100));
        tracker.process(&MidiMessage::note_on(1, 61, 100));

        let mut output = FailingOutput { attempts: 0 };
        let report = tracker.send_off(&mut output);
        assert_eq!(output.attempts, 2);
        assert_eq!(report.failed, 2);
        assert!(tracker.is_empty());
    }
}
