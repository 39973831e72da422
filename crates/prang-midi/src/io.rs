//! Collaborator contracts for the real-time loop.
//!
//! Both traits are polled from a single control thread. Implementations must
//! not block: `poll` returns immediately when nothing is pending and `send`
//! attempts delivery right away.

use crate::error::Result;
use crate::message::MidiMessage;

/// Non-blocking source of decoded inbound messages.
pub trait MidiInput {
    /// Next pending message, if any.
    fn poll(&mut self) -> Option<MidiMessage>;
}

/// Sink for outbound messages.
pub trait MidiOutput {
    fn send(&mut self, message: &MidiMessage) -> Result<()>;
}

impl<T: MidiInput + ?Sized> MidiInput for &mut T {
    fn poll(&mut self) -> Option<MidiMessage> {
        (**self).poll()
    }
}

impl<T: MidiOutput + ?Sized> MidiOutput for &mut T {
    fn send(&mut self, message: &MidiMessage) -> Result<()> {
        (**self).send(message)
    }
}

impl<T: MidiInput + ?Sized> MidiInput for Box<T> {
    fn poll(&mut self) -> Option<MidiMessage> {
        (**self).poll()
    }
}

impl<T: MidiOutput + ?Sized> MidiOutput for Box<T> {
    fn send(&mut self, message: &MidiMessage) -> Result<()> {
        (**self).send(message)
    }
}

/// Records everything sent to it. Useful as a null device and in tests.
impl MidiOutput for Vec<MidiMessage> {
    fn send(&mut self, message: &MidiMessage) -> Result<()> {
        self.push(message.clone());
        Ok(())
    }
}
