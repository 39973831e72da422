//! MIDI message layer for prang.
//!
//! Provides wire-level messages, stuck-note tracking, the input/output
//! collaborator traits driven by the real-time loop, and a lock-free queue
//! for handing messages across threads.
//!
//! Feature gates: `midi-io` (hardware ports via `midir`).

pub mod error;
pub use error::{Error, Result};

pub mod message;
pub use message::{status, MessageKind, MidiMessage};

pub mod io;
pub use io::{MidiInput, MidiOutput};

pub mod note_tracker;
pub use note_tracker::{FlushReport, NoteTracker};

pub mod queue;
pub use queue::{midi_queue, midi_queue_with_capacity, MidiQueueConsumer, MidiQueueProducer};

#[cfg(feature = "midi-io")]
pub mod device;

#[cfg(feature = "midi-io")]
pub use device::{
    list_input_ports, list_output_ports, HardwareInput, HardwareOutput, PortInfo, PortSelector,
};
