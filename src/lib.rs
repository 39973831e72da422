//! # prang - MIDI performance core
//!
//! Control-loop core for a standalone MIDI looper/sampler.
//!
//! ## Architecture
//!
//! prang is an umbrella crate that coordinates:
//! - **prang-smf** - Standard MIDI File metadata scanning (format, tracks, tempo)
//! - **prang-midi** - Wire messages, stuck-note tracking, I/O traits, lock-free queue
//! - **prang** - Event router, playback rate, settings, and the per-performance [`Session`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use prang::prelude::*;
//!
//! let catalog = Catalog::scan_dir("/songs")?;
//! let settings = Settings::load("/prang.csv")?.unwrap_or_default();
//!
//! let (producer, consumer) = midi_queue();
//! let mut session = SessionBuilder::new()
//!     .settings(&settings)
//!     .build(consumer, usb_out, looper, encoder)?;
//!
//! loop {
//!     let report = session.tick(Instant::now());
//!     // redraw whatever the report says changed
//! }
//!
//! let parts = session.close();
//! ```
//!
//! ## Feature Flags
//!
//! - `midi-io` - Hardware MIDI ports via `midir`

pub use prang_midi as midi;
pub use prang_smf as smf;

pub use prang_midi::{
    midi_queue, midi_queue_with_capacity, FlushReport, MessageKind, MidiInput, MidiMessage,
    MidiOutput, MidiQueueConsumer, MidiQueueProducer, NoteTracker,
};
pub use prang_smf::{scan, scan_path, Catalog, CatalogEntry, FileMetadata, SmfSource, Tempo};

#[cfg(feature = "midi-io")]
pub use prang_midi::{HardwareInput, HardwareOutput, PortSelector};

pub mod error;
pub use error::{Error, Result};

pub mod settings;
pub use settings::{Settings, SettingsError};

pub mod capture;
pub use capture::{CaptureEngine, CaptureTiming, Encoder};

pub mod rate;
pub use rate::{Direction, EncoderTracker, PlaybackRate};

pub mod router;
pub use router::{Feedback, Routed, RouterState, TickReport};

mod builder;
pub use builder::SessionBuilder;

mod session;
pub use session::{Session, SessionParts};

/// Convenient imports for driving a session.
pub mod prelude {
    pub use crate::{
        midi_queue, CaptureEngine, CaptureTiming, Catalog, Encoder, MidiInput, MidiMessage,
        MidiOutput, PlaybackRate, Routed, Session, SessionBuilder, Settings, TickReport,
    };
    pub use std::time::Instant;
}
