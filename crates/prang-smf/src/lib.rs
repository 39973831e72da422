//! Standard MIDI File metadata scanning for prang.
//!
//! Extracts format, track count and a single-or-varying tempo from SMF
//! files without loading them whole. The scanner runs over any
//! `Read + Seek` source; [`SmfSource`] picks an in-memory buffer when the
//! allocation succeeds and streams from storage otherwise.
//!
//! # Example
//!
//! ```ignore
//! use prang_smf::{scan_path, Tempo};
//!
//! let meta = scan_path("song.mid")?;
//! match meta.tempo() {
//!     Tempo::Fixed(_) => println!("{} tracks at {} bpm", meta.track_count, meta.tempo()),
//!     Tempo::Varies => println!("{} tracks, tempo varies", meta.track_count),
//! }
//! ```

pub mod error;
pub use error::{DecodeError, Result, ScanError};

pub mod metadata;
pub use metadata::{
    micro_tempo_to_bpm, Division, FileMetadata, SmfFormat, Tempo, DEFAULT_MICRO_TEMPO,
    TEMPO_VARIES,
};

pub mod stream;
pub use stream::SmfSource;

pub mod chunk;
pub use chunk::{SmfHeader, SmfLayout, TrackChunk};

pub mod decoder;
pub use decoder::{decode_event, DecodedEvent, EventDecoder, TrackEvent};

pub(crate) mod scanner;
pub use scanner::{scan, TrackCursor};

pub mod catalog;
pub use catalog::{is_midi_file_name, scan_path, Catalog, CatalogEntry, SkippedFile};
