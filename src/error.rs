//! Centralized error type for the prang umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use crate::settings::SettingsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MIDI: {0}")]
    Midi(#[from] prang_midi::Error),

    #[error("Scan: {0}")]
    Scan(#[from] prang_smf::ScanError),

    #[error("Settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
