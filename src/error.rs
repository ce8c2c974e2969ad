//! Error types shared across the crate.

use std::path::PathBuf;
use thiserror::Error;

use crate::midi::SequenceError;

/// Errors surfaced by the preference store, the player seam and the panels.
#[derive(Debug, Error)]
pub enum Error {
    /// The chosen soundbank is missing or does not have an `sf2`/`dls` extension.
    #[error("invalid soundbank file: {}", .0.display())]
    InvalidSoundbankFile(PathBuf),

    /// The player could not be built from the MIDI data and soundbank.
    #[error("{0}")]
    PlayerConstruction(String),

    /// The preference file could not be read or written.
    #[error("preferences I/O error: {0}")]
    PreferencesIo(#[from] std::io::Error),

    /// The preference file holds something other than a JSON object.
    #[error("preferences format error: {0}")]
    PreferencesFormat(#[from] serde_json::Error),
}

impl From<SequenceError> for Error {
    fn from(e: SequenceError) -> Self {
        Error::PlayerConstruction(e.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
