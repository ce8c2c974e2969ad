//! midipeek - A terminal MIDI previewer.
//!
//! This library provides the transport controller, the soundbank preference
//! and its panel, and the SoundFont-backed player used by the `midipeek`
//! binary.

pub mod app;
pub mod audio;
pub mod config;
pub mod error;
pub mod midi;
pub mod player;
pub mod preferences;
pub mod settings;
pub mod transport;
pub mod ui;

// Re-export commonly used types
pub use app::App;
pub use audio::{SynthPlayer, SynthPlayerFactory};
pub use error::{Error, Result};
pub use midi::{Sequence, PROBE_PAYLOAD};
pub use player::{MidiPlayer, PlayerFactory};
pub use settings::SoundbankSettings;
pub use transport::{SurfaceKind, TransportController, TransportState};
