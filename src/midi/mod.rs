//! MIDI file handling.
//!
//! Parsing of Standard MIDI Files into timed channel events, plus a small SMF
//! writer used to build the soundbank self-test payload and test fixtures.

mod sequence;
pub mod smf;

pub use sequence::{ChannelEvent, Sequence, SequenceError, DEFAULT_TEMPO_US};
pub use smf::PROBE_PAYLOAD;
