//! The MIDI player seam.
//!
//! A player is an opaque capability bound to one MIDI sequence and one
//! soundbank: it knows its duration, reports and accepts a position, and plays
//! or stops. End-of-sequence is reported through a [`Completion`] handed to
//! [`MidiPlayer::play`].
//!
//! The production implementation lives in [`crate::audio`]; [`fake`] provides a
//! scriptable one for tests.

pub mod fake;

use crate::error::Result;
use std::path::Path;
use std::sync::mpsc::Sender;

/// One-shot end-of-sequence signal for a single `play` call.
///
/// Each call to `play` gets a fresh completion tagged with a generation
/// number, so a receiver can tell a finished run from one that was superseded
/// by a later seek or restart. Dropping it without signalling is how a player
/// reports "stopped, not finished".
#[derive(Debug)]
pub struct Completion {
    generation: u64,
    tx: Sender<u64>,
}

impl Completion {
    pub fn new(generation: u64, tx: Sender<u64>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the `play` call this completion belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Reports that playback reached the end of the sequence.
    pub fn signal(self) {
        // The receiving controller may already be gone
        let _ = self.tx.send(self.generation);
    }
}

/// A loaded, playable MIDI sequence.
pub trait MidiPlayer {
    /// Length of the sequence in seconds. Fixed for the life of the player.
    fn duration(&self) -> f64;

    /// Current playback position in seconds.
    fn current_position(&self) -> f64;

    /// Moves the playback position. Callers stop the player first.
    fn set_current_position(&mut self, seconds: f64);

    /// Whether the player is currently sounding.
    fn is_playing(&self) -> bool;

    /// Readies the player to start quickly from the current position.
    fn prepare_to_play(&mut self);

    /// Starts sounding from the current position.
    fn play(&mut self, completion: Completion);

    /// Stops sounding, keeping the position. The pending completion is dropped.
    fn stop(&mut self);
}

/// Builds players from MIDI files or in-memory SMF data.
pub trait PlayerFactory {
    /// Builds a player for a MIDI file. `soundbank` of `None` selects the
    /// default soundbank.
    fn open_file(&self, path: &Path, soundbank: Option<&Path>) -> Result<Box<dyn MidiPlayer>>;

    /// Builds a player for SMF bytes held in memory.
    fn open_bytes(&self, data: &[u8], soundbank: Option<&Path>) -> Result<Box<dyn MidiPlayer>>;

    /// Checks that a player could be built for `data` and `soundbank`, without
    /// keeping it.
    fn probe(&self, data: &[u8], soundbank: Option<&Path>) -> Result<()> {
        self.open_bytes(data, soundbank).map(drop)
    }
}
