//! Audio back end for MIDI playback.
//!
//! This module provides the production [`crate::player::MidiPlayer`], using
//! rustysynth for synthesis and rodio for audio output. It covers:
//! - Locating and loading SoundFont soundbanks
//! - Sequencing parsed MIDI events into the synthesizer
//! - Building players for files and for in-memory SMF data

pub mod engine;
pub mod soundbank;

pub use engine::{SynthPlayer, SynthPlayerFactory, SAMPLE_RATE};
