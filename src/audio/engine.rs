//! SoundFont-backed MIDI player.
//!
//! Sequences parsed by [`crate::midi::Sequence`] are fed to a rustysynth
//! synthesizer from rodio's audio thread. The event cursor advances one render
//! block at a time, so event timing is accurate to `BUFFER_SIZE` samples.

use super::soundbank::{load_soundfont, resolve_soundbank};
use crate::error::{Error, Result};
use crate::midi::Sequence;
use crate::player::{Completion, MidiPlayer, PlayerFactory};
use rodio::{OutputStream, OutputStreamHandle, Source};
use rustysynth::{SoundFont, Synthesizer, SynthesizerSettings};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// Sample rate for audio synthesis (44.1 kHz standard).
pub const SAMPLE_RATE: u32 = 44100;

/// Audio buffer size for low-latency playback.
/// Smaller = lower latency but higher CPU usage.
const BUFFER_SIZE: usize = 256;

/// Synthesizer plus sequencing state, shared with the audio thread.
struct PlaybackCore {
    synth: Synthesizer,
    sequence: Arc<Sequence>,
    /// Index of the next event to dispatch.
    cursor: usize,
    /// Position in seconds.
    position: f64,
    playing: bool,
    completion: Option<Completion>,
}

impl PlaybackCore {
    fn new(soundfont: &Arc<SoundFont>, sequence: Sequence) -> Result<Self> {
        let settings = SynthesizerSettings::new(SAMPLE_RATE as i32);
        let synth = Synthesizer::new(soundfont, &settings)
            .map_err(|e| Error::PlayerConstruction(format!("failed to create synthesizer: {:?}", e)))?;

        Ok(Self {
            synth,
            sequence: Arc::new(sequence),
            cursor: 0,
            position: 0.0,
            playing: false,
            completion: None,
        })
    }

    /// Renders one block, dispatching every event due before the block ends.
    fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        if self.playing {
            let block_end = self.position + left.len() as f64 / SAMPLE_RATE as f64;
            let events = self.sequence.events();

            while self.cursor < events.len() && events[self.cursor].time < block_end {
                let e = events[self.cursor];
                self.synth.process_midi_message(
                    e.channel as i32,
                    e.command as i32,
                    e.data1 as i32,
                    e.data2 as i32,
                );
                self.cursor += 1;
            }
            self.position = block_end;

            let duration = self.sequence.duration();
            if self.cursor >= events.len() && self.position >= duration {
                self.position = duration;
                self.playing = false;
                if let Some(completion) = self.completion.take() {
                    completion.signal();
                }
            }
        }

        // Always render so released notes can ring out after a stop
        self.synth.render(left, right);
    }

    /// Moves to `seconds`, silencing everything and replaying the controller
    /// and program state that precedes the new position.
    fn relocate(&mut self, seconds: f64) {
        self.synth.note_off_all(true);
        self.synth.reset();

        let target = self.sequence.first_index_at(seconds);
        for e in self.sequence.events()[..target].iter().filter(|e| !e.is_note()) {
            self.synth.process_midi_message(
                e.channel as i32,
                e.command as i32,
                e.data1 as i32,
                e.data2 as i32,
            );
        }
        self.cursor = target;
        self.position = seconds;
    }
}

/// Audio source that pulls stereo samples from the playback core.
/// Implements rodio's Source trait for playback.
struct SynthSource {
    core: Arc<Mutex<PlaybackCore>>,
    left_buf: Vec<f32>,
    right_buf: Vec<f32>,
    buf_pos: usize,
    /// Current channel (0 = left, 1 = right).
    channel: usize,
}

impl SynthSource {
    fn new(core: Arc<Mutex<PlaybackCore>>) -> Self {
        Self {
            core,
            left_buf: vec![0.0; BUFFER_SIZE],
            right_buf: vec![0.0; BUFFER_SIZE],
            buf_pos: BUFFER_SIZE, // Start at end to trigger first render
            channel: 0,
        }
    }
}

impl Iterator for SynthSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.buf_pos >= BUFFER_SIZE {
            if let Ok(mut core) = self.core.lock() {
                core.render(&mut self.left_buf, &mut self.right_buf);
            } else {
                self.left_buf.fill(0.0);
                self.right_buf.fill(0.0);
            }
            self.buf_pos = 0;
        }

        // Interleave stereo samples: L, R, L, R, ...
        let sample = if self.channel == 0 {
            self.left_buf[self.buf_pos]
        } else {
            self.right_buf[self.buf_pos]
        };

        self.channel = 1 - self.channel;
        if self.channel == 0 {
            self.buf_pos += 1;
        }

        Some(sample)
    }
}

impl Source for SynthSource {
    fn current_frame_len(&self) -> Option<usize> {
        None // Continuous stream
    }

    fn channels(&self) -> u16 {
        2 // Stereo
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None // Infinite stream
    }
}

/// A [`MidiPlayer`] that synthesizes through a SoundFont and plays on the
/// default audio output device.
pub struct SynthPlayer {
    core: Arc<Mutex<PlaybackCore>>,
    duration: f64,
    /// Audio output stream (must be kept alive).
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
}

impl SynthPlayer {
    fn new(core: PlaybackCore) -> Result<Self> {
        let duration = core.sequence.duration();
        let core = Arc::new(Mutex::new(core));

        let (stream, stream_handle) = OutputStream::try_default().map_err(|e| {
            Error::PlayerConstruction(format!("failed to open audio output: {}", e))
        })?;
        stream_handle
            .play_raw(SynthSource::new(Arc::clone(&core)))
            .map_err(|e| {
                Error::PlayerConstruction(format!("failed to start audio playback: {}", e))
            })?;

        Ok(Self {
            core,
            duration,
            _stream: stream,
            _stream_handle: stream_handle,
        })
    }
}

impl MidiPlayer for SynthPlayer {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn current_position(&self) -> f64 {
        self.core.lock().map_or(0.0, |core| core.position)
    }

    fn set_current_position(&mut self, seconds: f64) {
        if let Ok(mut core) = self.core.lock() {
            core.relocate(seconds);
        }
    }

    fn is_playing(&self) -> bool {
        self.core.lock().is_ok_and(|core| core.playing)
    }

    fn prepare_to_play(&mut self) {
        if let Ok(mut core) = self.core.lock() {
            let position = core.position;
            core.cursor = core.sequence.first_index_at(position);
        }
    }

    fn play(&mut self, completion: Completion) {
        if let Ok(mut core) = self.core.lock() {
            core.completion = Some(completion);
            core.playing = true;
        }
    }

    fn stop(&mut self) {
        if let Ok(mut core) = self.core.lock() {
            core.playing = false;
            core.completion = None;
            core.synth.note_off_all(false);
        }
    }
}

/// Builds [`SynthPlayer`]s, remembering the last soundbank it loaded.
pub struct SynthPlayerFactory {
    default_soundbanks: Vec<PathBuf>,
    cache: RefCell<Option<(PathBuf, Arc<SoundFont>)>>,
}

impl SynthPlayerFactory {
    /// # Arguments
    ///
    /// * `default_soundbanks` - Candidates tried in order when no soundbank is chosen
    pub fn new(default_soundbanks: Vec<PathBuf>) -> Self {
        Self {
            default_soundbanks,
            cache: RefCell::new(None),
        }
    }

    fn soundfont(&self, soundbank: Option<&Path>) -> Result<Arc<SoundFont>> {
        let path = resolve_soundbank(soundbank, &self.default_soundbanks)?;

        if let Some((cached_path, soundfont)) = self.cache.borrow().as_ref() {
            if *cached_path == path {
                return Ok(Arc::clone(soundfont));
            }
        }

        let soundfont = load_soundfont(&path)?;
        *self.cache.borrow_mut() = Some((path, Arc::clone(&soundfont)));
        Ok(soundfont)
    }

    fn core(&self, sequence: Sequence, soundbank: Option<&Path>) -> Result<PlaybackCore> {
        let soundfont = self.soundfont(soundbank)?;
        PlaybackCore::new(&soundfont, sequence)
    }
}

impl PlayerFactory for SynthPlayerFactory {
    fn open_file(&self, path: &Path, soundbank: Option<&Path>) -> Result<Box<dyn MidiPlayer>> {
        let sequence = Sequence::load(path)?;
        info!(
            path = %path.display(),
            events = sequence.events().len(),
            duration = sequence.duration(),
            "MIDI file loaded"
        );
        let core = self.core(sequence, soundbank)?;
        Ok(Box::new(SynthPlayer::new(core)?))
    }

    fn open_bytes(&self, data: &[u8], soundbank: Option<&Path>) -> Result<Box<dyn MidiPlayer>> {
        let core = self.core(Sequence::parse(data)?, soundbank)?;
        Ok(Box::new(SynthPlayer::new(core)?))
    }

    /// Builds the synthesizer without opening an audio device.
    fn probe(&self, data: &[u8], soundbank: Option<&Path>) -> Result<()> {
        let core = self.core(Sequence::parse(data)?, soundbank)?;
        debug!(events = core.sequence.events().len(), "probe player built");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::PROBE_PAYLOAD;
    use std::sync::mpsc;

    /// Path to a real SoundFont, for the ignored tests below.
    fn test_soundbank() -> Option<PathBuf> {
        std::env::var_os("MIDIPEEK_TEST_SOUNDBANK").map(PathBuf::from)
    }

    #[test]
    fn test_probe_rejects_truncated_payload_before_loading_soundbank() {
        let factory = SynthPlayerFactory::new(Vec::new());
        let err = factory.probe(&PROBE_PAYLOAD[..20], None).unwrap_err();
        assert!(matches!(err, Error::PlayerConstruction(_)));
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn test_probe_without_any_soundbank_fails() {
        let factory = SynthPlayerFactory::new(vec![PathBuf::from("/no/such/default.sf2")]);
        let err = factory.probe(&PROBE_PAYLOAD, None).unwrap_err();
        // The payload itself parsed; only the soundbank lookup failed
        assert!(matches!(err, Error::PlayerConstruction(_)));
        assert!(err.to_string().contains("no default soundbank"), "{}", err);
    }

    #[test]
    fn test_probe_with_missing_explicit_soundbank_names_it() {
        let factory = SynthPlayerFactory::new(Vec::new());
        let err = factory
            .probe(&PROBE_PAYLOAD, Some(Path::new("/no/such/bank.sf2")))
            .unwrap_err();
        assert!(err.to_string().contains("failed to open soundbank"), "{}", err);
    }

    #[test]
    #[ignore] // Requires SoundFont file
    fn test_probe_accepts_payload_with_real_soundbank() {
        let bank = test_soundbank().unwrap();
        let factory = SynthPlayerFactory::new(Vec::new());
        factory.probe(&PROBE_PAYLOAD, Some(&bank)).unwrap();

        let mut corrupted = PROBE_PAYLOAD.to_vec();
        corrupted.truncate(25);
        assert!(factory.probe(&corrupted, Some(&bank)).is_err());
    }

    #[test]
    #[ignore] // Requires SoundFont file
    fn test_core_renders_to_completion() {
        let bank = test_soundbank().unwrap();
        let soundfont = load_soundfont(&bank).unwrap();
        let mut core = PlaybackCore::new(&soundfont, Sequence::parse(&PROBE_PAYLOAD).unwrap()).unwrap();

        let (tx, rx) = mpsc::channel();
        core.completion = Some(Completion::new(3, tx));
        core.playing = true;

        let mut left = vec![0.0; BUFFER_SIZE];
        let mut right = vec![0.0; BUFFER_SIZE];
        // Half a second of audio plus one block
        for _ in 0..(SAMPLE_RATE as usize / 2 / BUFFER_SIZE + 2) {
            core.render(&mut left, &mut right);
        }

        assert!(!core.playing);
        assert_eq!(core.position, 0.5);
        assert_eq!(rx.try_recv().unwrap(), 3);
    }
}
