//! A scriptable in-memory player.
//!
//! `FakePlayer` makes no sound. Its position only moves when a test tells it
//! to, and it reports end-of-sequence only when [`FakeHandle::finish`] is
//! called. Every call made on it is recorded so ordering can be asserted.
//!
//! Construction still parses the MIDI data with [`Sequence`], so malformed
//! input is rejected the same way the real player rejects it.

use super::{Completion, MidiPlayer, PlayerFactory};
use crate::error::{Error, Result};
use crate::midi::Sequence;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// A call made on a [`FakePlayer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FakeCall {
    SetPosition(f64),
    Prepare,
    Play,
    Stop,
}

#[derive(Debug)]
struct FakeState {
    duration: f64,
    position: f64,
    playing: bool,
    completion: Option<Completion>,
    calls: Vec<FakeCall>,
    dropped: bool,
}

/// Test-side view of a [`FakePlayer`] that outlives the player itself.
#[derive(Debug, Clone)]
pub struct FakeHandle(Rc<RefCell<FakeState>>);

impl FakeHandle {
    /// Simulates the sequence advancing to `seconds`.
    pub fn advance_to(&self, seconds: f64) {
        self.0.borrow_mut().position = seconds;
    }

    /// Simulates reaching the end of the sequence: the player stops at its
    /// duration and fires the pending completion, if any.
    pub fn finish(&self) {
        let completion = {
            let mut state = self.0.borrow_mut();
            state.playing = false;
            state.position = state.duration;
            state.completion.take()
        };
        if let Some(completion) = completion {
            completion.signal();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.0.borrow().playing
    }

    pub fn position(&self) -> f64 {
        self.0.borrow().position
    }

    /// Every call made on the player so far, oldest first.
    pub fn calls(&self) -> Vec<FakeCall> {
        self.0.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.0.borrow_mut().calls.clear();
    }

    /// Whether the owning player has been dropped.
    pub fn is_released(&self) -> bool {
        self.0.borrow().dropped
    }
}

/// The fake player handed out by [`FakePlayerFactory`].
#[derive(Debug)]
pub struct FakePlayer {
    state: Rc<RefCell<FakeState>>,
}

impl FakePlayer {
    pub fn new(duration: f64) -> (Self, FakeHandle) {
        let state = Rc::new(RefCell::new(FakeState {
            duration,
            position: 0.0,
            playing: false,
            completion: None,
            calls: Vec::new(),
            dropped: false,
        }));
        (
            Self {
                state: Rc::clone(&state),
            },
            FakeHandle(state),
        )
    }
}

impl Drop for FakePlayer {
    fn drop(&mut self) {
        self.state.borrow_mut().dropped = true;
    }
}

impl MidiPlayer for FakePlayer {
    fn duration(&self) -> f64 {
        self.state.borrow().duration
    }

    fn current_position(&self) -> f64 {
        self.state.borrow().position
    }

    fn set_current_position(&mut self, seconds: f64) {
        let mut state = self.state.borrow_mut();
        state.position = seconds;
        state.calls.push(FakeCall::SetPosition(seconds));
    }

    fn is_playing(&self) -> bool {
        self.state.borrow().playing
    }

    fn prepare_to_play(&mut self) {
        self.state.borrow_mut().calls.push(FakeCall::Prepare);
    }

    fn play(&mut self, completion: Completion) {
        let mut state = self.state.borrow_mut();
        state.playing = true;
        state.completion = Some(completion);
        state.calls.push(FakeCall::Play);
    }

    fn stop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.playing = false;
        state.completion = None;
        state.calls.push(FakeCall::Stop);
    }
}

/// Factory producing [`FakePlayer`]s and keeping a handle to each.
#[derive(Debug, Default)]
pub struct FakePlayerFactory {
    duration: Option<f64>,
    failure: Option<String>,
    handles: RefCell<Vec<FakeHandle>>,
}

impl FakePlayerFactory {
    /// Players take their duration from the parsed MIDI data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Players report `duration` and MIDI files are not read at all.
    pub fn with_duration(duration: f64) -> Self {
        Self {
            duration: Some(duration),
            ..Self::default()
        }
    }

    /// Every construction fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Handle to the most recently built player.
    pub fn last_handle(&self) -> Option<FakeHandle> {
        self.handles.borrow().last().cloned()
    }

    /// Number of players built so far.
    pub fn built(&self) -> usize {
        self.handles.borrow().len()
    }

    /// The scripted failure, if any. Checked before the MIDI data is read.
    fn scripted_failure(&self) -> Result<()> {
        match &self.failure {
            Some(message) => Err(Error::PlayerConstruction(message.clone())),
            None => Ok(()),
        }
    }

    fn build(&self, duration: f64, soundbank: Option<&Path>) -> Result<Box<dyn MidiPlayer>> {
        if let Some(bank) = soundbank {
            if !bank.is_file() {
                return Err(Error::PlayerConstruction(format!(
                    "soundbank not found: {}",
                    bank.display()
                )));
            }
        }
        let (player, handle) = FakePlayer::new(duration);
        self.handles.borrow_mut().push(handle);
        Ok(Box::new(player))
    }
}

impl PlayerFactory for FakePlayerFactory {
    fn open_file(&self, path: &Path, soundbank: Option<&Path>) -> Result<Box<dyn MidiPlayer>> {
        self.scripted_failure()?;
        let duration = match self.duration {
            Some(d) => d,
            None => Sequence::load(path)?.duration(),
        };
        self.build(duration, soundbank)
    }

    fn open_bytes(&self, data: &[u8], soundbank: Option<&Path>) -> Result<Box<dyn MidiPlayer>> {
        self.scripted_failure()?;
        let duration = match self.duration {
            Some(d) => d,
            None => Sequence::parse(data)?.duration(),
        };
        self.build(duration, soundbank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::PROBE_PAYLOAD;
    use std::sync::mpsc;

    #[test]
    fn test_finish_signals_pending_completion() {
        let (mut player, handle) = FakePlayer::new(4.0);
        let (tx, rx) = mpsc::channel();
        player.play(Completion::new(7, tx));
        assert!(handle.is_playing());

        handle.finish();
        assert!(!player.is_playing());
        assert_eq!(player.current_position(), 4.0);
        assert_eq!(rx.try_recv().unwrap(), 7);
    }

    #[test]
    fn test_stop_drops_completion() {
        let (mut player, handle) = FakePlayer::new(4.0);
        let (tx, rx) = mpsc::channel();
        player.play(Completion::new(1, tx));
        player.stop();
        handle.finish();
        assert!(rx.try_recv().is_err());
        assert_eq!(handle.calls(), vec![FakeCall::Play, FakeCall::Stop]);
    }

    #[test]
    fn test_factory_reads_duration_from_payload() {
        let factory = FakePlayerFactory::new();
        let player = factory.open_bytes(&PROBE_PAYLOAD, None).unwrap();
        assert!((player.duration() - 0.5).abs() < 1e-9);
        assert_eq!(factory.built(), 1);
    }

    #[test]
    fn test_factory_rejects_missing_soundbank() {
        let factory = FakePlayerFactory::with_duration(1.0);
        let result = factory.open_bytes(&PROBE_PAYLOAD, Some(Path::new("/no/such/bank.sf2")));
        assert!(matches!(result, Err(Error::PlayerConstruction(_))));
        assert_eq!(factory.built(), 0);
    }

    #[test]
    fn test_failing_factory_reports_its_message_before_reading() {
        let factory = FakePlayerFactory::failing("not a MIDI file");
        let result = factory.open_file(Path::new("/no/such/song.mid"), None);
        assert!(matches!(result, Err(Error::PlayerConstruction(ref m)) if m == "not a MIDI file"));

        let result = factory.open_bytes(&[0x00, 0x01], None);
        assert!(matches!(result, Err(Error::PlayerConstruction(ref m)) if m == "not a MIDI file"));
        assert_eq!(factory.built(), 0);
    }

    #[test]
    fn test_handle_tracks_release() {
        let factory = FakePlayerFactory::with_duration(1.0);
        let player = factory.open_bytes(&PROBE_PAYLOAD, None).unwrap();
        let handle = factory.last_handle().unwrap();
        assert!(!handle.is_released());
        drop(player);
        assert!(handle.is_released());
    }
}
