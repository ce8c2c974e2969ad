//! Transport control for one open MIDI file.
//!
//! The controller owns the player for the file being previewed and turns user
//! actions (play/pause, restart, seek) into player calls. Display state flows
//! the other way: every change, and a tick every [`TICK_INTERVAL`], produces
//! one [`DisplayUpdate`] that is pushed to every bound [`DisplaySink`]. The
//! compact and full preview surfaces are two sinks fed from the same update.
//!
//! End-of-sequence comes from the player's [`Completion`] signal, drained by
//! [`TransportController::process_completions`]; the tick only refreshes the
//! displayed numbers.

use crate::error::Result;
use crate::player::{Completion, MidiPlayer, PlayerFactory};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often the displayed position is refreshed while a file is open.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Display widths below this use the compact surface.
pub const COMPACT_WIDTH_THRESHOLD: f64 = 600.0;

/// Lifecycle of the transport for one preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// No player. Initial state, and the state after `close`.
    Idle,
    /// Player built, position 0, not sounding yet.
    Ready,
    Playing,
    /// Paused or finished, position held.
    Stopped,
}

/// The two preview layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Small inline layout used in narrow hosts.
    Compact,
    /// Full transport window.
    Full,
}

impl SurfaceKind {
    /// Picks the layout for an available width in pixels.
    pub fn for_width(width: f64) -> Self {
        if width < COMPACT_WIDTH_THRESHOLD {
            SurfaceKind::Compact
        } else {
            SurfaceKind::Full
        }
    }
}

/// Everything a surface needs to redraw the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayUpdate {
    /// File name shown above the controls.
    pub title: String,
    /// Elapsed time, `m:ss`.
    pub elapsed: String,
    /// Total time, `m:ss`.
    pub total: String,
    /// Slider position in `[0, 1]`.
    pub ratio: f64,
    /// Whether the play toggle shows "playing".
    pub playing: bool,
}

/// A renderer bound to the controller.
pub trait DisplaySink {
    fn kind(&self) -> SurfaceKind;
    fn update(&mut self, update: &DisplayUpdate);
    fn set_visible(&mut self, visible: bool);
}

/// Formats seconds as `m:ss`: minutes unpadded, seconds always two digits.
///
/// Fractions are truncated, and negative or NaN input reads as zero.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Last state pushed to one surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceModel {
    pub kind: SurfaceKind,
    pub visible: bool,
    pub title: String,
    pub elapsed: String,
    pub total: String,
    pub ratio: f64,
    pub playing: bool,
}

/// Shared handle to a [`SurfaceModel`]; one clone is bound to the controller,
/// another is read by the renderer.
#[derive(Debug, Clone)]
pub struct SurfaceHandle(Rc<RefCell<SurfaceModel>>);

impl SurfaceHandle {
    pub fn new(kind: SurfaceKind) -> Self {
        Self(Rc::new(RefCell::new(SurfaceModel {
            kind,
            visible: false,
            title: String::new(),
            elapsed: format_time(0.0),
            total: format_time(0.0),
            ratio: 0.0,
            playing: false,
        })))
    }

    /// Copy of the current model.
    pub fn snapshot(&self) -> SurfaceModel {
        self.0.borrow().clone()
    }
}

impl DisplaySink for SurfaceHandle {
    fn kind(&self) -> SurfaceKind {
        self.0.borrow().kind
    }

    fn update(&mut self, update: &DisplayUpdate) {
        let mut model = self.0.borrow_mut();
        model.title.clone_from(&update.title);
        model.elapsed.clone_from(&update.elapsed);
        model.total.clone_from(&update.total);
        model.ratio = update.ratio;
        model.playing = update.playing;
    }

    fn set_visible(&mut self, visible: bool) {
        self.0.borrow_mut().visible = visible;
    }
}

/// Fixed-period schedule for the display tick.
#[derive(Debug, Clone, Copy)]
struct TickSchedule {
    interval: Duration,
    next_due: Instant,
}

impl TickSchedule {
    fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now + interval,
        }
    }

    /// True once per elapsed period. Missed periods are skipped, not replayed.
    fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        if self.next_due <= now {
            self.next_due = now + self.interval;
        }
        true
    }
}

/// Play/pause/seek controller for a single previewed file.
pub struct TransportController {
    player: Option<Box<dyn MidiPlayer>>,
    state: TransportState,
    title: String,
    duration: f64,
    position: f64,
    /// Incremented on every play and stop; completions carry the value of
    /// the play call they belong to.
    generation: u64,
    completion_tx: Sender<u64>,
    completion_rx: Receiver<u64>,
    schedule: Option<TickSchedule>,
    sinks: Vec<Box<dyn DisplaySink>>,
    shown: Option<SurfaceKind>,
}

impl Default for TransportController {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportController {
    pub fn new() -> Self {
        let (completion_tx, completion_rx) = mpsc::channel();
        Self {
            player: None,
            state: TransportState::Idle,
            title: String::new(),
            duration: 0.0,
            position: 0.0,
            generation: 0,
            completion_tx,
            completion_rx,
            schedule: None,
            sinks: Vec::new(),
            shown: None,
        }
    }

    /// Binds a surface; it receives every update from now on.
    pub fn bind(&mut self, sink: Box<dyn DisplaySink>) {
        self.sinks.push(sink);
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.player.is_some()
    }

    /// Duration of the open file in seconds (0 when idle).
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Position as of the last tick, seek or restart.
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// The surface chosen by the last `appear`/`relayout`, if any.
    pub fn shown_surface(&self) -> Option<SurfaceKind> {
        self.shown
    }

    /// Builds a player for `file` and moves to `Ready`.
    ///
    /// # Arguments
    ///
    /// * `factory` - Player constructor
    /// * `file` - MIDI file to open
    /// * `soundbank` - Soundbank override; `None` uses the default
    ///
    /// # Errors
    ///
    /// Returns `PlayerConstruction` if the file or soundbank cannot be loaded.
    /// Nothing is retained on failure.
    pub fn open(
        &mut self,
        factory: &dyn PlayerFactory,
        file: &Path,
        soundbank: Option<&Path>,
    ) -> Result<()> {
        if self.player.is_some() {
            warn!("open called with a file already open; closing it first");
            self.close();
        }

        let mut player = factory.open_file(file, soundbank)?;
        player.prepare_to_play();

        self.duration = player.duration();
        self.position = 0.0;
        self.title = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        self.player = Some(player);
        self.state = TransportState::Ready;
        self.schedule = Some(TickSchedule::new(TICK_INTERVAL, Instant::now()));

        info!(
            file = %file.display(),
            soundbank = ?soundbank,
            duration = self.duration,
            "transport opened"
        );
        self.push_update();
        Ok(())
    }

    /// Starts sounding if stopped, stops if sounding.
    ///
    /// Starting from the end of the sequence rewinds to the beginning first.
    pub fn play_pause(&mut self) {
        let Some(player) = self.player.as_mut() else {
            return;
        };

        if player.is_playing() {
            self.halt();
            self.state = TransportState::Stopped;
            debug!(position = self.position, "transport paused");
        } else {
            if player.current_position() >= self.duration {
                player.set_current_position(0.0);
                player.prepare_to_play();
                self.position = 0.0;
            }
            self.start();
            debug!(position = self.position, "transport playing");
        }
        self.push_update();
    }

    /// Plays from the beginning regardless of the current state.
    pub fn restart(&mut self) {
        let Some(sounding) = self.player.as_ref().map(|p| p.is_playing()) else {
            return;
        };

        if sounding {
            self.halt();
        }
        if let Some(player) = self.player.as_mut() {
            player.set_current_position(0.0);
            player.prepare_to_play();
        }
        self.position = 0.0;
        self.start();
        debug!("transport restarted");
        self.push_update();
    }

    /// Moves to `position` (clamped to `[0, duration]`) and plays from there.
    ///
    /// The player is stopped before it is relocated and started again after.
    pub fn seek(&mut self, position: f64) {
        if self.player.is_none() {
            return;
        }

        let target = if position.is_nan() {
            0.0
        } else {
            position.clamp(0.0, self.duration)
        };

        self.halt();
        if let Some(player) = self.player.as_mut() {
            player.set_current_position(target);
            player.prepare_to_play();
        }
        self.position = target;
        self.start();
        debug!(position = target, "transport seeked");
        self.push_update();
    }

    /// Seeks by `delta` seconds from the current position.
    pub fn seek_by(&mut self, delta: f64) {
        let from = self
            .player
            .as_ref()
            .map_or(self.position, |p| p.current_position());
        self.seek(from + delta);
    }

    /// Seeks to a slider ratio in `[0, 1]`.
    pub fn seek_to_ratio(&mut self, ratio: f64) {
        self.seek(ratio.clamp(0.0, 1.0) * self.duration);
    }

    /// Reads the player position and refreshes every surface.
    pub fn tick(&mut self) {
        let Some(player) = self.player.as_ref() else {
            return;
        };

        let position = player.current_position();
        if position <= self.duration {
            self.position = position.max(0.0);
            self.push_update();
        }
    }

    /// Runs `tick` if a tick period has elapsed at `now`.
    ///
    /// # Returns
    ///
    /// Whether a tick ran.
    pub fn tick_if_due(&mut self, now: Instant) -> bool {
        let due = self.schedule.as_mut().is_some_and(|s| s.poll(now));
        if due {
            self.tick();
        }
        due
    }

    /// Applies end-of-sequence signals from the player.
    ///
    /// Signals from a play call that has since been superseded are ignored.
    pub fn process_completions(&mut self) {
        let mut finished = false;
        while let Ok(generation) = self.completion_rx.try_recv() {
            if generation == self.generation && self.state == TransportState::Playing {
                finished = true;
            }
        }

        if finished {
            if let Some(player) = self.player.as_ref() {
                self.position = player.current_position().clamp(0.0, self.duration);
            }
            self.state = TransportState::Stopped;
            debug!("transport reached end of sequence");
            self.push_update();
        }
    }

    /// Shows the transport in a host `width` pixels wide and starts playback.
    ///
    /// # Returns
    ///
    /// The surface that was made visible.
    pub fn appear(&mut self, width: f64) -> SurfaceKind {
        let kind = SurfaceKind::for_width(width);
        self.show(kind);

        let sounding = self.player.as_ref().map(|p| p.is_playing());
        if sounding == Some(false) {
            self.start();
        }
        debug!(surface = ?kind, width, "transport visible");
        self.push_update();
        kind
    }

    /// Re-picks the surface after the host was resized. Playback is untouched.
    pub fn relayout(&mut self, width: f64) -> SurfaceKind {
        let kind = SurfaceKind::for_width(width);
        if self.shown.is_some() && self.shown != Some(kind) {
            self.show(kind);
            self.push_update();
        }
        kind
    }

    /// Stops playback, releases the player and cancels the tick.
    ///
    /// Every other operation is a no-op afterwards.
    pub fn close(&mut self) {
        let Some(mut player) = self.player.take() else {
            return;
        };

        if player.is_playing() {
            player.stop();
        }
        drop(player);

        self.schedule = None;
        self.generation += 1;
        self.state = TransportState::Idle;
        while self.completion_rx.try_recv().is_ok() {}
        info!(file = %self.title, "transport closed");
    }

    fn show(&mut self, kind: SurfaceKind) {
        self.shown = Some(kind);
        for sink in &mut self.sinks {
            let visible = sink.kind() == kind;
            sink.set_visible(visible);
        }
    }

    /// Starts the player with a fresh completion.
    fn start(&mut self) {
        self.generation += 1;
        let completion = Completion::new(self.generation, self.completion_tx.clone());
        if let Some(player) = self.player.as_mut() {
            player.play(completion);
            self.state = TransportState::Playing;
        }
    }

    /// Stops the player, invalidating its pending completion.
    fn halt(&mut self) {
        self.generation += 1;
        if let Some(player) = self.player.as_mut() {
            player.stop();
        }
    }

    fn display_update(&self) -> DisplayUpdate {
        let ratio = if self.duration > 0.0 {
            (self.position / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        DisplayUpdate {
            title: self.title.clone(),
            elapsed: format_time(self.position),
            total: format_time(self.duration),
            ratio,
            playing: self.state == TransportState::Playing,
        }
    }

    fn push_update(&mut self) {
        let update = self.display_update();
        for sink in &mut self.sinks {
            sink.update(&update);
        }
    }
}

impl Drop for TransportController {
    fn drop(&mut self) {
        self.close();
    }
}
