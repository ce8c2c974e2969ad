//! Application state and input handling.
//!
//! Owns the transport controller, its two surfaces and the preferences
//! overlay, and routes key and mouse input to whichever has focus.

use crate::config::CELL_WIDTH_PX;
use crate::error::Result;
use crate::player::PlayerFactory;
use crate::preferences::{BrowseOutcome, PanelButton, PreferencesPanel};
use crate::settings::SoundbankSettings;
use crate::transport::{SurfaceHandle, SurfaceKind, SurfaceModel, TransportController};
use crossterm::event::KeyCode;
use ratatui::layout::Rect;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Seconds moved by one press of `Left`/`Right`.
pub const SEEK_STEP: f64 = 5.0;

/// How long status messages stay on screen.
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Width of the terminal in pixels.
///
/// Uses the size the terminal reports, or `columns * CELL_WIDTH_PX` when it
/// reports zero.
pub fn pixel_width(columns: u16, reported_px: u16) -> f64 {
    if reported_px > 0 {
        f64::from(reported_px)
    } else {
        f64::from(columns) * f64::from(CELL_WIDTH_PX)
    }
}

/// Clickable regions, filled in by the renderer each frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutRegions {
    pub play_button: Rect,
    pub restart_button: Rect,
    pub slider: Rect,
    /// Browse, Test and Reset, in that order.
    pub panel_buttons: [Rect; 3],
}

fn contains(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

/// Main application state.
pub struct App {
    pub transport: TransportController,
    compact: SurfaceHandle,
    full: SurfaceHandle,
    settings: SoundbankSettings,
    factory: Rc<dyn PlayerFactory>,
    /// The preferences overlay, when open.
    pub preferences: Option<PreferencesPanel>,
    /// Closing the preferences quits (the `preferences` subcommand).
    preferences_only: bool,
    pub layout: LayoutRegions,
    pub status_message: Option<(String, Instant)>,
    pub should_quit: bool,
}

impl App {
    pub fn new(settings: SoundbankSettings, factory: Rc<dyn PlayerFactory>) -> Self {
        let compact = SurfaceHandle::new(SurfaceKind::Compact);
        let full = SurfaceHandle::new(SurfaceKind::Full);

        let mut transport = TransportController::new();
        transport.bind(Box::new(compact.clone()));
        transport.bind(Box::new(full.clone()));

        Self {
            transport,
            compact,
            full,
            settings,
            factory,
            preferences: None,
            preferences_only: false,
            layout: LayoutRegions::default(),
            status_message: None,
            should_quit: false,
        }
    }

    /// An app showing only the preferences panel.
    pub fn preferences_only(settings: SoundbankSettings, factory: Rc<dyn PlayerFactory>) -> Self {
        let mut app = Self::new(settings, factory);
        app.preferences_only = true;
        app.open_preferences();
        app
    }

    /// Opens `file` for preview with the stored soundbank, or the default one.
    pub fn open_preview(&mut self, file: &Path) -> Result<()> {
        let soundbank = self.settings.get();
        self.transport
            .open(self.factory.as_ref(), file, soundbank.as_deref())
    }

    /// Shows the preview in a terminal `width_px` pixels wide.
    pub fn appear(&mut self, width_px: f64) {
        self.transport.appear(width_px);
    }

    pub fn resize(&mut self, width_px: f64) {
        self.transport.relayout(width_px);
    }

    /// The surface currently on screen.
    pub fn visible_surface(&self) -> Option<SurfaceModel> {
        [&self.compact, &self.full]
            .into_iter()
            .map(SurfaceHandle::snapshot)
            .find(|model| model.visible)
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Runs completions and the display tick, and expires the status line.
    pub fn update(&mut self, now: Instant) {
        self.transport.process_completions();
        self.transport.tick_if_due(now);

        if let Some((_, time)) = &self.status_message {
            if now.duration_since(*time) > STATUS_TIMEOUT {
                self.status_message = None;
            }
        }
    }

    pub fn update_layout(&mut self, layout: LayoutRegions) {
        self.layout = layout;
    }

    pub fn open_preferences(&mut self) {
        if self.preferences.is_none() {
            self.preferences = Some(PreferencesPanel::new(
                self.settings.clone(),
                Rc::clone(&self.factory),
            ));
        }
    }

    fn close_preferences(&mut self) {
        self.preferences = None;
        if self.preferences_only {
            self.should_quit = true;
        }
    }

    /// Stops playback and releases the player.
    pub fn close(&mut self) {
        self.transport.close();
    }

    /// Handles a key press.
    pub fn handle_key(&mut self, code: KeyCode) {
        if self.preferences.is_some() {
            self.handle_preferences_key(code);
            return;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(' ') => self.transport.play_pause(),
            KeyCode::Char('r') => self.transport.restart(),
            KeyCode::Left => self.transport.seek_by(-SEEK_STEP),
            KeyCode::Right => self.transport.seek_by(SEEK_STEP),
            KeyCode::Home => self.transport.seek(0.0),
            KeyCode::Char(',') => self.open_preferences(),
            _ => {}
        }
    }

    fn handle_preferences_key(&mut self, code: KeyCode) {
        let Some(panel) = self.preferences.as_mut() else {
            return;
        };

        // Alert first, then the browser, then the panel
        if let Some(alert) = panel.alert_mut() {
            match code {
                KeyCode::Left => alert.select_prev(),
                KeyCode::Right | KeyCode::Tab => alert.select_next(),
                KeyCode::Enter => panel.confirm_alert(),
                KeyCode::Esc => panel.dismiss_alert(),
                _ => {}
            }
            return;
        }

        if panel.browser.open {
            match code {
                KeyCode::Up => panel.browser.up(),
                KeyCode::Down => panel.browser.down(),
                KeyCode::Backspace => panel.browser.parent(),
                KeyCode::Esc => panel.browser.close(),
                KeyCode::Enter => {
                    if let BrowseOutcome::Chosen(path) = panel.browser.select() {
                        if panel.choose(&path).is_ok() {
                            self.set_status("Soundbank saved");
                        } else {
                            debug!(path = %path.display(), "rejected soundbank choice");
                        }
                    }
                }
                _ => {}
            }
            return;
        }

        match code {
            KeyCode::Esc => self.close_preferences(),
            KeyCode::Tab | KeyCode::Right => panel.focus_next(),
            KeyCode::BackTab | KeyCode::Left => panel.focus_prev(),
            KeyCode::Enter | KeyCode::Char(' ') => {
                let focus = panel.focus;
                panel.activate(focus);
            }
            KeyCode::Char('b') => panel.activate(PanelButton::Browse),
            KeyCode::Char('t') => panel.activate(PanelButton::Test),
            KeyCode::Char('x') => panel.activate(PanelButton::Reset),
            _ => {}
        }
    }

    /// Handles a left click at cell `(x, y)`.
    pub fn handle_click(&mut self, x: u16, y: u16) {
        if let Some(panel) = self.preferences.as_mut() {
            if panel.alert().is_some() || panel.browser.open {
                return;
            }
            for (rect, button) in self.layout.panel_buttons.iter().zip(PanelButton::ALL) {
                if contains(*rect, x, y) {
                    panel.activate(button);
                    return;
                }
            }
            return;
        }

        let slider = self.layout.slider;
        if contains(slider, x, y) {
            let ratio = if slider.width > 1 {
                f64::from(x - slider.x) / f64::from(slider.width - 1)
            } else {
                0.0
            };
            self.transport.seek_to_ratio(ratio);
        } else if contains(self.layout.play_button, x, y) {
            self.transport.play_pause();
        } else if contains(self.layout.restart_button, x, y) {
            self.transport.restart();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::fake::FakePlayerFactory;
    use crate::settings::MemoryStore;
    use crate::transport::TransportState;
    use tempfile::tempdir;

    fn app_with(factory: Rc<FakePlayerFactory>) -> App {
        let settings = SoundbankSettings::new(Rc::new(MemoryStore::new()));
        App::new(settings, factory)
    }

    fn opened(duration: f64) -> (App, Rc<FakePlayerFactory>) {
        let factory = Rc::new(FakePlayerFactory::with_duration(duration));
        let mut app = app_with(Rc::clone(&factory));
        app.open_preview(Path::new("song.mid")).unwrap();
        (app, factory)
    }

    #[test]
    fn test_pixel_width_falls_back_to_columns() {
        assert_eq!(pixel_width(100, 0), 800.0);
        assert_eq!(pixel_width(100, 1234), 1234.0);
    }

    #[test]
    fn test_appear_picks_surface_and_starts() {
        let (mut app, factory) = opened(10.0);
        app.appear(pixel_width(60, 0));

        let surface = app.visible_surface().unwrap();
        assert_eq!(surface.kind, SurfaceKind::Compact);
        assert_eq!(surface.title, "song.mid");
        assert!(surface.playing);
        assert!(factory.last_handle().unwrap().is_playing());

        app.resize(pixel_width(120, 0));
        assert_eq!(app.visible_surface().unwrap().kind, SurfaceKind::Full);
        assert_eq!(app.transport.state(), TransportState::Playing);
    }

    #[test]
    fn test_preview_keys() {
        let (mut app, factory) = opened(10.0);
        app.appear(800.0);
        let handle = factory.last_handle().unwrap();

        app.handle_key(KeyCode::Char(' '));
        assert!(!handle.is_playing());

        app.handle_key(KeyCode::Right);
        assert_eq!(app.transport.position(), 5.0);
        app.handle_key(KeyCode::Right);
        app.handle_key(KeyCode::Right);
        assert_eq!(app.transport.position(), 10.0);
        app.handle_key(KeyCode::Home);
        assert_eq!(app.transport.position(), 0.0);

        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_slider_click_seeks() {
        let (mut app, _) = opened(10.0);
        app.appear(800.0);
        app.update_layout(LayoutRegions {
            slider: Rect::new(10, 5, 11, 1),
            ..LayoutRegions::default()
        });

        app.handle_click(15, 5);
        assert_eq!(app.transport.position(), 5.0);
        app.handle_click(30, 5);
        assert_eq!(app.transport.position(), 5.0);
    }

    #[test]
    fn test_preferences_overlay_takes_keys() {
        let (mut app, factory) = opened(10.0);
        app.appear(800.0);
        let handle = factory.last_handle().unwrap();

        app.handle_key(KeyCode::Char(','));
        assert!(app.preferences.is_some());
        app.handle_key(KeyCode::Char(' '));
        // Space went to the focused Browse button, not the transport
        assert!(handle.is_playing());
        assert!(app.preferences.as_ref().unwrap().browser.open);

        app.handle_key(KeyCode::Esc);
        assert!(!app.preferences.as_ref().unwrap().browser.open);
        app.handle_key(KeyCode::Esc);
        assert!(app.preferences.is_none());
        assert!(!app.should_quit);
    }

    #[test]
    fn test_choosing_from_browser_saves_soundbank() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("gm.sf2"), b"RIFF").unwrap();
        let factory = Rc::new(FakePlayerFactory::new());
        let mut app = App::preferences_only(
            SoundbankSettings::new(Rc::new(MemoryStore::new())),
            factory,
        );

        let panel = app.preferences.as_mut().unwrap();
        panel.browser.open_at(dir.path());
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Enter);

        let panel = app.preferences.as_ref().unwrap();
        assert_eq!(panel.readout(), dir.path().join("gm.sf2").display().to_string());
        assert_eq!(panel.alert().unwrap().title, "Soundbank Set Successfully");

        app.handle_key(KeyCode::Enter);
        app.handle_key(KeyCode::Esc);
        assert!(app.should_quit);
    }

    #[test]
    fn test_close_releases_player() {
        let (mut app, factory) = opened(10.0);
        app.appear(800.0);
        app.close();
        assert!(factory.last_handle().unwrap().is_released());
        app.handle_key(KeyCode::Char(' '));
        assert_eq!(app.transport.state(), TransportState::Idle);
    }
}
