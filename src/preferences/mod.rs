//! The preferences panel: choose, test and reset the soundbank.
//!
//! The panel is a plain state machine. Rendering lives in `ui::preferences`;
//! every user action here ends in at most one [`Alert`] for the renderer to
//! show and for the user to answer.

mod alert;
mod browser;

pub use alert::{Alert, AlertSeverity};
pub use browser::{BrowseOutcome, FileBrowser};

use crate::error::{Error, Result};
use crate::midi::PROBE_PAYLOAD;
use crate::player::PlayerFactory;
use crate::settings::SoundbankSettings;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::warn;

pub const PANEL_TITLE: &str = "Soundbank Settings";
pub const DESCRIPTION: &str =
    "Select a custom SF2 or DLS soundbank file to improve MIDI playback quality:";
pub const NO_SOUNDBANK: &str = "No soundbank file selected (using system default)";
pub const FOOTNOTE: &str =
    "Note: MIDI files need to be reopened after changing soundbank settings.";

/// Panel buttons, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelButton {
    Browse,
    Test,
    Reset,
}

impl PanelButton {
    pub const ALL: [PanelButton; 3] = [PanelButton::Browse, PanelButton::Test, PanelButton::Reset];

    pub fn label(self) -> &'static str {
        match self {
            PanelButton::Browse => "Browse...",
            PanelButton::Test => "Test",
            PanelButton::Reset => "Reset",
        }
    }
}

/// An alert waiting on an answer that triggers further work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    ConfirmReset,
}

/// Runs the soundbank self-test: builds a player for the probe payload
/// against `soundbank` and discards it.
pub fn probe_soundbank(factory: &dyn PlayerFactory, soundbank: &Path) -> Result<()> {
    factory.probe(&PROBE_PAYLOAD, Some(soundbank))
}

/// State of the preferences panel.
pub struct PreferencesPanel {
    settings: SoundbankSettings,
    factory: Rc<dyn PlayerFactory>,
    pub focus: PanelButton,
    pub browser: FileBrowser,
    alert: Option<Alert>,
    pending: Option<Pending>,
}

impl PreferencesPanel {
    pub fn new(settings: SoundbankSettings, factory: Rc<dyn PlayerFactory>) -> Self {
        Self {
            settings,
            factory,
            focus: PanelButton::Browse,
            browser: FileBrowser::default(),
            alert: None,
            pending: None,
        }
    }

    /// Text for the current-path readout.
    pub fn readout(&self) -> String {
        match self.settings.get() {
            Some(path) => path.display().to_string(),
            None => NO_SOUNDBANK.to_string(),
        }
    }

    /// Test and Reset need a valid stored soundbank; Browse is always enabled.
    pub fn is_enabled(&self, button: PanelButton) -> bool {
        match button {
            PanelButton::Browse => true,
            PanelButton::Test | PanelButton::Reset => self.settings.get().is_some(),
        }
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn alert_mut(&mut self) -> Option<&mut Alert> {
        self.alert.as_mut()
    }

    /// Moves focus to the next enabled button, wrapping around.
    pub fn focus_next(&mut self) {
        self.move_focus(1);
    }

    pub fn focus_prev(&mut self) {
        self.move_focus(PanelButton::ALL.len() - 1);
    }

    fn move_focus(&mut self, step: usize) {
        let count = PanelButton::ALL.len();
        let mut idx = PanelButton::ALL
            .iter()
            .position(|b| *b == self.focus)
            .unwrap_or(0);
        for _ in 0..count {
            idx = (idx + step) % count;
            if self.is_enabled(PanelButton::ALL[idx]) {
                self.focus = PanelButton::ALL[idx];
                return;
            }
        }
    }

    /// Presses `button`. Disabled buttons do nothing.
    pub fn activate(&mut self, button: PanelButton) {
        if !self.is_enabled(button) || self.alert.is_some() {
            return;
        }
        self.focus = button;
        match button {
            PanelButton::Browse => self.browse(),
            PanelButton::Test => self.test(),
            PanelButton::Reset => self.request_reset(),
        }
    }

    /// Opens the file browser next to the current soundbank, or in the
    /// working directory.
    pub fn browse(&mut self) {
        let start = self
            .settings
            .get()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("/"));
        self.browser.open_at(&start);
    }

    /// Handles a file picked in the browser.
    ///
    /// # Errors
    ///
    /// `InvalidSoundbankFile` if the file is missing or has the wrong
    /// extension; the stored preference is left untouched.
    pub fn choose(&mut self, path: &Path) -> Result<()> {
        if !SoundbankSettings::validate(path) {
            self.alert = Some(Alert::warning(
                "Invalid Soundbank File",
                "Please select a valid SF2 or DLS soundbank file.",
            ));
            return Err(Error::InvalidSoundbankFile(path.to_path_buf()));
        }

        if let Err(e) = self.settings.set(path) {
            warn!(error = %e, "failed to save soundbank preference");
            self.alert = Some(Alert::critical(
                "Could Not Save Soundbank",
                format!("The soundbank setting could not be saved: {}", e),
            ));
            return Err(e);
        }

        self.alert = Some(Alert::informational(
            "Soundbank Set Successfully",
            "The soundbank file has been set. Please reopen MIDI files for changes to take effect.",
        ));
        Ok(())
    }

    /// Checks the stored soundbank with the self-test payload.
    pub fn test(&mut self) {
        let Some(soundbank) = self.settings.get() else {
            return;
        };

        self.alert = Some(match probe_soundbank(self.factory.as_ref(), &soundbank) {
            Ok(()) => Alert::informational(
                "Soundbank Test Successful",
                "The current soundbank file can be used normally.",
            ),
            Err(e) => {
                warn!(soundbank = %soundbank.display(), error = %e, "soundbank test failed");
                Alert::critical(
                    "Soundbank Test Failed",
                    format!(
                        "The soundbank file may be corrupted or incompatible: {}",
                        e
                    ),
                )
            }
        });
    }

    /// Asks for confirmation before resetting.
    pub fn request_reset(&mut self) {
        self.alert = Some(
            Alert::warning(
                "Reset Soundbank Settings",
                "Are you sure you want to reset soundbank settings and use the system default soundbank?",
            )
            .with_buttons(["Reset", "Cancel"]),
        );
        self.pending = Some(Pending::ConfirmReset);
    }

    /// Answers the open alert with the button at `index`.
    pub fn answer_alert(&mut self, index: usize) {
        if self.alert.take().is_none() {
            return;
        }

        match self.pending.take() {
            Some(Pending::ConfirmReset) if index == 0 => self.reset(),
            _ => {}
        }
        self.fix_focus();
    }

    /// Answers the open alert with its highlighted button.
    pub fn confirm_alert(&mut self) {
        if let Some(index) = self.alert.as_ref().map(|a| a.selected) {
            self.answer_alert(index);
        }
    }

    /// Answers the open alert with its cancel button.
    pub fn dismiss_alert(&mut self) {
        if let Some(index) = self.alert.as_ref().map(Alert::cancel_index) {
            self.answer_alert(index);
        }
    }

    fn reset(&mut self) {
        self.alert = Some(match self.settings.reset() {
            Ok(()) => Alert::informational(
                "Reset Successful",
                "Reset to system default soundbank. Please reopen MIDI files for changes to take effect.",
            ),
            Err(e) => Alert::critical(
                "Could Not Reset Soundbank",
                format!("The soundbank setting could not be removed: {}", e),
            ),
        });
    }

    /// Moves focus off a button that has become disabled.
    fn fix_focus(&mut self) {
        if !self.is_enabled(self.focus) {
            self.focus = PanelButton::Browse;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::fake::FakePlayerFactory;
    use crate::settings::MemoryStore;
    use tempfile::{tempdir, TempDir};

    fn panel_with(factory: FakePlayerFactory) -> (PreferencesPanel, SoundbankSettings) {
        let settings = SoundbankSettings::new(Rc::new(MemoryStore::new()));
        let panel = PreferencesPanel::new(settings.clone(), Rc::new(factory));
        (panel, settings)
    }

    fn bank(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"RIFF").unwrap();
        path
    }

    #[test]
    fn test_initial_readout_and_disabled_buttons() {
        let (panel, _) = panel_with(FakePlayerFactory::new());
        assert_eq!(panel.readout(), NO_SOUNDBANK);
        assert!(panel.is_enabled(PanelButton::Browse));
        assert!(!panel.is_enabled(PanelButton::Test));
        assert!(!panel.is_enabled(PanelButton::Reset));
    }

    #[test]
    fn test_choose_valid_soundbank() {
        let dir = tempdir().unwrap();
        let path = bank(&dir, "Piano.SF2");
        let (mut panel, settings) = panel_with(FakePlayerFactory::new());

        panel.choose(&path).unwrap();
        assert_eq!(settings.get(), Some(path.clone()));
        assert_eq!(panel.readout(), path.display().to_string());
        assert!(panel.is_enabled(PanelButton::Test));

        let alert = panel.alert().unwrap();
        assert_eq!(alert.severity, AlertSeverity::Informational);
        assert_eq!(alert.title, "Soundbank Set Successfully");
    }

    #[test]
    fn test_choose_invalid_soundbank_warns_without_change() {
        let dir = tempdir().unwrap();
        let good = bank(&dir, "good.dls");
        let bad = bank(&dir, "notes.txt");
        let (mut panel, settings) = panel_with(FakePlayerFactory::new());
        settings.set(&good).unwrap();

        let err = panel.choose(&bad).unwrap_err();
        assert!(matches!(err, Error::InvalidSoundbankFile(ref p) if *p == bad));
        assert_eq!(settings.get(), Some(good));

        let alert = panel.alert().unwrap();
        assert_eq!(alert.severity, AlertSeverity::Warning);
        assert_eq!(alert.title, "Invalid Soundbank File");
    }

    #[test]
    fn test_test_button_success() {
        let dir = tempdir().unwrap();
        let (mut panel, settings) = panel_with(FakePlayerFactory::new());
        settings.set(&bank(&dir, "gm.sf2")).unwrap();

        panel.activate(PanelButton::Test);
        let alert = panel.alert().unwrap();
        assert_eq!(alert.severity, AlertSeverity::Informational);
        assert_eq!(alert.title, "Soundbank Test Successful");
    }

    #[test]
    fn test_test_button_failure_is_critical_with_message() {
        let dir = tempdir().unwrap();
        let (mut panel, settings) = panel_with(FakePlayerFactory::failing("bad sample chunk"));
        settings.set(&bank(&dir, "gm.sf2")).unwrap();

        panel.activate(PanelButton::Test);
        let alert = panel.alert().unwrap();
        assert_eq!(alert.severity, AlertSeverity::Critical);
        assert!(alert.message.contains("bad sample chunk"));
        // A failed test never touches the stored setting
        assert!(settings.get().is_some());
    }

    #[test]
    fn test_disabled_buttons_do_nothing() {
        let (mut panel, _) = panel_with(FakePlayerFactory::new());
        panel.activate(PanelButton::Test);
        panel.activate(PanelButton::Reset);
        assert!(panel.alert().is_none());
    }

    #[test]
    fn test_reset_requires_confirmation() {
        let dir = tempdir().unwrap();
        let (mut panel, settings) = panel_with(FakePlayerFactory::new());
        settings.set(&bank(&dir, "gm.sf2")).unwrap();

        panel.activate(PanelButton::Reset);
        assert_eq!(panel.alert().unwrap().buttons, vec!["Reset", "Cancel"]);
        panel.dismiss_alert();
        assert!(panel.alert().is_none());
        assert!(settings.get().is_some());

        panel.activate(PanelButton::Reset);
        panel.confirm_alert();
        assert_eq!(settings.get(), None);
        assert_eq!(panel.alert().unwrap().title, "Reset Successful");
        assert_eq!(panel.readout(), NO_SOUNDBANK);

        panel.dismiss_alert();
        assert_eq!(panel.focus, PanelButton::Browse);
    }

    #[test]
    fn test_focus_skips_disabled_buttons() {
        let dir = tempdir().unwrap();
        let (mut panel, settings) = panel_with(FakePlayerFactory::new());

        panel.focus_next();
        assert_eq!(panel.focus, PanelButton::Browse);

        settings.set(&bank(&dir, "gm.sf2")).unwrap();
        panel.focus_next();
        assert_eq!(panel.focus, PanelButton::Test);
        panel.focus_next();
        assert_eq!(panel.focus, PanelButton::Reset);
        panel.focus_next();
        assert_eq!(panel.focus, PanelButton::Browse);
        panel.focus_prev();
        assert_eq!(panel.focus, PanelButton::Reset);
    }

    #[test]
    fn test_probe_soundbank_uses_payload() {
        let dir = tempdir().unwrap();
        let factory = FakePlayerFactory::new();
        probe_soundbank(&factory, &bank(&dir, "gm.sf2")).unwrap();
        let handle = factory.last_handle().unwrap();
        // The self-test builds a player and drops it straight away
        assert!(handle.is_released());
        assert!(probe_soundbank(&factory, &dir.path().join("missing.sf2")).is_err());
    }
}
