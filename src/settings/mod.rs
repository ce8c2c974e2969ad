//! Soundbank preference.
//!
//! One setting, the path of the user's chosen soundbank, persisted under
//! [`SOUNDBANK_PATH_KEY`]. Validity is re-checked on every read: a soundbank
//! that was deleted or renamed since it was chosen silently reads as "use the
//! default" instead of failing.

mod store;

pub use store::{JsonFileStore, MemoryStore, PreferenceStore};

use crate::error::Result;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{info, warn};

/// Preference key holding the soundbank's absolute path.
pub const SOUNDBANK_PATH_KEY: &str = "SoundbankPath";

/// Soundbank file extensions the preference accepts (compared lowercased).
pub const SOUNDBANK_EXTENSIONS: [&str; 2] = ["sf2", "dls"];

/// Accessor for the soundbank preference over an injected store.
#[derive(Clone)]
pub struct SoundbankSettings {
    store: Rc<dyn PreferenceStore>,
}

impl SoundbankSettings {
    pub fn new(store: Rc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Returns the stored soundbank, or `None` if unset or no longer valid.
    pub fn get(&self) -> Option<PathBuf> {
        let stored = match self.store.get_string(SOUNDBANK_PATH_KEY) {
            Ok(value) => value?,
            Err(e) => {
                warn!(error = %e, "could not read soundbank preference");
                return None;
            }
        };

        let path = PathBuf::from(stored);
        if Self::validate(&path) {
            Some(path)
        } else {
            None
        }
    }

    /// Persists `path` as-is. Callers check it with [`Self::validate`] first.
    pub fn set(&self, path: &Path) -> Result<()> {
        self.store
            .set_string(SOUNDBANK_PATH_KEY, &path.to_string_lossy())?;
        info!(path = %path.display(), "soundbank preference set");
        Ok(())
    }

    /// True iff `path` is an existing file with an `sf2` or `dls` extension,
    /// in any letter case.
    pub fn validate(path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .is_some_and(|ext| SOUNDBANK_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Removes the preference; the default soundbank is used afterwards.
    pub fn reset(&self) -> Result<()> {
        self.store.remove(SOUNDBANK_PATH_KEY)?;
        info!("soundbank preference reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings() -> SoundbankSettings {
        SoundbankSettings::new(Rc::new(MemoryStore::new()))
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"RIFF").unwrap();
        path
    }

    #[test]
    fn test_get_returns_valid_stored_path() {
        let dir = tempdir().unwrap();
        let bank = touch(dir.path(), "piano.sf2");
        let settings = settings();

        settings.set(&bank).unwrap();
        assert_eq!(settings.get(), Some(bank));
    }

    #[test]
    fn test_get_rechecks_validity_on_every_read() {
        let dir = tempdir().unwrap();
        let bank = touch(dir.path(), "piano.sf2");
        let settings = settings();

        settings.set(&bank).unwrap();
        std::fs::remove_file(&bank).unwrap();
        assert_eq!(settings.get(), None);

        // The file coming back makes the stale value valid again
        touch(dir.path(), "piano.sf2");
        assert_eq!(settings.get(), Some(bank));
    }

    #[test]
    fn test_set_does_not_validate_but_get_does() {
        let dir = tempdir().unwrap();
        let text = touch(dir.path(), "notes.txt");
        let settings = settings();

        settings.set(&text).unwrap();
        assert_eq!(settings.get(), None);
    }

    #[test]
    fn test_reset_always_clears() {
        let dir = tempdir().unwrap();
        let settings = settings();

        settings.reset().unwrap();
        assert_eq!(settings.get(), None);

        settings.set(&touch(dir.path(), "a.dls")).unwrap();
        settings.reset().unwrap();
        assert_eq!(settings.get(), None);
    }

    #[test]
    fn test_validate_is_case_insensitive() {
        let dir = tempdir().unwrap();
        for name in ["FOO.SF2", "foo.sf2", "Foo.Dls", "bar.dls"] {
            assert!(SoundbankSettings::validate(&touch(dir.path(), name)), "{}", name);
        }
        assert!(!SoundbankSettings::validate(&touch(dir.path(), "foo.txt")));
        assert!(!SoundbankSettings::validate(&touch(dir.path(), "sf2")));
        assert!(!SoundbankSettings::validate(&dir.path().join("missing.sf2")));
    }

    #[test]
    fn test_validate_rejects_directories() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("bank.sf2");
        std::fs::create_dir(&folder).unwrap();
        assert!(!SoundbankSettings::validate(&folder));
    }

    #[test]
    fn test_settings_over_json_store() {
        let dir = tempdir().unwrap();
        let bank = touch(dir.path(), "gm.sf2");
        let prefs = dir.path().join("preferences.json");

        SoundbankSettings::new(Rc::new(JsonFileStore::new(&prefs)))
            .set(&bank)
            .unwrap();

        let reopened = SoundbankSettings::new(Rc::new(JsonFileStore::new(&prefs)));
        assert_eq!(reopened.get(), Some(bank));
    }
}
