//! Runtime configuration: where preferences live and which soundbanks to
//! fall back on.

use std::path::PathBuf;

/// Name of the preference file inside the configuration directory.
pub const PREFERENCES_FILE: &str = "preferences.json";

/// Application directory name under the user's configuration directory.
const APP_DIR: &str = "midipeek";

/// Well-known locations of General MIDI SoundFonts installed by distributions
/// and package managers, tried in order when no soundbank is chosen.
pub const SYSTEM_SOUNDBANKS: [&str; 6] = [
    "/usr/share/sounds/sf2/default-GM.sf2",
    "/usr/share/sounds/sf2/FluidR3_GM.sf2",
    "/usr/share/soundfonts/default.sf2",
    "/usr/share/soundfonts/FluidR3_GM.sf2",
    "/usr/local/share/soundfonts/default.sf2",
    "/opt/homebrew/share/soundfonts/default.sf2",
];

/// Assumed terminal cell width in pixels when the terminal does not report
/// its pixel size.
pub const CELL_WIDTH_PX: u16 = 8;

/// Resolved configuration for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding the preference file.
    pub config_dir: PathBuf,
    /// Default soundbank candidates, most preferred first.
    pub default_soundbanks: Vec<PathBuf>,
}

impl Config {
    /// Builds the configuration.
    ///
    /// # Arguments
    ///
    /// * `config_dir` - Overrides the per-user configuration directory
    /// * `default_soundbank` - Tried before the system soundbank locations
    pub fn new(config_dir: Option<PathBuf>, default_soundbank: Option<PathBuf>) -> Self {
        let config_dir = config_dir.unwrap_or_else(|| {
            dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .unwrap_or_else(|| PathBuf::from(format!(".{}", APP_DIR)))
        });

        let default_soundbanks = default_soundbank
            .into_iter()
            .chain(SYSTEM_SOUNDBANKS.iter().map(PathBuf::from))
            .collect();

        Self {
            config_dir,
            default_soundbanks,
        }
    }

    /// Full path of the preference file.
    pub fn preferences_path(&self) -> PathBuf {
        self.config_dir.join(PREFERENCES_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_dir() {
        let config = Config::new(Some(PathBuf::from("/tmp/peek")), None);
        assert_eq!(
            config.preferences_path(),
            PathBuf::from("/tmp/peek/preferences.json")
        );
        assert_eq!(config.default_soundbanks.len(), SYSTEM_SOUNDBANKS.len());
    }

    #[test]
    fn test_default_soundbank_override_comes_first() {
        let config = Config::new(None, Some(PathBuf::from("/banks/mine.sf2")));
        assert_eq!(config.default_soundbanks[0], PathBuf::from("/banks/mine.sf2"));
        assert_eq!(config.default_soundbanks.len(), SYSTEM_SOUNDBANKS.len() + 1);
        assert!(config.config_dir.ends_with(APP_DIR) || config.config_dir.ends_with(".midipeek"));
    }
}
