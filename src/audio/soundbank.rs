//! Soundbank lookup and loading.
//!
//! An explicit soundbank (from the preferences) always wins. Without one, the
//! first existing entry of the configured default list is used; this is the
//! stand-in for the operating system's built-in synthesizer data.

use crate::error::{Error, Result};
use rustysynth::SoundFont;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Picks the soundbank to load.
///
/// # Errors
///
/// Returns `PlayerConstruction` when no explicit soundbank is given and none
/// of the defaults exists.
pub fn resolve_soundbank(explicit: Option<&Path>, defaults: &[PathBuf]) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    defaults
        .iter()
        .find(|candidate| candidate.is_file())
        .cloned()
        .ok_or_else(|| {
            Error::PlayerConstruction(
                "no default soundbank found; choose one in Preferences".to_string(),
            )
        })
}

/// Loads a SoundFont from disk.
///
/// DLS files pass preference validation but cannot be read by the synthesizer,
/// so they are rejected here with a construction error.
pub fn load_soundfont(path: &Path) -> Result<Arc<SoundFont>> {
    let is_dls = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("dls"));
    if is_dls {
        return Err(Error::PlayerConstruction(format!(
            "DLS soundbanks are not supported by the synthesizer: {}",
            path.display()
        )));
    }

    debug!(path = %path.display(), "loading soundbank");
    let file = File::open(path).map_err(|e| {
        Error::PlayerConstruction(format!(
            "failed to open soundbank {}: {}",
            path.display(),
            e
        ))
    })?;
    let mut reader = BufReader::new(file);
    let soundfont = SoundFont::new(&mut reader).map_err(|e| {
        Error::PlayerConstruction(format!(
            "failed to load soundbank {}: {:?}",
            path.display(),
            e
        ))
    })?;

    info!(
        path = %path.display(),
        presets = soundfont.get_presets().len(),
        "soundbank loaded"
    );
    Ok(Arc::new(soundfont))
}
