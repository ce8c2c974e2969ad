//! Soundbank file browser.
//!
//! Lists directories and soundbank files (`sf2`/`dls`) of one directory at a
//! time, with a `..` entry for the parent.

use crate::settings::SOUNDBANK_EXTENSIONS;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Rows the browser assumes visible when scrolling from the keyboard. The
/// renderer corrects for its real height with [`FileBrowser::visible_range`].
const VISIBLE_ROWS: usize = 10;

/// What selecting an entry did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseOutcome {
    /// Moved into another directory.
    Navigated,
    /// A soundbank file was picked; the browser has closed.
    Chosen(PathBuf),
    /// Nothing to select.
    Nothing,
}

/// State for the soundbank browser dialog.
#[derive(Debug, Clone, Default)]
pub struct FileBrowser {
    /// Whether the browser is open.
    pub open: bool,
    /// Current directory path.
    pub current_dir: PathBuf,
    /// List of entries in current directory.
    pub entries: Vec<PathBuf>,
    /// Currently selected index.
    pub selected: usize,
    /// Scroll offset for long lists.
    pub scroll: usize,
}

impl FileBrowser {
    /// Opens the browser in `dir`.
    pub fn open_at(&mut self, dir: &Path) {
        self.open = true;
        self.current_dir = dir.to_path_buf();
        self.selected = 0;
        self.scroll = 0;
        self.refresh();
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Re-reads the current directory.
    fn refresh(&mut self) {
        self.entries.clear();

        if self.current_dir.parent().is_some() {
            self.entries.push(PathBuf::from(".."));
        }

        if let Ok(entries) = std::fs::read_dir(&self.current_dir) {
            let mut dirs: Vec<PathBuf> = Vec::new();
            let mut files: Vec<PathBuf> = Vec::new();

            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    dirs.push(path);
                } else if is_soundbank_file(&path) {
                    files.push(path);
                }
            }

            dirs.sort();
            files.sort();

            self.entries.extend(dirs);
            self.entries.extend(files);
        }

        if self.selected >= self.entries.len() {
            self.selected = 0;
        }
    }

    pub fn up(&mut self) {
        if self.open && self.selected > 0 {
            self.selected -= 1;
            if self.selected < self.scroll {
                self.scroll = self.selected;
            }
        }
    }

    pub fn down(&mut self) {
        if self.open && self.selected + 1 < self.entries.len() {
            self.selected += 1;
            if self.selected >= self.scroll + VISIBLE_ROWS {
                self.scroll = self.selected.saturating_sub(VISIBLE_ROWS - 1);
            }
        }
    }

    /// Entries to draw in a list `height` rows tall, always including the
    /// selection.
    pub fn visible_range(&self, height: usize) -> Range<usize> {
        let len = self.entries.len();
        if height == 0 || len == 0 {
            return 0..0;
        }

        let mut start = self.scroll.min(len - 1);
        if self.selected < start {
            start = self.selected;
        } else if self.selected >= start + height {
            start = self.selected + 1 - height;
        }
        start..(start + height).min(len)
    }

    /// Moves to the parent directory.
    pub fn parent(&mut self) {
        if let Some(parent) = self.current_dir.parent() {
            self.current_dir = parent.to_path_buf();
            self.selected = 0;
            self.scroll = 0;
            self.refresh();
        }
    }

    /// Enters the selected directory or picks the selected file.
    pub fn select(&mut self) -> BrowseOutcome {
        if !self.open || self.entries.is_empty() {
            return BrowseOutcome::Nothing;
        }

        let selected_path = self.entries[self.selected].clone();

        if selected_path == Path::new("..") {
            self.parent();
            BrowseOutcome::Navigated
        } else if selected_path.is_dir() {
            self.current_dir = selected_path;
            self.selected = 0;
            self.scroll = 0;
            self.refresh();
            BrowseOutcome::Navigated
        } else {
            self.open = false;
            BrowseOutcome::Chosen(selected_path)
        }
    }
}

/// True for paths whose extension is an allowed soundbank extension.
fn is_soundbank_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SOUNDBANK_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_lists_dirs_then_soundbanks_only() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("banks")).unwrap();
        for name in ["b.sf2", "A.DLS", "readme.txt", "song.mid"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let mut browser = FileBrowser::default();
        browser.open_at(dir.path());

        let names: Vec<String> = browser
            .entries
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| p.display().to_string())
            })
            .collect();
        assert_eq!(names, vec!["..", "banks", "A.DLS", "b.sf2"]);
    }

    #[test]
    fn test_select_navigates_and_chooses() {
        let dir = tempdir().unwrap();
        let banks = dir.path().join("banks");
        std::fs::create_dir(&banks).unwrap();
        std::fs::write(banks.join("gm.sf2"), b"").unwrap();

        let mut browser = FileBrowser::default();
        browser.open_at(dir.path());
        browser.down(); // skip ".."
        assert_eq!(browser.select(), BrowseOutcome::Navigated);
        assert_eq!(browser.current_dir, banks);

        browser.down();
        assert_eq!(browser.select(), BrowseOutcome::Chosen(banks.join("gm.sf2")));
        assert!(!browser.open);
        assert_eq!(browser.select(), BrowseOutcome::Nothing);
    }

    #[test]
    fn test_visible_range_follows_selection_in_short_lists() {
        let mut browser = FileBrowser {
            open: true,
            entries: (0..20).map(|i| PathBuf::from(format!("{}.sf2", i))).collect(),
            ..FileBrowser::default()
        };
        for _ in 0..7 {
            browser.down();
        }
        // Keyboard scrolling assumed ten rows; only four are drawn
        assert_eq!(browser.scroll, 0);
        assert_eq!(browser.visible_range(4), 4..8);
        assert_eq!(browser.visible_range(30), 0..20);
        assert_eq!(browser.visible_range(0), 0..0);

        browser.selected = 19;
        assert_eq!(browser.visible_range(4), 16..20);
    }

    #[test]
    fn test_parent_entry_goes_up() {
        let dir = tempdir().unwrap();
        let inner = dir.path().join("inner");
        std::fs::create_dir(&inner).unwrap();

        let mut browser = FileBrowser::default();
        browser.open_at(&inner);
        assert_eq!(browser.select(), BrowseOutcome::Navigated);
        assert_eq!(browser.current_dir, dir.path());
    }
}
