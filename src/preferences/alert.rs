//! Modal alerts.

/// Alert style, mapped to colour by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Informational,
    Warning,
    Critical,
}

/// A modal message with one or two buttons.
///
/// The first button is the default action; the last one is what `Esc` picks.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub buttons: Vec<String>,
    /// Index of the highlighted button.
    pub selected: usize,
}

impl Alert {
    /// A single-button alert.
    pub fn new(
        severity: AlertSeverity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
            buttons: vec!["OK".to_string()],
            selected: 0,
        }
    }

    pub fn informational(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(AlertSeverity::Informational, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(AlertSeverity::Warning, title, message)
    }

    pub fn critical(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(AlertSeverity::Critical, title, message)
    }

    /// Replaces the buttons. An empty list keeps the default "OK".
    pub fn with_buttons<I, S>(mut self, buttons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let buttons: Vec<String> = buttons.into_iter().map(Into::into).collect();
        if !buttons.is_empty() {
            self.buttons = buttons;
        }
        self.selected = 0;
        self
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1).min(self.cancel_index());
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Index of the button `Esc` stands for.
    pub fn cancel_index(&self) -> usize {
        self.buttons.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_selection_stays_in_range() {
        let mut alert = Alert::warning("Reset", "Sure?").with_buttons(["Reset", "Cancel"]);
        assert_eq!(alert.selected, 0);
        alert.select_prev();
        assert_eq!(alert.selected, 0);
        alert.select_next();
        alert.select_next();
        assert_eq!(alert.selected, 1);
        assert_eq!(alert.cancel_index(), 1);
    }

    #[test]
    fn test_cleared_buttons_do_not_underflow() {
        let mut alert = Alert::critical("Failed", "");
        alert.buttons.clear();
        alert.select_next();
        assert_eq!(alert.selected, 0);
        assert_eq!(alert.cancel_index(), 0);
    }

    #[test]
    fn test_empty_button_list_keeps_ok() {
        let alert = Alert::informational("Done", "").with_buttons(Vec::<String>::new());
        assert_eq!(alert.buttons, vec!["OK".to_string()]);
        assert_eq!(alert.cancel_index(), 0);
    }
}
