//! Terminal user interface components.
//!
//! The preview surfaces, the preferences panel and its modal dialogs.

mod dialogs;
mod preferences;
mod preview;

use crate::app::{App, LayoutRegions};
use crate::transport::SurfaceKind;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::Frame;

pub use dialogs::{render_alert, render_soundbank_browser};
pub use preferences::render_preferences;
pub use preview::{render_compact, render_full};

/// Renders the whole UI and records clickable regions for mouse handling.
pub fn render(frame: &mut Frame, app: &mut App) {
    let size = frame.area();
    let mut layout = LayoutRegions::default();

    if let Some(surface) = app.visible_surface() {
        let status = app.status_message.as_ref().map(|(msg, _)| msg.as_str());
        match surface.kind {
            SurfaceKind::Compact => render_compact(frame, size, &surface, &mut layout),
            SurfaceKind::Full => render_full(frame, size, &surface, status, &mut layout),
        }
    }

    if let Some(panel) = app.preferences.as_ref() {
        layout.panel_buttons = render_preferences(frame, panel);
        render_soundbank_browser(frame, &panel.browser);
        if let Some(alert) = panel.alert() {
            render_alert(frame, alert);
        }
    }

    app.update_layout(layout);
}

/// Helper function to center a rectangle within another rectangle.
///
/// # Arguments
///
/// * `percent_x` - Width as percentage of the containing area
/// * `percent_y` - Height as percentage of the containing area
/// * `area` - The containing area
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Centers a `width` x `height` cell box in `area`, shrinking it to fit.
pub fn fixed_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
