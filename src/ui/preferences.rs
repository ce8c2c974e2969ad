//! Preferences panel rendering.

use crate::preferences::{PanelButton, PreferencesPanel, DESCRIPTION, FOOTNOTE, PANEL_TITLE};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use super::fixed_rect;

/// Panel size in cells (500x300 px at 8x16 px cells).
const PANEL_WIDTH: u16 = 62;
const PANEL_HEIGHT: u16 = 18;

/// Cells per button, brackets included.
const BUTTON_WIDTH: u16 = 13;

fn button_style(enabled: bool, focused: bool) -> Style {
    match (enabled, focused) {
        (false, _) => Style::default().fg(Color::DarkGray),
        (true, true) => Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        (true, false) => Style::default().fg(Color::Cyan),
    }
}

/// Renders the preferences panel.
///
/// # Returns
///
/// The screen areas of the Browse, Test and Reset buttons.
pub fn render_preferences(frame: &mut Frame, panel: &PreferencesPanel) -> [Rect; 3] {
    let area = fixed_rect(PANEL_WIDTH, PANEL_HEIGHT, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(format!(" {} ", PANEL_TITLE))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Spacer
            Constraint::Length(2), // Description
            Constraint::Length(1), // Spacer
            Constraint::Length(3), // Current path
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // Buttons
            Constraint::Min(1),    // Spacer
            Constraint::Length(2), // Footnote
            Constraint::Length(1), // Instructions
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(DESCRIPTION)
            .style(Style::default().fg(Color::White))
            .wrap(Wrap { trim: true }),
        chunks[1],
    );

    let has_soundbank = panel.is_enabled(PanelButton::Test);
    let readout_style = if has_soundbank {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC)
    };
    frame.render_widget(
        Paragraph::new(Span::styled(panel.readout(), readout_style))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray)),
            ),
        chunks[3],
    );

    let row = chunks[5];
    let mut areas = [Rect::default(); 3];
    for (i, button) in PanelButton::ALL.into_iter().enumerate() {
        let x = row.x + i as u16 * (BUTTON_WIDTH + 2);
        let button_area = Rect::new(x, row.y, BUTTON_WIDTH, 1).intersection(row);
        let style = button_style(panel.is_enabled(button), panel.focus == button);
        frame.render_widget(
            Paragraph::new(Span::styled(format!("[ {} ]", button.label()), style)).centered(),
            button_area,
        );
        areas[i] = button_area;
    }

    frame.render_widget(
        Paragraph::new(FOOTNOTE)
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true }),
        chunks[7],
    );

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("[Tab]", Style::default().fg(Color::Yellow)),
            Span::styled(" Focus  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[Enter]", Style::default().fg(Color::Yellow)),
            Span::styled(" Activate  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[b/t/x]", Style::default().fg(Color::Yellow)),
            Span::styled(" Browse/Test/Reset  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[Esc]", Style::default().fg(Color::Yellow)),
            Span::styled(" Close", Style::default().fg(Color::DarkGray)),
        ])),
        chunks[8],
    );

    areas
}
