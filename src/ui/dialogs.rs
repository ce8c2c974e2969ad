//! Modal overlays: alerts and the soundbank browser.

use crate::preferences::{Alert, AlertSeverity, FileBrowser};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;
use std::path::Path;

use super::{centered_rect, fixed_rect};

/// Truncates a path string to fit within max_width, adding "..." prefix if needed.
#[inline]
fn truncate_path(path_str: &str, max_width: usize) -> String {
    let chars: Vec<char> = path_str.chars().collect();
    if chars.len() > max_width && max_width > 3 {
        let tail: String = chars[chars.len() - (max_width - 3)..].iter().collect();
        format!("...{}", tail)
    } else {
        path_str.to_string()
    }
}

/// Extracts the display name from a path, returning "?" if extraction fails.
#[inline]
fn path_display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("?")
        .to_string()
}

fn severity_color(severity: AlertSeverity) -> Color {
    match severity {
        AlertSeverity::Informational => Color::Cyan,
        AlertSeverity::Warning => Color::Yellow,
        AlertSeverity::Critical => Color::Red,
    }
}

/// Renders an alert over everything else.
pub fn render_alert(frame: &mut Frame, alert: &Alert) {
    let area = fixed_rect(54, 10, frame.area());
    frame.render_widget(Clear, area);

    let color = severity_color(alert.severity);
    let block = Block::default()
        .title(format!(" {} ", alert.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Spacer
            Constraint::Min(2),    // Message
            Constraint::Length(1), // Buttons
            Constraint::Length(1), // Instructions
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(alert.message.as_str())
            .style(Style::default().fg(Color::White))
            .wrap(Wrap { trim: true }),
        chunks[1],
    );

    let mut spans = Vec::with_capacity(alert.buttons.len() * 2);
    for (i, label) in alert.buttons.iter().enumerate() {
        let style = if i == alert.selected {
            Style::default()
                .fg(Color::Black)
                .bg(color)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(color)
        };
        if i > 0 {
            spans.push(Span::raw("     "));
        }
        spans.push(Span::styled(format!(" {} ", label), style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)).centered(), chunks[2]);

    let mut hints = Vec::new();
    if alert.buttons.len() > 1 {
        hints.push(Span::styled("[Left/Right]", Style::default().fg(Color::Yellow)));
        hints.push(Span::styled(" Select  ", Style::default().fg(Color::DarkGray)));
    }
    hints.push(Span::styled("[Enter]", Style::default().fg(Color::Yellow)));
    hints.push(Span::styled(" Confirm  ", Style::default().fg(Color::DarkGray)));
    hints.push(Span::styled("[Esc]", Style::default().fg(Color::Yellow)));
    hints.push(Span::styled(" Dismiss", Style::default().fg(Color::DarkGray)));
    frame.render_widget(Paragraph::new(Line::from(hints)), chunks[3]);
}

/// Renders the soundbank browser if it is open.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `browser` - Browser state
pub fn render_soundbank_browser(frame: &mut Frame, browser: &FileBrowser) {
    if !browser.open {
        return;
    }

    let area = centered_rect(65, 75, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Select Soundbank ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Current path
            Constraint::Length(1), // Separator
            Constraint::Min(5),    // File list
            Constraint::Length(1), // Instructions
        ])
        .split(inner);

    let path_str = browser.current_dir.display().to_string();
    let max_width = chunks[0].width.saturating_sub(2) as usize;
    frame.render_widget(
        Paragraph::new(Span::styled(
            truncate_path(&path_str, max_width),
            Style::default().fg(Color::Cyan),
        )),
        chunks[0],
    );

    let visible = browser.visible_range(chunks[2].height as usize);
    let start_idx = visible.start;

    let items: Vec<ListItem> = browser.entries[visible]
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let is_selected = start_idx + i == browser.selected;

            let (icon, name, style) = if path == Path::new("..") {
                (
                    "[..]",
                    "Parent Directory".to_string(),
                    Style::default().fg(Color::Blue),
                )
            } else if path.is_dir() {
                (
                    "[D]",
                    path_display_name(path),
                    Style::default().fg(Color::Blue),
                )
            } else {
                (
                    "[S]",
                    path_display_name(path),
                    Style::default().fg(Color::Green),
                )
            };

            let display_style = if is_selected {
                style.add_modifier(Modifier::REVERSED)
            } else {
                style
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", icon), Style::default().fg(Color::DarkGray)),
                Span::styled(name, display_style),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items), chunks[2]);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("[Up/Down]", Style::default().fg(Color::Yellow)),
            Span::styled(" Navigate  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[Enter]", Style::default().fg(Color::Yellow)),
            Span::styled(" Select  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[Backspace]", Style::default().fg(Color::Yellow)),
            Span::styled(" Up  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[Esc]", Style::default().fg(Color::Yellow)),
            Span::styled(" Cancel", Style::default().fg(Color::DarkGray)),
        ])),
        chunks[3],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_path_keeps_tail() {
        assert_eq!(truncate_path("/a/b", 10), "/a/b");
        assert_eq!(truncate_path("/very/long/path/gm.sf2", 10), ".../gm.sf2");
    }
}
