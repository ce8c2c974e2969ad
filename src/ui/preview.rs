//! Preview surfaces.
//!
//! Both surfaces render the same [`SurfaceModel`]: the compact one packs the
//! transport into a three-row bar, the full one spreads it over the screen
//! with key hints.

use crate::app::LayoutRegions;
use crate::transport::SurfaceModel;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, LineGauge, Paragraph};
use ratatui::Frame;

fn play_span(playing: bool) -> Span<'static> {
    if playing {
        Span::styled(
            " [||] ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            " [>] ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    }
}

fn restart_span() -> Span<'static> {
    Span::styled(" [|<] ", Style::default().fg(Color::Cyan))
}

fn slider(ratio: f64) -> LineGauge<'static> {
    LineGauge::default()
        .filled_style(Style::default().fg(Color::Cyan))
        .unfilled_style(Style::default().fg(Color::DarkGray))
        .label("")
        .ratio(ratio.clamp(0.0, 1.0))
}

/// Renders the compact surface: one bordered bar titled with the file name.
pub fn render_compact(
    frame: &mut Frame,
    area: Rect,
    surface: &SurfaceModel,
    layout: &mut LayoutRegions,
) {
    let area = Rect {
        height: area.height.min(3),
        ..area
    };
    let block = Block::default()
        .title(format!(" {} ", surface.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let elapsed_width = surface.elapsed.len() as u16 + 1;
    let total_width = surface.total.len() as u16 + 1;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(6),             // Play/pause
            Constraint::Length(6),             // Restart
            Constraint::Length(elapsed_width), // Elapsed
            Constraint::Min(4),                // Slider
            Constraint::Length(total_width),   // Total
        ])
        .split(inner);

    frame.render_widget(Paragraph::new(play_span(surface.playing)), chunks[0]);
    frame.render_widget(Paragraph::new(restart_span()), chunks[1]);
    frame.render_widget(
        Paragraph::new(Span::styled(
            surface.elapsed.as_str(),
            Style::default().fg(Color::White),
        )),
        chunks[2],
    );
    frame.render_widget(slider(surface.ratio), chunks[3]);
    frame.render_widget(
        Paragraph::new(Span::styled(
            format!(" {}", surface.total),
            Style::default().fg(Color::DarkGray),
        )),
        chunks[4],
    );

    layout.play_button = chunks[0];
    layout.restart_button = chunks[1];
    layout.slider = chunks[3];
}

/// Renders the full surface.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `surface` - State pushed by the transport
/// * `status` - Transient status message, if any
/// * `layout` - Receives the clickable regions
pub fn render_full(
    frame: &mut Frame,
    area: Rect,
    surface: &SurfaceModel,
    status: Option<&str>,
    layout: &mut LayoutRegions,
) {
    let block = Block::default()
        .title(" Preview ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // File name
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // Slider
            Constraint::Length(1), // Time labels
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // Buttons
            Constraint::Min(1),    // Filler
            Constraint::Length(1), // Status
            Constraint::Length(1), // Instructions
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(Span::styled(
            surface.title.as_str(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ))
        .centered(),
        rows[1],
    );

    let slider_area = rows[3].inner(ratatui::layout::Margin::new(2, 0));
    frame.render_widget(slider(surface.ratio), slider_area);

    let labels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[4].inner(ratatui::layout::Margin::new(2, 0)));
    frame.render_widget(
        Paragraph::new(Span::styled(
            surface.elapsed.as_str(),
            Style::default().fg(Color::White),
        )),
        labels[0],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            surface.total.as_str(),
            Style::default().fg(Color::DarkGray),
        ))
        .right_aligned(),
        labels[1],
    );

    // Buttons centered under the slider
    let button_row = rows[6];
    let start = button_row.x + button_row.width.saturating_sub(14) / 2;
    let play_area = Rect::new(start, button_row.y, 6, 1).intersection(button_row);
    let restart_area = Rect::new(start + 8, button_row.y, 6, 1).intersection(button_row);
    frame.render_widget(Paragraph::new(play_span(surface.playing)), play_area);
    frame.render_widget(Paragraph::new(restart_span()), restart_area);

    if let Some(msg) = status {
        frame.render_widget(
            Paragraph::new(Span::styled(
                msg,
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ))
            .centered(),
            rows[8],
        );
    }

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("[Space]", Style::default().fg(Color::Yellow)),
            Span::styled(" Play/Pause  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[r]", Style::default().fg(Color::Yellow)),
            Span::styled(" Restart  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[Left/Right]", Style::default().fg(Color::Yellow)),
            Span::styled(" Seek  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[,]", Style::default().fg(Color::Yellow)),
            Span::styled(" Soundbank  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[q]", Style::default().fg(Color::Yellow)),
            Span::styled(" Quit", Style::default().fg(Color::DarkGray)),
        ]))
        .centered(),
        rows[9],
    );

    layout.play_button = play_area;
    layout.restart_button = restart_area;
    layout.slider = slider_area;
}
