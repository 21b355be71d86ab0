use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::{App, AppMode, StatusLevel};

pub fn render_table(frame: &mut Frame, area: Rect, app: &App) {
    let paragraph = Paragraph::new(app.table().view_lines());
    frame.render_widget(paragraph, area);
}

pub fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let palette = app.theme().palette();
    let dim = Style::default().fg(palette.text_dim);

    let mut first = vec![Span::styled(port_count(app), dim)];
    let status = if let Some(err) = app.last_error() {
        Some((err.to_string(), palette.status_error))
    } else if app.is_scanning() {
        Some(("scanning...".to_string(), palette.text_dim))
    } else {
        app.status().map(|status| {
            let color = match status.level {
                StatusLevel::Info => palette.status_info,
                StatusLevel::Warning => palette.status_warning,
                StatusLevel::Error => palette.status_error,
            };
            (status.display(), color)
        })
    };
    if let Some((text, color)) = status {
        first.push(Span::styled("  │  ", dim));
        first.push(Span::styled(text, Style::default().fg(color)));
    }

    let lines = vec![
        Line::from(first),
        Line::from(Span::styled(hints_for_mode(app.mode()), dim)),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn port_count(app: &App) -> String {
    let count = app.visible_count();
    let noun = if count == 1 { "port" } else { "ports" };
    if app.show_system() {
        format!("{count} {noun} (incl. system)")
    } else {
        format!("{count} {noun}")
    }
}

fn hints_for_mode(mode: AppMode) -> &'static str {
    match mode {
        AppMode::Normal => {
            "↑↓ navigate  enter expand  k kill  K force  p kill parent  / filter  s/S sort  t tree  ? help  q quit"
        }
        AppMode::Filter => "type to filter  enter apply  esc clear",
        AppMode::Confirm => "y confirm  n/esc cancel",
    }
}
