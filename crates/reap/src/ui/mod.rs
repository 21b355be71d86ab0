use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::{App, AppMode};

pub mod confirm;
pub mod help;
pub mod table;

pub fn render(frame: &mut Frame<'_>, app: &App) {
    let area = frame.size();
    let filter_height = u16::from(app.filter_bar_visible());
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(filter_height),
            Constraint::Min(2),
            Constraint::Length(2),
        ])
        .split(area);

    render_header(frame, layout[0], app);
    if filter_height > 0 {
        render_filter_bar(frame, layout[1], app);
    }
    table::render_table(frame, layout[2], app);
    table::render_status(frame, layout[3], app);

    if app.show_help() {
        help::render(frame, area, app);
    }
    if app.mode() == AppMode::Confirm {
        confirm::render(frame, area, app);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let palette = app.theme().palette();
    let style = Style::default()
        .fg(palette.header_fg)
        .bg(palette.header_bg)
        .add_modifier(Modifier::BOLD);
    let paragraph = Paragraph::new(Line::from(Span::raw(" reap — port monitor"))).style(style);
    frame.render_widget(paragraph, area);
}

fn render_filter_bar(frame: &mut Frame, area: Rect, app: &App) {
    let palette = app.theme().palette();
    let mut spans = vec![
        Span::styled("/ ", Style::default().fg(palette.filter_prompt)),
        Span::styled(
            app.filter().value().to_string(),
            Style::default().fg(palette.text_normal),
        ),
    ];
    if app.filter().is_active() {
        spans.push(Span::styled("█", Style::default().fg(palette.filter_prompt)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// A `width` x `height` rect centered in `area`, shrunk to fit.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width: width.max(1),
        height: height.max(1),
    }
}
