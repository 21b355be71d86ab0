use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::app::App;
use crate::theme::{COLOR_LEGEND, port_style};

const KEYS: [(&str, &str); 16] = [
    ("↑ / ↓ j", "move selection"),
    ("enter", "expand / collapse row"),
    ("esc", "collapse row"),
    ("k", "kill (SIGTERM)"),
    ("K", "force kill (SIGKILL)"),
    ("p", "kill parent process"),
    ("/", "filter"),
    ("s", "next sort column"),
    ("S", "reverse sort"),
    ("t", "toggle tree view"),
    ("a", "toggle system processes"),
    ("r", "refresh now"),
    ("?", "toggle this help"),
    ("q", "quit"),
    ("ctrl+c", "quit from any mode"),
    ("y / n", "answer a kill prompt"),
];

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let palette = app.theme().palette();
    let popup = super::centered_rect(52, KEYS.len() as u16 + 7, area);

    let heading = Style::default()
        .fg(palette.table_header)
        .add_modifier(Modifier::BOLD);
    let body = Style::default().fg(palette.text_normal);
    let dim = Style::default().fg(palette.text_dim);

    let mut lines = vec![Line::from(Span::styled("KEYS", heading))];
    for (key, action) in KEYS {
        lines.push(Line::from(vec![
            Span::styled(format!("  {key:<10}"), body.add_modifier(Modifier::BOLD)),
            Span::styled(action, body),
        ]));
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled("PORT COLORS", heading)));
    let mut legend = vec![Span::raw("  ")];
    for (color, meaning) in COLOR_LEGEND {
        legend.push(Span::styled("●", port_style(color)));
        legend.push(Span::styled(format!(" {meaning}  "), dim));
    }
    lines.push(Line::from(legend));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.table_border))
        .title(Line::from(Span::styled(" reap help ", heading)));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, popup);
    frame.render_widget(paragraph, popup);
}
