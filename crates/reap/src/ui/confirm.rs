use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::app::App;
use crate::confirm::ConfirmDialog;
use crate::theme::Palette;

const POPUP_WIDTH: u16 = 56;
const POPUP_HEIGHT: u16 = 10;

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let palette = app.theme().palette();
    let dialog = app.confirm();
    let popup = super::centered_rect(POPUP_WIDTH, POPUP_HEIGHT, area);

    let accent = if dialog.kill_parent() {
        palette.parent_accent
    } else {
        palette.kill_accent
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent))
        .title(Line::from(Span::styled(
            format!(" {} ", title(dialog)),
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        )));

    let paragraph = Paragraph::new(body(dialog, &palette))
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, popup);
    frame.render_widget(paragraph, popup);
}

fn title(dialog: &ConfirmDialog) -> String {
    let signal = dialog.signal().name();
    if dialog.kill_parent() {
        format!("Kill PARENT process? ({signal})")
    } else {
        format!("Kill process? ({signal})")
    }
}

fn body(dialog: &ConfirmDialog, palette: &Palette) -> Vec<Line<'static>> {
    let target = dialog.target();
    let label = Style::default().fg(palette.text_dim);
    let value = Style::default().fg(palette.text_normal);
    let field = |name: &str, text: String| {
        Line::from(vec![
            Span::styled(format!("  {name:<9}"), label),
            Span::styled(text, value),
        ])
    };

    let mut lines = vec![Line::default()];
    if dialog.kill_parent() {
        lines.push(field(
            "Target:",
            format!("{} (PID {}, port {})", target.process, target.pid, target.port),
        ));
        lines.push(field("Parent:", format!("PID {}", dialog.target_pid())));
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "  This will kill the parent and all its children.",
            Style::default().fg(palette.parent_accent),
        )));
    } else {
        lines.push(field("Process:", target.process.clone()));
        lines.push(field("PID:", target.pid.to_string()));
        lines.push(field("Port:", target.port.to_string()));
        lines.push(field("User:", target.user.clone()));
    }
    lines.push(Line::default());

    let bold = value.add_modifier(Modifier::BOLD);
    lines.push(Line::from(vec![
        Span::raw("  "),
        Span::styled("y", bold),
        Span::styled(
            format!(" confirm ({})  ", dialog.signal().description()),
            label,
        ),
        Span::styled("n/esc", bold),
        Span::styled(" cancel", label),
    ]));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Theme;
    use crate::ports::PortInfo;

    fn text(lines: &[Line<'_>]) -> String {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn dialog(force: bool, kill_parent: bool) -> ConfirmDialog {
        let mut dialog = ConfirmDialog::default();
        dialog.show(
            PortInfo {
                port: 3000,
                pid: 500,
                ppid: 100,
                process: "node".into(),
                user: "dev".into(),
                ..PortInfo::default()
            },
            force,
            kill_parent,
        );
        dialog
    }

    #[test]
    fn plain_kill_lists_target() {
        let dialog = dialog(true, false);
        assert_eq!(title(&dialog), "Kill process? (SIGKILL)");
        let body = text(&body(&dialog, &Theme::Pink.palette()));
        assert!(body.contains("PID:     500"));
        assert!(body.contains("User:    dev"));
        assert!(body.contains("force kill"));
    }

    #[test]
    fn parent_kill_shows_parent_pid() {
        let dialog = dialog(false, true);
        assert_eq!(title(&dialog), "Kill PARENT process? (SIGTERM)");
        let body = text(&body(&dialog, &Theme::Serious.palette()));
        assert!(body.contains("node (PID 500, port 3000)"));
        assert!(body.contains("Parent:  PID 100"));
    }
}
