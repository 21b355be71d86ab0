use ratatui::style::{Color, Style};

use crate::config::{FALLBACK_COLOR, Theme};

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub header_fg: Color,
    pub header_bg: Color,
    pub table_header: Color,
    pub table_border: Color,
    pub text_normal: Color,
    pub text_dim: Color,
    pub highlight_fg: Color,
    pub highlight_selected: Color,
    pub kill_accent: Color,
    pub parent_accent: Color,
    pub filter_prompt: Color,
    pub status_info: Color,
    pub status_warning: Color,
    pub status_error: Color,
}

impl Theme {
    pub fn palette(self) -> Palette {
        match self {
            Theme::Pink => Palette {
                header_fg: Color::Indexed(15),
                header_bg: Color::Indexed(62),
                table_header: Color::Indexed(252),
                table_border: Color::Indexed(241),
                text_normal: Color::Indexed(252),
                text_dim: Color::Indexed(243),
                highlight_fg: Color::Indexed(15),
                highlight_selected: Color::Indexed(57),
                kill_accent: Color::Indexed(196),
                parent_accent: Color::Indexed(214),
                filter_prompt: Color::Indexed(205),
                status_info: Color::Indexed(82),
                status_warning: Color::Indexed(220),
                status_error: Color::Indexed(196),
            },
            Theme::Serious => Palette {
                header_fg: Color::White,
                header_bg: Color::DarkGray,
                table_header: Color::White,
                table_border: Color::DarkGray,
                text_normal: Color::Gray,
                text_dim: Color::DarkGray,
                highlight_fg: Color::Black,
                highlight_selected: Color::Gray,
                kill_accent: Color::Red,
                parent_accent: Color::Yellow,
                filter_prompt: Color::Cyan,
                status_info: Color::Green,
                status_warning: Color::Yellow,
                status_error: Color::Red,
            },
        }
    }
}

/// Named port colors as they appear in the config file.
pub fn named_color(name: &str) -> Option<Color> {
    let color = match name {
        "green" => Color::Indexed(82),
        "yellow" => Color::Indexed(220),
        "cyan" => Color::Indexed(87),
        "magenta" => Color::Indexed(213),
        "red" => Color::Indexed(196),
        "blue" => Color::Indexed(75),
        "white" => Color::Indexed(15),
        "dim" => Color::Indexed(241),
        _ => return None,
    };
    Some(color)
}

pub fn port_style(color_name: &str) -> Style {
    let color = named_color(color_name)
        .or_else(|| named_color(FALLBACK_COLOR))
        .unwrap_or(Color::Reset);
    Style::default().fg(color)
}

/// Legend shown in the help popup.
pub const COLOR_LEGEND: [(&str, &str); 8] = [
    ("green", "frontend"),
    ("yellow", "backend"),
    ("cyan", "flask/vite"),
    ("magenta", "postgres"),
    ("red", "redis"),
    ("blue", "mysql/mongo"),
    ("white", "http/s"),
    ("dim", "other"),
];
