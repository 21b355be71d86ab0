use std::cmp::Ordering;

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::config::{Config, SortField};
use crate::ports::PortInfo;
use crate::theme::{Palette, port_style};
use crate::tree::{RowMeta, build_tree};

const MARKER_WIDTH: usize = 2;
const DETAIL_INDENT: &str = "      ";
const DETAIL_LABEL_WIDTH: usize = 12;

struct Column {
    title: &'static str,
    width: usize,
}

const COLUMNS: [Column; 6] = [
    Column { title: "PORT", width: 8 },
    Column { title: "PID", width: 8 },
    Column { title: "PROCESS", width: 20 },
    Column { title: "USER", width: 12 },
    Column { title: "MEMORY", width: 10 },
    Column { title: "UPTIME", width: 10 },
];

const LISTING_HEADER: [&str; 9] = [
    "PORT", "PID", "PROCESS", "USER", "MEMORY", "UPTIME", "CONTAINER", "DIR", "ADDRESS",
];

impl SortField {
    pub const ALL: [SortField; 6] = [
        SortField::Port,
        SortField::Pid,
        SortField::Process,
        SortField::User,
        SortField::Memory,
        SortField::Uptime,
    ];

    pub fn next(self) -> Self {
        let idx = SortField::ALL
            .iter()
            .position(|field| *field == self)
            .unwrap_or(0);
        SortField::ALL[(idx + 1) % SortField::ALL.len()]
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SortField::Port => "port",
            SortField::Pid => "PID",
            SortField::Process => "process",
            SortField::User => "user",
            SortField::Memory => "memory",
            SortField::Uptime => "uptime",
        }
    }

    fn column_index(self) -> usize {
        SortField::ALL
            .iter()
            .position(|field| *field == self)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SortState {
    pub field: SortField,
    pub ascending: bool,
}

/// The navigable projection of the current (already filtered) port records.
pub struct PortTable {
    sort: SortState,
    config: Config,
    displayed: Vec<PortInfo>,
    meta: Vec<RowMeta>,
    tree_mode: bool,
    expanded: Option<usize>,
    cursor: usize,
    offset: usize,
    height: usize,
    width: usize,
}

impl PortTable {
    pub fn new(config: &Config) -> Self {
        Self {
            sort: SortState {
                field: config.sort_by,
                ascending: true,
            },
            config: config.clone(),
            displayed: Vec::new(),
            meta: Vec::new(),
            tree_mode: true,
            expanded: None,
            cursor: 0,
            offset: 0,
            height: 0,
            width: 0,
        }
    }

    pub fn set_rows(&mut self, items: &[PortInfo]) {
        let mut sorted = items.to_vec();
        let sort = self.sort;
        sorted.sort_by(|a, b| compare_records(sort, a, b));

        if self.tree_mode {
            let (rows, meta) = build_tree(&sorted);
            self.displayed = rows;
            self.meta = meta;
        } else {
            self.meta = vec![RowMeta::default(); sorted.len()];
            self.displayed = sorted;
        }

        if self.cursor >= self.displayed.len() {
            self.cursor = self.displayed.len().saturating_sub(1);
        }
        if self
            .expanded
            .is_some_and(|expanded| expanded >= self.displayed.len())
        {
            self.expanded = None;
        }
        self.clamp_scroll();
    }

    pub fn move_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
        self.clamp_scroll();
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.displayed.len() {
            self.cursor += 1;
        }
        self.clamp_scroll();
    }

    pub fn toggle_expand(&mut self) {
        if self.displayed.is_empty() {
            return;
        }
        self.expanded = if self.expanded == Some(self.cursor) {
            None
        } else {
            Some(self.cursor)
        };
        self.clamp_scroll();
    }

    pub fn collapse(&mut self) {
        self.expanded = None;
        self.clamp_scroll();
    }

    /// Takes effect on the next `set_rows`.
    pub fn toggle_tree(&mut self) {
        self.tree_mode = !self.tree_mode;
    }

    pub fn set_tree_mode(&mut self, enabled: bool) {
        self.tree_mode = enabled;
    }

    pub fn next_sort(&mut self) {
        self.sort.field = self.sort.field.next();
        self.sort.ascending = true;
    }

    pub fn reverse_sort(&mut self) {
        self.sort.ascending = !self.sort.ascending;
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height;
        self.clamp_scroll();
    }

    pub fn set_width(&mut self, width: usize) {
        self.width = width;
    }

    pub fn selected(&self) -> Option<&PortInfo> {
        self.displayed.get(self.cursor)
    }

    pub fn displayed(&self) -> &[PortInfo] {
        &self.displayed
    }

    pub fn meta(&self) -> &[RowMeta] {
        &self.meta
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn expanded(&self) -> Option<usize> {
        self.expanded
    }

    pub fn tree_mode(&self) -> bool {
        self.tree_mode
    }

    pub fn sort(&self) -> SortState {
        self.sort
    }

    pub fn row_lines(&self, row: usize) -> usize {
        match (self.expanded, self.displayed.get(row)) {
            (Some(expanded), Some(record)) if expanded == row => {
                1 + expanded_line_count(record)
            }
            _ => 1,
        }
    }

    fn clamp_scroll(&mut self) {
        if self.cursor < self.offset {
            self.offset = self.cursor;
        }
        let last = self.cursor.min(self.displayed.len().saturating_sub(1));
        let mut lines: usize = (self.offset..=last)
            .filter(|row| *row < self.displayed.len())
            .map(|row| self.row_lines(row))
            .sum();
        while lines > self.height && self.offset < self.cursor {
            lines -= self.row_lines(self.offset);
            self.offset += 1;
        }
    }

    /// Header, separator, then exactly `height` body lines.
    pub fn view_lines(&self) -> Vec<Line<'static>> {
        let palette = self.config.theme.palette();
        let mut lines = Vec::with_capacity(self.height + 2);
        lines.push(self.header_line(&palette));
        lines.push(Line::from(Span::styled(
            "─".repeat(self.width),
            Style::default().fg(palette.table_border),
        )));

        let mut used = 0;
        for row in self.offset..self.displayed.len() {
            let needed = self.row_lines(row);
            if used + needed > self.height {
                break;
            }
            lines.push(self.row_line(row, &palette));
            if self.expanded == Some(row) {
                lines.extend(self.detail_lines(&self.displayed[row], &palette));
            }
            used += needed;
        }

        lines.extend((used..self.height).map(|_| Line::default()));
        lines
    }

    fn header_line(&self, palette: &Palette) -> Line<'static> {
        let style = Style::default()
            .fg(palette.table_header)
            .add_modifier(Modifier::BOLD);
        let sorted_column = self.sort.field.column_index();

        let mut spans = vec![Span::raw(" ".repeat(MARKER_WIDTH))];
        for (idx, column) in COLUMNS.iter().enumerate() {
            let title = if idx == sorted_column {
                let arrow = if self.sort.ascending { "▲" } else { "▼" };
                format!("{} {}", column.title, arrow)
            } else {
                column.title.to_string()
            };
            spans.push(Span::styled(fit(&title, column.width), style));
        }
        Line::from(spans)
    }

    fn row_line(&self, row: usize, palette: &Palette) -> Line<'static> {
        let record = &self.displayed[row];
        let meta = &self.meta[row];
        let is_expanded = self.expanded == Some(row);
        let is_cursor = self.cursor == row;

        let marker = if is_expanded {
            "▼ "
        } else if is_cursor {
            "▸ "
        } else {
            "  "
        };

        let cell_style = if meta.is_child {
            Style::default().fg(palette.text_dim)
        } else {
            Style::default().fg(palette.text_normal)
        };
        let process = format!("{}{}", meta.tree_prefix, record.process);

        let mut spans = vec![
            Span::styled(marker, Style::default().fg(palette.highlight_fg)),
            Span::styled(
                fit(&record.port.to_string(), COLUMNS[0].width),
                port_style(self.config.port_color(record.port)),
            ),
            Span::styled(fit(&record.pid.to_string(), COLUMNS[1].width), cell_style),
            Span::styled(fit(&process, COLUMNS[2].width), cell_style),
            Span::styled(fit(&record.user, COLUMNS[3].width), cell_style),
            Span::styled(fit(&record.memory, COLUMNS[4].width), cell_style),
            Span::styled(fit(&record.uptime, COLUMNS[5].width), cell_style),
        ];

        if is_cursor || is_expanded {
            for span in &mut spans {
                span.style = span.style.bg(palette.highlight_selected);
            }
        }
        Line::from(spans)
    }

    fn detail_lines(&self, record: &PortInfo, palette: &Palette) -> Vec<Line<'static>> {
        let label_style = Style::default().fg(palette.text_dim);
        let value_style = Style::default().fg(palette.text_normal);
        let detail = |label: &str, value: String| {
            Line::from(vec![
                Span::raw(DETAIL_INDENT),
                Span::styled(
                    format!("{:<width$}", label, width = DETAIL_LABEL_WIDTH),
                    label_style,
                ),
                Span::styled(value, value_style),
            ])
        };

        let mut lines = vec![
            detail("Address", self.address_text(record)),
            detail("Command", or_dash(&record.command)),
        ];
        if !record.cwd.is_empty() {
            lines.push(detail("Directory", record.cwd.clone()));
        }
        if !record.container.is_empty() {
            lines.push(detail("Container", record.container.clone()));
        }
        if record.ppid > 1 {
            lines.push(Line::from(vec![
                Span::raw(DETAIL_INDENT),
                Span::styled(
                    format!("{:<width$}", "Parent PID", width = DETAIL_LABEL_WIDTH),
                    label_style,
                ),
                Span::styled(
                    record.ppid.to_string(),
                    Style::default().fg(palette.parent_accent),
                ),
                Span::styled("  [p kill parent]", label_style),
            ]));
        }
        lines
    }

    fn address_text(&self, record: &PortInfo) -> String {
        let address = format!("{}:{}", record.address, record.port);
        match self.config.port_label(record.port) {
            Some(label) => format!("{address} ({label})"),
            None => address,
        }
    }

    /// Plain aligned text for non-interactive output.
    pub fn render_listing(&self) -> String {
        let rows: Vec<[String; 9]> = self
            .displayed
            .iter()
            .zip(&self.meta)
            .map(|(record, meta)| {
                [
                    record.port.to_string(),
                    record.pid.to_string(),
                    format!("{}{}", meta.tree_prefix, record.process),
                    or_dash(&record.user),
                    or_dash(&record.memory),
                    or_dash(&record.uptime),
                    or_dash(&record.container),
                    or_dash(&record.cwd),
                    self.address_text(record),
                ]
            })
            .collect();

        let mut widths = LISTING_HEADER.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        let header = LISTING_HEADER.map(str::to_string);
        for cells in std::iter::once(&header).chain(&rows) {
            let mut line = String::new();
            for (idx, cell) in cells.iter().enumerate() {
                if idx + 1 == cells.len() {
                    line.push_str(cell);
                } else {
                    line.push_str(&format!("{:<width$}  ", cell, width = widths[idx]));
                }
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

/// Address and command lines always show; the rest only when present.
pub fn expanded_line_count(record: &PortInfo) -> usize {
    let mut lines = 2;
    if !record.cwd.is_empty() {
        lines += 1;
    }
    if !record.container.is_empty() {
        lines += 1;
    }
    if record.ppid > 1 {
        lines += 1;
    }
    lines
}

fn compare_records(sort: SortState, a: &PortInfo, b: &PortInfo) -> Ordering {
    let ordering = match sort.field {
        SortField::Port => a.port.cmp(&b.port),
        SortField::Pid => a.pid.cmp(&b.pid),
        SortField::Process => a.process.to_lowercase().cmp(&b.process.to_lowercase()),
        SortField::User => a.user.to_lowercase().cmp(&b.user.to_lowercase()),
        SortField::Memory => a.memory_kb.cmp(&b.memory_kb),
        SortField::Uptime => a.uptime_secs.cmp(&b.uptime_secs),
    };
    let ordering = if sort.ascending {
        ordering
    } else {
        ordering.reverse()
    };
    ordering
        .then_with(|| a.port.cmp(&b.port))
        .then_with(|| a.pid.cmp(&b.pid))
}

fn or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

/// Truncates with an ellipsis so one space always separates columns, then pads.
fn fit(value: &str, width: usize) -> String {
    let text = truncated_with_indicator(value, width.saturating_sub(1));
    format!("{text:<width$}")
}

fn truncated_with_indicator(value: &str, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        value.to_string()
    } else {
        value
            .chars()
            .take(max_len.saturating_sub(1))
            .collect::<String>()
            + "…"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(port: u16, pid: u32, ppid: u32) -> PortInfo {
        PortInfo {
            port,
            pid,
            ppid,
            process: format!("proc{pid}"),
            user: "dev".into(),
            address: "*".into(),
            ..PortInfo::default()
        }
    }

    fn table_with(rows: &[PortInfo], height: usize) -> PortTable {
        let mut table = PortTable::new(&Config::default());
        table.set_width(80);
        table.set_height(height);
        table.set_rows(rows);
        table
    }

    fn ports(table: &PortTable) -> Vec<u16> {
        table.displayed().iter().map(|r| r.port).collect()
    }

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn sorts_by_port_descending() {
        let mut table = table_with(&[rec(3000, 1, 0), rec(5432, 2, 0), rec(8000, 3, 0)], 10);
        table.reverse_sort();
        table.set_rows(&[rec(3000, 1, 0), rec(5432, 2, 0), rec(8000, 3, 0)]);
        assert_eq!(ports(&table), vec![8000, 5432, 3000]);
    }

    #[test]
    fn next_sort_cycles_and_resets_direction() {
        let mut table = table_with(&[], 10);
        table.reverse_sort();
        table.next_sort();
        assert_eq!(
            table.sort(),
            SortState {
                field: SortField::Pid,
                ascending: true
            }
        );
        for _ in 0..5 {
            table.next_sort();
        }
        assert_eq!(table.sort().field, SortField::Port);
    }

    #[test]
    fn memory_sort_uses_raw_value() {
        let mut small = rec(1, 10, 0);
        small.memory_kb = 900;
        small.memory = "900 KB".into();
        let mut large = rec(2, 20, 0);
        large.memory_kb = 2048;
        large.memory = "2.0 MB".into();

        let mut table = PortTable::new(&Config {
            sort_by: SortField::Memory,
            ..Config::default()
        });
        table.reverse_sort();
        table.set_rows(&[small, large]);
        assert_eq!(ports(&table), vec![2, 1]);
    }

    #[test]
    fn ties_break_on_port_then_pid() {
        let mut a = rec(9000, 5, 0);
        let mut b = rec(80, 6, 0);
        a.user = "root".into();
        b.user = "root".into();
        let mut table = PortTable::new(&Config {
            sort_by: SortField::User,
            ..Config::default()
        });
        table.set_tree_mode(false);
        table.set_rows(&[a.clone(), b.clone()]);
        assert_eq!(ports(&table), vec![80, 9000]);
        table.reverse_sort();
        table.set_rows(&[a, b]);
        assert_eq!(ports(&table), vec![80, 9000]);
    }

    #[test]
    fn set_rows_is_idempotent() {
        let input = vec![
            rec(8000, 20, 10),
            rec(3000, 10, 1),
            rec(5432, 30, 700),
            rec(6379, 40, 700),
            rec(3001, 10, 1),
        ];
        let mut table = table_with(&input, 10);
        let first = table.displayed().to_vec();
        let first_meta = table.meta().to_vec();
        table.set_rows(&first);
        assert_eq!(table.displayed(), first.as_slice());
        assert_eq!(table.meta(), first_meta.as_slice());
    }

    #[test]
    fn flat_mode_has_empty_metadata() {
        let mut table = table_with(&[rec(1, 10, 1), rec(2, 10, 1)], 10);
        assert!(table.meta()[1].is_child);
        table.toggle_tree();
        table.set_rows(&[rec(1, 10, 1), rec(2, 10, 1)]);
        assert!(!table.tree_mode());
        assert!(table.meta().iter().all(|meta| *meta == RowMeta::default()));
    }

    #[test]
    fn cursor_and_expanded_are_clamped() {
        let rows: Vec<PortInfo> = (1..=6).map(|i| rec(i, u32::from(i) * 10, 0)).collect();
        let mut table = table_with(&rows, 20);
        for _ in 0..5 {
            table.move_down();
        }
        table.toggle_expand();
        assert_eq!(table.cursor(), 5);
        assert_eq!(table.expanded(), Some(5));

        table.set_rows(&rows[..2]);
        assert_eq!(table.cursor(), 1);
        assert_eq!(table.expanded(), None);

        table.set_rows(&[]);
        assert_eq!(table.cursor(), 0);
        assert_eq!(table.offset(), 0);
        assert!(table.selected().is_none());
    }

    #[test]
    fn movement_is_clamped() {
        let mut table = table_with(&[], 5);
        table.move_down();
        table.move_up();
        table.toggle_expand();
        assert_eq!(table.cursor(), 0);
        assert_eq!(table.expanded(), None);

        table.set_rows(&[rec(1, 1, 0), rec(2, 2, 0)]);
        table.move_up();
        assert_eq!(table.cursor(), 0);
        table.move_down();
        table.move_down();
        assert_eq!(table.cursor(), 1);
    }

    #[test]
    fn toggle_expand_collapses_same_row() {
        let mut table = table_with(&[rec(1, 1, 0), rec(2, 2, 0)], 10);
        table.toggle_expand();
        assert_eq!(table.expanded(), Some(0));
        table.move_down();
        table.toggle_expand();
        assert_eq!(table.expanded(), Some(1));
        table.toggle_expand();
        assert_eq!(table.expanded(), None);
        table.toggle_expand();
        table.collapse();
        assert_eq!(table.expanded(), None);
    }

    #[test]
    fn scroll_keeps_cursor_visible() {
        let rows: Vec<PortInfo> = (1..=10).map(|i| rec(i, u32::from(i), 0)).collect();
        let mut table = table_with(&rows, 3);
        for _ in 0..5 {
            table.move_down();
        }
        assert_eq!(table.cursor(), 5);
        assert_eq!(table.offset(), 3);
        for _ in 0..5 {
            table.move_up();
        }
        assert_eq!(table.offset(), 0);
    }

    #[test]
    fn expanding_near_bottom_scrolls() {
        let rows: Vec<PortInfo> = (1..=6).map(|i| rec(i, u32::from(i), 0)).collect();
        let mut table = table_with(&rows, 4);
        for _ in 0..3 {
            table.move_down();
        }
        assert_eq!(table.offset(), 0);
        table.toggle_expand();
        assert_eq!(table.row_lines(3), 3);
        assert_eq!(table.offset(), 2);
    }

    #[test]
    fn expanded_line_count_matches_fields() {
        let mut record = rec(3000, 500, 1);
        assert_eq!(expanded_line_count(&record), 2);
        record.cwd = "/srv/app".into();
        record.container = "web".into();
        record.ppid = 100;
        assert_eq!(expanded_line_count(&record), 5);
    }

    #[test]
    fn view_has_constant_height() {
        let rows: Vec<PortInfo> = (1..=3).map(|i| rec(i, u32::from(i), 0)).collect();
        let mut table = table_with(&rows, 8);
        assert_eq!(table.view_lines().len(), 10);
        table.toggle_expand();
        assert_eq!(table.view_lines().len(), 10);

        let many: Vec<PortInfo> = (1..=40).map(|i| rec(i, u32::from(i), 0)).collect();
        table.set_rows(&many);
        assert_eq!(table.view_lines().len(), 10);

        table.set_rows(&[]);
        assert_eq!(table.view_lines().len(), 10);
    }

    #[test]
    fn view_marks_cursor_and_sort_column() {
        let mut table = table_with(&[rec(3000, 1, 0), rec(8000, 2, 0)], 4);
        table.reverse_sort();
        table.set_rows(&[rec(3000, 1, 0), rec(8000, 2, 0)]);
        let lines = table.view_lines();
        assert!(text(&lines[0]).contains("PORT ▼"));
        assert!(text(&lines[2]).starts_with("▸ 8000"));
        assert!(text(&lines[3]).starts_with("  3000"));
    }

    #[test]
    fn expanded_row_shows_details() {
        let mut record = rec(3000, 500, 100);
        record.cwd = "/srv/app".into();
        record.command = "node server.js".into();
        let mut config = Config::default();
        config.port_labels.insert("3000".into(), "frontend".into());
        let mut table = PortTable::new(&config);
        table.set_height(10);
        table.set_rows(&[record]);
        table.toggle_expand();

        let lines: Vec<String> = table.view_lines().iter().map(text).collect();
        assert!(lines[2].starts_with("▼ 3000"));
        assert!(lines[3].contains("*:3000 (frontend)"));
        assert!(lines[4].contains("node server.js"));
        assert!(lines[5].contains("/srv/app"));
        assert!(lines[6].contains("Parent PID") && lines[6].contains("[p kill parent]"));
        assert!(lines[7].is_empty());
    }

    #[test]
    fn oversized_expanded_row_is_not_drawn() {
        let mut record = rec(3000, 500, 100);
        record.cwd = "/srv".into();
        let mut table = table_with(&[record], 2);
        table.toggle_expand();
        let lines = table.view_lines();
        assert_eq!(lines.len(), 4);
        assert!(lines[2..].iter().all(|line| text(line).is_empty()));
    }

    #[test]
    fn long_process_names_are_truncated() {
        let mut record = rec(3000, 1, 0);
        record.process = "a-very-long-process-name-indeed".into();
        let table = table_with(&[record], 2);
        let row = text(&table.view_lines()[2]);
        assert!(row.contains("a-very-long-proces…"));
    }

    #[test]
    fn listing_is_aligned() {
        let mut record = rec(3000, 42, 0);
        record.process = "node".into();
        record.memory = "12.0 MB".into();
        let table = table_with(&[record, rec(5432, 7, 0)], 0);
        let listing = table.render_listing();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("PORT  PID  PROCESS"));
        assert!(lines[1].starts_with("3000  42   node"));
        assert!(lines[1].ends_with("*:3000"));
        assert!(lines[2].contains(" - "));
        let address_column = lines[0].find("ADDRESS").unwrap();
        assert_eq!(lines[1].find("*:3000"), Some(address_column));
    }
}
