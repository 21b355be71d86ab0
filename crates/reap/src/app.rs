use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::{Config, Theme};
use crate::confirm::ConfirmDialog;
use crate::filter::{FilterInput, is_system_process};
use crate::ports::PortInfo;
use crate::signals::Signal;
use crate::table::PortTable;

/// Rows taken by the header, table header, separator and status bar.
const CHROME_HEIGHT: u16 = 5;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AppMode {
    Normal,
    Filter,
    Confirm,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
    pub at: DateTime<Local>,
}

impl StatusMessage {
    pub fn display(&self) -> String {
        format!("{} {}", self.at.format("%H:%M:%S"), self.text)
    }
}

/// Inputs to the state machine. Results of background work arrive here too.
#[derive(Debug)]
pub enum Message {
    Tick,
    ScanFinished(anyhow::Result<Vec<PortInfo>>),
    KillFinished {
        pid: u32,
        force: bool,
        result: Result<(), String>,
    },
    Key(KeyEvent),
    Resize { width: u16, height: u16 },
}

/// Work the event loop performs on behalf of the state machine.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Effect {
    Scan,
    ScheduleTick,
    Kill { pid: u32, force: bool },
    Quit,
}

pub struct App {
    config: Config,
    records: Vec<PortInfo>,
    filtered: Vec<PortInfo>,
    table: PortTable,
    filter: FilterInput,
    confirm: ConfirmDialog,
    mode: AppMode,
    scanning: bool,
    rescan_pending: bool,
    show_help: bool,
    show_system: bool,
    last_error: Option<String>,
    status: Option<StatusMessage>,
    height: u16,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            table: PortTable::new(&config),
            show_system: config.show_system,
            config,
            records: Vec::new(),
            filtered: Vec::new(),
            filter: FilterInput::default(),
            confirm: ConfirmDialog::default(),
            mode: AppMode::Normal,
            scanning: false,
            rescan_pending: false,
            show_help: false,
            last_error: None,
            status: None,
            height: 0,
        }
    }

    /// Kicks off the first scan and the periodic timer.
    pub fn start(&mut self) -> Vec<Effect> {
        let mut effects = self.request_scan();
        effects.push(Effect::ScheduleTick);
        effects
    }

    pub fn update(&mut self, message: Message) -> Vec<Effect> {
        match message {
            Message::Tick => {
                let mut effects = Vec::new();
                if !self.scanning {
                    self.scanning = true;
                    effects.push(Effect::Scan);
                }
                effects.push(Effect::ScheduleTick);
                effects
            }
            Message::ScanFinished(result) => {
                self.scanning = false;
                match result {
                    Ok(records) => {
                        self.last_error = None;
                        self.records = records;
                        self.apply_filter();
                    }
                    Err(err) => {
                        log::warn!("scan failed: {err:#}");
                        self.last_error = Some(format!("scan failed: {err:#}"));
                    }
                }
                if self.rescan_pending {
                    self.rescan_pending = false;
                    self.request_scan()
                } else {
                    Vec::new()
                }
            }
            Message::KillFinished { pid, force, result } => {
                match result {
                    Ok(()) => self.set_status(
                        StatusLevel::Info,
                        format!("killed PID {} ({})", pid, Signal::for_force(force).name()),
                    ),
                    Err(err) => {
                        self.set_status(StatusLevel::Error, format!("kill PID {pid} failed: {err}"))
                    }
                }
                self.request_scan()
            }
            Message::Key(event) => self.handle_input(event),
            Message::Resize { width, height } => {
                self.height = height;
                self.table.set_width(usize::from(width));
                self.sync_table_height();
                Vec::new()
            }
        }
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn theme(&self) -> Theme {
        self.config.theme
    }

    pub fn table(&self) -> &PortTable {
        &self.table
    }

    pub fn filter(&self) -> &FilterInput {
        &self.filter
    }

    pub fn confirm(&self) -> &ConfirmDialog {
        &self.confirm
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn show_system(&self) -> bool {
        self.show_system
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn visible_count(&self) -> usize {
        self.filtered.len()
    }

    pub fn filter_bar_visible(&self) -> bool {
        self.filter.is_active() || !self.filter.value().is_empty()
    }

    fn handle_input(&mut self, event: KeyEvent) -> Vec<Effect> {
        if event.modifiers.contains(KeyModifiers::CONTROL) && event.code == KeyCode::Char('c') {
            return vec![Effect::Quit];
        }
        match self.mode {
            AppMode::Confirm => self.handle_confirm_input(event),
            AppMode::Filter => self.handle_filter_input(event),
            AppMode::Normal => self.handle_normal_input(event),
        }
    }

    fn handle_confirm_input(&mut self, event: KeyEvent) -> Vec<Effect> {
        match event.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                let pid = self.confirm.target_pid();
                let force = self.confirm.force();
                self.confirm.hide();
                self.mode = AppMode::Normal;
                vec![Effect::Kill { pid, force }]
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm.hide();
                self.mode = AppMode::Normal;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn handle_filter_input(&mut self, event: KeyEvent) -> Vec<Effect> {
        match event.code {
            KeyCode::Esc => {
                self.filter.clear();
                self.set_mode(AppMode::Normal);
                self.apply_filter();
            }
            KeyCode::Enter => {
                self.filter.deactivate();
                self.set_mode(AppMode::Normal);
            }
            KeyCode::Backspace => {
                self.filter.pop();
                self.apply_filter();
            }
            KeyCode::Char(c)
                if !event.modifiers.contains(KeyModifiers::CONTROL)
                    && !event.modifiers.contains(KeyModifiers::ALT) =>
            {
                self.filter.push(c);
                self.apply_filter();
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_normal_input(&mut self, event: KeyEvent) -> Vec<Effect> {
        match event.code {
            KeyCode::Char('q') => return vec![Effect::Quit],
            KeyCode::Char('/') => {
                self.filter.activate();
                self.set_mode(AppMode::Filter);
            }
            KeyCode::Char('k') => self.open_confirm(false, false),
            KeyCode::Char('K') => self.open_confirm(true, false),
            KeyCode::Char('p') => self.open_confirm(false, true),
            KeyCode::Enter => self.table.toggle_expand(),
            KeyCode::Esc => self.table.collapse(),
            KeyCode::Char('s') => {
                self.table.next_sort();
                self.table.set_rows(&self.filtered);
                self.announce_sort();
            }
            KeyCode::Char('S') => {
                self.table.reverse_sort();
                self.table.set_rows(&self.filtered);
                self.announce_sort();
            }
            KeyCode::Char('t') => {
                self.table.toggle_tree();
                self.table.set_rows(&self.filtered);
                let state = if self.table.tree_mode() { "on" } else { "off" };
                self.set_status(StatusLevel::Info, format!("tree view {state}"));
            }
            KeyCode::Char('a') => {
                self.show_system = !self.show_system;
                self.apply_filter();
                let state = if self.show_system { "shown" } else { "hidden" };
                self.set_status(StatusLevel::Info, format!("system processes {state}"));
            }
            KeyCode::Char('r') => return self.request_scan(),
            KeyCode::Char('?') => self.show_help = !self.show_help,
            KeyCode::Up => self.table.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.table.move_down(),
            _ => {}
        }
        Vec::new()
    }

    fn open_confirm(&mut self, force: bool, kill_parent: bool) {
        let Some(target) = self.table.selected().cloned() else {
            return;
        };
        if kill_parent && target.ppid <= 1 {
            let message = format!("{} (PID {}) has no parent to kill", target.process, target.pid);
            self.set_status(StatusLevel::Warning, message);
            return;
        }
        self.confirm.show(target, force, kill_parent);
        self.mode = AppMode::Confirm;
    }

    /// Starts a scan now, or queues one behind the scan already in flight.
    fn request_scan(&mut self) -> Vec<Effect> {
        if self.scanning {
            self.rescan_pending = true;
            return Vec::new();
        }
        self.scanning = true;
        vec![Effect::Scan]
    }

    fn apply_filter(&mut self) {
        self.filtered = self
            .records
            .iter()
            .filter(|record| self.show_system || !is_system_process(record))
            .filter(|record| self.filter.matches(record))
            .cloned()
            .collect();
        self.table.set_rows(&self.filtered);
    }

    fn announce_sort(&mut self) {
        let sort = self.table.sort();
        let order = if sort.ascending { "(asc)" } else { "(desc)" };
        let message = format!("sorting by {} {}", sort.field.display_name(), order);
        self.set_status(StatusLevel::Info, message);
    }

    fn set_mode(&mut self, mode: AppMode) {
        self.mode = mode;
        self.sync_table_height();
    }

    fn sync_table_height(&mut self) {
        let filter_bar = u16::from(self.filter_bar_visible());
        let body = self.height.saturating_sub(CHROME_HEIGHT + filter_bar);
        self.table.set_height(usize::from(body));
    }

    fn set_status<T: Into<String>>(&mut self, level: StatusLevel, message: T) {
        self.status = Some(StatusMessage {
            text: message.into(),
            level,
            at: Local::now(),
        });
    }
}
