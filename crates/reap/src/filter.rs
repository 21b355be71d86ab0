use crate::ports::PortInfo;

pub const QUERY_LIMIT: usize = 64;

const SYSTEM_PROCESSES: [&str; 13] = [
    "launchd",
    "mDNSResponder",
    "bluetoothd",
    "rapportd",
    "sharingd",
    "ControlCenter",
    "SystemUIServer",
    "systemd",
    "systemd-resolve",
    "systemd-network",
    "avahi-daemon",
    "cupsd",
    "chronyd",
];

/// Text input backing the `/` filter.
#[derive(Debug, Clone, Default)]
pub struct FilterInput {
    query: String,
    active: bool,
}

impl FilterInput {
    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Empties the query and leaves input mode.
    pub fn clear(&mut self) {
        self.query.clear();
        self.deactivate();
    }

    pub fn push(&mut self, c: char) {
        if self.query.chars().count() < QUERY_LIMIT {
            self.query.push(c);
        }
    }

    pub fn pop(&mut self) {
        self.query.pop();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn value(&self) -> &str {
        &self.query
    }

    pub fn matches(&self, record: &PortInfo) -> bool {
        matches(record, &self.query)
    }
}

/// Case-insensitive substring test over process name, port, PID, user,
/// container and working directory. An empty query matches everything.
pub fn matches(record: &PortInfo, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    record.process.to_lowercase().contains(&needle)
        || record.port.to_string().contains(&needle)
        || record.pid.to_string().contains(&needle)
        || record.user.to_lowercase().contains(&needle)
        || record.container.to_lowercase().contains(&needle)
        || record.cwd.to_lowercase().contains(&needle)
}

pub fn is_system_process(record: &PortInfo) -> bool {
    record.pid <= 1 || SYSTEM_PROCESSES.contains(&record.process.as_str())
}
