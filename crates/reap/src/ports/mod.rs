use std::collections::HashMap;

use anyhow::Result;
use serde::Serialize;

pub mod docker;
pub mod enrich;
pub mod lsof;
#[cfg(target_os = "linux")]
pub mod procfs;

/// One listening socket and the process bound to it, as seen by a single scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    pub port: u16,
    pub pid: u32,
    /// 0 when unknown.
    pub ppid: u32,
    pub process: String,
    pub user: String,
    pub command: String,
    pub protocol: String,
    pub address: String,
    pub uptime: String,
    pub memory: String,
    /// Docker container name, empty when not containerized.
    pub container: String,
    /// Working directory, empty when unknown.
    pub cwd: String,
    #[serde(skip)]
    pub memory_kb: u64,
    #[serde(skip)]
    pub uptime_secs: u64,
}

impl PortInfo {
    pub fn is_ipv6(&self) -> bool {
        self.address.contains(':')
    }
}

pub trait Scanner: Send + Sync {
    fn scan(&self) -> Result<Vec<PortInfo>>;
}

#[cfg(target_os = "linux")]
pub fn new_scanner() -> Box<dyn Scanner> {
    Box::new(procfs::ProcfsScanner)
}

#[cfg(not(target_os = "linux"))]
pub fn new_scanner() -> Box<dyn Scanner> {
    Box::new(lsof::LsofScanner)
}

/// Collapses duplicate (port, pid) entries, keeping the first position and
/// upgrading its address to an IPv4 one when a later duplicate has it.
pub fn dedupe(entries: Vec<PortInfo>) -> Vec<PortInfo> {
    let mut seen: HashMap<(u16, u32), usize> = HashMap::new();
    let mut result: Vec<PortInfo> = Vec::with_capacity(entries.len());

    for entry in entries {
        let key = (entry.port, entry.pid);
        if let Some(&idx) = seen.get(&key) {
            if !entry.is_ipv6() && result[idx].is_ipv6() {
                result[idx].address = entry.address;
            }
            continue;
        }
        seen.insert(key, result.len());
        result.push(entry);
    }

    result
}

pub fn format_uptime(secs: u64) -> String {
    let minutes = secs / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

pub fn format_memory(kb: u64) -> String {
    if kb == 0 {
        return "-".to_string();
    }
    let mb = kb as f64 / 1024.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else if mb >= 1.0 {
        format!("{:.1} MB", mb)
    } else {
        format!("{} KB", kb)
    }
}
