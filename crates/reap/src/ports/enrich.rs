use std::collections::HashMap;

use nix::unistd::{Uid as NixUid, User};
use sysinfo::{Pid, ProcessRefreshKind, System};

use super::{PortInfo, format_memory, format_uptime};

/// Fills in PPID, uptime, memory, command line, working directory and owner
/// for every record from a single process table snapshot.
pub struct ProcessEnricher {
    system: System,
    username_cache: HashMap<u32, String>,
}

impl ProcessEnricher {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            username_cache: HashMap::new(),
        }
    }

    pub fn enrich(&mut self, ports: &mut [PortInfo]) {
        let mut pids: Vec<u32> = ports.iter().map(|p| p.pid).collect();
        pids.sort_unstable();
        pids.dedup();

        for pid in &pids {
            let refreshed = self
                .system
                .refresh_process_specifics(Pid::from_u32(*pid), ProcessRefreshKind::everything());
            if !refreshed {
                log::trace!("pid {pid} vanished before enrichment");
            }
        }

        for entry in ports.iter_mut() {
            let snapshot = match self.system.process(Pid::from_u32(entry.pid)) {
                Some(process) => (
                    process.name().to_string(),
                    process.parent().map(|p| p.as_u32()).unwrap_or(0),
                    process.run_time(),
                    process.memory() / 1_024,
                    process.cmd().join(" "),
                    process
                        .cwd()
                        .map(|path| path.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    process.user_id().map(|uid| **uid),
                ),
                None => continue,
            };

            let (name, ppid, run_time, memory_kb, command, cwd, uid) = snapshot;

            if entry.process.is_empty() {
                entry.process = name;
            }
            entry.ppid = ppid;
            entry.uptime_secs = run_time;
            entry.uptime = format_uptime(run_time);
            entry.memory_kb = memory_kb;
            entry.memory = format_memory(memory_kb);
            entry.command = command;
            entry.cwd = cwd;
            if entry.user.is_empty() {
                entry.user = uid
                    .map(|uid| self.username_from_uid(uid))
                    .unwrap_or_else(|| "unknown".to_string());
            }
        }
    }

    fn username_from_uid(&mut self, uid: u32) -> String {
        if let Some(name) = self.username_cache.get(&uid) {
            return name.clone();
        }

        let name = User::from_uid(NixUid::from_raw(uid))
            .ok()
            .flatten()
            .map(|user| user.name)
            .unwrap_or_else(|| uid.to_string());

        self.username_cache.insert(uid, name.clone());
        name
    }
}
