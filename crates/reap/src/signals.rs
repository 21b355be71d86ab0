use nix::errno::Errno;
use nix::sys::signal::{Signal as NixSignal, kill};
use nix::unistd::Pid as NixPid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signal {
    #[default]
    Sigterm,
    Sigkill,
}

impl Signal {
    pub fn for_force(force: bool) -> Self {
        if force { Signal::Sigkill } else { Signal::Sigterm }
    }

    pub fn name(self) -> &'static str {
        match self {
            Signal::Sigterm => "SIGTERM",
            Signal::Sigkill => "SIGKILL",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Signal::Sigterm => "graceful shutdown",
            Signal::Sigkill => "force kill",
        }
    }

    fn to_nix(self) -> NixSignal {
        match self {
            Signal::Sigterm => NixSignal::SIGTERM,
            Signal::Sigkill => NixSignal::SIGKILL,
        }
    }
}

/// Sends SIGTERM, or SIGKILL when `force` is set, to `pid`.
pub fn terminate(pid: u32, force: bool) -> Result<(), String> {
    let signal = Signal::for_force(force);
    validate_target(pid)?;
    log::info!("sending {} to pid {}", signal.name(), pid);
    send_to_pid(pid, signal).inspect_err(|err| log::warn!("signal to pid {pid} failed: {err}"))
}

fn validate_target(pid: u32) -> Result<(), String> {
    if pid <= 1 {
        return Err(format!("refusing to signal pid {pid}"));
    }
    if pid == std::process::id() {
        return Err("refusing to signal reap".to_string());
    }
    if i32::try_from(pid).is_err() {
        return Err(format!("pid {pid} out of range"));
    }
    Ok(())
}

fn send_to_pid(pid: u32, signal: Signal) -> Result<(), String> {
    match kill(NixPid::from_raw(pid as i32), signal.to_nix()) {
        Ok(()) => Ok(()),
        Err(Errno::EPERM) => Err("permission denied (needs sudo)".to_string()),
        Err(Errno::ESRCH) => Err("process not found".to_string()),
        Err(err) => Err(format!("failed to send {}: {}", signal.name(), err)),
    }
}
