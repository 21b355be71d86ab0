use crate::ports::PortInfo;
use crate::signals::Signal;

/// Pending kill awaiting a y/n answer. The target is a copy taken when the
/// dialog opened, so rescans do not change what gets signalled.
#[derive(Debug, Clone, Default)]
pub struct ConfirmDialog {
    visible: bool,
    target: PortInfo,
    force: bool,
    kill_parent: bool,
}

impl ConfirmDialog {
    pub fn show(&mut self, target: PortInfo, force: bool, kill_parent: bool) {
        self.visible = true;
        self.target = target;
        self.force = force;
        self.kill_parent = kill_parent;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn target(&self) -> &PortInfo {
        &self.target
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn kill_parent(&self) -> bool {
        self.kill_parent
    }

    pub fn signal(&self) -> Signal {
        Signal::for_force(self.force)
    }

    /// The PID that a confirmation would signal.
    pub fn target_pid(&self) -> u32 {
        if self.kill_parent {
            self.target.ppid
        } else {
            self.target.pid
        }
    }
}
