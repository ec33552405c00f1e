//! Breakpoints, traps, watches and step-traps, plus the Running/Halted/
//! Terminated state machine that drives a debug session.

use crate::bus::LastAccess;
use crate::debugger::targets::Target;
use crate::vcs::Vcs;
use vcs_core::logging::{LogCategory, LogLevel};
use vcs_core::vlog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Halted,
    Terminated,
}

/// One `(target, value)` pair in a breakpoint's AND-group.
#[derive(Debug, Clone, Copy)]
pub struct Condition {
    pub target: Target,
    pub value: i64,
}

/// Halts the moment every condition in the group is simultaneously true,
/// but only on the unmet-to-met transition; it stays suppressed for as
/// long as the group remains met, and re-arms once any condition goes
/// false again. Without this a breakpoint on a register that stays equal
/// to its trigger value for many quanta would refire every single one.
pub struct Breakpoint {
    pub id: u32,
    pub conditions: Vec<Condition>,
    was_met: bool,
}

impl Breakpoint {
    pub fn new(id: u32, conditions: Vec<Condition>) -> Self {
        Self {
            id,
            conditions,
            was_met: false,
        }
    }

    fn poll(&mut self, vcs: &Vcs) -> bool {
        let met = self.conditions.iter().all(|c| c.target.resolve(vcs) == c.value);
        let fires = met && !self.was_met;
        self.was_met = met;
        fires
    }
}

/// Halts whenever a target's resolved value differs from its value at the
/// previous poll, regardless of what it changes to or from.
pub struct Trap {
    pub id: u32,
    pub target: Target,
    last: Option<i64>,
}

impl Trap {
    pub fn new(id: u32, target: Target) -> Self {
        Self {
            id,
            target,
            last: None,
        }
    }

    fn poll(&mut self, vcs: &Vcs) -> bool {
        let current = self.target.resolve(vcs);
        let fires = matches!(self.last, Some(prev) if prev != current);
        self.last = Some(current);
        fires
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchDirection {
    Read,
    Write,
    Either,
}

/// Halts when `addr` is accessed in the given direction, optionally only
/// for a specific value.
pub struct Watch {
    pub id: u32,
    pub addr: u16,
    pub direction: WatchDirection,
    pub value: Option<u8>,
}

impl Watch {
    fn matches(&self, access: &LastAccess) -> bool {
        if access.addr != self.addr {
            return false;
        }
        let direction_ok = match self.direction {
            WatchDirection::Read => !access.write,
            WatchDirection::Write => access.write,
            WatchDirection::Either => true,
        };
        direction_ok && self.value.map(|v| v == access.value).unwrap_or(true)
    }
}

/// Fires exactly once after `remaining` more quanta, then removes itself.
pub struct StepTrap {
    pub id: u32,
    remaining: u32,
}

impl StepTrap {
    pub fn new(id: u32, quanta: u32) -> Self {
        Self { id, remaining: quanta }
    }

    fn poll(&mut self) -> bool {
        if self.remaining == 0 {
            return true;
        }
        self.remaining -= 1;
        self.remaining == 0
    }
}

pub struct Debugger {
    next_id: u32,
    pub breakpoints: Vec<Breakpoint>,
    pub traps: Vec<Trap>,
    pub watches: Vec<Watch>,
    pub step_traps: Vec<StepTrap>,
    pub state: RunState,
    last_halt_reason: Option<String>,
}

impl Default for Debugger {
    fn default() -> Self {
        Self {
            next_id: 0,
            breakpoints: Vec::new(),
            traps: Vec::new(),
            watches: Vec::new(),
            step_traps: Vec::new(),
            state: RunState::Running,
            last_halt_reason: None,
        }
    }
}

impl Debugger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_breakpoint(&mut self, conditions: Vec<Condition>) -> u32 {
        let id = self.next_id();
        self.breakpoints.push(Breakpoint::new(id, conditions));
        id
    }

    pub fn add_trap(&mut self, target: Target) -> u32 {
        let id = self.next_id();
        self.traps.push(Trap::new(id, target));
        id
    }

    pub fn add_watch(&mut self, addr: u16, direction: WatchDirection, value: Option<u8>) -> u32 {
        let id = self.next_id();
        self.watches.push(Watch {
            id,
            addr,
            direction,
            value,
        });
        id
    }

    pub fn add_step_trap(&mut self, quanta: u32) -> u32 {
        let id = self.next_id();
        self.step_traps.push(StepTrap::new(id, quanta));
        id
    }

    pub fn remove(&mut self, id: u32) {
        self.breakpoints.retain(|b| b.id != id);
        self.traps.retain(|t| t.id != id);
        self.watches.retain(|w| w.id != id);
        self.step_traps.retain(|s| s.id != id);
    }

    pub fn last_halt_reason(&self) -> Option<&str> {
        self.last_halt_reason.as_deref()
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Evaluate every halt source against the machine's current state.
    /// Called once per configured quantum (CPU instruction or TIA color
    /// clock, depending on the session's step mode).
    pub fn poll(&mut self, vcs: &Vcs) -> RunState {
        if self.state == RunState::Terminated {
            return RunState::Terminated;
        }

        for bp in &mut self.breakpoints {
            if bp.poll(vcs) {
                self.last_halt_reason = Some(format!("breakpoint {}", bp.id));
                self.state = RunState::Halted;
                vlog!(LogCategory::Debugger, LogLevel::Info, "halt: breakpoint {}", bp.id);
                return self.state;
            }
        }

        for trap in &mut self.traps {
            if trap.poll(vcs) {
                self.last_halt_reason = Some(format!("trap {}", trap.id));
                self.state = RunState::Halted;
                vlog!(LogCategory::Debugger, LogLevel::Info, "halt: trap {}", trap.id);
                return self.state;
            }
        }

        if let Some(access) = vcs.bus.last_access {
            for watch in &self.watches {
                if watch.matches(&access) {
                    self.last_halt_reason = Some(format!("watch {}", watch.id));
                    self.state = RunState::Halted;
                    vlog!(LogCategory::Debugger, LogLevel::Info, "halt: watch {}", watch.id);
                    return self.state;
                }
            }
        }

        let mut fired_step = None;
        for step in &mut self.step_traps {
            if step.poll() {
                fired_step = Some(step.id);
                break;
            }
        }
        if let Some(id) = fired_step {
            self.step_traps.retain(|s| s.id != id);
            self.last_halt_reason = Some(format!("step-trap {id}"));
            self.state = RunState::Halted;
            return self.state;
        }

        self.state = RunState::Running;
        RunState::Running
    }

    pub fn resume(&mut self) {
        if self.state == RunState::Halted {
            self.state = RunState::Running;
        }
    }

    pub fn terminate(&mut self) {
        self.state = RunState::Terminated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::Mapper;
    use crate::tv::TvSpec;

    struct StubMapper {
        rom: Vec<u8>,
    }
    impl Mapper for StubMapper {
        fn read(&mut self, offset: u16) -> u8 {
            self.rom[offset as usize % self.rom.len()]
        }
        fn write(&mut self, _offset: u16, _val: u8) {}
        fn peek(&self, offset: u16) -> u8 {
            self.rom[offset as usize % self.rom.len()]
        }
        fn poke(&mut self, offset: u16, val: u8) {
            let len = self.rom.len();
            self.rom[offset as usize % len] = val;
        }
        fn current_bank(&self) -> usize {
            0
        }
        fn bank_count(&self) -> usize {
            1
        }
    }

    fn test_vcs() -> Vcs {
        Vcs::new(Box::new(StubMapper { rom: vec![0; 0x1000] }), TvSpec::Ntsc)
    }

    #[test]
    fn breakpoint_fires_only_on_transition_into_met() {
        let mut vcs = test_vcs();
        let mut dbg = Debugger::new();
        dbg.add_breakpoint(vec![Condition {
            target: Target::X,
            value: 5,
        }]);

        assert_eq!(dbg.poll(&vcs), RunState::Running);
        vcs.cpu.x = 5;
        assert_eq!(dbg.poll(&vcs), RunState::Halted);
        dbg.resume();
        // still met: must NOT refire until it goes unmet and back
        assert_eq!(dbg.poll(&vcs), RunState::Running);
        vcs.cpu.x = 6;
        assert_eq!(dbg.poll(&vcs), RunState::Running);
        vcs.cpu.x = 5;
        assert_eq!(dbg.poll(&vcs), RunState::Halted);
    }

    #[test]
    fn trap_fires_on_any_change() {
        let mut vcs = test_vcs();
        let mut dbg = Debugger::new();
        dbg.add_trap(Target::A);
        assert_eq!(dbg.poll(&vcs), RunState::Running); // establishes baseline
        vcs.cpu.a = 1;
        assert_eq!(dbg.poll(&vcs), RunState::Halted);
    }

    #[test]
    fn step_trap_fires_after_n_quanta_then_removes_itself() {
        let vcs = test_vcs();
        let mut dbg = Debugger::new();
        dbg.add_step_trap(2);
        assert_eq!(dbg.poll(&vcs), RunState::Running);
        assert_eq!(dbg.poll(&vcs), RunState::Halted);
        dbg.resume();
        assert!(dbg.step_traps.is_empty());
        assert_eq!(dbg.poll(&vcs), RunState::Running);
    }
}
