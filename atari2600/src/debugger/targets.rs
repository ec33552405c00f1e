//! Named, inspectable quantities a breakpoint/trap/watch can reference.
//! Resolving a target never mutates machine state (it goes through `peek`,
//! never `read`), so arming a condition never perturbs the run it's
//! observing.

use crate::vcs::Vcs;
use serde::Serialize;

/// JSON-serializable snapshot of machine state for external tooling, the way
/// the debugger's introspection surface is meant to be consumed outside the
/// REPL (a GUI, a test harness) without exposing `Vcs` itself.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
    pub scanline: usize,
    pub clock: u16,
    pub frame: u64,
    pub last_instruction: crate::cpu::InstructionResult,
}

impl Snapshot {
    pub fn capture(vcs: &Vcs) -> Self {
        Self {
            a: vcs.cpu.a,
            x: vcs.cpu.x,
            y: vcs.cpu.y,
            sp: vcs.cpu.sp,
            pc: vcs.cpu.pc,
            status: vcs.cpu.status,
            scanline: vcs.tv.current_line(),
            clock: vcs.bus.tia.scanline_position(),
            frame: vcs.tv.frames_rendered,
            last_instruction: vcs.cpu.last_result.clone(),
        }
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

    #[test]
    fn snapshot_serializes_to_json_with_register_fields() {
        let vcs = Vcs::new(Box::new(StubMapper { rom: vec![0; 0x1000] }), TvSpec::Ntsc);
        let snapshot = Snapshot::capture(&vcs);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"pc\""));
        assert!(json.contains("\"last_instruction\""));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    A,
    X,
    Y,
    Sp,
    Pc,
    Status,
    Memory(u16),
    Scanline,
    Clock,
    Frame,
    Cycles,
    Bank,
    ResultMnemonic,
    ResultEffect,
    ResultPagefault,
    ResultBug,
}

impl Target {
    pub fn resolve(self, vcs: &Vcs) -> i64 {
        match self {
            Target::A => vcs.cpu.a as i64,
            Target::X => vcs.cpu.x as i64,
            Target::Y => vcs.cpu.y as i64,
            Target::Sp => vcs.cpu.sp as i64,
            Target::Pc => vcs.cpu.pc as i64,
            Target::Status => vcs.cpu.status as i64,
            Target::Memory(addr) => vcs.bus.peek(addr) as i64,
            Target::Scanline => vcs.tv.current_line() as i64,
            Target::Clock => vcs.bus.tia.scanline_position() as i64,
            Target::Frame => vcs.tv.frames_rendered as i64,
            Target::Cycles => vcs.cpu.last_result.cycles as i64,
            Target::Bank => vcs.bus.cartridge.current_bank() as i64,
            // Mnemonics aren't numeric; hash to a stable value so equality
            // and change-detection (TRAP) still work against the same
            // canonical token a BREAK condition would compare to.
            Target::ResultMnemonic => fnv1a(vcs.cpu.last_result.mnemonic) as i64,
            // The address the in-flight instruction's last bus access
            // touched, i.e. where its side effect landed.
            Target::ResultEffect => vcs.bus.last_access.map(|a| a.addr as i64).unwrap_or(-1),
            Target::ResultPagefault => vcs.cpu.last_result.page_fault as i64,
            Target::ResultBug => vcs.cpu.last_result.bug as i64,
        }
    }
}

/// Stable string hash so `RESULT.MNEMONIC` can be used as a `Target` despite
/// `Target::resolve` being `i64`-typed throughout.
pub(crate) fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in s.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
