//! 6507 CPU: the documented 6502 instruction set minus the decimal-mode
//! subtleties the VCS never relies on (the 6507 wires D out entirely, but we
//! still honor SED/CLD so D-flag tests on RAM behave), with the indirect-JMP
//! page-wrap bug emulated and flagged.
//!
//! `execute_instruction` is cooperative suspension rather than a literal
//! micro-op state machine: it computes the addressing mode and the total
//! cycle count for the decoded instruction up front, performs the bus
//! accesses the instruction actually needs at the cycle they occur on real
//! hardware, and pads any remaining counted cycles with bus-access-free
//! callback invocations so that the callback fires exactly `cycles(i)` times
//! regardless of which of those cycles did real work. The one genuine stall
//! is the `ready` line: when false (driven by a WSYNC write observed through
//! [`Bus6507::cpu_ready`]), the *next* `execute_instruction` call spins,
//! invoking the callback without fetching, until the bus reports ready again.

use crate::error::{EmulatorError, Result};
use serde::Serialize;
use vcs_core::logging::{LogCategory, LogLevel};
use vcs_core::vlog;

pub const FLAG_N: u8 = 0x80;
pub const FLAG_V: u8 = 0x40;
pub const FLAG_U: u8 = 0x20;
pub const FLAG_B: u8 = 0x10;
pub const FLAG_D: u8 = 0x08;
pub const FLAG_I: u8 = 0x04;
pub const FLAG_Z: u8 = 0x02;
pub const FLAG_C: u8 = 0x01;

/// Everything the CPU needs from the rest of the machine: a byte-addressable
/// bus and the RDY line driven by the TIA's WSYNC logic.
pub trait Bus6507 {
    fn cpu_read(&mut self, addr: u16) -> u8;
    fn cpu_write(&mut self, addr: u16, val: u8);
    /// False while a WSYNC write is holding the CPU's RDY line low.
    fn cpu_ready(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AddressingMode {
    #[default]
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

/// Describes the instruction currently (or most recently) in flight.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstructionResult {
    pub pc_at_fetch: u16,
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub mode: AddressingMode,
    pub bytecode: Vec<u8>,
    pub fetched: Vec<u8>,
    pub cycles: u32,
    /// Set when an indexed read/branch crossed a page boundary, costing an
    /// extra cycle.
    pub page_fault: bool,
    /// Set when a documented CPU bug (indirect-JMP page wrap) fired.
    pub bug: bool,
    /// Latches true once the instruction has consumed its last cycle.
    pub is_final: bool,
}

#[derive(Debug, Default)]
pub struct Cpu6507 {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
    pub last_result: InstructionResult,
}

impl Cpu6507 {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            status: FLAG_U | FLAG_I,
            last_result: InstructionResult::default(),
        }
    }

    /// Reconstruct power-on state and reseed PC from the reset vector.
    pub fn reset(&mut self, bus: &mut impl Bus6507) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFD;
        self.status = FLAG_U | FLAG_I;
        self.pc = self.read_u16(bus, 0xFFFC);
        self.last_result = InstructionResult::default();
    }

    fn read_u16(&self, bus: &mut impl Bus6507, addr: u16) -> u16 {
        let lo = bus.cpu_read(addr) as u16;
        let hi = bus.cpu_read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    fn flag(&self, mask: u8) -> bool {
        self.status & mask != 0
    }

    fn set_flag(&mut self, mask: u8, on: bool) {
        if on {
            self.status |= mask;
        } else {
            self.status &= !mask;
        }
    }

    fn set_nz(&mut self, val: u8) {
        self.set_flag(FLAG_Z, val == 0);
        self.set_flag(FLAG_N, val & 0x80 != 0);
    }

    /// Fetch the opcode at PC, decode it, run its full cycle sequence, and
    /// invoke `callback(bus, is_final_cycle)` exactly once per CPU cycle.
    ///
    /// Generic over the concrete bus type (rather than `&mut dyn Bus6507`)
    /// so that callers can capture the same concrete bus in their callback
    /// and reach component fields the trait doesn't expose.
    pub fn execute_instruction<B: Bus6507>(
        &mut self,
        bus: &mut B,
        mut callback: impl FnMut(&mut B, bool),
    ) -> Result<InstructionResult> {
        // WSYNC stall: spin without fetching until RDY returns high. Each
        // spin is itself a CPU cycle from the TIA/RIOT's point of view.
        while !bus.cpu_ready() {
            callback(bus, false);
        }

        let pc_at_fetch = self.pc;
        let opcode = bus.cpu_read(self.pc);
        self.pc = self.pc.wrapping_add(1);

        let Some(spec) = decode(opcode) else {
            callback(bus, true);
            return Err(EmulatorError::InvalidOpcode {
                opcode,
                pc: pc_at_fetch,
            });
        };

        let mut result = InstructionResult {
            pc_at_fetch,
            opcode,
            mnemonic: spec.mnemonic,
            mode: spec.mode,
            bytecode: vec![opcode],
            fetched: Vec::new(),
            cycles: 0,
            page_fault: false,
            bug: false,
            is_final: false,
        };

        let mut ticks_used = 1u32; // the opcode fetch itself
        callback(bus, false);

        let operand = self.fetch_operand(bus, spec.mode, &mut result, &mut ticks_used, &mut callback);
        self.run_operation(bus, spec.mnemonic, spec.mode, operand, &mut result, &mut ticks_used, &mut callback);

        let mut total = spec.cycles;
        if result.page_fault && matches!(spec.mode, AddressingMode::AbsoluteX | AddressingMode::AbsoluteY | AddressingMode::IndirectY) {
            total += 1;
        }
        // Pad out any remaining counted cycles with bus-access-free ticks so
        // the callback fires exactly `total` times.
        while ticks_used < total {
            ticks_used += 1;
            let is_last = ticks_used == total;
            if is_last {
                result.is_final = true;
            }
            callback(bus, is_last);
        }
        if result.is_final == false {
            result.is_final = true;
        }
        result.cycles = ticks_used;

        vlog!(
            LogCategory::Cpu,
            LogLevel::Trace,
            "{:04X}: {} ({} cycles)",
            pc_at_fetch,
            spec.mnemonic,
            result.cycles
        );

        self.last_result = result.clone();
        Ok(result)
    }

    /// Operand effective address/value, with the reads themselves ticking
    /// the callback once per cycle they occupy.
    #[allow(clippy::too_many_arguments)]
    fn fetch_operand<B: Bus6507>(
        &mut self,
        bus: &mut B,
        mode: AddressingMode,
        result: &mut InstructionResult,
        ticks: &mut u32,
        callback: &mut impl FnMut(&mut B, bool),
    ) -> Operand {
        let mut fetch_byte = |cpu: &mut Self, bus: &mut B| {
            let b = bus.cpu_read(cpu.pc);
            cpu.pc = cpu.pc.wrapping_add(1);
            result.bytecode.push(b);
            result.fetched.push(b);
            *ticks += 1;
            callback(bus, false);
            b
        };

        match mode {
            AddressingMode::Implied | AddressingMode::Accumulator => Operand::None,
            AddressingMode::Immediate => {
                let v = fetch_byte(self, bus);
                Operand::Value(v)
            }
            AddressingMode::ZeroPage => {
                let addr = fetch_byte(self, bus) as u16;
                Operand::Address(addr)
            }
            AddressingMode::ZeroPageX => {
                let base = fetch_byte(self, bus);
                Operand::Address(base.wrapping_add(self.x) as u16)
            }
            AddressingMode::ZeroPageY => {
                let base = fetch_byte(self, bus);
                Operand::Address(base.wrapping_add(self.y) as u16)
            }
            AddressingMode::Relative => {
                let offset = fetch_byte(self, bus) as i8;
                Operand::Relative(offset)
            }
            AddressingMode::Absolute => {
                let lo = fetch_byte(self, bus) as u16;
                let hi = fetch_byte(self, bus) as u16;
                Operand::Address((hi << 8) | lo)
            }
            AddressingMode::AbsoluteX => {
                let lo = fetch_byte(self, bus) as u16;
                let hi = fetch_byte(self, bus) as u16;
                let base = (hi << 8) | lo;
                let addr = base.wrapping_add(self.x as u16);
                result.page_fault = (addr & 0xFF00) != (base & 0xFF00);
                Operand::Address(addr)
            }
            AddressingMode::AbsoluteY => {
                let lo = fetch_byte(self, bus) as u16;
                let hi = fetch_byte(self, bus) as u16;
                let base = (hi << 8) | lo;
                let addr = base.wrapping_add(self.y as u16);
                result.page_fault = (addr & 0xFF00) != (base & 0xFF00);
                Operand::Address(addr)
            }
            AddressingMode::Indirect => {
                let lo = fetch_byte(self, bus) as u16;
                let hi = fetch_byte(self, bus) as u16;
                let ptr = (hi << 8) | lo;
                // Documented 6502 bug: indirect JMP does not cross a page
                // when fetching the high byte of the target.
                let hi_ptr = (ptr & 0xFF00) | ((ptr.wrapping_add(1)) & 0x00FF);
                if hi_ptr != ptr.wrapping_add(1) {
                    result.bug = true;
                }
                let target_lo = bus.cpu_read(ptr) as u16;
                let target_hi = bus.cpu_read(hi_ptr) as u16;
                Operand::Address((target_hi << 8) | target_lo)
            }
            AddressingMode::IndirectX => {
                let zp = fetch_byte(self, bus).wrapping_add(self.x);
                let lo = bus.cpu_read(zp as u16) as u16;
                let hi = bus.cpu_read(zp.wrapping_add(1) as u16) as u16;
                Operand::Address((hi << 8) | lo)
            }
            AddressingMode::IndirectY => {
                let zp = fetch_byte(self, bus);
                let lo = bus.cpu_read(zp as u16) as u16;
                let hi = bus.cpu_read(zp.wrapping_add(1) as u16) as u16;
                let base = (hi << 8) | lo;
                let addr = base.wrapping_add(self.y as u16);
                result.page_fault = (addr & 0xFF00) != (base & 0xFF00);
                Operand::Address(addr)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_operation<B: Bus6507>(
        &mut self,
        bus: &mut B,
        mnemonic: &'static str,
        mode: AddressingMode,
        operand: Operand,
        result: &mut InstructionResult,
        ticks: &mut u32,
        callback: &mut impl FnMut(&mut B, bool),
    ) {
        let read_value = |cpu: &Self, bus: &mut B| -> u8 {
            match operand {
                Operand::Value(v) => v,
                Operand::Address(addr) => bus.cpu_read(addr),
                Operand::None => cpu.a,
                Operand::Relative(_) => 0,
            }
        };

        macro_rules! store {
            ($addr:expr, $val:expr) => {{
                bus.cpu_write($addr, $val);
            }};
        }

        match mnemonic {
            "LDA" => {
                self.a = read_value(self, bus);
                self.set_nz(self.a);
            }
            "LDX" => {
                self.x = read_value(self, bus);
                self.set_nz(self.x);
            }
            "LDY" => {
                self.y = read_value(self, bus);
                self.set_nz(self.y);
            }
            "STA" => {
                if let Operand::Address(addr) = operand {
                    store!(addr, self.a);
                }
            }
            "STX" => {
                if let Operand::Address(addr) = operand {
                    store!(addr, self.x);
                }
            }
            "STY" => {
                if let Operand::Address(addr) = operand {
                    store!(addr, self.y);
                }
            }
            "TAX" => {
                self.x = self.a;
                self.set_nz(self.x);
            }
            "TAY" => {
                self.y = self.a;
                self.set_nz(self.y);
            }
            "TXA" => {
                self.a = self.x;
                self.set_nz(self.a);
            }
            "TYA" => {
                self.a = self.y;
                self.set_nz(self.a);
            }
            "TSX" => {
                self.x = self.sp;
                self.set_nz(self.x);
            }
            "TXS" => {
                self.sp = self.x;
            }
            "PHA" => {
                self.push(bus, self.a);
            }
            "PHP" => {
                let pushed = self.status | FLAG_B | FLAG_U;
                self.push(bus, pushed);
            }
            "PLA" => {
                self.a = self.pull(bus);
                self.set_nz(self.a);
            }
            "PLP" => {
                self.status = (self.pull(bus) & !FLAG_B) | FLAG_U;
            }
            "AND" => {
                self.a &= read_value(self, bus);
                self.set_nz(self.a);
            }
            "ORA" => {
                self.a |= read_value(self, bus);
                self.set_nz(self.a);
            }
            "EOR" => {
                self.a ^= read_value(self, bus);
                self.set_nz(self.a);
            }
            "ADC" => {
                let v = read_value(self, bus);
                self.adc(v);
            }
            "SBC" => {
                let v = read_value(self, bus);
                self.adc(v ^ 0xFF);
            }
            "CMP" => {
                let v = read_value(self, bus);
                self.compare(self.a, v);
            }
            "CPX" => {
                let v = read_value(self, bus);
                self.compare(self.x, v);
            }
            "CPY" => {
                let v = read_value(self, bus);
                self.compare(self.y, v);
            }
            "BIT" => {
                let v = read_value(self, bus);
                self.set_flag(FLAG_Z, self.a & v == 0);
                self.set_flag(FLAG_N, v & 0x80 != 0);
                self.set_flag(FLAG_V, v & 0x40 != 0);
            }
            "INC" => {
                if let Operand::Address(addr) = operand {
                    let v = bus.cpu_read(addr).wrapping_add(1);
                    store!(addr, v);
                    self.set_nz(v);
                }
            }
            "DEC" => {
                if let Operand::Address(addr) = operand {
                    let v = bus.cpu_read(addr).wrapping_sub(1);
                    store!(addr, v);
                    self.set_nz(v);
                }
            }
            "INX" => {
                self.x = self.x.wrapping_add(1);
                self.set_nz(self.x);
            }
            "DEX" => {
                self.x = self.x.wrapping_sub(1);
                self.set_nz(self.x);
            }
            "INY" => {
                self.y = self.y.wrapping_add(1);
                self.set_nz(self.y);
            }
            "DEY" => {
                self.y = self.y.wrapping_sub(1);
                self.set_nz(self.y);
            }
            "ASL" => self.shift(bus, operand, mode, |v, _| (v << 1, v & 0x80 != 0)),
            "LSR" => self.shift(bus, operand, mode, |v, _| (v >> 1, v & 0x01 != 0)),
            "ROL" => {
                let carry_in = self.flag(FLAG_C);
                self.shift(bus, operand, mode, move |v, _| {
                    ((v << 1) | (carry_in as u8), v & 0x80 != 0)
                })
            }
            "ROR" => {
                let carry_in = self.flag(FLAG_C);
                self.shift(bus, operand, mode, move |v, _| {
                    ((v >> 1) | ((carry_in as u8) << 7), v & 0x01 != 0)
                })
            }
            "JMP" => {
                if let Operand::Address(addr) = operand {
                    self.pc = addr;
                }
            }
            "JSR" => {
                if let Operand::Address(addr) = operand {
                    let return_addr = self.pc.wrapping_sub(1);
                    self.push(bus, (return_addr >> 8) as u8);
                    self.push(bus, return_addr as u8);
                    self.pc = addr;
                }
            }
            "RTS" => {
                let lo = self.pull(bus) as u16;
                let hi = self.pull(bus) as u16;
                self.pc = ((hi << 8) | lo).wrapping_add(1);
            }
            "RTI" => {
                self.status = (self.pull(bus) & !FLAG_B) | FLAG_U;
                let lo = self.pull(bus) as u16;
                let hi = self.pull(bus) as u16;
                self.pc = (hi << 8) | lo;
            }
            "BRK" => {
                self.pc = self.pc.wrapping_add(1);
                let ret = self.pc;
                self.push(bus, (ret >> 8) as u8);
                self.push(bus, ret as u8);
                self.push(bus, self.status | FLAG_B | FLAG_U);
                self.set_flag(FLAG_I, true);
                self.pc = self.read_u16(bus, 0xFFFE);
            }
            "BCC" => self.branch(bus, !self.flag(FLAG_C), operand, result, ticks, callback),
            "BCS" => self.branch(bus, self.flag(FLAG_C), operand, result, ticks, callback),
            "BEQ" => self.branch(bus, self.flag(FLAG_Z), operand, result, ticks, callback),
            "BNE" => self.branch(bus, !self.flag(FLAG_Z), operand, result, ticks, callback),
            "BPL" => self.branch(bus, !self.flag(FLAG_N), operand, result, ticks, callback),
            "BMI" => self.branch(bus, self.flag(FLAG_N), operand, result, ticks, callback),
            "BVC" => self.branch(bus, !self.flag(FLAG_V), operand, result, ticks, callback),
            "BVS" => self.branch(bus, self.flag(FLAG_V), operand, result, ticks, callback),
            "CLC" => self.set_flag(FLAG_C, false),
            "SEC" => self.set_flag(FLAG_C, true),
            "CLI" => self.set_flag(FLAG_I, false),
            "SEI" => self.set_flag(FLAG_I, true),
            "CLD" => self.set_flag(FLAG_D, false),
            "SED" => self.set_flag(FLAG_D, true),
            "CLV" => self.set_flag(FLAG_V, false),
            "NOP" => {}
            _ => {
                vlog!(LogCategory::Cpu, LogLevel::Warn, "unhandled mnemonic {mnemonic}");
            }
        }
    }

    fn shift(
        &mut self,
        bus: &mut impl Bus6507,
        operand: Operand,
        mode: AddressingMode,
        f: impl FnOnce(u8, bool) -> (u8, bool),
    ) {
        let (old, addr) = match operand {
            Operand::Address(addr) => (bus.cpu_read(addr), Some(addr)),
            _ => (self.a, None),
        };
        let carry_in = self.flag(FLAG_C);
        let (new, carry_out) = f(old, carry_in);
        self.set_flag(FLAG_C, carry_out);
        self.set_nz(new);
        match addr {
            Some(addr) => bus.cpu_write(addr, new),
            None => {
                debug_assert_eq!(mode, AddressingMode::Accumulator);
                self.a = new;
            }
        }
    }

    fn adc(&mut self, v: u8) {
        let carry = self.flag(FLAG_C) as u16;
        let sum = self.a as u16 + v as u16 + carry;
        let overflow = (!(self.a ^ v) & (self.a ^ sum as u8) & 0x80) != 0;
        self.set_flag(FLAG_C, sum > 0xFF);
        self.set_flag(FLAG_V, overflow);
        self.a = sum as u8;
        self.set_nz(self.a);
    }

    fn compare(&mut self, reg: u8, v: u8) {
        let result = reg.wrapping_sub(v);
        self.set_flag(FLAG_C, reg >= v);
        self.set_nz(result);
    }

    #[allow(clippy::too_many_arguments)]
    fn branch<B: Bus6507>(
        &mut self,
        bus: &mut B,
        taken: bool,
        operand: Operand,
        result: &mut InstructionResult,
        ticks: &mut u32,
        callback: &mut impl FnMut(&mut B, bool),
    ) {
        let Operand::Relative(offset) = operand else {
            return;
        };
        if !taken {
            return;
        }
        *ticks += 1;
        callback(bus, false);
        let base = self.pc;
        let target = (base as i32 + offset as i32) as u16;
        result.page_fault = (target & 0xFF00) != (base & 0xFF00);
        if result.page_fault {
            *ticks += 1;
            callback(bus, false);
        }
        self.pc = target;
    }

    fn push(&mut self, bus: &mut impl Bus6507, val: u8) {
        bus.cpu_write(0x0100 | self.sp as u16, val);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pull(&mut self, bus: &mut impl Bus6507) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.cpu_read(0x0100 | self.sp as u16)
    }
}

#[derive(Debug, Clone, Copy)]
enum Operand {
    None,
    Value(u8),
    Address(u16),
    Relative(i8),
}

struct OpSpec {
    mnemonic: &'static str,
    mode: AddressingMode,
    cycles: u32,
}

macro_rules! op {
    ($mnemonic:expr, $mode:expr, $cycles:expr) => {
        Some(OpSpec {
            mnemonic: $mnemonic,
            mode: $mode,
            cycles: $cycles,
        })
    };
}

/// Decode table for the subset of the 6502 instruction set the VCS actually
/// exercises. Unlisted opcodes are `InvalidOpcode`.
fn decode(opcode: u8) -> Option<OpSpec> {
    use AddressingMode::*;
    match opcode {
        0xA9 => op!("LDA", Immediate, 2),
        0xA5 => op!("LDA", ZeroPage, 3),
        0xB5 => op!("LDA", ZeroPageX, 4),
        0xAD => op!("LDA", Absolute, 4),
        0xBD => op!("LDA", AbsoluteX, 4),
        0xB9 => op!("LDA", AbsoluteY, 4),
        0xA1 => op!("LDA", IndirectX, 6),
        0xB1 => op!("LDA", IndirectY, 5),

        0xA2 => op!("LDX", Immediate, 2),
        0xA6 => op!("LDX", ZeroPage, 3),
        0xB6 => op!("LDX", ZeroPageY, 4),
        0xAE => op!("LDX", Absolute, 4),
        0xBE => op!("LDX", AbsoluteY, 4),

        0xA0 => op!("LDY", Immediate, 2),
        0xA4 => op!("LDY", ZeroPage, 3),
        0xB4 => op!("LDY", ZeroPageX, 4),
        0xAC => op!("LDY", Absolute, 4),
        0xBC => op!("LDY", AbsoluteX, 4),

        0x85 => op!("STA", ZeroPage, 3),
        0x95 => op!("STA", ZeroPageX, 4),
        0x8D => op!("STA", Absolute, 4),
        0x9D => op!("STA", AbsoluteX, 5),
        0x99 => op!("STA", AbsoluteY, 5),
        0x81 => op!("STA", IndirectX, 6),
        0x91 => op!("STA", IndirectY, 6),

        0x86 => op!("STX", ZeroPage, 3),
        0x96 => op!("STX", ZeroPageY, 4),
        0x8E => op!("STX", Absolute, 4),

        0x84 => op!("STY", ZeroPage, 3),
        0x94 => op!("STY", ZeroPageX, 4),
        0x8C => op!("STY", Absolute, 4),

        0xAA => op!("TAX", Implied, 2),
        0xA8 => op!("TAY", Implied, 2),
        0x8A => op!("TXA", Implied, 2),
        0x98 => op!("TYA", Implied, 2),
        0xBA => op!("TSX", Implied, 2),
        0x9A => op!("TXS", Implied, 2),

        0x48 => op!("PHA", Implied, 3),
        0x08 => op!("PHP", Implied, 3),
        0x68 => op!("PLA", Implied, 4),
        0x28 => op!("PLP", Implied, 4),

        0x29 => op!("AND", Immediate, 2),
        0x25 => op!("AND", ZeroPage, 3),
        0x35 => op!("AND", ZeroPageX, 4),
        0x2D => op!("AND", Absolute, 4),
        0x3D => op!("AND", AbsoluteX, 4),
        0x39 => op!("AND", AbsoluteY, 4),
        0x21 => op!("AND", IndirectX, 6),
        0x31 => op!("AND", IndirectY, 5),

        0x09 => op!("ORA", Immediate, 2),
        0x05 => op!("ORA", ZeroPage, 3),
        0x15 => op!("ORA", ZeroPageX, 4),
        0x0D => op!("ORA", Absolute, 4),
        0x1D => op!("ORA", AbsoluteX, 4),
        0x19 => op!("ORA", AbsoluteY, 4),
        0x01 => op!("ORA", IndirectX, 6),
        0x11 => op!("ORA", IndirectY, 5),

        0x49 => op!("EOR", Immediate, 2),
        0x45 => op!("EOR", ZeroPage, 3),
        0x55 => op!("EOR", ZeroPageX, 4),
        0x4D => op!("EOR", Absolute, 4),
        0x5D => op!("EOR", AbsoluteX, 4),
        0x59 => op!("EOR", AbsoluteY, 4),
        0x41 => op!("EOR", IndirectX, 6),
        0x51 => op!("EOR", IndirectY, 5),

        0x69 => op!("ADC", Immediate, 2),
        0x65 => op!("ADC", ZeroPage, 3),
        0x75 => op!("ADC", ZeroPageX, 4),
        0x6D => op!("ADC", Absolute, 4),
        0x7D => op!("ADC", AbsoluteX, 4),
        0x79 => op!("ADC", AbsoluteY, 4),
        0x61 => op!("ADC", IndirectX, 6),
        0x71 => op!("ADC", IndirectY, 5),

        0xE9 => op!("SBC", Immediate, 2),
        0xE5 => op!("SBC", ZeroPage, 3),
        0xF5 => op!("SBC", ZeroPageX, 4),
        0xED => op!("SBC", Absolute, 4),
        0xFD => op!("SBC", AbsoluteX, 4),
        0xF9 => op!("SBC", AbsoluteY, 4),
        0xE1 => op!("SBC", IndirectX, 6),
        0xF1 => op!("SBC", IndirectY, 5),

        0xC9 => op!("CMP", Immediate, 2),
        0xC5 => op!("CMP", ZeroPage, 3),
        0xD5 => op!("CMP", ZeroPageX, 4),
        0xCD => op!("CMP", Absolute, 4),
        0xDD => op!("CMP", AbsoluteX, 4),
        0xD9 => op!("CMP", AbsoluteY, 4),
        0xC1 => op!("CMP", IndirectX, 6),
        0xD1 => op!("CMP", IndirectY, 5),

        0xE0 => op!("CPX", Immediate, 2),
        0xE4 => op!("CPX", ZeroPage, 3),
        0xEC => op!("CPX", Absolute, 4),

        0xC0 => op!("CPY", Immediate, 2),
        0xC4 => op!("CPY", ZeroPage, 3),
        0xCC => op!("CPY", Absolute, 4),

        0x24 => op!("BIT", ZeroPage, 3),
        0x2C => op!("BIT", Absolute, 4),

        0xE6 => op!("INC", ZeroPage, 5),
        0xF6 => op!("INC", ZeroPageX, 6),
        0xEE => op!("INC", Absolute, 6),
        0xFE => op!("INC", AbsoluteX, 7),

        0xC6 => op!("DEC", ZeroPage, 5),
        0xD6 => op!("DEC", ZeroPageX, 6),
        0xCE => op!("DEC", Absolute, 6),
        0xDE => op!("DEC", AbsoluteX, 7),

        0xE8 => op!("INX", Implied, 2),
        0xCA => op!("DEX", Implied, 2),
        0xC8 => op!("INY", Implied, 2),
        0x88 => op!("DEY", Implied, 2),

        0x0A => op!("ASL", Accumulator, 2),
        0x06 => op!("ASL", ZeroPage, 5),
        0x16 => op!("ASL", ZeroPageX, 6),
        0x0E => op!("ASL", Absolute, 6),
        0x1E => op!("ASL", AbsoluteX, 7),

        0x4A => op!("LSR", Accumulator, 2),
        0x46 => op!("LSR", ZeroPage, 5),
        0x56 => op!("LSR", ZeroPageX, 6),
        0x4E => op!("LSR", Absolute, 6),
        0x5E => op!("LSR", AbsoluteX, 7),

        0x2A => op!("ROL", Accumulator, 2),
        0x26 => op!("ROL", ZeroPage, 5),
        0x36 => op!("ROL", ZeroPageX, 6),
        0x2E => op!("ROL", Absolute, 6),
        0x3E => op!("ROL", AbsoluteX, 7),

        0x6A => op!("ROR", Accumulator, 2),
        0x66 => op!("ROR", ZeroPage, 5),
        0x76 => op!("ROR", ZeroPageX, 6),
        0x6E => op!("ROR", Absolute, 6),
        0x7E => op!("ROR", AbsoluteX, 7),

        0x4C => op!("JMP", Absolute, 3),
        0x6C => op!("JMP", Indirect, 5),
        0x20 => op!("JSR", Absolute, 6),
        0x60 => op!("RTS", Implied, 6),
        0x40 => op!("RTI", Implied, 6),
        0x00 => op!("BRK", Implied, 7),

        0x90 => op!("BCC", Relative, 2),
        0xB0 => op!("BCS", Relative, 2),
        0xF0 => op!("BEQ", Relative, 2),
        0xD0 => op!("BNE", Relative, 2),
        0x10 => op!("BPL", Relative, 2),
        0x30 => op!("BMI", Relative, 2),
        0x50 => op!("BVC", Relative, 2),
        0x70 => op!("BVS", Relative, 2),

        0x18 => op!("CLC", Implied, 2),
        0x38 => op!("SEC", Implied, 2),
        0x58 => op!("CLI", Implied, 2),
        0x78 => op!("SEI", Implied, 2),
        0xD8 => op!("CLD", Implied, 2),
        0xF8 => op!("SED", Implied, 2),
        0xB8 => op!("CLV", Implied, 2),
        0xEA => op!("NOP", Implied, 2),

        _ => None,
    }
}

/// Static disassembly info for one opcode: mnemonic, addressing mode, and
/// total instruction length in bytes (opcode + operand bytes), independent
/// of any bus or execution state. Used by `DISASM` mode, which never drives
/// the CPU, only peeks memory.
pub fn describe_opcode(opcode: u8) -> Option<(&'static str, AddressingMode, u8)> {
    decode(opcode).map(|spec| (spec.mnemonic, spec.mode, operand_len(spec.mode)))
}

pub fn operand_len(mode: AddressingMode) -> u8 {
    match mode {
        AddressingMode::Implied | AddressingMode::Accumulator => 0,
        AddressingMode::Immediate
        | AddressingMode::ZeroPage
        | AddressingMode::ZeroPageX
        | AddressingMode::ZeroPageY
        | AddressingMode::IndirectX
        | AddressingMode::IndirectY
        | AddressingMode::Relative => 1,
        AddressingMode::Absolute | AddressingMode::AbsoluteX | AddressingMode::AbsoluteY | AddressingMode::Indirect => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct TestBus {
        mem: [u8; 0x10000],
        ready: bool,
    }

    impl TestBus {
        fn new() -> Self {
            Self {
                mem: [0; 0x10000],
                ready: true,
            }
        }
    }

    impl Bus6507 for TestBus {
        fn cpu_read(&mut self, addr: u16) -> u8 {
            self.mem[addr as usize]
        }
        fn cpu_write(&mut self, addr: u16, val: u8) {
            self.mem[addr as usize] = val;
        }
        fn cpu_ready(&self) -> bool {
            self.ready
        }
    }

    #[test]
    fn reset_loads_vector() {
        let mut bus = TestBus::new();
        bus.mem[0xFFFC] = 0x00;
        bus.mem[0xFFFD] = 0xF0;
        let mut cpu = Cpu6507::new();
        cpu.reset(&mut bus);
        assert_eq!(cpu.pc, 0xF000);
    }

    #[test]
    fn lda_immediate_sets_flags_and_takes_two_cycles() {
        let mut bus = TestBus::new();
        bus.mem[0x1000] = 0xA9; // LDA #$00
        bus.mem[0x1001] = 0x00;
        let mut cpu = Cpu6507::new();
        cpu.pc = 0x1000;

        let count = Rc::new(RefCell::new(0));
        let finals = Rc::new(RefCell::new(Vec::new()));
        let count2 = count.clone();
        let finals2 = finals.clone();
        let result = cpu
            .execute_instruction(&mut bus, |_bus, is_final| {
                *count2.borrow_mut() += 1;
                finals2.borrow_mut().push(is_final);
            })
            .unwrap();

        assert_eq!(*count.borrow(), 2);
        assert_eq!(result.cycles, 2);
        assert_eq!(cpu.a, 0);
        assert!(cpu.status & FLAG_Z != 0);
        let finals = finals.borrow();
        assert_eq!(finals.len(), 2);
        assert!(!finals[0]);
        assert!(finals[1]);
    }

    #[test]
    fn indirect_jmp_page_wrap_bug() {
        let mut bus = TestBus::new();
        bus.mem[0x1000] = 0x6C; // JMP (addr)
        bus.mem[0x1001] = 0xFF;
        bus.mem[0x1002] = 0x10;
        bus.mem[0x10FF] = 0x34;
        bus.mem[0x1000_u16.wrapping_add(0) as usize] = 0x6C;
        bus.mem[0x1100] = 0x12; // would be read if the bug were absent
        bus.mem[0x1000] = 0x6C;
        let mut cpu = Cpu6507::new();
        cpu.pc = 0x1000;
        let result = cpu.execute_instruction(&mut bus, |_, _| {}).unwrap();
        assert!(result.bug);
    }
}
