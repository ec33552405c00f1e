//! Static disassembly: walks memory with `peek` only, never executes, so it
//! is safe to point at arbitrary addresses (including ones that are never
//! actually reached as code) without perturbing machine state.

use crate::bus::Bus;
use crate::cpu::describe_opcode;

pub struct Line {
    pub addr: u16,
    pub bytes: Vec<u8>,
    pub text: String,
}

pub fn disassemble(bus: &Bus, start: u16, count: usize) -> Vec<Line> {
    let mut lines = Vec::with_capacity(count);
    let mut addr = start;
    for _ in 0..count {
        let opcode = bus.peek(addr);
        let Some((mnemonic, mode, len)) = describe_opcode(opcode) else {
            lines.push(Line {
                addr,
                bytes: vec![opcode],
                text: format!(".byte ${opcode:02x}"),
            });
            addr = addr.wrapping_add(1);
            continue;
        };
        let mut bytes = vec![opcode];
        for i in 0..len {
            bytes.push(bus.peek(addr.wrapping_add(1 + i as u16)));
        }
        let text = format_operand(mnemonic, mode, &bytes[1..]);
        lines.push(Line { addr, bytes, text });
        addr = addr.wrapping_add(1 + len as u16);
    }
    lines
}

fn format_operand(mnemonic: &str, mode: crate::cpu::AddressingMode, operand: &[u8]) -> String {
    use crate::cpu::AddressingMode::*;
    match mode {
        Implied => mnemonic.to_string(),
        Accumulator => format!("{mnemonic} A"),
        Immediate => format!("{mnemonic} #${:02x}", operand[0]),
        ZeroPage => format!("{mnemonic} ${:02x}", operand[0]),
        ZeroPageX => format!("{mnemonic} ${:02x},X", operand[0]),
        ZeroPageY => format!("{mnemonic} ${:02x},Y", operand[0]),
        Relative => format!("{mnemonic} *{:+}", operand[0] as i8),
        Absolute => format!("{mnemonic} ${:02x}{:02x}", operand[1], operand[0]),
        AbsoluteX => format!("{mnemonic} ${:02x}{:02x},X", operand[1], operand[0]),
        AbsoluteY => format!("{mnemonic} ${:02x}{:02x},Y", operand[1], operand[0]),
        Indirect => format!("{mnemonic} (${:02x}{:02x})", operand[1], operand[0]),
        IndirectX => format!("{mnemonic} (${:02x},X)", operand[0]),
        IndirectY => format!("{mnemonic} (${:02x}),Y", operand[0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::Mapper;
    use crate::riot::Riot;
    use crate::tia::Tia;

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
    fn disassembles_immediate_load() {
        let mut rom = vec![0u8; 0x1000];
        rom[0] = 0xA9; // LDA #$42
        rom[1] = 0x42;
        let bus = Bus::new(Box::new(StubMapper { rom }), Tia::new(), Riot::new());
        let lines = disassemble(&bus, 0x1000, 1);
        assert_eq!(lines[0].text, "LDA #$42");
    }
}
