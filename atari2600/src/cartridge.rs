//! Cartridge bank switching.
//!
//! Every scheme implements [`Mapper`]: the CPU only ever sees a 4K window at
//! $1000-$1FFF, and each mapper decides which bank of the underlying ROM (and
//! sometimes RAM) backs that window, and whether a given address is also a
//! hotspot that changes banks as a side effect of being addressed at all
//! (even by a peek the 6507 never actually issues, which is why bank-switch
//! hotspots are snooped from the full address bus, not just CPU reads).

use crate::error::{CartridgeError, Result};
use vcs_core::logging::{LogCategory, LogLevel};
use vcs_core::vlog;

pub trait Mapper: Send {
    fn read(&mut self, offset: u16) -> u8;
    fn write(&mut self, offset: u16, val: u8);
    fn peek(&self, offset: u16) -> u8;
    fn poke(&mut self, offset: u16, val: u8);
    /// Let the mapper see every address and value placed on the bus, not
    /// just ones the CPU actually reads or writes; several schemes switch
    /// banks on access alone, and Tigervision's needs the value too (it
    /// banks on a *write* to zero-page, not on addressing the cartridge
    /// window at all).
    fn snoop(&mut self, _addr: u16, _val: u8) {}
    fn current_bank(&self) -> usize;
    fn bank_count(&self) -> usize;
}

const BANK_SIZE: usize = 0x1000;

/// Detect a mapper from ROM size alone. Ambiguous sizes (8K could be F8 or
/// E0's relatives) default to the most common scheme for that size.
pub fn detect(rom: Vec<u8>) -> Result<Box<dyn Mapper>> {
    let len = rom.len();
    let mapper: Box<dyn Mapper> = match len {
        0x0800 => Box::new(Atari2k::new(rom)),
        0x1000 => Box::new(Atari4k::new(rom)),
        0x2000 => Box::new(F8::new(rom)),
        0x4000 => Box::new(F6::new(rom)),
        0x8000 => Box::new(F4::new(rom)),
        0x2000 + 256 => Box::new(Superchip::new(rom, 0x2000)),
        0x4000 + 256 => Box::new(Superchip::new(rom, 0x4000)),
        // F8/F6/F4 are strictly 4K-banked; a size that's a multiple of 2K
        // but not of 4K can only be Tigervision's 2K banking scheme.
        n if n > 0x0800 && n % 0x0800 == 0 && n % 0x1000 != 0 => Box::new(Tigervision::new(rom)),
        _ => return Err(CartridgeError::InvalidSize(len).into()),
    };
    vlog!(
        LogCategory::Cartridge,
        LogLevel::Info,
        "detected {}-bank cartridge ({} bytes)",
        mapper.bank_count(),
        len
    );
    Ok(mapper)
}

/// 2K ROM, no bank switching; the 2K image is mirrored twice to fill the 4K
/// window.
struct Atari2k {
    rom: Vec<u8>,
}
impl Atari2k {
    fn new(rom: Vec<u8>) -> Self {
        Self { rom }
    }
}
impl Mapper for Atari2k {
    fn read(&mut self, offset: u16) -> u8 {
        self.peek(offset)
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

/// Plain 4K ROM, no bank switching at all.
struct Atari4k {
    rom: Vec<u8>,
}
impl Atari4k {
    fn new(rom: Vec<u8>) -> Self {
        Self { rom }
    }
}
impl Mapper for Atari4k {
    fn read(&mut self, offset: u16) -> u8 {
        self.rom[offset as usize]
    }
    fn write(&mut self, _offset: u16, _val: u8) {}
    fn peek(&self, offset: u16) -> u8 {
        self.rom[offset as usize]
    }
    fn poke(&mut self, offset: u16, val: u8) {
        self.rom[offset as usize] = val;
    }
    fn current_bank(&self) -> usize {
        0
    }
    fn bank_count(&self) -> usize {
        1
    }
}

/// F8: 8K in two 4K banks, hotspots $1FF8/$1FF9.
struct F8 {
    rom: Vec<u8>,
    bank: usize,
}
impl F8 {
    fn new(rom: Vec<u8>) -> Self {
        Self { rom, bank: 1 }
    }
    fn bank_offset(&self) -> usize {
        self.bank * BANK_SIZE
    }
}
impl Mapper for F8 {
    fn read(&mut self, offset: u16) -> u8 {
        self.snoop(offset, 0);
        self.rom[self.bank_offset() + offset as usize]
    }
    fn write(&mut self, offset: u16, val: u8) {
        self.snoop(offset, val);
    }
    fn peek(&self, offset: u16) -> u8 {
        self.rom[self.bank_offset() + offset as usize]
    }
    fn poke(&mut self, offset: u16, val: u8) {
        let idx = self.bank_offset() + offset as usize;
        self.rom[idx] = val;
    }
    fn snoop(&mut self, addr: u16, _val: u8) {
        match addr & 0x0FFF {
            0x0FF8 => self.bank = 0,
            0x0FF9 => self.bank = 1,
            _ => {}
        }
    }
    fn current_bank(&self) -> usize {
        self.bank
    }
    fn bank_count(&self) -> usize {
        2
    }
}

/// F6: 16K in four 4K banks, hotspots $1FF6-$1FF9.
struct F6 {
    rom: Vec<u8>,
    bank: usize,
}
impl F6 {
    fn new(rom: Vec<u8>) -> Self {
        Self { rom, bank: 0 }
    }
}
impl Mapper for F6 {
    fn read(&mut self, offset: u16) -> u8 {
        self.snoop(offset, 0);
        self.rom[self.bank * BANK_SIZE + offset as usize]
    }
    fn write(&mut self, offset: u16, val: u8) {
        self.snoop(offset, val);
    }
    fn peek(&self, offset: u16) -> u8 {
        self.rom[self.bank * BANK_SIZE + offset as usize]
    }
    fn poke(&mut self, offset: u16, val: u8) {
        let idx = self.bank * BANK_SIZE + offset as usize;
        self.rom[idx] = val;
    }
    fn snoop(&mut self, addr: u16, _val: u8) {
        if let 0x0FF6..=0x0FF9 = addr & 0x0FFF {
            self.bank = (addr & 0x0FFF) as usize - 0x0FF6;
        }
    }
    fn current_bank(&self) -> usize {
        self.bank
    }
    fn bank_count(&self) -> usize {
        4
    }
}

/// F4: 32K in eight 4K banks, hotspots $1FF4-$1FFB.
struct F4 {
    rom: Vec<u8>,
    bank: usize,
}
impl F4 {
    fn new(rom: Vec<u8>) -> Self {
        Self { rom, bank: 0 }
    }
}
impl Mapper for F4 {
    fn read(&mut self, offset: u16) -> u8 {
        self.snoop(offset, 0);
        self.rom[self.bank * BANK_SIZE + offset as usize]
    }
    fn write(&mut self, offset: u16, val: u8) {
        self.snoop(offset, val);
    }
    fn peek(&self, offset: u16) -> u8 {
        self.rom[self.bank * BANK_SIZE + offset as usize]
    }
    fn poke(&mut self, offset: u16, val: u8) {
        let idx = self.bank * BANK_SIZE + offset as usize;
        self.rom[idx] = val;
    }
    fn snoop(&mut self, addr: u16, _val: u8) {
        if let 0x0FF4..=0x0FFB = addr & 0x0FFF {
            self.bank = (addr & 0x0FFF) as usize - 0x0FF4;
        }
    }
    fn current_bank(&self) -> usize {
        self.bank
    }
    fn bank_count(&self) -> usize {
        8
    }
}

/// F8 plus a 128-byte "superchip" RAM window: low 128 bytes of the 4K window
/// are write-port, mirrored 128 bytes above are read-port.
struct Superchip {
    rom: Vec<u8>,
    ram: [u8; 128],
    bank: usize,
    banked_size: usize,
}
impl Superchip {
    fn new(mut rom: Vec<u8>, banked_size: usize) -> Self {
        rom.truncate(banked_size);
        Self {
            rom,
            ram: [0; 128],
            bank: 0,
            banked_size,
        }
    }
    fn bank_count_inner(&self) -> usize {
        self.banked_size / BANK_SIZE
    }
}
impl Mapper for Superchip {
    fn read(&mut self, offset: u16) -> u8 {
        self.snoop(offset, 0);
        if offset < 0x80 {
            // write port: reads are open-bus on real hardware, approximate
            // with the stored value rather than guessing a floating byte.
            self.ram[offset as usize]
        } else if offset < 0x100 {
            self.ram[(offset - 0x80) as usize]
        } else {
            self.rom[self.bank * BANK_SIZE + offset as usize]
        }
    }
    fn write(&mut self, offset: u16, val: u8) {
        self.snoop(offset, val);
        if offset < 0x80 {
            self.ram[offset as usize] = val;
        }
    }
    fn peek(&self, offset: u16) -> u8 {
        if offset < 0x100 {
            self.ram[(offset % 0x80) as usize]
        } else {
            self.rom[self.bank * BANK_SIZE + offset as usize]
        }
    }
    fn poke(&mut self, offset: u16, val: u8) {
        if offset < 0x100 {
            self.ram[(offset % 0x80) as usize] = val;
        } else {
            let idx = self.bank * BANK_SIZE + offset as usize;
            self.rom[idx] = val;
        }
    }
    fn snoop(&mut self, addr: u16, _val: u8) {
        let off = addr & 0x0FFF;
        if off >= 0x0FF8 && (off as usize - 0x0FF8) < self.bank_count_inner() {
            self.bank = off as usize - 0x0FF8;
        }
    }
    fn current_bank(&self) -> usize {
        self.bank
    }
    fn bank_count(&self) -> usize {
        self.bank_count_inner()
    }
}

/// Tigervision/3F: ROM banked in 2K halves, the hotspot is a *write* to the
/// low TIA/RAM zero-page ($00-$3F of the folded bus address) rather than an
/// access to the cartridge window itself. The low 2K of the 4K window is the
/// selected bank; the upper 2K is hardwired to the last bank so a game can
/// always reach its fixed entry/vector bank regardless of which bank is
/// switched in below it.
struct Tigervision {
    rom: Vec<u8>,
    bank: usize,
    bank_count: usize,
}
impl Tigervision {
    fn new(rom: Vec<u8>) -> Self {
        let bank_count = rom.len() / 0x0800;
        Self {
            rom,
            bank: 0,
            bank_count,
        }
    }
    fn last_bank_offset(&self) -> usize {
        (self.bank_count - 1) * 0x0800
    }
}
impl Mapper for Tigervision {
    fn read(&mut self, offset: u16) -> u8 {
        if offset < 0x0800 {
            self.rom[self.bank * 0x0800 + offset as usize]
        } else {
            self.rom[self.last_bank_offset() + (offset as usize - 0x0800)]
        }
    }
    fn write(&mut self, _offset: u16, _val: u8) {}
    fn peek(&self, offset: u16) -> u8 {
        if offset < 0x0800 {
            self.rom[self.bank * 0x0800 + offset as usize]
        } else {
            self.rom[self.last_bank_offset() + (offset as usize - 0x0800)]
        }
    }
    fn poke(&mut self, offset: u16, val: u8) {
        if offset < 0x0800 {
            let idx = self.bank * 0x0800 + offset as usize;
            self.rom[idx] = val;
        } else {
            let idx = self.last_bank_offset() + (offset as usize - 0x0800);
            self.rom[idx] = val;
        }
    }
    fn snoop(&mut self, addr: u16, val: u8) {
        if addr & 0x1FFF < 0x0040 {
            self.bank = val as usize % self.bank_count;
        }
    }
    fn current_bank(&self) -> usize {
        self.bank
    }
    fn bank_count(&self) -> usize {
        self.bank_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_size_is_rejected() {
        assert!(matches!(
            detect(vec![0u8; 123]),
            Err(crate::error::EmulatorError::Cartridge(CartridgeError::InvalidSize(123)))
        ));
    }

    #[test]
    fn f8_switches_bank_on_hotspot_read() {
        let mut rom = vec![0u8; 0x2000];
        rom[0x0000] = 0xAA; // bank 0 byte 0
        rom[0x1000] = 0xBB; // bank 1 byte 0
        let mut m = F8::new(rom);
        assert_eq!(m.current_bank(), 1);
        assert_eq!(m.read(0x0000), 0xBB);
        m.read(0x0FF8);
        assert_eq!(m.current_bank(), 0);
        assert_eq!(m.read(0x0000), 0xAA);
    }

    #[test]
    fn atari_4k_never_switches() {
        let rom = vec![7u8; 0x1000];
        let mut m = Atari4k::new(rom);
        assert_eq!(m.bank_count(), 1);
        assert_eq!(m.read(0x1FF8 & 0x0FFF), 7);
    }

    #[test]
    fn detect_picks_tigervision_for_non_4k_multiple_of_2k() {
        let rom = vec![0u8; 0x0800 * 3]; // 6K: not a multiple of 4K
        let mapper = detect(rom).unwrap();
        assert_eq!(mapper.bank_count(), 3);
    }

    #[test]
    fn tigervision_switches_low_half_on_zero_page_write_value() {
        let mut rom = vec![0u8; 0x0800 * 3];
        rom[0x0000] = 0x11; // bank 0
        rom[0x0800] = 0x22; // bank 1
        let mut m = Tigervision::new(rom);
        assert_eq!(m.read(0x0000), 0x11);
        m.snoop(0x0000, 1);
        assert_eq!(m.current_bank(), 1);
        assert_eq!(m.read(0x0000), 0x22);
    }

    #[test]
    fn tigervision_upper_half_stays_on_last_bank() {
        let mut rom = vec![0u8; 0x0800 * 3];
        rom[2 * 0x0800] = 0x33; // last bank's first byte
        let mut m = Tigervision::new(rom);
        m.snoop(0x0000, 1); // switch the low half away from bank 0
        assert_eq!(m.read(0x0800), 0x33);
    }
}
