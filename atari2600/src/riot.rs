//! RIOT: 128 bytes of RAM (owned by [`crate::bus::Bus`] directly, not here),
//! a single down-counting interval timer with a selectable prescaler, and the
//! two 8-bit I/O ports wired to the console switches and joystick.

use vcs_core::logging::{LogCategory, LogLevel};
use vcs_core::vlog;

const PRESCALERS: [u32; 4] = [1, 8, 64, 1024];

#[derive(Debug, Clone, Copy, Default)]
pub struct Switches {
    pub reset: bool,
    pub select: bool,
    pub color: bool,
    pub p0_difficulty_a: bool,
    pub p1_difficulty_a: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Controller {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub fire: bool,
}

pub struct Riot {
    pub timer: u8,
    prescaler: u32,
    divider: u32,
    underflowed: bool,
    pub switches: Switches,
    pub controllers: [Controller; 2],
}

impl Riot {
    pub fn new() -> Self {
        Self {
            timer: 0,
            prescaler: PRESCALERS[0],
            divider: PRESCALERS[0],
            underflowed: false,
            switches: Switches::default(),
            controllers: [Controller::default(); 2],
        }
    }

    /// Advance the timer by one CPU cycle. Called once per CPU cycle from
    /// the VCS step loop, independent of the TIA's 3x-faster color clock.
    pub fn tick(&mut self) {
        self.divider -= 1;
        if self.divider == 0 {
            self.divider = self.prescaler;
            let (next, underflow) = self.timer.overflowing_sub(1);
            self.timer = next;
            if underflow {
                self.underflowed = true;
                vlog!(LogCategory::Riot, LogLevel::Debug, "timer underflow, INTIM wraps to ${next:02x}");
            }
        }
    }

    pub fn read(&mut self, offset: u16, open_bus: u8) -> u8 {
        match offset & 0x07 {
            0x00 | 0x08 => self.switches_byte(),
            0x01 | 0x09 => self.controller_byte(0),
            0x02 => self.controller_byte(1),
            0x04 => {
                // INTIM
                self.timer
            }
            0x05 => {
                // INSTAT/TIMINT: reading clears the underflow flag.
                let flag = self.underflowed;
                self.underflowed = false;
                if flag {
                    0x80
                } else {
                    0x00
                }
            }
            _ => open_bus,
        }
    }

    pub fn peek(&self, offset: u16, open_bus: u8) -> u8 {
        match offset & 0x07 {
            0x00 | 0x08 => self.switches_byte(),
            0x01 | 0x09 => self.controller_byte(0),
            0x02 => self.controller_byte(1),
            0x04 => self.timer,
            0x05 => {
                if self.underflowed {
                    0x80
                } else {
                    0x00
                }
            }
            _ => open_bus,
        }
    }

    pub fn poke(&mut self, offset: u16, val: u8) {
        if offset & 0x07 == 0x04 {
            self.timer = val;
        }
    }

    pub fn write(&mut self, offset: u16, val: u8) {
        // TIMxT hotspots: $14=T1, $15=T8, $16=T64, $17=T1024 (and their
        // mirrors at +0x10 which also set the edge-detect bit, unused here).
        let low = offset & 0x1F;
        let prescaler = match low {
            0x14 | 0x1C => Some(PRESCALERS[0]),
            0x15 | 0x1D => Some(PRESCALERS[1]),
            0x16 | 0x1E => Some(PRESCALERS[2]),
            0x17 | 0x1F => Some(PRESCALERS[3]),
            _ => None,
        };
        if let Some(p) = prescaler {
            self.prescaler = p;
            // The first interval is one cycle longer than every subsequent
            // reload: INTIM still reads the armed value on the cycle the
            // divider would otherwise hit zero, so the initial countdown
            // needs the extra +1 that `tick`'s own reload doesn't.
            self.divider = p + 1;
            self.timer = val;
            self.underflowed = false;
            vlog!(LogCategory::Riot, LogLevel::Debug, "timer armed: {val} x{p}");
        }
    }

    fn switches_byte(&self) -> u8 {
        let mut b = 0u8;
        if !self.switches.reset {
            b |= 0x01;
        }
        if !self.switches.select {
            b |= 0x02;
        }
        b |= 0x04 | 0x08; // unused, pulled high
        if self.switches.p0_difficulty_a {
            b |= 0x40;
        }
        if self.switches.p1_difficulty_a {
            b |= 0x80;
        }
        if !self.switches.color {
            b |= 0x08;
        }
        b
    }

    fn controller_byte(&self, index: usize) -> u8 {
        let c = &self.controllers[index];
        let mut b = 0xFFu8;
        if c.up {
            b &= !0x10;
        }
        if c.down {
            b &= !0x20;
        }
        if c.left {
            b &= !0x40;
        }
        if c.right {
            b &= !0x80;
        }
        b
    }
}

impl Default for Riot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_counts_down_at_selected_prescaler() {
        let mut riot = Riot::new();
        riot.write(0x14 & 0x1F, 5); // T1
        for _ in 0..5 {
            riot.tick();
        }
        // the first interval is one cycle longer than the rest, so INTIM is
        // still 1 after the 5th tick and only reaches 0 on the 6th.
        assert_eq!(riot.timer, 1);
        riot.tick();
        assert_eq!(riot.timer, 0);
    }

    #[test]
    fn timer_underflow_sets_instat_and_clears_on_read() {
        let mut riot = Riot::new();
        riot.write(0x14, 0);
        riot.tick();
        riot.tick();
        assert_eq!(riot.read(0x05, 0), 0x80);
        assert_eq!(riot.read(0x05, 0), 0x00);
    }

    #[test]
    fn t1024_prescaler_divides_by_1024() {
        let mut riot = Riot::new();
        riot.write(0x17, 1);
        for _ in 0..1024 {
            riot.tick();
        }
        assert_eq!(riot.timer, 1);
        riot.tick();
        assert_eq!(riot.timer, 0);
    }
}
