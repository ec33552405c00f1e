//! The Television Interface Adaptor: video timing, playfield/player/missile/
//! ball generation, collision detection and the two audio channels.
//!
//! `tick` is called three times per CPU cycle (the TIA's color clock runs at
//! 3x the 6507's) and returns the color index for the pixel just generated,
//! or `None` while in HBLANK/VBLANK. `write`/`read` are called once per CPU
//! bus cycle that actually addresses the chip.

pub mod audio;
pub mod playfield;
pub mod sprite;

use audio::AudioChannel;
use playfield::Playfield;
use sprite::{CopyPattern, Sprite};
use vcs_core::logging::{LogCategory, LogLevel};
use vcs_core::vlog;
use vcs_core::PhaseClock;

pub const HBLANK_CLOCKS: u16 = 68;
pub const VISIBLE_CLOCKS: u16 = 160;
pub const CLOCKS_PER_LINE: u16 = HBLANK_CLOCKS + VISIBLE_CLOCKS;

#[derive(Debug, Clone, Copy, Default)]
struct Collisions {
    m0_p0: bool,
    m0_p1: bool,
    m1_p0: bool,
    m1_p1: bool,
    p0_pf: bool,
    p0_bl: bool,
    p1_pf: bool,
    p1_bl: bool,
    m0_pf: bool,
    m0_bl: bool,
    m1_pf: bool,
    m1_bl: bool,
    bl_pf: bool,
    p0_p1: bool,
    m0_m1: bool,
}

pub struct Tia {
    scanline_clock: u16,
    /// Gates sprite position advance to every other color clock in normal
    /// play (§4.7: "position counters increment only on Φ2 rising edges"),
    /// and gates stretched-width scan rates.
    phase: PhaseClock,
    /// `None` when no HMOVE comb is in progress, otherwise counts 15 down to
    /// 0 across the 16 extra clocks inserted after the strobe.
    comb_remaining: Option<i8>,
    vsync: bool,
    vblank: bool,
    wsync: bool,
    colubk: u8,
    colupf: u8,
    colup: [u8; 2],
    playfield: Playfield,
    players: [Sprite; 2],
    missiles: [Sprite; 2],
    ball: Sprite,
    grp: [u8; 2],
    grp_old: [u8; 2],
    enam: [bool; 2],
    enabl: bool,
    enabl_old: bool,
    vdelp: [bool; 2],
    vdelbl: bool,
    refp: [bool; 2],
    hm: [i8; 5], // p0, p1, m0, m1, bl
    collisions: Collisions,
    audio: [AudioChannel; 2],
    input_latched: [bool; 2],
    pub frame_done: bool,
}

impl Tia {
    pub fn new() -> Self {
        Self {
            scanline_clock: 0,
            phase: PhaseClock::new(),
            comb_remaining: None,
            vsync: false,
            vblank: false,
            wsync: false,
            colubk: 0,
            colupf: 0,
            colup: [0; 2],
            playfield: Playfield::new(),
            players: [Sprite::new(), Sprite::new()],
            missiles: [Sprite::new(), Sprite::new()],
            ball: Sprite::new(),
            grp: [0; 2],
            grp_old: [0; 2],
            enam: [false; 2],
            enabl: false,
            enabl_old: false,
            vdelp: [false; 2],
            vdelbl: false,
            refp: [false; 2],
            hm: [0; 5],
            collisions: Collisions::default(),
            audio: [AudioChannel::new(), AudioChannel::new()],
            input_latched: [false; 2],
            frame_done: false,
        }
    }

    pub fn rdy_high(&self) -> bool {
        !self.wsync
    }

    pub fn scanline_position(&self) -> u16 {
        self.scanline_clock
    }

    pub fn in_vblank(&self) -> bool {
        self.vblank
    }

    pub fn in_vsync(&self) -> bool {
        self.vsync
    }

    /// `(new, old)` graphics latch pair for player 0/1, for debugger
    /// inspection of the GRP0/GRP1 cross-latch.
    pub fn player_graphics(&self, idx: usize) -> (u8, u8) {
        (self.grp[idx], self.grp_old[idx])
    }

    /// Advance one color clock. Returns `Some(color_index)` for visible
    /// pixels, `None` during HBLANK.
    pub fn tick(&mut self) -> Option<u8> {
        self.frame_done = false;

        self.phase.tick();

        let comb_active = if let Some(remaining) = self.comb_remaining {
            for (sprite, nibble) in [
                (&mut self.players[0], self.hm[0]),
                (&mut self.players[1], self.hm[1]),
                (&mut self.missiles[0], self.hm[2]),
                (&mut self.missiles[1], self.hm[3]),
                (&mut self.ball, self.hm[4]),
            ] {
                let threshold = nibble as i32 + 8;
                let extra = threshold > remaining as i32;
                sprite.tick(self.phase, extra);
            }
            let next = remaining - 1;
            self.comb_remaining = if next >= 0 { Some(next) } else { None };
            true
        } else {
            false
        };

        if !comb_active {
            for sprite in self
                .players
                .iter_mut()
                .chain(self.missiles.iter_mut())
                .chain(std::iter::once(&mut self.ball))
            {
                sprite.tick(self.phase, false);
            }
        }

        for ch in &mut self.audio {
            ch.tick();
        }

        let was_hblank = self.scanline_clock < HBLANK_CLOCKS;
        let pixel_result = if was_hblank {
            None
        } else {
            let column = (self.scanline_clock - HBLANK_CLOCKS) as usize;
            Some(self.composite_pixel(column))
        };

        self.scanline_clock += 1;
        if self.scanline_clock >= CLOCKS_PER_LINE {
            self.scanline_clock = 0;
            self.frame_done = true;
            if self.wsync {
                self.wsync = false;
            }
        }

        pixel_result
    }

    fn composite_pixel(&mut self, column: usize) -> u8 {
        let pf_bit = self.playfield.bit_at(column);
        let p0 = self.players[0]
            .scan_bit(8)
            .map(|bit| (self.grp_for(0) & (0x80 >> bit) != 0) ^ self.refp[0])
            .unwrap_or(false);
        let p1 = self.players[1]
            .scan_bit(8)
            .map(|bit| (self.grp_for(1) & (0x80 >> bit) != 0) ^ self.refp[1])
            .unwrap_or(false);
        let m0 = self.enam[0] && self.missiles[0].scan_bit(1).is_some();
        let m1 = self.enam[1] && self.missiles[1].scan_bit(1).is_some();
        let bl = self.ball_enabled() && self.ball.scan_bit(1).is_some();

        self.record_collisions(p0, p1, m0, m1, bl, pf_bit);

        if self.playfield.priority {
            if pf_bit || bl {
                return self.playfield_color(column);
            }
            if p0 || m0 {
                return self.colup[0];
            }
            if p1 || m1 {
                return self.colup[1];
            }
            self.colubk
        } else {
            if p0 || m0 {
                return self.colup[0];
            }
            if p1 || m1 {
                return self.colup[1];
            }
            if pf_bit || bl {
                return self.playfield_color(column);
            }
            self.colubk
        }
    }

    fn grp_for(&self, idx: usize) -> u8 {
        if self.vdelp[idx] {
            self.grp_old[idx]
        } else {
            self.grp[idx]
        }
    }

    fn ball_enabled(&self) -> bool {
        if self.vdelbl {
            self.enabl_old
        } else {
            self.enabl
        }
    }

    /// Signed horizontal position: negative while still in HBLANK, matching
    /// the "tv clock" the reset latch samples.
    fn horizpos(&self) -> i16 {
        self.scanline_clock as i16 - HBLANK_CLOCKS as i16
    }

    fn hblank(&self) -> bool {
        self.scanline_clock < HBLANK_CLOCKS
    }

    /// Whether HMOVE's comb is still running with at least one extra clock
    /// left to apply (§4.6's "last HMOVE counter between 1 and 15").
    fn hmove_active(&self) -> bool {
        matches!(self.comb_remaining, Some(r) if r >= 1)
    }

    fn playfield_color(&self, column: usize) -> u8 {
        if self.playfield.score_mode {
            if column < 80 {
                self.colup[0]
            } else {
                self.colup[1]
            }
        } else {
            self.colupf
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record_collisions(&mut self, p0: bool, p1: bool, m0: bool, m1: bool, bl: bool, pf: bool) {
        let c = &mut self.collisions;
        c.m0_p0 |= m0 && p0;
        c.m0_p1 |= m0 && p1;
        c.m1_p0 |= m1 && p0;
        c.m1_p1 |= m1 && p1;
        c.p0_pf |= p0 && pf;
        c.p0_bl |= p0 && bl;
        c.p1_pf |= p1 && pf;
        c.p1_bl |= p1 && bl;
        c.m0_pf |= m0 && pf;
        c.m0_bl |= m0 && bl;
        c.m1_pf |= m1 && pf;
        c.m1_bl |= m1 && bl;
        c.bl_pf |= bl && pf;
        c.p0_p1 |= p0 && p1;
        c.m0_m1 |= m0 && m1;
    }

    pub fn write(&mut self, offset: u16, val: u8) {
        match offset {
            0x00 => self.vsync = val & 0x02 != 0,
            0x01 => self.vblank = val & 0x02 != 0,
            0x02 => {
                self.wsync = true;
                vlog!(LogCategory::Tia, LogLevel::Trace, "WSYNC at clock {}", self.scanline_clock);
            }
            0x03 => self.scanline_clock = 0,
            0x04 => self.players[0].copies = CopyPattern::from_nusiz(val),
            0x05 => self.players[1].copies = CopyPattern::from_nusiz(val),
            0x06 => self.colup[0] = val & 0xFE,
            0x07 => self.colup[1] = val & 0xFE,
            0x08 => self.colupf = val & 0xFE,
            0x09 => self.colubk = val & 0xFE,
            0x0A => {
                self.playfield.reflect = val & 0x01 != 0;
                self.playfield.score_mode = val & 0x02 != 0;
                self.playfield.priority = val & 0x04 != 0;
            }
            0x0B => self.refp[0] = val & 0x08 != 0,
            0x0C => self.refp[1] = val & 0x08 != 0,
            0x0D => self.playfield.set_pf0(val),
            0x0E => self.playfield.set_pf1(val),
            0x0F => self.playfield.set_pf2(val),
            0x10 => {
                let (horizpos, hblank, hmove_active) = (self.horizpos(), self.hblank(), self.hmove_active());
                let stretched = matches!(self.players[0].copies, CopyPattern::Double | CopyPattern::Quad);
                self.players[0].reset(horizpos, hblank, hmove_active, stretched);
            }
            0x11 => {
                let (horizpos, hblank, hmove_active) = (self.horizpos(), self.hblank(), self.hmove_active());
                let stretched = matches!(self.players[1].copies, CopyPattern::Double | CopyPattern::Quad);
                self.players[1].reset(horizpos, hblank, hmove_active, stretched);
            }
            0x12 => {
                let (horizpos, hblank, hmove_active) = (self.horizpos(), self.hblank(), self.hmove_active());
                self.missiles[0].reset(horizpos, hblank, hmove_active, false);
            }
            0x13 => {
                let (horizpos, hblank, hmove_active) = (self.horizpos(), self.hblank(), self.hmove_active());
                self.missiles[1].reset(horizpos, hblank, hmove_active, false);
            }
            0x14 => {
                let (horizpos, hblank, hmove_active) = (self.horizpos(), self.hblank(), self.hmove_active());
                self.ball.reset(horizpos, hblank, hmove_active, false);
            }
            0x15 => self.audio[0].control = val,
            0x16 => self.audio[1].control = val,
            0x17 => self.audio[0].freq_divider = val & 0x1F,
            0x18 => self.audio[1].freq_divider = val & 0x1F,
            0x19 => self.audio[0].volume = val & 0x0F,
            0x1A => self.audio[1].volume = val & 0x0F,
            0x1B => {
                self.grp_old[1] = self.grp[1];
                self.grp[0] = val;
                // Hardware quirk: writing GRP0 latches the *ball's* old
                // enable from its current value, piggybacking on the
                // player-0 latch pulse.
                self.enabl_old = self.enabl;
            }
            0x1C => {
                self.grp_old[0] = self.grp[0];
                self.grp[1] = val;
            }
            0x1D => self.enam[0] = val & 0x02 != 0,
            0x1E => self.enam[1] = val & 0x02 != 0,
            0x1F => self.enabl = val & 0x02 != 0,
            0x20 => self.hm[0] = nibble_signed(val),
            0x21 => self.hm[1] = nibble_signed(val),
            0x22 => self.hm[2] = nibble_signed(val),
            0x23 => self.hm[3] = nibble_signed(val),
            0x24 => self.hm[4] = nibble_signed(val),
            0x25 => self.vdelp[0] = val & 0x01 != 0,
            0x26 => self.vdelp[1] = val & 0x01 != 0,
            0x27 => self.vdelbl = val & 0x01 != 0,
            0x28 | 0x29 => {} // RESMPx: missile-locked-to-player, not modeled pixel-exact
            0x2A => {
                self.comb_remaining = Some(15);
                for sprite in self
                    .players
                    .iter_mut()
                    .chain(self.missiles.iter_mut())
                    .chain(std::iter::once(&mut self.ball))
                {
                    sprite.begin_hmove();
                }
                vlog!(LogCategory::Tia, LogLevel::Debug, "HMOVE strobe at clock {}", self.scanline_clock);
            }
            0x2B => self.hm = [0; 5],
            0x2C => self.collisions = Collisions::default(),
            _ => {}
        }
    }

    pub fn read(&mut self, offset: u16, open_bus: u8) -> u8 {
        self.peek(offset, open_bus)
    }

    pub fn peek(&self, offset: u16, open_bus: u8) -> u8 {
        let c = &self.collisions;
        let bits = |hi: bool, lo: bool| -> u8 {
            let mut b = open_bus & 0x3F;
            if hi {
                b |= 0x80;
            }
            if lo {
                b |= 0x40;
            }
            b
        };
        match offset {
            0x00 => bits(c.m0_p1, c.m0_p0),
            0x01 => bits(c.m1_p0, c.m1_p1),
            0x02 => bits(c.p0_pf, c.p0_bl),
            0x03 => bits(c.p1_pf, c.p1_bl),
            0x04 => bits(c.m0_pf, c.m0_bl),
            0x05 => bits(c.m1_pf, c.m1_bl),
            0x06 => bits(c.bl_pf, false),
            0x07 => bits(c.p0_p1, c.m0_m1),
            0x08..=0x0B => (open_bus & 0x7F) | 0x80, // INPT0-3: paddles not modeled, pulled high
            0x0C | 0x0D => {
                let idx = (offset - 0x0C) as usize;
                if self.input_latched[idx] {
                    0x80
                } else {
                    open_bus & 0x7F
                }
            }
            _ => open_bus,
        }
    }

    pub fn poke(&mut self, offset: u16, val: u8) {
        self.write(offset, val);
    }
}

fn nibble_signed(val: u8) -> i8 {
    let high = (val >> 4) as i8 & 0x0F;
    if high >= 8 {
        high - 16
    } else {
        high
    }
}

impl Default for Tia {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wsync_holds_rdy_low_until_line_wraps() {
        let mut tia = Tia::new();
        tia.write(0x02, 0);
        assert!(!tia.rdy_high());
        for _ in 0..CLOCKS_PER_LINE {
            tia.tick();
        }
        assert!(tia.rdy_high());
    }

    #[test]
    fn hmove_extends_reach_of_full_left_nibble() {
        let mut tia = Tia::new();
        tia.write(0x20, 0x70); // HMP0 nibble 7 -> +8 threshold, max comb reach
        tia.write(0x2A, 0); // HMOVE
        let before = tia.players[0].counter.count;
        for _ in 0..16 {
            tia.tick();
        }
        // every one of the 16 comb clocks should have advanced this sprite
        assert_ne!(tia.players[0].counter.count, before);
    }

    #[test]
    fn hmove_comb_produces_the_documented_hmoved_pixel_shift() {
        let mut tia = Tia::new();
        tia.write(0x20, 0x70); // HMP0 nibble 7 -> move left 7
        tia.write(0x2A, 0); // strobe HMOVE at horizpos -68 (HBLANK start)
        for _ in 0..16 {
            tia.tick();
        }
        let reset_pixel = tia.players[0].reset_pixel as u16;
        assert_eq!(tia.players[0].hmoved_pixel as u16, (reset_pixel + 153) % 160);
    }

    #[test]
    fn nibble_signed_decodes_twos_complement_high_nibble() {
        assert_eq!(nibble_signed(0x70), 7);
        assert_eq!(nibble_signed(0x80), -8);
        assert_eq!(nibble_signed(0x00), 0);
    }
}
