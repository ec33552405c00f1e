//! Player, missile and ball counters.
//!
//! Each movable object carries its own 40-state polycounter acting as a
//! motion clock: under normal play it advances once every other color clock
//! (gated by the two-phase clock's late edges), but during HMOVE's "comb"
//! extension it advances every clock for up to 16 extra counts, which is
//! what lets late horizontal-motion values shove an object further left than
//! a single color clock of travel could explain. RESxx writes don't move the
//! object immediately; they schedule a restart of the counter a fixed number
//! of color clocks out, and a start-drawing decode is itself latched a
//! further 5 (or 6, for stretched widths) clocks after the counter reaches
//! its trigger value — both modeled with [`vcs_core::FutureScheduler`]
//! exactly as register writes are deferred elsewhere in the chip.

use vcs_core::{FutureScheduler, PhaseClock, Polycounter};

/// NUSIZx selects how many copies of a player/missile are drawn across the
/// scanline and how far apart. The counts are motion-clock offsets at which
/// a second/third copy starts drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyPattern {
    One,
    TwoClose,
    TwoMedium,
    Three,
    TwoWide,
    Double,
    Quad,
}

impl CopyPattern {
    pub fn from_nusiz(val: u8) -> Self {
        match val & 0x07 {
            0b001 => CopyPattern::TwoClose,
            0b010 => CopyPattern::TwoMedium,
            0b011 => CopyPattern::Three,
            0b100 => CopyPattern::TwoWide,
            0b110 => CopyPattern::Double,
            0b111 => CopyPattern::Quad,
            _ => CopyPattern::One,
        }
    }

    /// Motion-clock counts (mod 40) at which additional copies begin, beside
    /// the primary copy's start at count 39.
    fn extra_starts(self) -> &'static [u8] {
        match self {
            CopyPattern::One => &[],
            CopyPattern::TwoClose => &[3],
            CopyPattern::TwoMedium => &[7],
            CopyPattern::Three => &[3, 7],
            CopyPattern::TwoWide => &[15],
            CopyPattern::Double => &[],
            CopyPattern::Quad => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpriteEvent {
    ResetCounter,
    StartDrawing,
}

/// A player, missile or ball's horizontal position/scan logic.
pub struct Sprite {
    pub counter: Polycounter,
    scheduler: FutureScheduler<SpriteEvent>,
    /// True for the scan duration during which this object's graphics are
    /// actively being serialized out (set by the start-drawing latch firing).
    pub drawing: bool,
    scan_index: u8,
    pub copies: CopyPattern,
    /// HMxx nibble, signed -8..7, added to the per-clock advance during
    /// HMOVE's comb phase.
    pub motion: i8,
    /// Horizontal pixel the last RESPn reset landed on, computed from the
    /// write's delay and TV position rather than decoded from the counter.
    pub reset_pixel: u8,
    /// `reset_pixel` as adjusted by HMOVE's comb, tracked incrementally as
    /// the strobe and its extra clocks land.
    pub hmoved_pixel: u8,
}

impl Sprite {
    pub fn new() -> Self {
        Self {
            counter: Polycounter::new(),
            scheduler: FutureScheduler::new(),
            drawing: false,
            scan_index: 0,
            copies: CopyPattern::One,
            motion: 0,
            reset_pixel: 0,
            hmoved_pixel: 0,
        }
    }

    fn is_start_position(&self, count: u8) -> bool {
        count == 39 || self.copies.extra_starts().contains(&count)
    }

    fn start_latch_delay(&self) -> u32 {
        match self.copies {
            CopyPattern::Double | CopyPattern::Quad => 6,
            _ => 5,
        }
    }

    /// RESPn: schedule the counter restart and compute this write's
    /// `reset_pixel`/`hmoved_pixel` up front. `hblank`/`hmove_active` select
    /// the delay (4 outside HBLANK, 2 during HBLANK with HMOVE's comb still
    /// running, 3 during HBLANK otherwise); `stretched` is true for 2x/4x
    /// player sprites, which land one pixel further right.
    pub fn reset(&mut self, horizpos_at_write: i16, hblank: bool, hmove_active: bool, stretched: bool) {
        let delay: u32 = if !hblank {
            4
        } else if hmove_active {
            2
        } else {
            3
        };

        let target = horizpos_at_write + delay as i16;
        if target < 0 {
            // Documented VCS quirk: a reset that fires before the visible
            // line starts lands at pixel 0 but reports hmoved_pixel as 7.
            self.reset_pixel = 0;
            self.hmoved_pixel = 7;
        } else {
            let size_adjustment: i16 = if stretched { 1 } else { 0 };
            let pixel = (target + size_adjustment).rem_euclid(160) as u8;
            self.reset_pixel = pixel;
            self.hmoved_pixel = pixel;
        }

        if self.scheduler.about_to_end("start") {
            if self.scheduler.force("start").is_some() {
                self.drawing = true;
                self.scan_index = 0;
            }
        } else {
            self.scheduler.drop_event("start");
        }

        self.scheduler.schedule("reset", delay, SpriteEvent::ResetCounter);
    }

    /// HMOVE strobe: bump the comb bookkeeping pixel by 8, mirroring the
    /// hardware's HBLANK-extension kick before the per-clock comb begins.
    pub fn begin_hmove(&mut self) {
        self.hmoved_pixel = (self.hmoved_pixel + 8) % 160;
    }

    /// Advance by one color clock. `phase` gates the normal (every-other-
    /// clock) motion advance and, for stretched widths, the scan rate;
    /// `extra_hmove` is true on clocks where this sprite's HM nibble keeps
    /// HMOVE's comb ticking it an additional step.
    pub fn tick(&mut self, phase: PhaseClock, extra_hmove: bool) {
        let mut just_started = false;
        for (_, event) in self.scheduler.tick() {
            match event {
                SpriteEvent::ResetCounter => {
                    self.counter.reset();
                    self.scan_index = 0;
                    self.drawing = false;
                }
                SpriteEvent::StartDrawing => {
                    self.drawing = true;
                    self.scan_index = 0;
                    just_started = true;
                }
            }
        }

        let normal_motion = phase.late_phi1() || phase.late_phi2();
        if normal_motion || extra_hmove {
            self.counter.tick();
            if self.is_start_position(self.counter.count) {
                self.scheduler
                    .schedule("start", self.start_latch_delay(), SpriteEvent::StartDrawing);
            }
        }

        if extra_hmove {
            self.hmoved_pixel = (self.hmoved_pixel + 159) % 160;
        }

        if self.drawing && !just_started {
            let scan_gate = match self.copies {
                CopyPattern::Quad => phase.late_phi2(),
                CopyPattern::Double => phase.late_phi1() || phase.late_phi2(),
                _ => true,
            };
            if scan_gate {
                self.scan_index = self.scan_index.saturating_add(1);
            }
        }
    }

    /// Bit offset into an 8-pixel graphics byte for the current scan
    /// position, or `None` once past the sprite's width.
    pub fn scan_bit(&self, width: u8) -> Option<u8> {
        if !self.drawing || self.scan_index >= width {
            return None;
        }
        Some(self.scan_index)
    }
}

impl Default for Sprite {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_normal_clocks(s: &mut Sprite, n: u32) {
        let mut phase = PhaseClock::new();
        for _ in 0..n {
            phase.tick();
            s.tick(phase, false);
        }
    }

    #[test]
    fn reset_schedules_counter_restart_after_delay() {
        let mut s = Sprite::new();
        s.counter.tick();
        s.counter.tick();
        s.reset(100, false, false, false);
        // The scheduled "reset" fires after exactly 4 calls to tick(),
        // independent of phase gating.
        run_normal_clocks(&mut s, 4);
        assert_eq!(s.counter.raw(), 0);
    }

    #[test]
    fn reset_pixel_outside_hblank_matches_write_plus_four() {
        let mut s = Sprite::new();
        s.reset(50, false, false, false);
        assert_eq!(s.reset_pixel, 54);
        assert_eq!(s.hmoved_pixel, 54);
    }

    #[test]
    fn reset_off_screen_uses_documented_quirk_values() {
        let mut s = Sprite::new();
        s.reset(-68, true, false, false);
        assert_eq!(s.reset_pixel, 0);
        assert_eq!(s.hmoved_pixel, 7);
    }

    #[test]
    fn nusiz_two_close_adds_second_copy() {
        let pattern = CopyPattern::from_nusiz(0b001);
        assert_eq!(pattern.extra_starts(), &[3]);
    }

    #[test]
    fn nusiz_wide_patterns_match_hardware_table() {
        assert_eq!(CopyPattern::from_nusiz(0b010).extra_starts(), &[7]);
        assert_eq!(CopyPattern::from_nusiz(0b011).extra_starts(), &[3, 7]);
        assert_eq!(CopyPattern::from_nusiz(0b100).extra_starts(), &[15]);
    }

    #[test]
    fn start_drawing_is_latched_not_synchronous() {
        let mut s = Sprite::new();
        // Drive the counter to 38, one normal clock short of the primary
        // start at 39.
        for _ in 0..38 {
            s.counter.tick();
        }
        let mut phase = PhaseClock::new();
        phase.tick();
        phase.tick();
        phase.tick(); // late_phi2 -> normal motion advances counter to 39
        s.tick(phase, false);
        assert!(!s.drawing, "drawing must not flip synchronously with the count reaching 39");
        // Five-clock latch before the start actually takes effect, regardless
        // of phase gating in between.
        run_normal_clocks(&mut s, 5);
        assert!(s.drawing);
    }

    #[test]
    fn begin_hmove_adds_eight_pixels() {
        let mut s = Sprite::new();
        s.begin_hmove();
        assert_eq!(s.hmoved_pixel, 8);
    }
}
