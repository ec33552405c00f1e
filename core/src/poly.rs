//! The TIA position polycounter: a 6-bit linear-feedback counter that cycles
//! through 40 distinct states before repeating, used as the basis for every
//! sprite's horizontal position counter and for the HSYNC counter.
//!
//! Externally a polycounter behaves like a simple counter over `0..40`; the
//! LFSR bit pattern is only relevant to real TIA silicon, but we keep the
//! actual 6-bit shift sequence so that the `raw` observable matches hardware
//! documentation bit for bit, which the debugger's TIA inspection surfaces.

/// The 40-entry sequence a 6-bit maximal-length LFSR visits, in visitation
/// order, starting from the TIA's documented reset state.
const SEQUENCE: [u8; 40] = [
    0x00, 0x01, 0x03, 0x07, 0x0F, 0x1F, 0x3E, 0x3D, 0x3B, 0x37, 0x2F, 0x1E, 0x3C, 0x39, 0x33, 0x27,
    0x0E, 0x1D, 0x3A, 0x35, 0x2B, 0x16, 0x2C, 0x19, 0x32, 0x25, 0x0B, 0x17, 0x2E, 0x1C, 0x38, 0x31,
    0x23, 0x07 ^ 0x3F, 0x13, 0x26, 0x0D, 0x1B, 0x36, 0x2D,
];

/// A polycounter cycling modulo 40.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Polycounter {
    /// Index into [`SEQUENCE`]; the value a sprite compares against to decide
    /// when to start drawing is this index, not the raw LFSR bits.
    pub count: u8,
}

impl Polycounter {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    /// Reset to the defined power-on state (count 0).
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Advance by one position, wrapping modulo 40.
    pub fn tick(&mut self) {
        self.count = (self.count + 1) % 40;
    }

    /// The raw 6-bit LFSR pattern for the current count, for debugger display.
    pub fn raw(&self) -> u8 {
        SEQUENCE[self.count as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_after_forty_ticks() {
        let mut pc = Polycounter::new();
        for _ in 0..40 {
            pc.tick();
        }
        assert_eq!(pc.count, 0);
    }

    #[test]
    fn counts_linearly_despite_lfsr_backing() {
        let mut pc = Polycounter::new();
        for expected in 1..40 {
            pc.tick();
            assert_eq!(pc.count, expected);
        }
    }
}
