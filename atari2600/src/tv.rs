//! A minimal television: accumulates the color-index pixels the TIA emits
//! into scanlines, and a frame, using VSYNC/VBLANK edges the way a real set
//! would lock onto them rather than a fixed scanline count.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TvSpec {
    Ntsc,
    Pal,
}

impl TvSpec {
    pub fn scanlines_per_frame(self) -> usize {
        match self {
            TvSpec::Ntsc => 262,
            TvSpec::Pal => 312,
        }
    }
}

pub struct Television {
    spec: TvSpec,
    width: usize,
    current_line: Vec<u8>,
    pub frame: Vec<u8>,
    lines_this_frame: usize,
    in_vsync: bool,
    pub frames_rendered: u64,
}

impl Television {
    pub fn new(spec: TvSpec) -> Self {
        let width = 160;
        Self {
            spec,
            width,
            current_line: Vec::with_capacity(width),
            frame: vec![0; width * spec.scanlines_per_frame()],
            lines_this_frame: 0,
            in_vsync: false,
            frames_rendered: 0,
        }
    }

    /// Feed one color-clock's worth of pixel data (`None` during HBLANK).
    pub fn push_pixel(&mut self, pixel: Option<u8>) {
        if let Some(color) = pixel {
            self.current_line.push(color);
        }
    }

    /// Called once every TIA color clock with the current VSYNC/VBLANK/
    /// end-of-line state, so the TV can detect scanline and frame
    /// boundaries the way real hardware locks onto sync pulses.
    pub fn observe_sync(&mut self, vsync: bool, line_ended: bool) {
        if vsync && !self.in_vsync {
            self.lines_this_frame = 0;
            self.frame.fill(0);
        }
        self.in_vsync = vsync;

        if line_ended {
            self.commit_line();
        }
    }

    fn commit_line(&mut self) {
        if self.lines_this_frame < self.spec.scanlines_per_frame() {
            let start = self.lines_this_frame * self.width;
            for (i, &color) in self.current_line.iter().take(self.width).enumerate() {
                self.frame[start + i] = color;
            }
        }
        self.current_line.clear();
        self.lines_this_frame += 1;
        if self.lines_this_frame >= self.spec.scanlines_per_frame() {
            self.frames_rendered += 1;
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Scanline index within the current frame, for debugger inspection.
    pub fn current_line(&self) -> usize {
        self.lines_this_frame
    }

    pub fn spec(&self) -> TvSpec {
        self.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commits_a_full_line_of_pixels() {
        let mut tv = Television::new(TvSpec::Ntsc);
        for i in 0..160 {
            tv.push_pixel(Some((i % 4) as u8));
        }
        tv.observe_sync(false, true);
        assert_eq!(tv.frame[3], 3);
    }

    #[test]
    fn vsync_rising_edge_resets_the_frame() {
        let mut tv = Television::new(TvSpec::Ntsc);
        tv.push_pixel(Some(9));
        tv.observe_sync(false, true);
        tv.observe_sync(true, false);
        assert_eq!(tv.frame[0], 0);
    }
}
