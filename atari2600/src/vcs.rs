//! Top-level machine: wires the CPU, bus, TIA and RIOT together and defines
//! the per-CPU-cycle callback that keeps them in lockstep.

use crate::bus::Bus;
use crate::cartridge::Mapper;
use crate::cpu::{Cpu6507, InstructionResult};
use crate::error::Result;
use crate::riot::Riot;
use crate::tia::Tia;
use crate::tv::{Television, TvSpec};

pub struct Vcs {
    pub cpu: Cpu6507,
    pub bus: Bus,
    pub tv: Television,
}

impl Vcs {
    pub fn new(cartridge: Box<dyn Mapper>, spec: TvSpec) -> Self {
        let mut vcs = Self {
            cpu: Cpu6507::new(),
            bus: Bus::new(cartridge, Tia::new(), Riot::new()),
            tv: Television::new(spec),
        };
        vcs.cpu.reset(&mut vcs.bus);
        vcs
    }

    /// Run one CPU instruction to completion. Each CPU cycle it consumes
    /// ticks the TIA three times and the RIOT once, and feeds the TV the
    /// resulting pixels/sync state.
    ///
    /// `execute_instruction` is generic over the bus type rather than
    /// `&mut dyn Bus6507`, so the callback below is handed back the same
    /// concrete `&mut Bus` it was called with and can reach `tia`/`riot`
    /// directly instead of going through the CPU-facing trait.
    pub fn step_instruction(&mut self) -> Result<InstructionResult> {
        let tv = &mut self.tv;
        self.cpu.execute_instruction(&mut self.bus, |bus, _is_final| {
            for _ in 0..3 {
                let pixel = bus.tia.tick();
                let line_ended = bus.tia.scanline_position() == 0;
                tv.observe_sync(bus.tia.in_vsync(), line_ended);
                tv.push_pixel(pixel);
            }
            bus.riot.tick();
        })
    }

    pub fn reset(&mut self) {
        self.cpu.reset(&mut self.bus);
        self.bus.riot.switches.reset = true;
    }
}
