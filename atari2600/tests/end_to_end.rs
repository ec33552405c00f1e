//! End-to-end scenarios exercising the whole machine (CPU, bus, TIA, RIOT,
//! debugger) together, grounded in the literal scenarios and properties used
//! to validate the original hardware-accurate core.

use std::cell::RefCell;
use std::rc::Rc;
use vcs_atari2600::bus::Bus;
use vcs_atari2600::cartridge;
use vcs_atari2600::cpu::{Bus6507, Cpu6507};
use vcs_atari2600::debugger::command;
use vcs_atari2600::debugger::halt::Debugger;
use vcs_atari2600::debugger::RunState;
use vcs_atari2600::riot::Riot;
use vcs_atari2600::tia::Tia;
use vcs_atari2600::tv::TvSpec;
use vcs_atari2600::vcs::Vcs;

/// A 4K cartridge image with the reset vector pointed at `$1000`, the usual
/// load address for a ROM image that size.
fn rom_with_program(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x1000];
    rom[..program.len()].copy_from_slice(program);
    rom[0x0FFC] = 0x00;
    rom[0x0FFD] = 0x10;
    rom
}

fn vcs_with_program(program: &[u8]) -> Vcs {
    let mapper = cartridge::detect(rom_with_program(program)).unwrap();
    Vcs::new(mapper, TvSpec::Ntsc)
}

#[test]
fn reset_vector_loads_pc_from_cartridge() {
    let vcs = vcs_with_program(&[]);
    assert_eq!(vcs.cpu.pc, 0x1000);
}

#[test]
fn wsync_stalls_cpu_until_next_scanline_start() {
    // LDA #$02; STA $02 (WSYNC strobe); LDA #$55
    let mut vcs = vcs_with_program(&[0xA9, 0x02, 0x85, 0x02, 0xA9, 0x55]);

    vcs.step_instruction().unwrap(); // LDA #$02
    assert_eq!(vcs.cpu.a, 0x02);

    vcs.step_instruction().unwrap(); // STA $02 strobes WSYNC
    assert!(!vcs.bus.tia.rdy_high());

    // The next instruction first spins through the rest of the scanline,
    // then executes starting at horizpos 0 of the following line.
    vcs.step_instruction().unwrap(); // LDA #$55
    assert_eq!(vcs.cpu.a, 0x55);
    assert!(vcs.bus.tia.rdy_high());
    // A 2-cycle immediate load ticks the TIA 3x per cycle, so it should have
    // begun exactly at horizpos 0 and ended 6 clocks later.
    assert_eq!(vcs.bus.tia.scanline_position(), 6);
}

#[test]
fn player_graphics_cross_latch_on_grp1_write() {
    // LDA #$AA; STA GRP0 ($1B); LDA #$55; STA GRP1 ($1C)
    let mut vcs = vcs_with_program(&[0xA9, 0xAA, 0x85, 0x1B, 0xA9, 0x55, 0x85, 0x1C]);
    for _ in 0..4 {
        vcs.step_instruction().unwrap();
    }
    let (p0_new, p0_old) = vcs.bus.tia.player_graphics(0);
    let (p1_new, p1_old) = vcs.bus.tia.player_graphics(1);
    assert_eq!(p0_new, 0xAA);
    assert_eq!(p0_old, 0xAA, "writing GRP1 latches player0's old graphics");
    assert_eq!(p1_new, 0x55);
    assert_eq!(p1_old, 0x00, "player1's old latch is untouched until GRP0 is written again");
}

#[test]
fn three_tia_ticks_and_one_riot_tick_occur_per_cpu_cycle() {
    let mut vcs = vcs_with_program(&[0xEA]); // NOP, 2 cycles
    vcs.bus.riot.write(0x14, 10); // T1: decrements once per CPU cycle
    vcs.step_instruction().unwrap();
    assert_eq!(vcs.bus.tia.scanline_position(), 6);
    assert_eq!(vcs.bus.riot.timer, 8);
}

#[test]
fn riot_timer_hotspot_decrements_at_the_selected_prescaler_through_the_bus() {
    let mut bus = Bus::new(cartridge::detect(rom_with_program(&[])).unwrap(), Tia::new(), Riot::new());
    bus.cpu_write(0x0296, 0x01); // TIM64T ($16 hotspot, mirrored into the RIOT region)
    // the first interval is one cycle longer than the rest: INTIM holds at 1
    // through the 64th tick and only reaches 0 on the 65th.
    for _ in 0..64 {
        bus.riot.tick();
    }
    assert_eq!(bus.riot.timer, 1);
    bus.riot.tick();
    assert_eq!(bus.riot.timer, 0);
    for _ in 0..63 {
        bus.riot.tick();
    }
    assert_eq!(bus.riot.timer, 0);
    bus.riot.tick();
    assert_eq!(bus.riot.timer, 0xFF);
    assert_eq!(bus.cpu_read(0x0295), 0x80); // INSTAT, and reading clears it
    assert_eq!(bus.cpu_read(0x0295), 0x00);
}

#[test]
fn breakpoint_rearm_requires_leaving_and_reentering_the_full_match_set() {
    let mut vcs = vcs_with_program(&[]);
    let mut dbg = Debugger::new();
    let conditions = match command::parse("BREAK X = 255 AND A = 7").unwrap() {
        command::Command::Break(c) => c,
        other => panic!("unexpected {other:?}"),
    };
    dbg.add_breakpoint(conditions);

    assert_eq!(dbg.poll(&vcs), RunState::Running);
    vcs.cpu.x = 255;
    vcs.cpu.a = 7;
    assert_eq!(dbg.poll(&vcs), RunState::Halted);
    dbg.resume();

    // Still fully met: must not refire.
    assert_eq!(dbg.poll(&vcs), RunState::Running);

    // One condition leaves, then the group re-enters: must refire.
    vcs.cpu.a = 0;
    assert_eq!(dbg.poll(&vcs), RunState::Running);
    vcs.cpu.a = 7;
    assert_eq!(dbg.poll(&vcs), RunState::Halted);
}

#[test]
fn bus_mirror_fold_is_idempotent_at_the_peek_api() {
    let vcs = vcs_with_program(&[]);
    for addr in [0x0000u16, 0x0280, 0x1000, 0x2004, 0x3280, 0x17FF] {
        let folded = addr & 0x1FFF;
        assert_eq!(vcs.bus.peek(addr), vcs.bus.peek(folded), "addr ${addr:04x}");
    }
}

#[test]
fn poke_peek_roundtrips_across_ram_and_cartridge_ram() {
    let mut vcs = vcs_with_program(&[]);
    vcs.bus.poke(0x0080, 0x42); // PIA RAM
    assert_eq!(vcs.bus.peek(0x0080), 0x42);

    let superchip = cartridge::detect(vec![0u8; 0x2000 + 256]).unwrap();
    let mut bus = Bus::new(superchip, Tia::new(), Riot::new());
    bus.poke(0x1000, 0x99); // write-port superchip RAM
    assert_eq!(bus.peek(0x1000), 0x99);
}

#[test]
fn callback_fires_exactly_once_per_counted_cycle_for_a_four_cycle_store() {
    struct CountingBus {
        mem: [u8; 0x10000],
    }
    impl Bus6507 for CountingBus {
        fn cpu_read(&mut self, addr: u16) -> u8 {
            self.mem[addr as usize]
        }
        fn cpu_write(&mut self, addr: u16, val: u8) {
            self.mem[addr as usize] = val;
        }
        fn cpu_ready(&self) -> bool {
            true
        }
    }

    let mut bus = CountingBus { mem: [0; 0x10000] };
    bus.mem[0x1000] = 0x8D; // STA $0200 (Absolute), 4 cycles
    bus.mem[0x1001] = 0x00;
    bus.mem[0x1002] = 0x02;
    let mut cpu = Cpu6507::new();
    cpu.pc = 0x1000;

    let count = Rc::new(RefCell::new(0u32));
    let finals = Rc::new(RefCell::new(Vec::new()));
    let (count2, finals2) = (count.clone(), finals.clone());
    let result = cpu
        .execute_instruction(&mut bus, |_bus, is_final| {
            *count2.borrow_mut() += 1;
            finals2.borrow_mut().push(is_final);
        })
        .unwrap();

    assert_eq!(result.cycles, 4);
    assert_eq!(*count.borrow(), 4);
    let finals = finals.borrow();
    assert_eq!(finals.iter().filter(|&&f| f).count(), 1);
    assert!(*finals.last().unwrap());
}
