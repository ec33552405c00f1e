mod symbols;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::VecDeque;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;
use symbols::Symbols;
use vcs_atari2600::cartridge;
use vcs_atari2600::debugger::command::{self, Command, SymbolQuery};
use vcs_atari2600::debugger::halt::Debugger;
use vcs_atari2600::disasm;
use vcs_atari2600::error::EmulatorError;
use vcs_atari2600::tv::TvSpec;
use vcs_atari2600::vcs::Vcs;
use vcs_core::logging::{LogCategory, LogConfig, LogLevel};

#[derive(Parser)]
#[command(name = "vcs", about = "An Atari 2600 emulator core driver")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Core log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "off")]
    log: String,

    /// PAL instead of NTSC timing
    #[arg(long, global = true, default_value_t = false)]
    pal: bool,
}

#[derive(Subcommand)]
enum Mode {
    /// Run a ROM headlessly for a fixed number of frames.
    Run {
        rom: PathBuf,
        #[arg(long, default_value_t = 60)]
        frames: u32,
    },
    /// Same as Run, but with a much longer default so interactive play
    /// doesn't exit after a handful of frames.
    Play {
        rom: PathBuf,
        #[arg(long, default_value_t = 3600)]
        frames: u32,
    },
    /// Interactive (or scripted) debugger REPL.
    Debug {
        rom: PathBuf,
        /// Read commands from a script file instead of stdin.
        #[arg(long)]
        script: Option<PathBuf>,
        /// Symbols file for the SYMBOL command (`name = value`, optional
        /// READ/WRITE/LOCATION sections).
        #[arg(long)]
        symbols: Option<PathBuf>,
    },
    /// Static disassembly starting at an address, never executing.
    Disasm {
        rom: PathBuf,
        #[arg(long, value_parser = parse_hex, default_value = "0xf000")]
        start: u16,
        #[arg(long, default_value_t = 32)]
        count: usize,
    },
    /// Time raw emulation throughput.
    Performance {
        rom: PathBuf,
        #[arg(long, default_value_t = 600)]
        frames: u32,
    },
    /// Regression database of expected final-frame hashes, keyed by ROM.
    Regress {
        #[command(subcommand)]
        action: RegressAction,
    },
}

#[derive(Subcommand)]
enum RegressAction {
    /// Run a ROM and compare its final-frame hash against the recorded one.
    Run {
        rom: PathBuf,
        #[arg(long, default_value = "regress.tsv")]
        db: PathBuf,
        #[arg(long, default_value_t = 60)]
        frames: u32,
    },
    /// List every entry in the database (or just those for one ROM).
    List {
        #[arg(long, default_value = "regress.tsv")]
        db: PathBuf,
        rom: Option<PathBuf>,
    },
    /// Run a ROM and record (or overwrite) its expected hash.
    Add {
        rom: PathBuf,
        #[arg(long, default_value = "regress.tsv")]
        db: PathBuf,
        #[arg(long, default_value_t = 60)]
        frames: u32,
    },
    /// Remove a ROM's entry from the database.
    Delete {
        rom: PathBuf,
        #[arg(long, default_value = "regress.tsv")]
        db: PathBuf,
    },
}

fn parse_hex(s: &str) -> std::result::Result<u16, String> {
    let s = s.trim_start_matches("0x").trim_start_matches('$');
    u16::from_str_radix(s, 16).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Some(level) = LogLevel::from_str(&args.log) {
        LogConfig::global().set_global_level(level);
    }

    let spec = if args.pal { TvSpec::Pal } else { TvSpec::Ntsc };

    match args.mode {
        Mode::Run { rom, frames } => run(&rom, spec, frames, false)?,
        Mode::Play { rom, frames } => run(&rom, spec, frames, true)?,
        Mode::Debug { rom, script, symbols } => debug(&rom, spec, script, symbols)?,
        Mode::Disasm { rom, start, count } => disasm_mode(&rom, spec, start, count)?,
        Mode::Performance { rom, frames } => performance(&rom, spec, frames)?,
        Mode::Regress { action } => regress(spec, action)?,
    }

    Ok(())
}

fn run(rom: &PathBuf, spec: TvSpec, frames: u32, quiet_until_done: bool) -> Result<()> {
    let mut vcs = load(rom, spec)?;

    while vcs.tv.frames_rendered < frames as u64 {
        vcs.step_instruction()?;
    }

    if !quiet_until_done {
        println!(
            "rendered {} frames, {}x{} pixels, final PC=${:04x}",
            vcs.tv.frames_rendered,
            vcs.tv.width(),
            spec.scanlines_per_frame(),
            vcs.cpu.pc
        );
    } else {
        println!("played {} frames", vcs.tv.frames_rendered);
    }
    Ok(())
}

fn debug(rom: &PathBuf, spec: TvSpec, script: Option<PathBuf>, symbols_path: Option<PathBuf>) -> Result<()> {
    let bytes = fs::read(rom).with_context(|| format!("reading ROM {}", rom.display()))?;
    let mapper = cartridge::detect(bytes)?;
    let mut vcs = Vcs::new(mapper, spec);
    let mut dbg = Debugger::new();
    let symbols = match symbols_path {
        Some(path) => Symbols::load(&path).with_context(|| format!("reading symbols {}", path.display()))?,
        None => Symbols::parse(""),
    };

    let initial: Vec<String> = match script {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("reading script {}", path.display()))?
            .lines()
            .map(str::to_string)
            .collect(),
        None => io::stdin().lock().lines().collect::<io::Result<_>>()?,
    };
    let mut pending: VecDeque<String> = initial.into();
    let mut recording: Option<fs::File> = None;

    'outer: while let Some(raw_line) = pending.pop_front() {
        for piece in command::split_script_line(&raw_line) {
            let cmd = command::parse(piece)?;
            match cmd {
                Command::Script { path, record: true } => {
                    recording = Some(
                        fs::File::create(&path).with_context(|| format!("opening {} for recording", path.display()))?,
                    );
                    println!("recording to {}", path.display());
                }
                Command::Script { path, record: false } => {
                    let text = fs::read_to_string(&path)
                        .with_context(|| format!("reading script {}", path.display()))?;
                    for line in text.lines().rev() {
                        pending.push_front(line.to_string());
                    }
                }
                other => {
                    if let Some(f) = recording.as_mut() {
                        writeln!(f, "{piece}")?;
                    }
                    if !execute(&mut vcs, &mut dbg, &symbols, other)? {
                        break 'outer;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Returns false when the session should stop (QUIT).
fn execute(vcs: &mut Vcs, dbg: &mut Debugger, symbols: &Symbols, cmd: Command) -> Result<bool> {
    use vcs_atari2600::debugger::halt::RunState;
    match cmd {
        Command::Quit => return Ok(false),
        Command::Step(n) => {
            for _ in 0..n {
                vcs.step_instruction()?;
                if dbg.poll(vcs) == RunState::Halted {
                    println!("halted: {}", dbg.last_halt_reason().unwrap_or("?"));
                    break;
                }
            }
        }
        Command::Run => loop {
            vcs.step_instruction()?;
            if dbg.poll(vcs) == RunState::Halted {
                println!("halted: {}", dbg.last_halt_reason().unwrap_or("?"));
                break;
            }
        },
        Command::Break(conditions) => {
            let id = dbg.add_breakpoint(conditions);
            println!("breakpoint {id} set");
        }
        Command::Trap(target) => {
            let id = dbg.add_trap(target);
            println!("trap {id} set");
        }
        Command::Watch { addr, direction, value } => {
            let id = dbg.add_watch(addr, direction, value);
            println!("watch {id} set on ${addr:04x}");
        }
        Command::Delete(id) => dbg.remove(id),
        Command::Disasm => {
            for line in disasm::disassemble(&vcs.bus, vcs.cpu.pc, 16) {
                println!("${:04x}: {}", line.addr, line.text);
            }
        }
        Command::Print(target) => println!("{}", target.resolve(vcs)),
        Command::Poke(addr, val) => vcs.bus.poke(addr, val),
        Command::State => {
            let snapshot = vcs_atari2600::debugger::Snapshot::capture(vcs);
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::Symbol(name, query) => match query {
            SymbolQuery::Plain => match symbols.lookup(&name) {
                Some(addr) => println!("{name} = ${addr:04x}"),
                None => println!("* unknown symbol {name}"),
            },
            SymbolQuery::Mirrors => match symbols.lookup(&name) {
                Some(addr) => {
                    let mirrors: Vec<String> = vcs_atari2600::bus::mirrors(addr).iter().map(|a| format!("${a:04x}")).collect();
                    println!("{name} = ${addr:04x} (mirrors: {})", mirrors.join(", "));
                }
                None => println!("* unknown symbol {name}"),
            },
            SymbolQuery::All => {
                let entries = symbols.lookup_all(&name);
                if entries.is_empty() {
                    println!("* unknown symbol {name}");
                } else {
                    for (section, addr) in entries {
                        println!("{name} [{section}] = ${addr:04x}");
                    }
                }
            }
        },
        // Intercepted by the caller before a command ever reaches here.
        Command::Script { .. } => {}
    }
    Ok(true)
}

fn disasm_mode(rom: &PathBuf, spec: TvSpec, start: u16, count: usize) -> Result<()> {
    let vcs = load(rom, spec)?;
    for line in disasm::disassemble(&vcs.bus, start, count) {
        let bytes: Vec<String> = line.bytes.iter().map(|b| format!("{b:02x}")).collect();
        println!("${:04x}  {:<10} {}", line.addr, bytes.join(" "), line.text);
    }
    Ok(())
}

fn load(rom: &PathBuf, spec: TvSpec) -> Result<Vcs> {
    let bytes = fs::read(rom).with_context(|| format!("reading ROM {}", rom.display()))?;
    let mapper = cartridge::detect(bytes)?;
    Ok(Vcs::new(mapper, spec))
}

fn performance(rom: &PathBuf, spec: TvSpec, frames: u32) -> Result<()> {
    let mut vcs = load(rom, spec)?;
    let start = Instant::now();
    let mut instructions = 0u64;
    while vcs.tv.frames_rendered < frames as u64 {
        vcs.step_instruction()?;
        instructions += 1;
    }
    let elapsed = start.elapsed();
    println!(
        "{} frames, {} instructions in {:.3}s ({:.0} instructions/sec)",
        frames,
        instructions,
        elapsed.as_secs_f64(),
        instructions as f64 / elapsed.as_secs_f64().max(1e-9)
    );
    Ok(())
}

/// One row of the flat regression database: tab-separated `kind`, `key`,
/// `parameters`, `expected hash`. `kind` is always `"frame-hash"` today,
/// left as a column so the format can grow a second kind without a
/// migration.
struct RegressRow {
    kind: String,
    key: String,
    parameters: String,
    hash: u64,
}

impl RegressRow {
    fn format(&self) -> String {
        format!("{}\t{}\t{}\t{:016x}", self.kind, self.key, self.parameters, self.hash)
    }

    fn parse(line: &str) -> Option<Self> {
        let mut cols = line.split('\t');
        let kind = cols.next()?.to_string();
        let key = cols.next()?.to_string();
        let parameters = cols.next()?.to_string();
        let hash = u64::from_str_radix(cols.next()?, 16).ok()?;
        Some(Self { kind, key, parameters, hash })
    }
}

fn read_db(db: &PathBuf) -> Result<Vec<RegressRow>> {
    if !db.exists() {
        return Ok(Vec::new());
    }
    Ok(fs::read_to_string(db)?.lines().filter_map(RegressRow::parse).collect())
}

fn write_db(db: &PathBuf, rows: &[RegressRow]) -> Result<()> {
    let mut f = fs::File::create(db)?;
    for row in rows {
        writeln!(f, "{}", row.format())?;
    }
    Ok(())
}

fn rom_key(rom: &PathBuf) -> String {
    rom.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| rom.display().to_string())
}

fn frame_hash(rom: &PathBuf, spec: TvSpec, frames: u32) -> Result<u64> {
    let mut vcs = load(rom, spec)?;
    while vcs.tv.frames_rendered < frames as u64 {
        vcs.step_instruction()?;
    }
    Ok(fnv1a(&vcs.tv.frame))
}

fn regress(spec: TvSpec, action: RegressAction) -> Result<()> {
    match action {
        RegressAction::Run { rom, db, frames } => {
            let key = rom_key(&rom);
            let params = frames.to_string();
            let hash = frame_hash(&rom, spec, frames)?;
            let rows = read_db(&db)?;
            let found = rows.iter().find(|r| r.kind == "frame-hash" && r.key == key && r.parameters == params);
            match found {
                Some(row) if row.hash == hash => println!("PASS {key}"),
                Some(row) => {
                    return Err(EmulatorError::Regression(format!(
                        "{key}: expected {:016x}, got {hash:016x}",
                        row.hash
                    ))
                    .into())
                }
                None => {
                    return Err(EmulatorError::Regression(format!(
                        "{key}: no baseline recorded at {frames} frames, run REGRESS ADD first"
                    ))
                    .into())
                }
            }
        }
        RegressAction::List { db, rom } => {
            let rows = read_db(&db)?;
            let key_filter = rom.as_ref().map(rom_key);
            for row in rows.iter().filter(|r| key_filter.as_deref().map(|k| k == r.key).unwrap_or(true)) {
                println!("{}", row.format());
            }
        }
        RegressAction::Add { rom, db, frames } => {
            let key = rom_key(&rom);
            let params = frames.to_string();
            let hash = frame_hash(&rom, spec, frames)?;
            let mut rows = read_db(&db)?;
            rows.retain(|r| !(r.kind == "frame-hash" && r.key == key && r.parameters == params));
            rows.push(RegressRow {
                kind: "frame-hash".to_string(),
                key: key.clone(),
                parameters: params,
                hash,
            });
            write_db(&db, &rows)?;
            println!("RECORDED {key} -> {hash:016x}");
        }
        RegressAction::Delete { rom, db } => {
            let key = rom_key(&rom);
            let mut rows = read_db(&db)?;
            let before = rows.len();
            rows.retain(|r| r.key != key);
            if rows.len() == before {
                return Err(EmulatorError::Regression(format!("{key}: no entry to delete")).into());
            }
            write_db(&db, &rows)?;
            println!("DELETED {key}");
        }
    }
    Ok(())
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[allow(dead_code)]
fn silence_unused(_c: LogCategory) {}
