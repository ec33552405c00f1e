//! Parses the plain-text debugger command surface used by the interactive
//! REPL and by script playback: one command per line, `#` starts a comment,
//! and arguments are separated by whitespace or semicolons when several
//! commands are packed onto one recorded script line.

use crate::debugger::halt::{Condition, WatchDirection};
use crate::debugger::targets::Target;
use crate::error::{EmulatorError, Result};
use std::path::PathBuf;

/// What a `SYMBOL <name>` lookup should additionally report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolQuery {
    /// Just the symbol's own address.
    Plain,
    /// The address plus every bus address that mirrors it.
    Mirrors,
    /// Every section's entry for this name (a symbol can differ between
    /// the READ/WRITE/LOCATION sections of a symbols file).
    All,
}

#[derive(Debug, Clone)]
pub enum Command {
    Step(u32),
    Run,
    Quit,
    Break(Vec<Condition>),
    Trap(Target),
    Watch {
        addr: u16,
        direction: WatchDirection,
        value: Option<u8>,
    },
    Delete(u32),
    Disasm,
    Print(Target),
    Poke(u16, u8),
    /// Dump a JSON snapshot of machine state for external tooling.
    State,
    /// `SYMBOL <name> [MIRRORS|ALL]`.
    Symbol(String, SymbolQuery),
    /// `SCRIPT [RECORD] <file>`: without `record`, read further commands
    /// from `path`; with it, start mirroring every subsequent command to
    /// `path` instead.
    Script { path: PathBuf, record: bool },
}

/// Split a recorded script line into its semicolon-delimited commands,
/// dropping a trailing `#`-led comment.
pub fn split_script_line(line: &str) -> Vec<&str> {
    let without_comment = line.split('#').next().unwrap_or("").trim();
    if without_comment.is_empty() {
        return Vec::new();
    }
    without_comment.split(';').map(str::trim).filter(|s| !s.is_empty()).collect()
}

pub fn parse(line: &str) -> Result<Command> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&head) = tokens.first() else {
        return Err(EmulatorError::ScriptFile("empty command".into()));
    };

    match head.to_uppercase().as_str() {
        "STEP" | "S" => {
            let n = tokens.get(1).and_then(|s| s.parse().ok()).unwrap_or(1);
            Ok(Command::Step(n))
        }
        "RUN" | "R" => Ok(Command::Run),
        "QUIT" | "Q" => Ok(Command::Quit),
        "DISASM" | "D" => Ok(Command::Disasm),
        "STATE" => Ok(Command::State),
        "BREAK" | "B" => {
            let conditions = parse_conditions(&tokens[1..])?;
            Ok(Command::Break(conditions))
        }
        "TRAP" | "T" => {
            let target = parse_target(tokens.get(1).copied().unwrap_or(""))?;
            Ok(Command::Trap(target))
        }
        "WATCH" | "W" => parse_watch(&tokens[1..]),
        "DELETE" | "DEL" => {
            let id = tokens
                .get(1)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| EmulatorError::ScriptFile("DELETE requires an id".into()))?;
            Ok(Command::Delete(id))
        }
        "PRINT" | "P" => {
            let target = parse_target(tokens.get(1).copied().unwrap_or(""))?;
            Ok(Command::Print(target))
        }
        "POKE" => {
            let addr = parse_u16(tokens.get(1).copied().unwrap_or(""))?;
            let val = tokens
                .get(2)
                .and_then(|s| parse_u16(s).ok())
                .map(|v| v as u8)
                .ok_or_else(|| EmulatorError::ScriptFile("POKE requires a value".into()))?;
            Ok(Command::Poke(addr, val))
        }
        "SYMBOL" => {
            let name = tokens
                .get(1)
                .ok_or_else(|| EmulatorError::ScriptFile("SYMBOL requires a name".into()))?
                .to_string();
            let query = match tokens.get(2).map(|t| t.to_uppercase()) {
                Some(ref t) if t == "MIRRORS" => SymbolQuery::Mirrors,
                Some(ref t) if t == "ALL" => SymbolQuery::All,
                Some(other) => return Err(EmulatorError::ScriptFile(format!("unknown SYMBOL qualifier {other}"))),
                None => SymbolQuery::Plain,
            };
            Ok(Command::Symbol(name, query))
        }
        "SCRIPT" => {
            let record = tokens.get(1).map(|t| t.eq_ignore_ascii_case("RECORD")).unwrap_or(false);
            let path_tok = if record { tokens.get(2) } else { tokens.get(1) };
            let path = path_tok.ok_or_else(|| EmulatorError::ScriptFile("SCRIPT requires a file".into()))?;
            Ok(Command::Script {
                path: PathBuf::from(path),
                record,
            })
        }
        other => Err(EmulatorError::ScriptFile(format!("unknown command {other}"))),
    }
}

fn parse_conditions(tokens: &[&str]) -> Result<Vec<Condition>> {
    // "X = 5 AND Y = 2" style: groups of three tokens joined by "AND".
    let groups: Vec<&[&str]> = tokens.split(|t| t.eq_ignore_ascii_case("AND")).collect();
    let mut conditions = Vec::new();
    for group in groups {
        if group.len() < 3 {
            return Err(EmulatorError::ScriptFile("BREAK condition needs target = value".into()));
        }
        let target = parse_target(group[0])?;
        let value = parse_condition_value(target, group[2])?;
        conditions.push(Condition { target, value });
    }
    Ok(conditions)
}

fn parse_watch(tokens: &[&str]) -> Result<Command> {
    let addr = parse_u16(tokens.first().copied().unwrap_or(""))?;
    let mut direction = WatchDirection::Either;
    let mut value = None;
    for tok in &tokens[1.min(tokens.len())..] {
        match tok.to_uppercase().as_str() {
            "READ" => direction = WatchDirection::Read,
            "WRITE" => direction = WatchDirection::Write,
            other => {
                if let Ok(v) = parse_u16(other) {
                    value = Some(v as u8);
                }
            }
        }
    }
    Ok(Command::Watch { addr, direction, value })
}

fn parse_target(tok: &str) -> Result<Target> {
    match tok.to_uppercase().as_str() {
        "A" => Ok(Target::A),
        "X" => Ok(Target::X),
        "Y" => Ok(Target::Y),
        "SP" => Ok(Target::Sp),
        "PC" => Ok(Target::Pc),
        "STATUS" => Ok(Target::Status),
        "SCANLINE" => Ok(Target::Scanline),
        "CLOCK" => Ok(Target::Clock),
        "FRAME" => Ok(Target::Frame),
        "CYCLES" => Ok(Target::Cycles),
        "BANK" => Ok(Target::Bank),
        "RESULT.MNEMONIC" => Ok(Target::ResultMnemonic),
        "RESULT.EFFECT" => Ok(Target::ResultEffect),
        "RESULT.PAGEFAULT" => Ok(Target::ResultPagefault),
        "RESULT.BUG" => Ok(Target::ResultBug),
        hex if hex.starts_with('$') => Ok(Target::Memory(parse_u16(hex)?)),
        other => Err(EmulatorError::ScriptFile(format!("unknown target {other}"))),
    }
}

/// Parse a condition's right-hand side in light of its target: most targets
/// compare against a plain integer, but `RESULT.MNEMONIC` compares against a
/// bare mnemonic token (`LDA`, `STA`, ...), hashed the same way
/// `Target::resolve` hashes the live instruction's mnemonic.
fn parse_condition_value(target: Target, tok: &str) -> Result<i64> {
    if target == Target::ResultMnemonic && !tok.starts_with('$') && tok.parse::<i64>().is_err() {
        return Ok(crate::debugger::targets::fnv1a(&tok.to_uppercase()) as i64);
    }
    Ok(parse_u16(tok)? as i64)
}

fn parse_u16(tok: &str) -> Result<u16> {
    let tok = tok.trim_start_matches('=').trim();
    if let Some(hex) = tok.strip_prefix('$') {
        u16::from_str_radix(hex, 16).map_err(|_| EmulatorError::ScriptFile(format!("bad hex literal {tok}")))
    } else {
        tok.parse().map_err(|_| EmulatorError::ScriptFile(format!("bad number {tok}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_step_with_count() {
        match parse("STEP 4").unwrap() {
            Command::Step(4) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_breakpoint_with_and_group() {
        match parse("BREAK X = $05 AND Y = 2").unwrap() {
            Command::Break(conds) => {
                assert_eq!(conds.len(), 2);
                assert_eq!(conds[0].value, 5);
                assert_eq!(conds[1].value, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn splits_script_line_on_semicolons_and_strips_comments() {
        let parts = split_script_line("STEP 1 ; PRINT A # advance and check");
        assert_eq!(parts, vec!["STEP 1", "PRINT A"]);
    }

    #[test]
    fn parses_state() {
        assert!(matches!(parse("STATE").unwrap(), Command::State));
    }
}
