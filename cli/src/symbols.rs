//! Symbols file parser: `name = value` pairs, grouped into optional
//! `READ`/`WRITE`/`LOCATION` sections (a bare section keyword on its own
//! line switches the section every following entry belongs to until the
//! next one). Lines starting with `#` are comments; blank lines are
//! ignored. Used by the debugger's `SYMBOL` command, never by the core
//! itself.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

const UNSECTIONED: &str = "";

pub struct Symbols {
    sections: Vec<(String, HashMap<String, u16>)>,
}

impl Symbols {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        let mut sections: Vec<(String, HashMap<String, u16>)> = vec![(UNSECTIONED.to_string(), HashMap::new())];
        for raw_line in text.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if matches!(line.to_uppercase().as_str(), "READ" | "WRITE" | "LOCATION") {
                sections.push((line.to_uppercase(), HashMap::new()));
                continue;
            }
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            let Some(addr) = parse_value(value.trim()) else {
                continue;
            };
            sections.last_mut().unwrap().1.insert(name.trim().to_string(), addr);
        }
        Self { sections }
    }

    /// First matching address across sections, in file order.
    pub fn lookup(&self, name: &str) -> Option<u16> {
        self.sections.iter().find_map(|(_, map)| map.get(name).copied())
    }

    /// Every section's entry for `name`, as `(section name, address)`; the
    /// unsectioned top of a file reports as `"(none)"`.
    pub fn lookup_all<'a>(&'a self, name: &str) -> Vec<(&'a str, u16)> {
        self.sections
            .iter()
            .filter_map(|(section, map)| {
                map.get(name).map(|&addr| {
                    let label = if section.is_empty() { "(none)" } else { section.as_str() };
                    (label, addr)
                })
            })
            .collect()
    }
}

fn parse_value(tok: &str) -> Option<u16> {
    if let Some(hex) = tok.strip_prefix('$') {
        u16::from_str_radix(hex, 16).ok()
    } else if let Some(hex) = tok.strip_prefix("0x") {
        u16::from_str_radix(hex, 16).ok()
    } else {
        tok.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_assignments() {
        let syms = Symbols::parse("VSYNC = $00\nPLAYER0 = $1234\n");
        assert_eq!(syms.lookup("VSYNC"), Some(0x00));
        assert_eq!(syms.lookup("PLAYER0"), Some(0x1234));
    }

    #[test]
    fn sections_keep_entries_distinct() {
        let text = "READ\nCXM0P = $00\nWRITE\nCXM0P = $2C\n";
        let syms = Symbols::parse(text);
        let all = syms.lookup_all("CXM0P");
        assert_eq!(all, vec![("READ", 0x00), ("WRITE", 0x2C)]);
    }

    #[test]
    fn ignores_comments_and_blank_lines() {
        let syms = Symbols::parse("# a comment\n\nFOO = $10 # trailing comment\n");
        assert_eq!(syms.lookup("FOO"), Some(0x10));
    }
}
