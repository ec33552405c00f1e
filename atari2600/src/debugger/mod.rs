//! Debug session support: halt sources plus a small command parser for
//! driving them from a REPL or a script file.

pub mod command;
pub mod halt;
pub mod targets;

pub use halt::{Debugger, RunState};
pub use targets::{Snapshot, Target};
