//! Error kinds shared across the core. Every fallible operation returns a
//! `Result<T, EmulatorError>`; kinds cross component boundaries without
//! reinterpretation, and the outermost loop (the debugger's input loop, or a
//! `RUN`-mode driver) decides whether to log, halt or exit.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("invalid opcode ${opcode:02x} at ${pc:04x}")]
    InvalidOpcode { opcode: u8, pc: u16 },

    #[error("unreadable address ${0:04x}")]
    UnreadableAddress(u16),

    #[error("unpokeable address ${0:04x}")]
    UnpokeableAddress(u16),

    #[error("cartridge error: {0}")]
    Cartridge(#[from] CartridgeError),

    #[error("bus error at ${addr:04x}: {detail}")]
    Bus { addr: u16, detail: String },

    #[error("regression error: {0}")]
    Regression(String),

    #[error("script ended")]
    ScriptEnd,

    #[error("script file error: {0}")]
    ScriptFile(String),

    #[error("power off")]
    PowerOff,

    #[error("user interrupt")]
    UserInterrupt,
}

#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("unsupported ROM size: {0} bytes")]
    InvalidSize(usize),

    #[error("unknown mapper hotspot pattern for {0} byte ROM")]
    UnknownMapper(usize),

    #[error("no cartridge loaded")]
    NotLoaded,
}

pub type Result<T> = std::result::Result<T, EmulatorError>;
