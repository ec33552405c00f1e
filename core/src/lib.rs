//! Low-level primitives shared by the Atari 2600 core: the logging facade,
//! the two-phase clock, the polycounter, and the future-event scheduler.
//!
//! None of these carry any Atari-2600-specific meaning; they are the reusable
//! building blocks the `vcs_atari2600` crate assembles into a TIA, a CPU and
//! a debugger.

pub mod logging;
pub mod phase;
pub mod poly;
pub mod scheduler;

pub use phase::PhaseClock;
pub use poly::Polycounter;
pub use scheduler::FutureScheduler;
