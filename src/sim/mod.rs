//! Simulation runtime: the frame evaluator and everything that feeds it.

/// Structural mutation commands and their queue.
pub mod commands;

/// Freeze pin and auto-freeze policy.
pub mod freeze;

/// Player input snapshot.
pub mod input;

/// Background evaluator thread.
pub mod session;

/// The per-frame evaluator.
pub mod simulator;

pub use commands::{CommandSender, SimCommand};
pub use input::{InputHandle, InputState};
pub use session::Session;
pub use simulator::{Pass, Simulator};
