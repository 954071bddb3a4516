//! Hierarchical Digital Logic Simulator Library.
//!
//! This crate evaluates circuits built from nested chips, frame by frame.
//! A chip is either a built-in primitive (gates, clocks, memories,
//! displays, a toy CPU) or a custom chip described by a library entry that
//! wires further chips together. Signals are tri-state words of up to 64
//! bits; when several drivers fight over a bit, a seeded random number
//! generator picks the winner.
//!
//! # Architecture
//!
//! * **Arena**: every chip and pin lives in one `Circuit`, addressed by handle.
//! * **Evaluator**: a reorder pass discovers evaluation order, a fast pass replays it.
//! * **Editing**: structural commands queue up and apply between frames.
//!
//! # Modules
//!
//! * `asm`: Assembler for the toy CPU.
//! * `builtin`: Behaviour of every built-in chip.
//! * `chip`: Chip and pin model, the arena, and the builder.
//! * `common`: Signal words, identifiers, and error handling.
//! * `config`: Configuration loading and parsing.
//! * `library`: Custom chip descriptions.
//! * `sim`: The frame evaluator, command queue, and input handling.
//! * `stats`: Simulation statistics collection.

/// Assembler for the toy CPU's instruction set.
///
/// Produces the two ROM images a CPU chip executes from.
pub mod asm;

/// Built-in chip behaviour.
///
/// One evaluation function per built-in kind, each a pure transformation of
/// inputs and internal state into outputs.
pub mod builtin;

/// Chip and pin model, the circuit arena, and construction from descriptions.
pub mod chip;

/// Shared types and error handling.
///
/// Provides the tri-state signal word, chip and pin identifiers, and the
/// error type used throughout the simulator.
pub mod common;

/// Configuration system for the evaluator and built-in defaults.
///
/// Loads and parses TOML configuration files.
pub mod config;

/// Declarative custom chip descriptions and their JSON loader.
pub mod library;

/// Frame evaluator and the runtime around it.
///
/// Handles the reorder and fast passes, freezing, structural command
/// application, player input, and the background evaluator thread.
pub mod sim;

/// Simulation statistics collection and reporting.
///
/// Tracks frame counts, traversal passes, signal deliveries, and editor
/// traffic during a run.
pub mod stats;
