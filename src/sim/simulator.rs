//! Frame Evaluator.
//!
//! The `Simulator` owns a `Circuit` and advances it one frame at a time.
//! Each frame it:
//!
//! 1. drains the structural command queue,
//! 2. snapshots player input and drives the root chip's input pins,
//! 3. walks the chip tree from the root, evaluating built-in leaves and
//!    forwarding pin states along the wires.
//!
//! The walk has two modes. The *reorder pass* (first frame and after any
//! structural edit) discovers an evaluation order per chip: it repeatedly
//! picks a child whose inputs have all arrived, falling back to a random
//! child when a feedback loop leaves none ready. The order it settles on is
//! cached in each chip's `children` list (stored reversed). The *fast pass*
//! replays that cached order, occasionally nudging a not-ready child one
//! slot earlier so the order can adapt to circuits whose timing drifts.
//!
//! Every random decision (which racing driver wins a bit, which child to
//! pick in a loop, whether to nudge) comes from one seeded
//! `Xoshiro256StarStar`, so a run is reproducible from its seed.

use std::mem;

use log::{debug, info, trace, warn};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use super::commands::{self, CommandQueue, CommandSender};
use super::freeze::{is_frozen, AutoFreeze};
use super::input::{InputHandle, InputState};
use crate::builtin::{self, EvalContext};
use crate::chip::{ChipBuilder, ChipHandle, Circuit, PropagationReport};
use crate::common::{ChipPath, PinAddress, PinId, PinState, Result};
use crate::config::Config;
use crate::library::ChipLibrary;
use crate::stats::SimStats;

/// Which traversal a frame used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    Reorder,
    Fast,
}

/// Per-frame circuit evaluator.
pub struct Simulator {
    circuit: Circuit,
    library: ChipLibrary,
    config: Config,

    frame: u64,
    rng: Xoshiro256StarStar,
    needs_reorder: bool,
    auto_freeze: AutoFreeze,

    stats: SimStats,

    commands: CommandQueue,
    command_tx: CommandSender,
    input: InputHandle,
    snapshot: InputState,

    scratch_inputs: Vec<PinState>,
    scratch_outputs: Vec<PinState>,
}

impl Simulator {
    /// Builds the chip `root` from `library` and wraps it in a simulator.
    ///
    /// # Arguments
    ///
    /// * `config` - Seed, reorder interval, freeze and built-in defaults
    /// * `library` - Descriptions of every custom chip `root` may contain
    /// * `root` - Library or built-in name of the top-level chip
    ///
    /// # Returns
    ///
    /// A simulator at frame 0, or the builder's error if `root` cannot be
    /// instantiated.
    pub fn new(config: Config, library: ChipLibrary, root: &str) -> Result<Self> {
        let mut circuit = Circuit::new();
        ChipBuilder::new(&library, config.simulation.builtin_defaults())
            .build_root(&mut circuit, root)?;
        info!(
            "built root chip {} ({} chips, {} pins)",
            root,
            circuit.chip_count(),
            circuit.pin_count()
        );
        Ok(Self::from_circuit(config, library, circuit))
    }

    /// Wraps an already built circuit.
    pub fn from_circuit(config: Config, library: ChipLibrary, circuit: Circuit) -> Self {
        let (command_tx, commands) = commands::channel();
        Self {
            circuit,
            library,
            rng: Xoshiro256StarStar::seed_from_u64(config.general.seed),
            auto_freeze: config.simulation.auto_freeze(),
            config,
            frame: 0,
            needs_reorder: true,
            stats: SimStats::default(),
            commands,
            command_tx,
            input: InputHandle::new(),
            snapshot: InputState::new(),
            scratch_inputs: Vec::new(),
            scratch_outputs: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Handles and read-back
    // ------------------------------------------------------------------

    /// A new producer for the structural command queue.
    pub fn command_sender(&self) -> CommandSender {
        self.command_tx.clone()
    }

    /// Shared handle to the live player input.
    pub fn input_handle(&self) -> InputHandle {
        self.input.clone()
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn library(&self) -> &ChipLibrary {
        &self.library
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    /// Number of frames run so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// True when the next frame will run a reorder pass.
    pub fn needs_reorder(&self) -> bool {
        self.needs_reorder
    }

    /// Forces a reorder pass on the next frame.
    pub fn request_reorder(&mut self) {
        self.needs_reorder = true;
    }

    pub fn pin_state(&self, address: &PinAddress) -> Option<PinState> {
        self.circuit.pin_state(address)
    }

    /// Internal-state buffer of the chip at `path`.
    pub fn chip_state(&self, path: &ChipPath) -> Option<&[u32]> {
        let handle = self.circuit.find_chip(path).ok()?;
        Some(&self.circuit[handle].internal_state)
    }

    /// Ids and states of the root chip's output pins.
    pub fn root_outputs(&self) -> Vec<(PinId, PinState)> {
        self.circuit
            .root()
            .map(|root| {
                self.circuit[root]
                    .outputs
                    .iter()
                    .map(|&p| (self.circuit[p].id, self.circuit[p].state))
                    .collect()
            })
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Frame loop
    // ------------------------------------------------------------------

    /// Runs `frames` frames back to back.
    pub fn run(&mut self, frames: u64) {
        for _ in 0..frames {
            self.step_frame();
        }
    }

    /// Advances the circuit by one frame.
    ///
    /// # Returns
    ///
    /// The traversal mode the frame used.
    pub fn step_frame(&mut self) -> Pass {
        self.frame += 1;
        self.apply_commands();
        self.input.snapshot_into(&mut self.snapshot);
        self.inject_inputs();

        let pass = if self.needs_reorder {
            self.stats.reorder_passes += 1;
            Pass::Reorder
        } else {
            self.stats.fast_passes += 1;
            Pass::Fast
        };

        #[cfg(feature = "always-trace")]
        info!("frame {}: {:?} pass", self.frame, pass);
        if self.config.general.trace_frames {
            trace!("frame {}: {:?} pass", self.frame, pass);
        }

        match self.circuit.root() {
            Some(root) if self.circuit[root].is_builtin() => self.step_builtin(root),
            Some(root) => self.step_chip(root, pass),
            None => {}
        }
        self.needs_reorder = false;
        self.stats.frames += 1;
        pass
    }

    /// Applies every queued structural command.
    fn apply_commands(&mut self) {
        let builder = ChipBuilder::new(&self.library, self.config.simulation.builtin_defaults());
        for command in self.commands.drain() {
            match command.apply(&mut self.circuit, &builder) {
                Ok(()) => {
                    debug!("applied {:?}", command);
                    for path in command.affected_chips() {
                        Self::reset_histories(&mut self.circuit, path);
                    }
                    self.stats.commands_applied += 1;
                    self.needs_reorder = true;
                }
                Err(e) if e.is_transient() => {
                    debug!("skipped {:?}: {}", command, e);
                    self.stats.commands_skipped += 1;
                }
                Err(e) => {
                    warn!("rejected {:?}: {}", command, e);
                    self.stats.commands_skipped += 1;
                }
            }
        }
    }

    /// Clears the auto-freeze history of every chip from the root down
    /// `path`, stopping where the path no longer resolves.
    fn reset_histories(circuit: &mut Circuit, path: &ChipPath) {
        let mut chip = circuit.root();
        let mut ids = path.0.iter();
        while let Some(handle) = chip {
            circuit[handle].input_history.reset();
            chip = ids.next().and_then(|&id| circuit.child_by_id(handle, id));
        }
    }

    /// Copies player-driven values onto the root chip's input pins.
    fn inject_inputs(&mut self) {
        let Some(root) = self.circuit.root() else {
            return;
        };
        for (id, state) in self.snapshot.pin_values() {
            let pin = self
                .circuit
                .pin_by_id(root, id)
                .filter(|&p| self.circuit[p].is_input);
            match pin {
                Some(pin) => {
                    let bits = self.circuit[pin].bit_count;
                    self.circuit[pin].state = state.masked(bits);
                }
                None => {
                    debug!("frame {}: no root input pin {}, skipped", self.frame, id);
                    self.stats.input_pins_skipped += 1;
                }
            }
        }
    }

    fn absorb(&mut self, report: PropagationReport) {
        self.stats.pin_deliveries += report.deliveries;
        self.stats.contested_receives += report.contested;
    }

    /// Evaluates one custom chip and, through it, its subtree.
    fn step_chip(&mut self, chip: ChipHandle, pass: Pass) {
        let report = self.circuit.propagate_inputs(chip, self.frame, &mut self.rng);
        self.absorb(report);

        if is_frozen(&self.circuit, chip) {
            self.stats.frozen_skips += 1;
            return;
        }

        let settled = self
            .auto_freeze
            .check(&mut self.circuit, chip, self.frame, &mut self.scratch_inputs);
        if settled && pass == Pass::Fast {
            self.stats.auto_frozen_skips += 1;
            for i in 0..self.circuit[chip].children.len() {
                let child = self.circuit[chip].children[i];
                let report = self.circuit.propagate_outputs(child, self.frame, &mut self.rng);
                self.absorb(report);
            }
            return;
        }

        match pass {
            Pass::Reorder => self.reorder_children(chip),
            Pass::Fast => self.fast_children(chip),
        }
    }

    /// Evaluates the children of `chip` in dependency order and caches it.
    fn reorder_children(&mut self, chip: ChipHandle) {
        let mut order = mem::take(&mut self.circuit[chip].children);
        let mut remaining = order.len();

        while remaining > 0 {
            let live = &order[..remaining];
            let index = match live.iter().position(|&c| self.circuit[c].is_ready(self.frame)) {
                Some(i) => i,
                None => {
                    let i = self.pick_in_loop(live);
                    if self.config.general.trace_frames {
                        self.trace_pending_inputs(order[i]);
                    }
                    i
                }
            };
            let child = order[index];
            if self.config.general.trace_frames {
                trace!(
                    "frame {}: reorder picked {} (id {})",
                    self.frame,
                    self.circuit[child].name,
                    self.circuit[child].id
                );
            }
            self.evaluate_child(child, Pass::Reorder);
            order.swap(index, remaining - 1);
            remaining -= 1;
        }

        self.circuit[chip].children = order;
    }

    /// Logs the inputs of a loop-picked chip that are still waiting on
    /// drivers this frame.
    fn trace_pending_inputs(&self, chip: ChipHandle) {
        for &pin in &self.circuit[chip].inputs {
            let p = &self.circuit[pin];
            let received = p.num_inputs_received(self.frame);
            if received >= p.num_input_connections {
                continue;
            }
            let last = p.last_driver().map(|d| self.circuit[d].id);
            trace!(
                "frame {}: {} pin {} has {}/{} drivers (last {:?})",
                self.frame,
                self.circuit[chip].name,
                p.id,
                received,
                p.num_input_connections,
                last
            );
        }
    }

    /// Picks a child when none is ready, preferring non-bus-origin chips so
    /// buses settle after whatever drives them.
    fn pick_in_loop(&mut self, live: &[ChipHandle]) -> usize {
        let candidates = live
            .iter()
            .filter(|&&c| !self.circuit[c].is_bus_origin())
            .count();
        if candidates == 0 {
            return self.rng.gen_range(0..live.len());
        }
        let nth = self.rng.gen_range(0..candidates);
        live.iter()
            .enumerate()
            .filter(|(_, c)| !self.circuit[**c].is_bus_origin())
            .nth(nth)
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Evaluates the children of `chip` in the cached order.
    fn fast_children(&mut self, chip: ChipHandle) {
        let count = self.circuit[chip].children.len();
        let interval = self.config.simulation.dynamic_reorder_interval;
        let nudge = interval > 0 && self.frame % interval == 0;

        for i in (0..count).rev() {
            let child = self.circuit[chip].children[i];
            if nudge && i + 1 < count && !self.circuit[child].is_ready(self.frame) {
                let next = self.circuit[chip].children[i + 1];
                let pinned = self.circuit[child].is_bus_origin() || self.circuit[next].is_bus_origin();
                if !pinned && self.rng.gen_bool(0.5) {
                    self.circuit[chip].children.swap(i, i + 1);
                    self.stats.dynamic_swaps += 1;
                }
            }
            self.evaluate_child(child, Pass::Fast);
        }
    }

    /// Evaluates one child and forwards its outputs.
    fn evaluate_child(&mut self, child: ChipHandle, pass: Pass) {
        if self.circuit[child].is_builtin() {
            self.step_builtin(child);
        } else {
            self.step_chip(child, pass);
        }
        let report = self.circuit.propagate_outputs(child, self.frame, &mut self.rng);
        self.absorb(report);
    }

    /// Runs a built-in unless its freeze pin holds it.
    fn step_builtin(&mut self, chip: ChipHandle) {
        if is_frozen(&self.circuit, chip) {
            self.stats.frozen_skips += 1;
        } else {
            self.process_builtin(chip);
        }
    }

    fn process_builtin(&mut self, chip: ChipHandle) {
        let kind = self.circuit.kind(chip);
        self.circuit.read_inputs(chip, &mut self.scratch_inputs);
        self.scratch_outputs.clear();
        self.scratch_outputs.extend(
            self.circuit[chip]
                .outputs
                .iter()
                .map(|&p| self.circuit[p].state),
        );

        let mut state = mem::take(&mut self.circuit[chip].internal_state);
        let mut ctx = EvalContext {
            frame: self.frame,
            rng: &mut self.rng,
            input: &self.snapshot,
        };
        builtin::process(
            kind,
            &self.scratch_inputs,
            &mut state,
            &mut self.scratch_outputs,
            &mut ctx,
        );
        self.circuit[chip].internal_state = state;
        self.circuit.write_outputs(chip, &self.scratch_outputs);
        self.stats.builtin_evaluations += 1;
    }
}
