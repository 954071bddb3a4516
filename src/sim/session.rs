//! Evaluator Thread.
//!
//! A `Session` moves a `Simulator` onto its own thread and runs frames until
//! told to stop (or until an optional frame limit). Editors keep the
//! command sender and input handle; a shared frame counter lets them watch
//! progress without touching the circuit.

use std::io;
use std::panic;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::info;

use super::commands::CommandSender;
use super::input::InputHandle;
use super::simulator::Simulator;

/// A simulator running on a background thread.
pub struct Session {
    handle: JoinHandle<Simulator>,
    stop: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
    commands: CommandSender,
    input: InputHandle,
}

impl Session {
    /// Starts running `simulator` on a new thread.
    ///
    /// # Arguments
    ///
    /// * `simulator` - The simulator to run; returned by `join`/`wait`
    /// * `frame_limit` - Stop on its own after this many frames, if set
    pub fn spawn(simulator: Simulator, frame_limit: Option<u64>) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let frames = Arc::new(AtomicU64::new(simulator.frame()));
        let commands = simulator.command_sender();
        let input = simulator.input_handle();

        let thread_stop = stop.clone();
        let thread_frames = frames.clone();
        let handle = thread::Builder::new()
            .name("circuit-evaluator".to_string())
            .spawn(move || {
                let mut sim = simulator;
                let start = sim.frame();
                while !thread_stop.load(Ordering::Relaxed) {
                    if frame_limit.is_some_and(|limit| sim.frame() - start >= limit) {
                        break;
                    }
                    sim.step_frame();
                    thread_frames.store(sim.frame(), Ordering::Relaxed);
                }
                info!("evaluator stopped after frame {}", sim.frame());
                sim
            })?;

        Ok(Self {
            handle,
            stop,
            frames,
            commands,
            input,
        })
    }

    pub fn commands(&self) -> &CommandSender {
        &self.commands
    }

    pub fn input(&self) -> &InputHandle {
        &self.input
    }

    /// Frames completed so far.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Asks the evaluator to stop after the current frame.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Stops the evaluator and takes the simulator back.
    pub fn join(self) -> Simulator {
        self.stop();
        self.wait()
    }

    /// Waits for the evaluator to stop on its own (frame limit) and takes
    /// the simulator back.
    pub fn wait(self) -> Simulator {
        match self.handle.join() {
            Ok(sim) => sim,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}
