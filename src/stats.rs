//! Simulation statistics collection and reporting.
//!
//! Tracks frame counts, which traversal pass ran, how often chips were
//! skipped by the freeze policy, and how the command queue and input
//! injection fared.

use std::time::Instant;

/// Counters updated by the simulator as frames run.
#[derive(Clone, Debug)]
pub struct SimStats {
    start_time: Instant,
    pub frames: u64,

    pub reorder_passes: u64,
    pub fast_passes: u64,
    /// Fast-pass neighbour swaps made by dynamic reordering.
    pub dynamic_swaps: u64,

    pub builtin_evaluations: u64,
    pub frozen_skips: u64,
    pub auto_frozen_skips: u64,

    pub pin_deliveries: u64,
    pub contested_receives: u64,

    pub commands_applied: u64,
    pub commands_skipped: u64,
    pub input_pins_skipped: u64,
}

impl Default for SimStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            frames: 0,
            reorder_passes: 0,
            fast_passes: 0,
            dynamic_swaps: 0,
            builtin_evaluations: 0,
            frozen_skips: 0,
            auto_frozen_skips: 0,
            pin_deliveries: 0,
            contested_receives: 0,
            commands_applied: 0,
            commands_skipped: 0,
            input_pins_skipped: 0,
        }
    }
}

impl SimStats {
    /// Prints a formatted summary of all simulation statistics.
    pub fn print(&self) {
        let seconds = self.start_time.elapsed().as_secs_f64();
        let frames = self.frames.max(1) as f64;
        let fps = if seconds > 0.0 {
            self.frames as f64 / seconds
        } else {
            0.0
        };

        println!("\n==========================================================");
        println!("CIRCUIT SIMULATION STATISTICS");
        println!("==========================================================");
        println!("host_seconds             {:.4} s", seconds);
        println!("sim_frames               {}", self.frames);
        println!("sim_fps                  {:.2}", fps);
        println!("----------------------------------------------------------");
        println!("TRAVERSAL");
        println!(
            "  pass.reorder           {} ({:.2}%)",
            self.reorder_passes,
            (self.reorder_passes as f64 / frames) * 100.0
        );
        println!(
            "  pass.fast              {} ({:.2}%)",
            self.fast_passes,
            (self.fast_passes as f64 / frames) * 100.0
        );
        println!("  pass.dynamic_swaps     {}", self.dynamic_swaps);
        println!(
            "  eval.builtin           {} ({:.2}/frame)",
            self.builtin_evaluations,
            self.builtin_evaluations as f64 / frames
        );
        println!("  skip.frozen            {}", self.frozen_skips);
        println!("  skip.auto_frozen       {}", self.auto_frozen_skips);
        println!("----------------------------------------------------------");
        println!("SIGNALS");
        let contested_rate = if self.pin_deliveries > 0 {
            (self.contested_receives as f64 / self.pin_deliveries as f64) * 100.0
        } else {
            0.0
        };
        println!("  pin.deliveries         {}", self.pin_deliveries);
        println!(
            "  pin.contested          {} ({:.2}%)",
            self.contested_receives, contested_rate
        );
        println!("----------------------------------------------------------");
        println!("EDITOR TRAFFIC");
        println!("  cmd.applied            {}", self.commands_applied);
        println!("  cmd.skipped            {}", self.commands_skipped);
        println!("  input.pins_skipped     {}", self.input_pins_skipped);
        println!("==========================================================");
    }
}
