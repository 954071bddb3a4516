//! Simulator configuration.
//!
//! Loaded from a TOML file. Every field has a default, so an empty document
//! (or `Config::default()`) gives a working deterministic setup.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::builtin::BuiltinDefaults;
use crate::common::Result;
use crate::sim::freeze::AutoFreeze;

const DEFAULT_SEED: u64 = 0x5eed;
const DEFAULT_REORDER_INTERVAL: u64 = 100;
const DEFAULT_AUTO_FREEZE_FRAMES: u32 = 8;
const DEFAULT_CLOCK_HALF_PERIOD: u32 = 1;
const DEFAULT_PULSE_WIDTH: u32 = 1;
const DEFAULT_RUN_FRAMES: u64 = 1000;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GeneralConfig {
    /// Seed of the race-resolution PRNG.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Log every frame's pass selection and chip visits at trace level.
    #[serde(default)]
    pub trace_frames: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            trace_frames: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Frames between opportunistic neighbour swaps in the fast pass.
    #[serde(default = "default_reorder_interval")]
    pub dynamic_reorder_interval: u64,

    #[serde(default)]
    pub auto_freeze: bool,

    #[serde(default = "default_auto_freeze_frames")]
    pub auto_freeze_frames: u32,

    /// Half period, in frames, of clocks without a stored period.
    #[serde(default = "default_clock_half_period")]
    pub clock_half_period: u32,

    /// Width, in frames, of pulses without a stored width.
    #[serde(default = "default_pulse_width")]
    pub pulse_width: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dynamic_reorder_interval: default_reorder_interval(),
            auto_freeze: false,
            auto_freeze_frames: default_auto_freeze_frames(),
            clock_half_period: default_clock_half_period(),
            pulse_width: default_pulse_width(),
        }
    }
}

impl SimulationConfig {
    pub fn builtin_defaults(&self) -> BuiltinDefaults {
        BuiltinDefaults {
            clock_half_period: self.clock_half_period.max(1),
            pulse_width: self.pulse_width,
        }
    }

    pub fn auto_freeze(&self) -> AutoFreeze {
        if self.auto_freeze {
            AutoFreeze {
                enabled: true,
                threshold: self.auto_freeze_frames,
            }
        } else {
            AutoFreeze::disabled()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Frames executed by `circuit-sim run` unless overridden.
    #[serde(default = "default_run_frames")]
    pub frames: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frames: default_run_frames(),
        }
    }
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_reorder_interval() -> u64 {
    DEFAULT_REORDER_INTERVAL
}

fn default_auto_freeze_frames() -> u32 {
    DEFAULT_AUTO_FREEZE_FRAMES
}

fn default_clock_half_period() -> u32 {
    DEFAULT_CLOCK_HALF_PERIOD
}

fn default_pulse_width() -> u32 {
    DEFAULT_PULSE_WIDTH
}

fn default_run_frames() -> u64 {
    DEFAULT_RUN_FRAMES
}
