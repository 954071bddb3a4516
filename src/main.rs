//! Circuit Simulator CLI.
//!
//! The main executable for the simulator. It handles command-line argument
//! parsing, loading the chip library and configuration, and running the
//! evaluator.
//!
//! # Usage
//!
//! The executable has two modes:
//! 1. **Run**: Builds a chip from a JSON library and evaluates it for a
//!    number of frames on the evaluator thread, then prints the root chip's
//!    outputs and the run statistics.
//! 2. **Assemble**: Translates a toy CPU program into its two ROM images.

use std::path::PathBuf;
use std::{fs, process};

use clap::{Args, Parser, Subcommand};
use log::info;

use circuit_sim::asm;
use circuit_sim::common::{PinId, PinState, Result, SimError};
use circuit_sim::config::Config;
use circuit_sim::library::ChipLibrary;
use circuit_sim::sim::{Session, Simulator};

#[derive(Parser, Debug)]
#[command(author, version, about = "Hierarchical Digital Logic Simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a chip for a number of frames.
    Run(RunArgs),
    /// Assemble a CPU program into ROM images.
    Assemble(AssembleArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON chip library.
    #[arg(short, long)]
    library: Option<PathBuf>,

    /// Name of the chip to evaluate.
    #[arg(long)]
    chip: String,

    /// Frames to run; overrides the configuration.
    #[arg(short, long)]
    frames: Option<u64>,

    /// PRNG seed; overrides the configuration.
    #[arg(long)]
    seed: Option<u64>,

    /// Drive a root input pin, as PIN=VALUE. May be repeated.
    #[arg(long = "set", value_parser = parse_assignment)]
    set: Vec<(PinId, u64)>,
}

#[derive(Args, Debug)]
struct AssembleArgs {
    /// Assembly source file.
    file: PathBuf,

    /// Print the ROM images as JSON instead of a listing.
    #[arg(long)]
    json: bool,
}

fn parse_number(text: &str) -> Option<u64> {
    let t = text.trim().to_ascii_lowercase();
    if let Some(hex) = t.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = t.strip_prefix("0b") {
        u64::from_str_radix(bin, 2).ok()
    } else {
        t.parse().ok()
    }
}

fn parse_assignment(text: &str) -> std::result::Result<(PinId, u64), String> {
    let (pin, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected PIN=VALUE, got '{}'", text))?;
    let pin = pin
        .trim()
        .parse::<PinId>()
        .map_err(|e| format!("bad pin id '{}': {}", pin, e))?;
    let value = parse_number(value).ok_or_else(|| format!("bad value '{}'", value))?;
    Ok((pin, value))
}

/// Main entry point for the circuit simulator.
///
/// # Behavior
///
/// 1. **Logging**: Initializes `env_logger` (`RUST_LOG` selects the level).
/// 2. **Dispatch**: Runs the selected subcommand.
/// 3. **Teardown**: Reports any error and exits non-zero.
fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Run(args) => run(args),
        Command::Assemble(args) => assemble(args),
    };
    if let Err(e) = outcome {
        eprintln!("[!] {}", e);
        process::exit(1);
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(seed) = args.seed {
        config.general.seed = seed;
    }
    let frames = args.frames.unwrap_or(config.run.frames);

    let library = match &args.library {
        Some(path) => ChipLibrary::load(path)?,
        None => ChipLibrary::new(),
    };

    println!("Global Configuration");
    println!("--------------------");
    println!("  Chip:               {}", args.chip);
    println!("  Library Chips:      {}", library.len());
    println!("  Seed:               {:#x}", config.general.seed);
    println!("  Frames:             {}", frames);
    println!(
        "  Reorder Interval:   {}",
        config.simulation.dynamic_reorder_interval
    );
    println!(
        "  Auto-Freeze:        {}",
        if config.simulation.auto_freeze {
            "Enabled"
        } else {
            "Disabled"
        }
    );
    println!("--------------------");

    let sim = Simulator::new(config, library, &args.chip)?;
    let input = sim.input_handle();
    input.update(|state| {
        for &(pin, value) in &args.set {
            state.set_pin(pin, PinState::from_value(value));
        }
    });

    let session = Session::spawn(sim, Some(frames))?;
    info!("evaluator started for {} frames", frames);
    let sim = session.wait();

    println!("\n[*] Root outputs after frame {}", sim.frame());
    for (id, state) in sim.root_outputs() {
        println!(
            "    pin {:<6} value {:#x}  floating {:#x}",
            id,
            state.value(),
            state.tristate()
        );
    }
    sim.stats().print();
    Ok(())
}

fn assemble(args: AssembleArgs) -> Result<()> {
    let source = fs::read_to_string(&args.file)?;
    let program = asm::assemble(&source)?;
    let (rom1, rom2) = program.rom_images();

    if args.json {
        let doc = serde_json::json!({ "rom1": rom1, "rom2": rom2 });
        let text = serde_json::to_string_pretty(&doc).map_err(SimError::from)?;
        println!("{}", text);
        return Ok(());
    }

    for (address, instr) in program.instructions().iter().enumerate() {
        println!(
            "{:3}: {:02x} {:02x} {:02x} {:02x}   rom1 {:04x}  rom2 {:04x}",
            address, instr.opcode, instr.data1, instr.data2, instr.data3, rom1[address], rom2[address]
        );
    }
    println!("[*] {} of {} words used", program.len(), asm::ROM_WORDS);
    Ok(())
}
