//! End-to-end tests for the frame evaluator.

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use circuit_sim::asm;
use circuit_sim::builtin::{cpu, display};
use circuit_sim::common::{ChipPath, PinAddress, PinId, PinState};
use circuit_sim::config::Config;
use circuit_sim::library::{
    ChipDescription, ChipLibrary, PinDescription, SubChipDescription, WireDescription, WireEnd,
};
use circuit_sim::sim::{Pass, Session, SimCommand, Simulator};

const LIBRARY: &str = r#"{
  "chips": [
    {
      "name": "HALF_ADDER",
      "input_pins":  [{ "id": 0 }, { "id": 1 }],
      "output_pins": [{ "id": 2 }, { "id": 3 }],
      "sub_chips":   [{ "id": 1, "name": "XOR" }, { "id": 2, "name": "AND" }],
      "wires": [
        { "source": { "pin": 0 }, "target": { "chip": 1, "pin": 0 } },
        { "source": { "pin": 1 }, "target": { "chip": 1, "pin": 1 } },
        { "source": { "pin": 0 }, "target": { "chip": 2, "pin": 0 } },
        { "source": { "pin": 1 }, "target": { "chip": 2, "pin": 1 } },
        { "source": { "chip": 1, "pin": 2 }, "target": { "pin": 2 } },
        { "source": { "chip": 2, "pin": 2 }, "target": { "pin": 3 } }
      ]
    },
    {
      "name": "RACE",
      "input_pins":  [{ "id": 0 }],
      "output_pins": [{ "id": 1 }],
      "sub_chips":   [{ "id": 1, "name": "NOT" }],
      "wires": [
        { "source": { "pin": 0 }, "target": { "chip": 1, "pin": 0 } },
        { "source": { "chip": 1, "pin": 1 }, "target": { "pin": 1 } },
        { "source": { "pin": 0 }, "target": { "pin": 1 } }
      ]
    },
    {
      "name": "RING",
      "output_pins": [{ "id": 0 }],
      "sub_chips":   [{ "id": 1, "name": "NOT" }],
      "wires": [
        { "source": { "chip": 1, "pin": 1 }, "target": { "chip": 1, "pin": 0 } },
        { "source": { "chip": 1, "pin": 1 }, "target": { "pin": 0 } }
      ]
    },
    {
      "name": "TRIANGLE",
      "sub_chips": [
        { "id": 1, "name": "NOT" },
        { "id": 2, "name": "NOT" },
        { "id": 3, "name": "NOT" }
      ],
      "wires": [
        { "source": { "chip": 1, "pin": 1 }, "target": { "chip": 2, "pin": 0 } },
        { "source": { "chip": 2, "pin": 1 }, "target": { "chip": 1, "pin": 0 } }
      ]
    },
    {
      "name": "INV",
      "input_pins":  [{ "id": 0 }],
      "output_pins": [{ "id": 1 }],
      "sub_chips":   [{ "id": 1, "name": "NOT" }],
      "wires": [
        { "source": { "pin": 0 }, "target": { "chip": 1, "pin": 0 } },
        { "source": { "chip": 1, "pin": 1 }, "target": { "pin": 1 } }
      ]
    },
    {
      "name": "INV_TOP",
      "input_pins":  [{ "id": 0 }],
      "output_pins": [{ "id": 1 }],
      "sub_chips":   [{ "id": 1, "name": "INV" }],
      "wires": [
        { "source": { "pin": 0 }, "target": { "chip": 1, "pin": 0 } },
        { "source": { "chip": 1, "pin": 1 }, "target": { "pin": 1 } }
      ]
    },
    {
      "name": "FREEZABLE",
      "input_pins":  [{ "id": 0 }, { "id": 4294967295 }],
      "output_pins": [{ "id": 1 }],
      "sub_chips":   [{ "id": 1, "name": "NOT" }],
      "wires": [
        { "source": { "pin": 0 }, "target": { "chip": 1, "pin": 0 } },
        { "source": { "chip": 1, "pin": 1 }, "target": { "pin": 1 } }
      ]
    },
    {
      "name": "FREEZE_TOP",
      "input_pins":  [{ "id": 0 }, { "id": 1 }],
      "output_pins": [{ "id": 2 }],
      "sub_chips":   [{ "id": 1, "name": "FREEZABLE" }],
      "wires": [
        { "source": { "pin": 0 }, "target": { "chip": 1, "pin": 0 } },
        { "source": { "pin": 1 }, "target": { "chip": 1, "pin": 4294967295 } },
        { "source": { "chip": 1, "pin": 1 }, "target": { "pin": 2 } }
      ]
    },
    {
      "name": "CLOCKED",
      "output_pins": [{ "id": 0 }],
      "sub_chips":   [{ "id": 1, "name": "CLOCK" }],
      "wires": [{ "source": { "chip": 1, "pin": 0 }, "target": { "pin": 0 } }]
    },
    {
      "name": "KEYS",
      "output_pins": [{ "id": 0 }],
      "sub_chips":   [{ "id": 1, "name": "KEY", "internal_data": [87] }],
      "wires": [{ "source": { "chip": 1, "pin": 0 }, "target": { "pin": 0 } }]
    },
    {
      "name": "BUS_LOOP",
      "output_pins": [{ "id": 0 }, { "id": 1 }, { "id": 2 }],
      "sub_chips": [
        { "id": 1, "name": "BUS-ORIGIN-1" },
        { "id": 2, "name": "NOT" },
        { "id": 3, "name": "NOT" },
        { "id": 4, "name": "NOT" }
      ],
      "wires": [
        { "source": { "chip": 1, "pin": 1 }, "target": { "chip": 1, "pin": 0 } },
        { "source": { "chip": 2, "pin": 1 }, "target": { "chip": 3, "pin": 0 } },
        { "source": { "chip": 3, "pin": 1 }, "target": { "chip": 4, "pin": 0 } },
        { "source": { "chip": 4, "pin": 1 }, "target": { "chip": 2, "pin": 0 } },
        { "source": { "chip": 2, "pin": 1 }, "target": { "pin": 0 } },
        { "source": { "chip": 3, "pin": 1 }, "target": { "pin": 1 } },
        { "source": { "chip": 4, "pin": 1 }, "target": { "pin": 2 } }
      ]
    },
    {
      "name": "EMPTY",
      "input_pins":  [{ "id": 0 }],
      "output_pins": [{ "id": 1 }]
    }
  ]
}"#;

fn simulator_with(config: Config, root: &str) -> Simulator {
    let library = ChipLibrary::from_json(LIBRARY).unwrap();
    Simulator::new(config, library, root).unwrap()
}

fn simulator(root: &str) -> Simulator {
    simulator_with(Config::default(), root)
}

fn drive(sim: &Simulator, pin: PinId, value: u64) {
    sim.input_handle()
        .update(|input| input.set_pin(pin, PinState::from_value(value)));
}

fn root_pin(sim: &Simulator, pin: PinId) -> PinState {
    sim.pin_state(&PinAddress::root(pin)).unwrap()
}

/// Tests the pass sequence and a purely combinational circuit.
#[test]
fn test_half_adder_truth_table() {
    let mut sim = simulator("HALF_ADDER");
    assert!(sim.needs_reorder());

    let cases = [(0, 0, 0, 0), (0, 1, 1, 0), (1, 0, 1, 0), (1, 1, 0, 1)];
    for (i, (a, b, sum, carry)) in cases.into_iter().enumerate() {
        drive(&sim, 0, a);
        drive(&sim, 1, b);
        let pass = sim.step_frame();
        assert_eq!(pass, if i == 0 { Pass::Reorder } else { Pass::Fast });
        assert_eq!(root_pin(&sim, 2), PinState::from_value(sum), "sum of {}+{}", a, b);
        assert_eq!(root_pin(&sim, 3), PinState::from_value(carry), "carry of {}+{}", a, b);
    }
    assert_eq!(sim.frame(), 4);
    assert_eq!(sim.stats().reorder_passes, 1);
    assert_eq!(sim.stats().fast_passes, 3);
}

/// Tests that root outputs are reported with their ids.
#[test]
fn test_root_outputs() {
    let mut sim = simulator("HALF_ADDER");
    drive(&sim, 0, 1);
    drive(&sim, 1, 1);
    sim.step_frame();
    assert_eq!(
        sim.root_outputs(),
        vec![(2, PinState::LOW), (3, PinState::HIGH)]
    );
}

fn race_trace(seed: u64, frames: usize) -> Vec<bool> {
    let mut config = Config::default();
    config.general.seed = seed;
    let mut sim = simulator_with(config, "RACE");
    drive(&sim, 0, 1);
    (0..frames)
        .map(|_| {
            sim.step_frame();
            root_pin(&sim, 1).first_bit_high()
        })
        .collect()
}

/// Tests that two disagreeing drivers each win about half of the frames.
#[test]
fn test_driver_race_is_fair() {
    let trace = race_trace(1234, 400);
    let highs = trace.iter().filter(|&&h| h).count();
    assert!((140..=260).contains(&highs), "input won {} of 400 frames", highs);
}

/// Tests that a race resolves identically for the same seed and
/// differently for another.
#[test]
fn test_driver_race_is_reproducible() {
    assert_eq!(race_trace(7, 200), race_trace(7, 200));
    assert_ne!(race_trace(7, 200), race_trace(8, 200));
}

/// Tests that every contested delivery is counted.
#[test]
fn test_contested_receives_counted() {
    let mut sim = simulator("RACE");
    drive(&sim, 0, 1);
    sim.run(50);
    assert_eq!(sim.stats().contested_receives, 50);
}

/// Tests that a gate feeding itself settles into a one-frame oscillation.
#[test]
fn test_feedback_loop_oscillates() {
    let mut sim = simulator("RING");
    let mut seen = Vec::new();
    for _ in 0..6 {
        sim.step_frame();
        seen.push(root_pin(&sim, 0).first_bit_high());
    }
    assert_eq!(seen, [true, false, true, false, true, false]);
}

/// Tests that a loop's evaluation order is nudged when a child keeps
/// arriving before its inputs.
#[test]
fn test_dynamic_reorder_swaps_neighbours() {
    let mut config = Config::default();
    config.simulation.dynamic_reorder_interval = 1;
    let mut sim = simulator_with(config, "TRIANGLE");
    sim.run(64);
    assert!(sim.stats().dynamic_swaps >= 1);

    let mut config = Config::default();
    config.simulation.dynamic_reorder_interval = 0;
    let mut sim = simulator_with(config, "TRIANGLE");
    sim.run(64);
    assert_eq!(sim.stats().dynamic_swaps, 0);
}

fn seeded(seed: u64, interval: u64, root: &str) -> Simulator {
    let mut config = Config::default();
    config.general.seed = seed;
    config.simulation.dynamic_reorder_interval = interval;
    simulator_with(config, root)
}

/// Child ids of the root in stored order; index 0 is evaluated last.
fn root_order(sim: &Simulator) -> Vec<u32> {
    let circuit = sim.circuit();
    let root = circuit.root().unwrap();
    circuit[root].children.iter().map(|&c| circuit[c].id).collect()
}

/// Tests that a bus origin caught in a loop is evaluated after every other
/// chip of the loop.
#[test]
fn test_loop_defers_bus_origin() {
    for seed in 0..20 {
        let mut sim = seeded(seed, 0, "BUS_LOOP");
        assert_eq!(sim.step_frame(), Pass::Reorder);
        let order = root_order(&sim);
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], 1, "seed {} ordered {:?}", seed, order);
    }
}

/// Tests that the periodic nudge never moves a bus origin.
#[test]
fn test_nudge_leaves_bus_origin_in_place() {
    let mut sim = seeded(99, 1, "BUS_LOOP");
    sim.run(100);
    assert_eq!(sim.stats().fast_passes, 99);
    assert_eq!(sim.stats().dynamic_swaps, 0);
    assert_eq!(root_order(&sim)[0], 1);
}

fn loop_trace(seed: u64) -> Vec<(Vec<u32>, Vec<bool>)> {
    let mut sim = seeded(seed, 1, "BUS_LOOP");
    (0..30)
        .map(|_| {
            sim.step_frame();
            let outputs = (0..3).map(|p| root_pin(&sim, p).first_bit_high()).collect();
            (root_order(&sim), outputs)
        })
        .collect()
}

/// Tests that random loop picks repeat exactly for the same seed.
#[test]
fn test_loop_order_is_reproducible() {
    for seed in [3, 17, 4242] {
        assert_eq!(loop_trace(seed), loop_trace(seed));
    }

    let first_picks: HashSet<u32> =
        (0..20).map(|seed| loop_trace(seed)[0].0[3]).collect();
    assert!(first_picks.len() > 1, "every seed started the ring at {:?}", first_picks);
}

/// Tests that a built-in chip can be simulated on its own.
#[test]
fn test_builtin_root_evaluates() {
    let mut sim = simulator("NOT");
    sim.run(3);
    assert_eq!(root_pin(&sim, 1), PinState::HIGH);
    assert_eq!(sim.stats().builtin_evaluations, 3);

    drive(&sim, 0, 1);
    sim.step_frame();
    assert_eq!(root_pin(&sim, 1), PinState::LOW);

    let mut sim = simulator("CLOCK");
    let mut seen = Vec::new();
    for _ in 0..4 {
        sim.step_frame();
        seen.push(root_pin(&sim, 0).first_bit_high());
    }
    assert_eq!(seen, [true, false, true, false]);
}

/// Tests that a frozen chip keeps its outputs until released.
#[test]
fn test_freeze_pin_holds_outputs() {
    let mut sim = simulator("FREEZE_TOP");
    drive(&sim, 0, 0);
    drive(&sim, 1, 0);
    sim.step_frame();
    assert_eq!(root_pin(&sim, 2), PinState::HIGH);

    drive(&sim, 0, 1);
    drive(&sim, 1, 1);
    sim.step_frame();
    assert_eq!(root_pin(&sim, 2), PinState::HIGH);
    assert!(sim.stats().frozen_skips >= 1);

    drive(&sim, 1, 0);
    sim.step_frame();
    assert_eq!(root_pin(&sim, 2), PinState::LOW);
}

/// Tests that auto-freeze skips settled chips and wakes on input change.
#[test]
fn test_auto_freeze() {
    let mut config = Config::default();
    config.simulation.auto_freeze = true;
    config.simulation.auto_freeze_frames = 2;
    let mut sim = simulator_with(config, "INV_TOP");

    drive(&sim, 0, 0);
    sim.run(10);
    assert_eq!(root_pin(&sim, 1), PinState::HIGH);
    assert!(sim.stats().auto_frozen_skips > 0);

    drive(&sim, 0, 1);
    sim.step_frame();
    assert_eq!(root_pin(&sim, 1), PinState::LOW);
}

/// Tests that a structural edit restarts the settle count of the edited
/// chip and its ancestors.
#[test]
fn test_auto_freeze_restarts_after_edit() {
    let mut config = Config::default();
    config.simulation.auto_freeze = true;
    config.simulation.auto_freeze_frames = 2;
    let mut sim = simulator_with(config, "INV_TOP");
    drive(&sim, 0, 0);
    sim.run(10);

    let settled = |sim: &Simulator, path: Vec<u32>| {
        let circuit = sim.circuit();
        circuit[circuit.find_chip(&ChipPath(path)).unwrap()].settled_frames()
    };
    // The root settles first and stops re-evaluating its child.
    assert_eq!(settled(&sim, vec![]), 10);
    assert_eq!(settled(&sim, vec![1]), 2);

    sim.command_sender().send(SimCommand::AddPin {
        chip: ChipPath(vec![1]),
        pin_id: 9,
        is_input: false,
        bit_count: 1,
    });
    let skips = sim.stats().auto_frozen_skips;
    sim.run(2);
    assert_eq!(settled(&sim, vec![]), 2);
    assert_eq!(settled(&sim, vec![1]), 2);
    assert_eq!(sim.stats().auto_frozen_skips, skips);
    assert_eq!(root_pin(&sim, 1), PinState::HIGH);
}

/// Tests that chips containing a clock are never auto-frozen.
#[test]
fn test_auto_freeze_exempts_clocks() {
    let mut config = Config::default();
    config.simulation.auto_freeze = true;
    config.simulation.auto_freeze_frames = 1;
    let mut sim = simulator_with(config, "CLOCKED");

    let mut seen = Vec::new();
    for _ in 0..6 {
        sim.step_frame();
        seen.push(root_pin(&sim, 0).first_bit_high());
    }
    assert_eq!(seen, [true, false, true, false, true, false]);
    assert_eq!(sim.stats().auto_frozen_skips, 0);
}

/// Tests structural edits through the command queue.
#[test]
fn test_command_queue_edits() {
    let mut sim = simulator("EMPTY");
    sim.step_frame();
    assert!(!sim.needs_reorder());

    let tx = sim.command_sender();
    assert!(tx.send(SimCommand::AddSubChip {
        parent: ChipPath::root(),
        id: 5,
        name: "NOT".to_string(),
        internal_data: None,
    }));
    tx.send(SimCommand::AddConnection {
        source: PinAddress::root(0),
        target: PinAddress::new(vec![5], 0),
    });
    tx.send(SimCommand::AddConnection {
        source: PinAddress::new(vec![5], 1),
        target: PinAddress::root(1),
    });

    assert_eq!(sim.step_frame(), Pass::Reorder);
    assert_eq!(sim.stats().commands_applied, 3);
    assert_eq!(root_pin(&sim, 1), PinState::HIGH);
    assert_eq!(sim.circuit().chip_count(), 2);

    drive(&sim, 0, 1);
    assert_eq!(sim.step_frame(), Pass::Fast);
    assert_eq!(root_pin(&sim, 1), PinState::LOW);

    tx.send(SimCommand::RemoveConnection {
        source: PinAddress::new(vec![5], 1),
        target: PinAddress::root(1),
    });
    assert_eq!(sim.step_frame(), Pass::Reorder);
    assert_eq!(root_pin(&sim, 1), PinState::DISCONNECTED);

    // Wires must run source to target inside one chip.
    let applied = sim.stats().commands_applied;
    for (source, target) in [
        (PinAddress::root(0), PinAddress::new(vec![5], 1)),
        (PinAddress::new(vec![5], 0), PinAddress::root(1)),
        (PinAddress::root(1), PinAddress::new(vec![5], 0)),
        (PinAddress::new(vec![5], 1), PinAddress::new(vec![5], 1)),
    ] {
        tx.send(SimCommand::AddConnection { source, target });
    }
    sim.step_frame();
    assert_eq!(sim.stats().commands_applied, applied);
    assert_eq!(sim.stats().commands_skipped, 4);
    assert_eq!(root_pin(&sim, 1), PinState::DISCONNECTED);

    tx.send(SimCommand::RemoveSubChip { path: vec![5].into() });
    sim.step_frame();
    assert_eq!(sim.circuit().chip_count(), 1);
}

/// Tests that a wire cannot reach into a grandchild.
#[test]
fn test_command_queue_rejects_wires_across_chips() {
    let mut sim = simulator("INV_TOP");
    sim.command_sender().send(SimCommand::AddConnection {
        source: PinAddress::root(0),
        target: PinAddress::new(vec![1, 1], 0),
    });
    sim.step_frame();
    assert_eq!(sim.stats().commands_applied, 0);
    assert_eq!(sim.stats().commands_skipped, 1);

    sim.command_sender().send(SimCommand::AddConnection {
        source: PinAddress::new(vec![1], 0),
        target: PinAddress::new(vec![1, 1], 0),
    });
    sim.step_frame();
    assert_eq!(sim.stats().commands_applied, 1);
}

/// Tests that commands aimed at vanished targets are skipped.
#[test]
fn test_command_queue_skips_stale_targets() {
    let mut sim = simulator("EMPTY");
    let tx = sim.command_sender();
    tx.send(SimCommand::RemoveSubChip { path: vec![77].into() });
    tx.send(SimCommand::RemoveSubChip { path: ChipPath::root() });
    tx.send(SimCommand::AddConnection {
        source: PinAddress::new(vec![3], 1),
        target: PinAddress::root(1),
    });
    tx.send(SimCommand::RemoveConnection {
        source: PinAddress::root(0),
        target: PinAddress::root(1),
    });
    tx.send(SimCommand::AddSubChip {
        parent: ChipPath::root(),
        id: 1,
        name: "NO_SUCH_CHIP".to_string(),
        internal_data: None,
    });
    sim.step_frame();
    assert_eq!(sim.stats().commands_skipped, 5);
    assert_eq!(sim.stats().commands_applied, 0);
    assert_eq!(sim.circuit().chip_count(), 1);
}

/// Tests that new pins can be added and driven.
#[test]
fn test_command_queue_adds_pins() {
    let mut sim = simulator("EMPTY");
    sim.command_sender().send(SimCommand::AddPin {
        chip: ChipPath::root(),
        pin_id: 7,
        is_input: true,
        bit_count: 8,
    });
    sim.step_frame();
    drive(&sim, 7, 0x1AB);
    sim.step_frame();
    assert_eq!(root_pin(&sim, 7), PinState::from_value(0xAB));
    assert_eq!(sim.stats().input_pins_skipped, 0);

    sim.command_sender().send(SimCommand::AddPin {
        chip: ChipPath::root(),
        pin_id: 7,
        is_input: false,
        bit_count: 1,
    });
    sim.step_frame();
    assert_eq!(sim.stats().commands_skipped, 1);
}

/// Tests that values for missing or output pins are skipped, not fatal.
#[test]
fn test_input_for_missing_pin_is_skipped() {
    let mut sim = simulator("HALF_ADDER");
    drive(&sim, 99, 1);
    drive(&sim, 2, 1);
    sim.step_frame();
    assert_eq!(sim.stats().input_pins_skipped, 2);
    assert_eq!(root_pin(&sim, 2), PinState::LOW);
}

/// Tests that key chips follow the input snapshot.
#[test]
fn test_key_follows_input() {
    let mut sim = simulator("KEYS");
    let input = sim.input_handle();
    sim.step_frame();
    assert_eq!(root_pin(&sim, 0), PinState::LOW);

    input.update(|s| s.set_key("w", true));
    sim.step_frame();
    assert_eq!(root_pin(&sim, 0), PinState::HIGH);

    input.update(|s| s.set_key("W", false));
    sim.step_frame();
    assert_eq!(root_pin(&sim, 0), PinState::LOW);
}

/// Tests a session that stops on its frame limit.
#[test]
fn test_session_frame_limit() {
    let sim = simulator("HALF_ADDER");
    let session = Session::spawn(sim, Some(50)).unwrap();
    let sim = session.wait();
    assert_eq!(sim.frame(), 50);
    assert_eq!(sim.stats().frames, 50);
}

/// Tests editing and stopping a free-running session.
#[test]
fn test_session_commands_and_stop() {
    let sim = simulator("EMPTY");
    let session = Session::spawn(sim, None).unwrap();

    session.commands().send(SimCommand::AddSubChip {
        parent: ChipPath::root(),
        id: 1,
        name: "AND".to_string(),
        internal_data: None,
    });
    session.input().update(|s| s.set_pin(0, PinState::HIGH));
    let sent_at = session.frames();
    for _ in 0..5000 {
        if session.frames() >= sent_at + 3 {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    assert!(!session.is_finished());

    let sim = session.join();
    assert!(sim.frame() >= sent_at + 3);
    assert_eq!(sim.stats().commands_applied, 1);
    assert_eq!(root_pin(&sim, 0), PinState::HIGH);
}

// ----------------------------------------------------------------------
// A small computer: CPU, two program ROMs, a clock and an RGB display.
// ----------------------------------------------------------------------

const CPU: u32 = 1;
const CLOCK: u32 = 2;
const ROM1: u32 = 3;
const ROM2: u32 = 4;
const SCREEN: u32 = 5;

fn pin(id: PinId) -> PinDescription {
    PinDescription {
        id,
        name: String::new(),
        bit_count: 1,
    }
}

fn sub(id: u32, name: &str, internal_data: Option<Vec<u32>>) -> SubChipDescription {
    SubChipDescription {
        id,
        name: name.to_string(),
        internal_data,
    }
}

fn wire(from: (Option<u32>, PinId), to: (Option<u32>, PinId)) -> WireDescription {
    WireDescription {
        source: WireEnd {
            chip: from.0,
            pin: from.1,
        },
        target: WireEnd {
            chip: to.0,
            pin: to.1,
        },
    }
}

fn computer(source: &str) -> ChipLibrary {
    let (rom1, rom2) = asm::assemble(source).unwrap().rom_images();
    let c = |chip: u32, pin: PinId| (Some(chip), pin);
    let own = |pin: PinId| (None, pin);

    let mut wires = vec![
        // RUN and HALTED
        wire(own(0), c(CPU, 5)),
        wire(c(CPU, 17), own(1)),
        wire(c(CLOCK, 0), c(CPU, 8)),
        // PC addresses both ROMs
        wire(c(CPU, 9), c(ROM1, 0)),
        wire(c(CPU, 9), c(ROM2, 0)),
        // ROM1 = DATA1:OPCODE, ROM2 = DATA3:DATA2
        wire(c(ROM1, 2), c(CPU, 0)),
        wire(c(ROM1, 1), c(CPU, 1)),
        wire(c(ROM2, 2), c(CPU, 2)),
        wire(c(ROM2, 1), c(CPU, 3)),
    ];
    // Screen address and colour, then clear, write, refresh and clock.
    for (from, to) in [(10, 0), (11, 1), (12, 2), (13, 3), (15, 4), (14, 5), (16, 6)] {
        wires.push(wire(c(CPU, from), c(SCREEN, to)));
    }
    wires.push(wire(c(CLOCK, 0), c(SCREEN, 7)));

    let mut library = ChipLibrary::new();
    library.insert(ChipDescription {
        name: "COMPUTER".to_string(),
        input_pins: vec![pin(0)],
        output_pins: vec![pin(1)],
        sub_chips: vec![
            sub(CPU, "CPU", None),
            sub(CLOCK, "CLOCK", None),
            sub(ROM1, "ROM-256X16", Some(rom1)),
            sub(ROM2, "ROM-256X16", Some(rom2)),
            sub(SCREEN, "RGB-DISPLAY", None),
        ],
        wires,
    });
    library
}

/// Tests an assembled program running on a wired-up CPU.
#[test]
fn test_cpu_runs_program_from_rom() {
    let library = computer(
        "SET A TO 5
         SET B TO 7
         A + B = C
         STORE C INTO 0x10
         DRAW 3 4 15 8 1
         REFRESHSCREEN",
    );
    let mut config = Config::default();
    config.simulation.dynamic_reorder_interval = 0;
    let mut sim = Simulator::new(config, library, "COMPUTER").unwrap();
    drive(&sim, 0, 1);

    sim.run(200);
    assert_eq!(root_pin(&sim, 1), PinState::HIGH);

    let state = sim.chip_state(&ChipPath(vec![CPU])).unwrap();
    assert!(cpu::is_halted(state));
    assert_eq!(cpu::register(state, 2), 12);
    assert_eq!(cpu::ram_byte(state, 0x10), 12);

    let screen = sim.chip_state(&ChipPath(vec![SCREEN])).unwrap();
    assert_eq!(display::rgb_pixel(screen, 0x43), (15, 8, 1));
}

/// Tests that nothing runs while RUN is low.
#[test]
fn test_cpu_waits_for_run() {
    let library = computer("SET A TO 1");
    let mut sim = Simulator::new(Config::default(), library, "COMPUTER").unwrap();
    sim.run(50);
    let state = sim.chip_state(&ChipPath(vec![CPU])).unwrap();
    assert_eq!(cpu::program_counter(state), 0);
    assert_eq!(root_pin(&sim, 1), PinState::LOW);
}
