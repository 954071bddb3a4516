//! Integration tests for chip construction from library descriptions.

use circuit_sim::builtin::BuiltinDefaults;
use circuit_sim::chip::{ChipBuilder, ChipKind, Circuit, GateOp};
use circuit_sim::common::{ChipPath, PinAddress, SimError, FREEZE_PIN_ID};
use circuit_sim::library::ChipLibrary;

const LIBRARY: &str = r#"{
  "chips": [
    {
      "name": "HALF_ADDER",
      "input_pins":  [{ "id": 0, "name": "A" }, { "id": 1, "name": "B" }],
      "output_pins": [{ "id": 2, "name": "SUM" }, { "id": 3, "name": "CARRY" }],
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
      "name": "PAIR",
      "input_pins":  [{ "id": 0 }, { "id": 4294967295 }],
      "output_pins": [{ "id": 1 }],
      "sub_chips":   [
        { "id": 10, "name": "half_adder" },
        { "id": 11, "name": "CLOCK", "internal_data": [4] }
      ],
      "wires": []
    },
    { "name": "LOOP_A", "sub_chips": [{ "id": 1, "name": "LOOP_B" }] },
    { "name": "LOOP_B", "sub_chips": [{ "id": 1, "name": "LOOP_A" }] },
    { "name": "USES_GHOST", "sub_chips": [{ "id": 1, "name": "GHOST" }] },
    {
      "name": "DUP_PINS",
      "input_pins": [{ "id": 0 }],
      "output_pins": [{ "id": 0 }]
    },
    {
      "name": "BAD_WIRE",
      "input_pins": [{ "id": 0 }],
      "sub_chips": [{ "id": 1, "name": "NOT" }],
      "wires": [{ "source": { "pin": 0 }, "target": { "chip": 1, "pin": 7 } }]
    },
    {
      "name": "BACKWARDS",
      "input_pins": [{ "id": 0 }],
      "sub_chips": [{ "id": 1, "name": "NOT" }],
      "wires": [{ "source": { "chip": 1, "pin": 0 }, "target": { "pin": 0 } }]
    }
  ]
}"#;

fn build(name: &str) -> (Circuit, Result<(), SimError>) {
    let library = ChipLibrary::from_json(LIBRARY).unwrap();
    let mut circuit = Circuit::new();
    let result = ChipBuilder::new(&library, BuiltinDefaults::default())
        .build_root(&mut circuit, name)
        .map(|_| ());
    (circuit, result)
}

/// Tests that a custom chip gets its pins, children and wires.
#[test]
fn test_build_half_adder() {
    let (circuit, result) = build("HALF_ADDER");
    result.unwrap();

    let root = circuit.root().unwrap();
    assert_eq!(circuit[root].inputs.len(), 2);
    assert_eq!(circuit[root].outputs.len(), 2);
    assert_eq!(circuit[root].children.len(), 2);
    assert_eq!(circuit.chip_count(), 3);

    let xor = circuit.find_chip(&ChipPath(vec![1])).unwrap();
    assert_eq!(circuit.kind(xor), ChipKind::Gate { op: GateOp::Xor, width: 1 });
    assert_eq!(circuit[xor].num_connected_inputs, 2);

    let a = circuit.find_pin(&PinAddress::root(0)).unwrap();
    assert_eq!(circuit[a].targets.len(), 2);
    let sum = circuit.find_pin(&PinAddress::root(2)).unwrap();
    assert_eq!(circuit[sum].num_input_connections, 1);
}

/// Tests nesting, case-insensitive names, seeds and the freeze pin.
#[test]
fn test_build_nested() {
    let (circuit, result) = build("pair");
    result.unwrap();

    let root = circuit.root().unwrap();
    assert!(circuit[root].freeze_pin.is_some());
    assert_eq!(circuit[root].inputs.len(), 1);
    assert!(circuit.find_pin(&PinAddress::root(FREEZE_PIN_ID)).is_ok());

    let clock = circuit.find_chip(&ChipPath(vec![11])).unwrap();
    assert_eq!(circuit[clock].internal_state[0], 4);
    assert!(circuit[root].changes_spontaneously);

    let inner = circuit.find_chip(&ChipPath(vec![10])).unwrap();
    assert_eq!(circuit[inner].name, "HALF_ADDER");
    assert!(!circuit[inner].changes_spontaneously);
    assert!(circuit.find_chip(&ChipPath(vec![10, 2])).is_ok());
}

/// Tests that a chip containing itself is rejected.
#[test]
fn test_recursive_chip() {
    let (_, result) = build("LOOP_A");
    assert!(matches!(result, Err(SimError::RecursiveChip(_))));
}

/// Tests that unknown chip names are rejected and nothing is left behind.
#[test]
fn test_unknown_chip() {
    let (circuit, result) = build("USES_GHOST");
    assert!(matches!(result, Err(SimError::UnknownChip(ref n)) if n == "GHOST"));
    assert_eq!(circuit.chip_count(), 0);
    assert_eq!(circuit.pin_count(), 0);
    assert!(circuit.root().is_none());
}

/// Tests that duplicate pin ids are rejected.
#[test]
fn test_duplicate_pin_id() {
    let (_, result) = build("DUP_PINS");
    assert!(matches!(result, Err(SimError::DuplicatePinId { pin: 0, .. })));
}

/// Tests that wires to missing pins are rejected.
#[test]
fn test_wire_to_missing_pin() {
    let (circuit, result) = build("BAD_WIRE");
    assert!(matches!(result, Err(SimError::InvalidWire { .. })));
    assert_eq!(circuit.chip_count(), 0);
}

/// Tests that wires running against pin direction are rejected.
#[test]
fn test_wire_direction() {
    let (_, result) = build("BACKWARDS");
    assert!(matches!(result, Err(SimError::InvalidWire { .. })));
}

/// Tests that a built-in can be the root chip.
#[test]
fn test_builtin_root() {
    let (circuit, result) = build("counter-16");
    result.unwrap();
    let root = circuit.root().unwrap();
    assert_eq!(circuit.kind(root), ChipKind::Counter { width: 16 });
    assert_eq!(circuit[root].inputs.len(), 2);
    assert_eq!(circuit[circuit[root].outputs[0]].bit_count, 16);
}

/// Tests lookups that miss.
#[test]
fn test_lookup_errors() {
    let (circuit, result) = build("HALF_ADDER");
    result.unwrap();
    let err = circuit.find_chip(&ChipPath(vec![9])).unwrap_err();
    assert!(err.is_transient());
    let err = circuit.find_pin(&PinAddress::new(vec![1], 42)).unwrap_err();
    assert!(matches!(err, SimError::PinNotFound { pin: 42, .. }));
}

/// Tests that library documents must be well formed.
#[test]
fn test_library_parse_error() {
    assert!(matches!(ChipLibrary::from_json("{ \"chips\": 3 }"), Err(SimError::Library(_))));
    let library = ChipLibrary::from_json(LIBRARY).unwrap();
    assert_eq!(library.len(), 8);
    assert!(library.names().any(|n| n == "HALF_ADDER"));
}
