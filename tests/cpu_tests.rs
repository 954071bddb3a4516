//! Integration tests for the toy CPU, driven instruction by instruction.

use circuit_sim::asm::{self, Program};
use circuit_sim::builtin::cpu::{self, Alu, AluOp};
use circuit_sim::common::PinState;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

const KEY_W: u64 = 0b0001;
const KEY_D: u64 = 0b1000;

/// Feeds a CPU from an assembled program, one clock cycle per step.
struct Machine {
    program: Program,
    state: Vec<u32>,
    out: [PinState; 9],
    rng: Xoshiro256StarStar,
    keys: u64,
}

impl Machine {
    fn new(source: &str) -> Self {
        Self {
            program: asm::assemble(source).unwrap(),
            state: vec![0u32; cpu::STATE_LEN],
            out: [PinState::LOW; 9],
            rng: Xoshiro256StarStar::seed_from_u64(1),
            keys: 0,
        }
    }

    fn pins(&self, run: bool, step: bool, reset: bool, clock: bool) -> [PinState; 9] {
        let pc = cpu::program_counter(&self.state) as usize;
        let instr = self.program.instructions().get(pc).copied().unwrap_or_default();
        [
            PinState::from_value(instr.opcode as u64),
            PinState::from_value(instr.data1 as u64),
            PinState::from_value(instr.data2 as u64),
            PinState::from_value(instr.data3 as u64),
            PinState::from_value(self.keys),
            PinState::from_bool(run),
            PinState::from_bool(step),
            PinState::from_bool(reset),
            PinState::from_bool(clock),
        ]
    }

    fn cycle(&mut self) {
        for clock in [false, true] {
            let inputs = self.pins(true, false, false, clock);
            cpu::process(&inputs, &mut self.state, &mut self.out, &mut self.rng);
        }
    }

    fn run(&mut self, max_cycles: usize) {
        for _ in 0..max_cycles {
            if cpu::is_halted(&self.state) {
                break;
            }
            self.cycle();
        }
    }

    fn reg(&self, name: char) -> u8 {
        let index = "ABCDXY".find(name).unwrap();
        cpu::register(&self.state, index)
    }
}

/// Tests the ALU flags for arithmetic and comparisons.
#[test]
fn test_alu_operations() {
    assert_eq!(Alu::execute(AluOp::Mul, 16, 16).value, 0);
    assert!(Alu::execute(AluOp::Mul, 16, 16).carry);
    assert_eq!(Alu::execute(AluOp::Xnor, 0xF0, 0xFF).value, 0xF0);
    assert!(Alu::execute(AluOp::Sub, 1, 2).carry);
    assert!(Alu::execute(AluOp::Compare, 4, 4).zero);
    assert!(!Alu::execute(AluOp::CompareSigned, 1, 0xFF).carry);
}

/// Tests straight-line arithmetic and a RAM store.
#[test]
fn test_set_add_store() {
    let mut m = Machine::new(
        "SET A TO 5
         SET B TO 7
         A + B = C
         STORE C INTO 0x10",
    );
    m.run(50);
    assert!(cpu::is_halted(&m.state));
    assert_eq!(m.reg('C'), 12);
    assert_eq!(cpu::ram_byte(&m.state, 0x10), 12);
    assert!(m.out[8].first_bit_high());
}

/// Tests a counted loop ending on the zero flag.
#[test]
fn test_loop_with_compare() {
    let mut m = Machine::new(
        "SET A TO 0
         SET B TO 3
         loop:
             A = A + 1
             A COMPARE B = C
             JUMP done IF ZERO
             JUMP loop
         done:
             STORE A INTO 1",
    );
    m.run(200);
    assert!(cpu::is_halted(&m.state));
    assert_eq!(cpu::ram_byte(&m.state, 1), 3);
}

/// Tests that each IF comparison picks the right branch.
#[test]
fn test_if_comparisons() {
    let cases = [
        (3, "==", 3, true),
        (3, "==", 4, false),
        (3, "!=", 4, true),
        (3, "!=", 3, false),
        (2, "<", 9, true),
        (9, "<", 9, false),
        (9, ">", 2, true),
        (9, ">", 9, false),
        (9, "<=", 9, true),
        (10, "<=", 9, false),
        (9, ">=", 9, true),
        (200, ">=", 15, true),
        (1, ">=", 2, false),
    ];
    for (a, cmp, b, taken) in cases {
        let mut m = Machine::new(&format!(
            "SET A TO {}
             IF A {} {} THEN
                 SET B TO 1
             ELSE
                 SET B TO 2
             END",
            a, cmp, b
        ));
        m.run(50);
        assert!(cpu::is_halted(&m.state));
        let expected = if taken { 1 } else { 2 };
        assert_eq!(m.reg('B'), expected, "{} {} {}", a, cmp, b);
    }
}

/// Tests a loop built from an inline fake function and a line jump.
#[test]
fn test_fake_function_loop() {
    let mut m = Machine::new(
        "SET A TO 0
         JUMP [bump]
         IF A < 5 THEN
             JUMP L2
         END
         HALT
         bump: FAKE
             A = A + 1",
    );
    m.run(200);
    assert!(cpu::is_halted(&m.state));
    assert_eq!(m.reg('A'), 5);
}

/// Tests a function call through the return stack.
#[test]
fn test_call_and_return() {
    let mut m = Machine::new(
        "SET A TO 3
         JUMP [double]
         JUMP [double]
         STORE A INTO 0
         [double]:
             A = A + A
             RETURN",
    );
    m.run(100);
    assert!(cpu::is_halted(&m.state));
    assert_eq!(cpu::ram_byte(&m.state, 0), 12);
}

/// Tests pushing literals and registers and popping them back in reverse.
#[test]
fn test_stack_instructions() {
    let mut m = Machine::new(
        "SET X TO 9
         PUSH 200
         PUSH PARAMETERS X
         POP PARAMETERS Y
         POP B",
    );
    m.run(50);
    assert_eq!(m.reg('Y'), 9);
    assert_eq!(m.reg('B'), 200);
}

/// Tests loading from RAM and RAM-sourced ALU operands.
#[test]
fn test_load_and_ram_operand() {
    let mut m = Machine::new(
        "SET A TO 40
         STORE A INTO 2
         LOAD 2 INTO B
         [2] + 2 = C",
    );
    m.run(50);
    assert_eq!(m.reg('B'), 40);
    assert_eq!(m.reg('C'), 42);
}

/// Tests key-conditioned jumps.
#[test]
fn test_jump_on_key() {
    let source = "wait:
                      JUMP pressed IF KEY D
                      JUMP wait
                  pressed:
                      SET A TO 1";
    let mut m = Machine::new(source);
    m.run(20);
    assert!(!cpu::is_halted(&m.state));
    assert_eq!(m.reg('A'), 0);

    m.keys = KEY_W;
    m.run(20);
    assert!(!cpu::is_halted(&m.state));

    m.keys = KEY_D;
    m.run(20);
    assert!(cpu::is_halted(&m.state));
    assert_eq!(m.reg('A'), 1);
}

/// Tests the screen strobes raised by drawing instructions.
#[test]
fn test_draw_outputs() {
    let mut m = Machine::new("DRAW 3 4 15 8 1\nREFRESHSCREEN\nCLEARSCREEN");
    for _ in 0..3 {
        m.cycle();
    }
    assert_eq!(m.out[1].value(), 0x43);
    assert_eq!(m.out[2].value(), 15);
    assert_eq!(m.out[3].value(), 8);
    assert_eq!(m.out[4].value(), 1);
    assert!(m.out[5].first_bit_high());

    m.cycle();
    assert!(!m.out[5].first_bit_high());
    assert!(m.out[7].first_bit_high());

    m.cycle();
    assert!(!m.out[7].first_bit_high());
    assert!(m.out[6].first_bit_high());
}

/// Tests that nothing executes without RUN, while STEP executes once.
#[test]
fn test_run_and_step_gating() {
    let mut m = Machine::new("SET A TO 1\nSET B TO 2");
    for clock in [false, true, false, true] {
        let inputs = m.pins(false, false, false, clock);
        cpu::process(&inputs, &mut m.state, &mut m.out, &mut m.rng);
    }
    assert_eq!(cpu::program_counter(&m.state), 0);

    for step in [false, true, true] {
        let inputs = m.pins(false, step, false, false);
        cpu::process(&inputs, &mut m.state, &mut m.out, &mut m.rng);
    }
    assert_eq!(cpu::program_counter(&m.state), 1);
}

/// Tests that reset clears registers, memory and the halt flag.
#[test]
fn test_reset() {
    let mut m = Machine::new("SET A TO 9\nSTORE A INTO 5");
    m.run(20);
    assert!(cpu::is_halted(&m.state));

    let inputs = m.pins(true, false, true, false);
    cpu::process(&inputs, &mut m.state, &mut m.out, &mut m.rng);
    assert!(!cpu::is_halted(&m.state));
    assert_eq!(m.reg('A'), 0);
    assert_eq!(cpu::ram_byte(&m.state, 5), 0);
    assert_eq!(cpu::program_counter(&m.state), 0);
}

/// Tests that RANDOM draws from the shared generator reproducibly.
#[test]
fn test_random_is_reproducible() {
    let run = || {
        let mut m = Machine::new("RANDOM A\nRANDOM B");
        m.run(10);
        (m.reg('A'), m.reg('B'))
    };
    assert_eq!(run(), run());
}
