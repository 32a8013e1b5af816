#![macro_use]

use crate::disk::Disk;
use crate::loader;
use crate::log::Logger;
use crate::machine::Machine;
use crate::opcodes::{encode, Mode, OpCode};

/// Start of user space; test programs are assembled here.
pub const ENTRY: u32 = 300;

/// Assemble the words into a program at the start of user space, append
/// the end-of-program sentinel, and return a machine ready to step.
pub fn machine_with_program(words: &[i64]) -> Machine {
    let mut machine = Machine::new(Disk::new(), None, Logger::disabled());
    let mut text = format!("_start {}\n", ENTRY);
    for word in words {
        text.push_str(&format!("{}\n", word));
    }
    text.push_str("-9999999\n");
    loader::load_str(&mut machine.cpu, &text).expect("test program should load");
    machine
}

/// Step a program to completion in kernel mode, so direct addresses in
/// tests mean what they say (no base relocation). User-mode behaviour is
/// exercised by tests that switch the mode explicitly.
pub fn run_program(words: &[i64]) -> Machine {
    let mut machine = machine_with_program(words);
    step_until_halt(&mut machine);
    machine
}

pub fn step_until_halt(machine: &mut Machine) {
    for _ in 0..10_000 {
        machine.step();
        if machine.cpu.halted {
            return;
        }
    }
    panic!("program did not halt within 10 000 cycles");
}

/// Shorthand for one instruction word.
pub fn inst(op: OpCode, mode: Mode, value: u32) -> i64 {
    encode(op, mode, value) as i64
}

/// Run a program and assert the final accumulator and condition code.
///
///              TestName  AC  ConditionCode  Program
///                  |      |        |        |
///                  v      v        v        v
/// accumulator!(sum_1, 42, ConditionCode::Zero, [ ... ]);
#[macro_export]
macro_rules! accumulator {
    ($name:ident, $ac:expr, $cc:expr, [$($word:expr),* $(,)?]) => {
        #[test]
        fn $name() {
            let machine = run_program(&[$($word),*]);
            assert_eq!(machine.cpu.ac.to_int(), $ac, "accumulator");
            assert_eq!(machine.cpu.psw.condition_code, $cc, "condition code");
        }
    };
}

/// Run a program and assert only the final condition code.
#[macro_export]
macro_rules! condition {
    ($name:ident, $cc:expr, [$($word:expr),* $(,)?]) => {
        #[test]
        fn $name() {
            let machine = run_program(&[$($word),*]);
            assert_eq!(machine.cpu.psw.condition_code, $cc, "condition code");
        }
    };
}

/// Run a program and assert the value left at a memory address.
#[macro_export]
macro_rules! memory_word {
    ($name:ident, [$address:expr, $expected:expr], [$($word:expr),* $(,)?]) => {
        #[test]
        fn $name() {
            let machine = run_program(&[$($word),*]);
            let actual = machine.peek($address).expect("address inside RAM");
            assert_eq!(actual.to_int(), $expected, "memory[{}]", $address);
        }
    };
}
