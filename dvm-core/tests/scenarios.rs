//! End-to-end scenarios driving the assembled machine through its public
//! surface: the loader text format, the run drivers, and the concurrent
//! DMA path.

use std::thread;
use std::time::Duration;

use dvm_core::constants::disk_geometry::SECTOR_SIZE;
use dvm_core::cpu::ConditionCode;
use dvm_core::disk::Disk;
use dvm_core::loader;
use dvm_core::log::Logger;
use dvm_core::machine::{Machine, RunOutcome};
use dvm_core::opcodes::Mode::{Direct, Immediate};
use dvm_core::opcodes::OpCode::*;
use dvm_core::opcodes::{encode, Mode, OpCode};
use dvm_core::word::Word;

fn machine() -> Machine {
    Machine::new(Disk::new(), None, Logger::disabled())
}

fn inst(op: OpCode, mode: Mode, value: u32) -> i64 {
    encode(op, mode, value) as i64
}

fn program_text(words: &[i64]) -> String {
    let mut text = String::from(".NombreProg scenario\n_start 300\n");
    for word in words {
        text.push_str(&format!("{}\n", word));
    }
    text.push_str("-9999999\n");
    text
}

#[test]
fn immediate_arithmetic_runs_to_completion_in_user_mode() {
    let mut machine = machine();
    let text = program_text(&[
        inst(LOAD, Immediate, 12),
        inst(SUM, Immediate, 30),
        inst(COMP, Immediate, 42),
    ]);
    loader::load_str(&mut machine.cpu, &text).expect("program loads");

    let outcome = machine.run(1_000);

    assert!(matches!(outcome, RunOutcome::Halted { .. }));
    assert_eq!(machine.cpu.ac.to_int(), 42);
    assert_eq!(machine.cpu.psw.condition_code, ConditionCode::Zero);
}

#[test]
fn dma_read_completes_concurrently_and_interrupts_once() {
    let mut machine = machine();
    machine.cpu.dma.latency = Duration::from_millis(20);

    // Sector (cylinder 2, track 3, sector 4) carries a known payload.
    let mut payload = [Word::ZERO; SECTOR_SIZE];
    for (index, word) in payload.iter_mut().enumerate() {
        *word = Word::from_int((index as i64 + 1) * 11);
    }
    machine
        .disk
        .lock()
        .unwrap()
        .write_sector(2, 3, 4, &payload);

    // Program the controller, enable interrupts, start the transfer and
    // spin. The I/O-complete vector entry points at the sentinel so the
    // dispatch itself ends the run.
    let text = program_text(&[
        inst(LOAD, Immediate, 310),
        inst(STORE, Direct, 4),
        inst(SDMAM, Direct, 400),
        inst(SDMAC, Direct, 2),
        inst(SDMAP, Direct, 3),
        inst(SDMAS, Direct, 4),
        inst(SDMAIO, Direct, 0),
        inst(HAB, Direct, 0),
        inst(SDMAON, Direct, 0),
        inst(J, Direct, 309),
    ]);
    loader::load_str(&mut machine.cpu, &text).expect("program loads");

    // Step in kernel mode; the worker needs wall-clock time, not cycles.
    for _ in 0..5_000 {
        machine.step();
        if machine.cpu.halted {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    assert!(machine.cpu.halted, "the completion interrupt never arrived");

    // The sector payload landed at the programmed address, atomically.
    for (index, word) in payload.iter().enumerate() {
        assert_eq!(machine.peek(400 + index).unwrap(), *word);
    }
    // Exactly one dispatch: the latch is consumed, one context frame was
    // pushed, and its saved pc is the spin loop.
    assert!(!machine.cpu.dma.take_interrupt());
    assert!(!machine.cpu.dma.is_busy());
    assert!(!machine.cpu.dma.status_is_error());
    assert_eq!(machine.cpu.sp, 1995);
    assert_eq!(machine.peek(1998).unwrap().to_int(), 309);
}

#[test]
fn dma_write_persists_through_shutdown() {
    let path = std::env::temp_dir().join(format!("dvm-scenario-disk-{}", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let mut machine = Machine::new(Disk::new(), Some(path.clone()), Logger::disabled());
    machine.cpu.dma.latency = Duration::from_millis(5);

    // Place two words in RAM, then push the sector containing them out to
    // cylinder 1, track 1, sector 1.
    let text = program_text(&[
        inst(LOAD, Immediate, 1234),
        inst(STORE, Direct, 500),
        inst(LOAD, Immediate, 5678),
        inst(STORE, Direct, 501),
        inst(SDMAM, Direct, 500),
        inst(SDMAC, Direct, 1),
        inst(SDMAP, Direct, 1),
        inst(SDMAS, Direct, 1),
        inst(SDMAIO, Direct, 1),
        inst(SDMAON, Direct, 0),
    ]);
    loader::load_str(&mut machine.cpu, &text).expect("program loads");
    for _ in 0..20 {
        machine.step();
        if machine.cpu.halted {
            break;
        }
    }
    assert!(machine.cpu.halted);

    // Shutdown joins the in-flight worker before persisting.
    machine.shutdown().expect("disk image persists");

    let reloaded = Disk::load(&path).expect("image reloads");
    let _ = std::fs::remove_file(&path);
    let sector = reloaded.read_sector(1, 1, 1).expect("valid geometry");
    assert_eq!(sector[0].to_int(), 1234);
    assert_eq!(sector[1].to_int(), 5678);
}

#[test]
fn user_mode_store_cannot_escape_its_window() {
    let mut machine = machine();
    // The program stores through a direct address that relocates past RL
    // once the window is narrowed.
    let text = program_text(&[
        inst(LOAD, Immediate, 7),
        inst(STORE, Direct, 1900),
    ]);
    loader::load_str(&mut machine.cpu, &text).expect("program loads");
    machine.cpu.rl = 400;

    let outcome = machine.run(1_000);

    assert!(matches!(outcome, RunOutcome::Halted { .. }));
    // 1900 + RB overflows the limit; nothing was written anywhere, and the
    // handler restored the accumulator on the way out.
    assert_eq!(machine.peek(1900).unwrap(), Word::ZERO);
    assert_eq!(machine.cpu.ac.to_int(), 7);
}
