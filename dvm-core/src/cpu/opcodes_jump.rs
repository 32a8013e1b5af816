use crate::constants::memory_layout::MEM_SIZE;
use crate::cpu::{Cpu, Resolution};
use crate::interrupt::Interrupt;

/// Shared body of the conditional jumps: compare AC against the word at
/// the top of the stack (peeked, not popped) and take the jump when the
/// predicate holds. A stack pointer outside RAM at peek time is an
/// invalid address.
fn branch(cpu: &mut Cpu, predicate: fn(i64, i64) -> bool) {
    let target = match cpu.effective_address() {
        Resolution::Address(address) => address,
        Resolution::NoAddress => {
            cpu.raise(Interrupt::InvalidInstruction);
            return;
        }
        Resolution::Fault => return,
    };
    if cpu.sp < 0 || cpu.sp >= MEM_SIZE as i64 {
        cpu.raise(Interrupt::InvalidAddress);
        return;
    }
    let top = cpu.read_word(cpu.sp as usize).to_int();
    if predicate(cpu.ac.to_int(), top) {
        cpu.psw.pc = target as i64;
    }
}

/// J: unconditional jump to the effective address.
pub(crate) fn j(cpu: &mut Cpu) {
    match cpu.effective_address() {
        Resolution::Address(address) => cpu.psw.pc = address as i64,
        Resolution::NoAddress => cpu.raise(Interrupt::InvalidInstruction),
        Resolution::Fault => {}
    }
}

/// Jump when AC equals the stack top.
pub(crate) fn jmpe(cpu: &mut Cpu) {
    branch(cpu, |ac, top| ac == top);
}

/// Jump when AC differs from the stack top.
pub(crate) fn jmpne(cpu: &mut Cpu) {
    branch(cpu, |ac, top| ac != top);
}

/// Jump when AC is less than the stack top.
pub(crate) fn jmplt(cpu: &mut Cpu) {
    branch(cpu, |ac, top| ac < top);
}

/// Jump when AC is greater than the stack top.
pub(crate) fn jmplgt(cpu: &mut Cpu) {
    branch(cpu, |ac, top| ac > top);
}
