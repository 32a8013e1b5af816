use crate::cpu::{Cpu, ExecutionMode, Resolution};
use crate::interrupt::Interrupt;
use crate::word::Word;

/// Which register a special-register transfer names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpecialRegister {
    Rx,
    Rb,
    Rl,
    Sp,
}

/// LOAD: AC := IR.value under immediate mode, otherwise the word at the
/// effective address.
pub(crate) fn load(cpu: &mut Cpu) {
    match cpu.effective_address() {
        Resolution::Address(address) => cpu.ac = cpu.read_word(address),
        Resolution::NoAddress => cpu.ac = Word::from_int(cpu.ir.value as i64),
        Resolution::Fault => {}
    }
}

/// STORE writes AC to the effective address. Immediate addressing has no
/// destination and is an invalid instruction.
pub(crate) fn store(cpu: &mut Cpu) {
    match cpu.effective_address() {
        Resolution::Address(address) => {
            let value = cpu.ac;
            cpu.write_word(address, value);
        }
        Resolution::NoAddress => cpu.raise(Interrupt::InvalidInstruction),
        Resolution::Fault => {}
    }
}

/// LOADRX / LOADRB / LOADRL / LOADSP copy the named register into AC.
pub(crate) fn load_register(cpu: &mut Cpu, register: SpecialRegister) {
    let value = match register {
        SpecialRegister::Rx => cpu.rx,
        SpecialRegister::Rb => cpu.rb,
        SpecialRegister::Rl => cpu.rl,
        SpecialRegister::Sp => cpu.sp,
    };
    cpu.ac = Word::from_int(value);
}

/// STRRX / STRRB / STRRL / STRSP copy AC into the named register.
///
/// Writing RB or RL redefines the user's own reach, so those two are
/// privileged: a user-mode attempt raises invalid-instruction. The stack
/// registers stay writable in any mode.
pub(crate) fn store_register(cpu: &mut Cpu, register: SpecialRegister) {
    let privileged = matches!(register, SpecialRegister::Rb | SpecialRegister::Rl);
    if privileged && cpu.psw.mode == ExecutionMode::User {
        cpu.raise(Interrupt::InvalidInstruction);
        return;
    }
    let value = cpu.ac.to_int();
    match register {
        SpecialRegister::Rx => cpu.rx = value,
        SpecialRegister::Rb => cpu.rb = value,
        SpecialRegister::Rl => cpu.rl = value,
        SpecialRegister::Sp => cpu.sp = value,
    }
}
