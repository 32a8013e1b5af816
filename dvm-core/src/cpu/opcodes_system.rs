use crate::cpu::{Cpu, ExecutionMode};
use crate::interrupt::Interrupt;

/// SVC traps into the supervisor-call interrupt.
pub(crate) fn svc(cpu: &mut Cpu) {
    cpu.raise(Interrupt::Svc);
}

/// RETURN undoes the interrupt save protocol: pop RX, AC, the packed
/// flags, and finally the pc, in exactly the reverse of the push order.
pub(crate) fn retrn(cpu: &mut Cpu) {
    let rx = match cpu.try_pop() {
        Some(word) => word,
        None => return,
    };
    let ac = match cpu.try_pop() {
        Some(word) => word,
        None => return,
    };
    let flags = match cpu.try_pop() {
        Some(word) => word,
        None => return,
    };
    let pc = match cpu.try_pop() {
        Some(word) => word,
        None => return,
    };
    cpu.rx = rx.to_int();
    cpu.ac = ac;
    cpu.psw.unpack_flags(flags.to_int());
    cpu.psw.pc = pc.to_int();
}

/// HAB enables interrupt delivery.
pub(crate) fn hab(cpu: &mut Cpu) {
    cpu.psw.interrupt_enable = true;
}

/// DHAB masks interrupt delivery.
pub(crate) fn dhab(cpu: &mut Cpu) {
    cpu.psw.interrupt_enable = false;
}

/// TTI is reserved for the timer facility: accepted and recorded, no
/// further effect.
pub(crate) fn tti(cpu: &mut Cpu) {
    cpu.logger.event("tti accepted, timer facility not fitted");
}

/// CHMOD is privileged: in kernel mode it drops to user mode; a user-mode
/// attempt raises invalid-instruction.
pub(crate) fn chmod(cpu: &mut Cpu) {
    match cpu.psw.mode {
        ExecutionMode::Kernel => cpu.psw.mode = ExecutionMode::User,
        ExecutionMode::User => cpu.raise(Interrupt::InvalidInstruction),
    }
}

/// PSH pre-decrements SP and stores AC at the new top.
pub(crate) fn psh(cpu: &mut Cpu) {
    let value = cpu.ac;
    if !cpu.try_push(value) {
        cpu.raise(Interrupt::InvalidAddress);
    }
}

/// POP loads AC from the stack top then post-increments SP. An empty
/// stack underflows without touching AC or SP.
pub(crate) fn pop(cpu: &mut Cpu) {
    if let Some(value) = cpu.try_pop() {
        cpu.ac = value;
    }
}
