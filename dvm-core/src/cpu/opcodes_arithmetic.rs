use crate::cpu::{ConditionCode, Cpu};
use crate::interrupt::Interrupt;
use crate::opcodes::OpCode;
use crate::word::{Word, MAX_MAGNITUDE};

/// SUM / SUB / MUL / DIV.
///
/// The result is computed in a wide signed integer and re-encoded to
/// sign-magnitude afterwards; the host's two's-complement behaviour never
/// leaks into a word. A divisor of zero raises invalid-instruction and
/// leaves AC alone. A magnitude above seven digits sets cc = overflow,
/// raises the overflow interrupt and truncates modulo 10 000 000 with the
/// sign preserved; cc stays at overflow for the rest of the cycle.
pub(crate) fn arithmetic(cpu: &mut Cpu, opcode: OpCode) {
    let operand = match cpu.operand_value() {
        Some(operand) => operand,
        None => return,
    };
    let ac = cpu.ac.to_int();
    let result = match opcode {
        OpCode::SUM => ac + operand,
        OpCode::SUB => ac - operand,
        OpCode::MUL => ac * operand,
        OpCode::DIV => {
            if operand == 0 {
                cpu.raise(Interrupt::InvalidInstruction);
                return;
            }
            ac / operand
        }
        _ => unreachable!("non-arithmetic opcode dispatched as arithmetic"),
    };

    if result.abs() > MAX_MAGNITUDE {
        cpu.psw.condition_code = ConditionCode::Overflow;
        cpu.raise(Interrupt::Overflow);
        cpu.ac = Word::from_int(result % 10_000_000);
        return;
    }
    cpu.ac = Word::from_int(result);
    cpu.update_condition_code();
}

/// COMP sets the condition code from AC against the operand; AC itself is
/// not modified.
pub(crate) fn comp(cpu: &mut Cpu) {
    let operand = match cpu.operand_value() {
        Some(operand) => operand,
        None => return,
    };
    let ac = cpu.ac.to_int();
    cpu.psw.condition_code = if ac == operand {
        ConditionCode::Zero
    } else if ac < operand {
        ConditionCode::Negative
    } else {
        ConditionCode::Positive
    };
}
