use crate::word::Word;

/// Addressing modes, encoded in the sixth decimal digit of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Direct = 0,
    Immediate = 1,
    Indexed = 2,
}

impl Mode {
    /// Mode digits outside the three defined modes decode to `None` and
    /// are treated as an invalid instruction at execute time.
    pub fn from_digit(digit: u32) -> Option<Mode> {
        match digit {
            0 => Some(Mode::Direct),
            1 => Some(Mode::Immediate),
            2 => Some(Mode::Indexed),
            _ => None,
        }
    }
}

/// The 34 operations of the machine, tagged with their decimal opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    // Arithmetic
    SUM = 0,
    SUB = 1,
    MUL = 2,
    DIV = 3,
    // Memory transfer
    LOAD = 4,
    STORE = 5,
    // Stack-base register transfer
    LOADRX = 6,
    STRRX = 7,
    // Compare and conditional jumps (against the stack top)
    COMP = 8,
    JMPE = 9,
    JMPNE = 10,
    JMPLT = 11,
    JMPLGT = 12,
    // System
    SVC = 13,
    RETURN = 14,
    HAB = 15,
    DHAB = 16,
    TTI = 17,
    CHMOD = 18,
    // Base / limit / stack-pointer transfer
    LOADRB = 19,
    STRRB = 20,
    LOADRL = 21,
    STRRL = 22,
    LOADSP = 23,
    STRSP = 24,
    // Stack
    PSH = 25,
    POP = 26,
    // Unconditional jump
    J = 27,
    // DMA programming
    SDMAP = 28,
    SDMAC = 29,
    SDMAS = 30,
    SDMAIO = 31,
    SDMAM = 32,
    SDMAON = 33,
}

impl OpCode {
    /// Any code outside the table is an invalid instruction.
    pub fn from_code(code: u32) -> Option<OpCode> {
        let opcode = match code {
            0 => OpCode::SUM,
            1 => OpCode::SUB,
            2 => OpCode::MUL,
            3 => OpCode::DIV,
            4 => OpCode::LOAD,
            5 => OpCode::STORE,
            6 => OpCode::LOADRX,
            7 => OpCode::STRRX,
            8 => OpCode::COMP,
            9 => OpCode::JMPE,
            10 => OpCode::JMPNE,
            11 => OpCode::JMPLT,
            12 => OpCode::JMPLGT,
            13 => OpCode::SVC,
            14 => OpCode::RETURN,
            15 => OpCode::HAB,
            16 => OpCode::DHAB,
            17 => OpCode::TTI,
            18 => OpCode::CHMOD,
            19 => OpCode::LOADRB,
            20 => OpCode::STRRB,
            21 => OpCode::LOADRL,
            22 => OpCode::STRRL,
            23 => OpCode::LOADSP,
            24 => OpCode::STRSP,
            25 => OpCode::PSH,
            26 => OpCode::POP,
            27 => OpCode::J,
            28 => OpCode::SDMAP,
            29 => OpCode::SDMAC,
            30 => OpCode::SDMAS,
            31 => OpCode::SDMAIO,
            32 => OpCode::SDMAM,
            33 => OpCode::SDMAON,
            _ => return None,
        };
        Some(opcode)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::SUM => "SUM",
            OpCode::SUB => "SUB",
            OpCode::MUL => "MUL",
            OpCode::DIV => "DIV",
            OpCode::LOAD => "LOAD",
            OpCode::STORE => "STORE",
            OpCode::LOADRX => "LOADRX",
            OpCode::STRRX => "STRRX",
            OpCode::COMP => "COMP",
            OpCode::JMPE => "JMPE",
            OpCode::JMPNE => "JMPNE",
            OpCode::JMPLT => "JMPLT",
            OpCode::JMPLGT => "JMPLGT",
            OpCode::SVC => "SVC",
            OpCode::RETURN => "RETURN",
            OpCode::HAB => "HAB",
            OpCode::DHAB => "DHAB",
            OpCode::TTI => "TTI",
            OpCode::CHMOD => "CHMOD",
            OpCode::LOADRB => "LOADRB",
            OpCode::STRRB => "STRRB",
            OpCode::LOADRL => "LOADRL",
            OpCode::STRRL => "STRRL",
            OpCode::LOADSP => "LOADSP",
            OpCode::STRSP => "STRSP",
            OpCode::PSH => "PSH",
            OpCode::POP => "POP",
            OpCode::J => "J",
            OpCode::SDMAP => "SDMAP",
            OpCode::SDMAC => "SDMAC",
            OpCode::SDMAS => "SDMAS",
            OpCode::SDMAIO => "SDMAIO",
            OpCode::SDMAM => "SDMAM",
            OpCode::SDMAON => "SDMAON",
        }
    }
}

/// The decoded fields of one instruction word. The opcode is kept raw so
/// an out-of-range code can still be inspected (and reported) after the
/// invalid-instruction interrupt fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub opcode: u32,
    pub mode: u32,
    pub value: u32,
}

/// Field extraction from one decimal word. The sign flag is ignored while
/// decoding; only the digits carry code.
pub fn decode(word: Word) -> DecodedInstruction {
    let digits = word.digits;
    DecodedInstruction {
        opcode: digits / 1_000_000,
        mode: (digits / 100_000) % 10,
        value: digits % 100_000,
    }
}

/// Build an instruction word from its fields. The inverse of [`decode`];
/// used by tests and demo programs.
pub fn encode(op: OpCode, mode: Mode, value: u32) -> u32 {
    debug_assert!(value < 100_000, "operand field holds five decimal digits");
    (op as u32) * 1_000_000 + (mode as u32) * 100_000 + value
}
