/// The nine interrupt codes the machine can raise. The numeric value is
/// both the code software sees and the index into the vector table held in
/// the first nine words of memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    InvalidSvc = 0,
    InvalidCode = 1,
    Svc = 2,
    Timer = 3,
    IoDone = 4,
    InvalidInstruction = 5,
    InvalidAddress = 6,
    StackUnderflow = 7,
    Overflow = 8,
}

impl Interrupt {
    /// Map a numeric code to its interrupt. Codes outside 0..=8 remap to
    /// `InvalidCode`; the remap target is itself in range, which bounds
    /// the recursion at a single level.
    pub fn from_code(code: i64) -> Interrupt {
        match code {
            0 => Interrupt::InvalidSvc,
            1 => Interrupt::InvalidCode,
            2 => Interrupt::Svc,
            3 => Interrupt::Timer,
            4 => Interrupt::IoDone,
            5 => Interrupt::InvalidInstruction,
            6 => Interrupt::InvalidAddress,
            7 => Interrupt::StackUnderflow,
            8 => Interrupt::Overflow,
            _ => Interrupt::InvalidCode,
        }
    }

    pub fn vector_index(self) -> usize {
        self as usize
    }

    pub fn description(self) -> &'static str {
        match self {
            Interrupt::InvalidSvc => "invalid supervisor call",
            Interrupt::InvalidCode => "invalid interrupt code",
            Interrupt::Svc => "supervisor call",
            Interrupt::Timer => "timer",
            Interrupt::IoDone => "I/O complete",
            Interrupt::InvalidInstruction => "invalid instruction",
            Interrupt::InvalidAddress => "address out of range",
            Interrupt::StackUnderflow => "stack underflow",
            Interrupt::Overflow => "arithmetic overflow",
        }
    }
}
