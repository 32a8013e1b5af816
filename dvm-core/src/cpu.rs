use crate::constants::memory_layout::{DEFAULT_HANDLER, MEM_SIZE, VECTOR_SIZE};
use crate::dma::DmaController;
use crate::interrupt::Interrupt;
use crate::log::Logger;
use crate::memory::SharedMemory;
use crate::opcodes::{self, DecodedInstruction, Mode, OpCode};
use crate::word::Word;

pub mod opcodes_arithmetic;
pub mod opcodes_dma;
pub mod opcodes_jump;
pub mod opcodes_system;
pub mod opcodes_transfer;

// test_helpers must stay declared before test: the assertion macros it
// exports are resolved textually.
#[cfg(test)]
mod test_helpers;


/// Two-bit summary of the most recent accumulator update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionCode {
    Zero = 0,
    Negative = 1,
    Positive = 2,
    Overflow = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    User = 0,
    Kernel = 1,
}

/// Program status word: condition code, execution mode, interrupt enable,
/// and the program counter.
#[derive(Debug, Clone, Copy)]
pub struct Psw {
    pub condition_code: ConditionCode,
    pub mode: ExecutionMode,
    pub interrupt_enable: bool,
    pub pc: i64,
}

impl Psw {
    /// cc·100 + mode·10 + ie: the layout used when the flags are saved on
    /// the stack during interrupt entry. The pc travels in its own word.
    pub fn packed_flags(&self) -> i64 {
        self.condition_code as i64 * 100
            + self.mode as i64 * 10
            + self.interrupt_enable as i64
    }

    pub fn unpack_flags(&mut self, flags: i64) {
        self.condition_code = match (flags / 100) % 10 {
            1 => ConditionCode::Negative,
            2 => ConditionCode::Positive,
            3 => ConditionCode::Overflow,
            _ => ConditionCode::Zero,
        };
        self.mode = if (flags / 10) % 10 == 1 {
            ExecutionMode::Kernel
        } else {
            ExecutionMode::User
        };
        self.interrupt_enable = flags % 10 == 1;
    }
}

/// Outcome of resolving the current instruction's operand field.
pub(crate) enum Resolution {
    /// A physical memory address, validated for the current mode.
    Address(usize),
    /// Immediate mode: the operand is IR.value itself, there is no address.
    NoAddress,
    /// Resolution faulted; the interrupt has already been raised.
    Fault,
}

/// The register file plus the machinery of the fetch-decode-execute cycle.
///
/// RB/RL/RX/SP are wide signed integers rather than addresses because the
/// special-register transfer opcodes can write any accumulator value into
/// them; every dereference validates first.
pub struct Cpu {
    /// Shared RAM handle; every access goes through the bus arbiter.
    pub memory: SharedMemory,
    pub dma: DmaController,
    pub logger: Logger,
    /// Accumulator, the sole general-purpose register.
    pub ac: Word,
    /// Decoded fields of the current instruction.
    pub ir: DecodedInstruction,
    /// Base and limit registers bounding user-mode accesses.
    pub rb: i64,
    pub rl: i64,
    /// Stack base: a pop at or above it underflows.
    pub rx: i64,
    /// Stack pointer, addressing the current top-of-stack word.
    pub sp: i64,
    pub psw: Psw,
    pub halted: bool,
}

impl Cpu {
    pub fn new(memory: SharedMemory, dma: DmaController, logger: Logger) -> Cpu {
        Cpu {
            memory,
            dma,
            logger,
            ac: Word::ZERO,
            ir: DecodedInstruction::default(),
            rb: 0,
            rl: (MEM_SIZE - 1) as i64,
            rx: 0,
            sp: 0,
            psw: Psw {
                condition_code: ConditionCode::Zero,
                mode: ExecutionMode::Kernel,
                interrupt_enable: false,
                pc: 0,
            },
            halted: false,
        }
    }

    /// Establish the known post-reset state and install the interrupt
    /// vector.
    pub fn reset(&mut self) {
        self.sp = 0;
        self.rx = 0;
        self.rb = 0;
        self.rl = (MEM_SIZE - 1) as i64;
        self.ac = Word::ZERO;
        self.ir = DecodedInstruction::default();
        self.psw = Psw {
            condition_code: ConditionCode::Zero,
            mode: ExecutionMode::Kernel,
            interrupt_enable: false,
            pc: 0,
        };
        self.halted = false;
        self.install_vector();
        self.logger
            .event("cpu reset: pc 0, kernel mode, interrupts disabled");
    }

    /// Point every vector entry at the default handler and leave a RETURN
    /// there, so an unhandled interrupt comes straight back. Privileged
    /// software overwrites entries with STORE.
    fn install_vector(&mut self) {
        let mut memory = self.memory.lock().unwrap();
        let handler = Word::from_int(DEFAULT_HANDLER as i64);
        for entry in 0..VECTOR_SIZE {
            memory.write(entry, handler);
        }
        memory.write(
            DEFAULT_HANDLER,
            Word::from_int(opcodes::encode(OpCode::RETURN, Mode::Direct, 0) as i64),
        );
    }

    /// One fetch-decode-execute cycle. A pending DMA completion is
    /// dispatched first; the instruction itself runs only when no
    /// interrupt was taken.
    pub fn cycle(&mut self) {
        if self.halted {
            return;
        }
        // The completion line is edge-triggered and reading clears it, so
        // it is only read once interrupts are enabled; a masked completion
        // stays latched for a later cycle.
        if self.psw.interrupt_enable && self.dma.take_interrupt() {
            self.raise(Interrupt::IoDone);
            return;
        }

        let pc = self.psw.pc;
        if pc < 0 || pc >= MEM_SIZE as i64 {
            // The pc itself is untrustworthy here, so no interrupt: a
            // handler dispatched from this state could not be trusted
            // either.
            self.logger
                .event(&format!("fatal: pc {} outside memory, halting", pc));
            self.halted = true;
            return;
        }

        let instruction = self.read_word(pc as usize);
        if instruction.is_sentinel() {
            self.logger.event(&format!("end of program at pc {}", pc));
            self.halted = true;
            return;
        }

        self.psw.pc += 1;
        self.ir = opcodes::decode(instruction);

        let opcode = match OpCode::from_code(self.ir.opcode) {
            Some(opcode) => opcode,
            None => {
                self.raise(Interrupt::InvalidInstruction);
                return;
            }
        };
        self.logger.instruction(pc, opcode.mnemonic(), self.ir.value);
        self.execute(opcode);
    }

    /// Opcode dispatch: one closed match over the instruction set.
    fn execute(&mut self, opcode: OpCode) {
        use self::opcodes_dma::DmaRegister;
        use self::opcodes_transfer::SpecialRegister;

        match opcode {
            OpCode::SUM | OpCode::SUB | OpCode::MUL | OpCode::DIV => {
                opcodes_arithmetic::arithmetic(self, opcode)
            }
            OpCode::COMP => opcodes_arithmetic::comp(self),

            OpCode::LOAD => opcodes_transfer::load(self),
            OpCode::STORE => opcodes_transfer::store(self),
            OpCode::LOADRX => opcodes_transfer::load_register(self, SpecialRegister::Rx),
            OpCode::STRRX => opcodes_transfer::store_register(self, SpecialRegister::Rx),
            OpCode::LOADRB => opcodes_transfer::load_register(self, SpecialRegister::Rb),
            OpCode::STRRB => opcodes_transfer::store_register(self, SpecialRegister::Rb),
            OpCode::LOADRL => opcodes_transfer::load_register(self, SpecialRegister::Rl),
            OpCode::STRRL => opcodes_transfer::store_register(self, SpecialRegister::Rl),
            OpCode::LOADSP => opcodes_transfer::load_register(self, SpecialRegister::Sp),
            OpCode::STRSP => opcodes_transfer::store_register(self, SpecialRegister::Sp),

            OpCode::J => opcodes_jump::j(self),
            OpCode::JMPE => opcodes_jump::jmpe(self),
            OpCode::JMPNE => opcodes_jump::jmpne(self),
            OpCode::JMPLT => opcodes_jump::jmplt(self),
            OpCode::JMPLGT => opcodes_jump::jmplgt(self),

            OpCode::SVC => opcodes_system::svc(self),
            OpCode::RETURN => opcodes_system::retrn(self),
            OpCode::HAB => opcodes_system::hab(self),
            OpCode::DHAB => opcodes_system::dhab(self),
            OpCode::TTI => opcodes_system::tti(self),
            OpCode::CHMOD => opcodes_system::chmod(self),
            OpCode::PSH => opcodes_system::psh(self),
            OpCode::POP => opcodes_system::pop(self),

            OpCode::SDMAP => opcodes_dma::set_register(self, DmaRegister::Track),
            OpCode::SDMAC => opcodes_dma::set_register(self, DmaRegister::Cylinder),
            OpCode::SDMAS => opcodes_dma::set_register(self, DmaRegister::Sector),
            OpCode::SDMAIO => opcodes_dma::set_register(self, DmaRegister::Direction),
            OpCode::SDMAM => opcodes_dma::set_register(self, DmaRegister::MemoryAddress),
            OpCode::SDMAON => opcodes_dma::start(self),
        }
    }

    /// Arbiter-guarded single-word read. The address has already been
    /// validated by the caller.
    fn read_word(&self, address: usize) -> Word {
        self.memory.lock().unwrap().read(address)
    }

    fn write_word(&mut self, address: usize, value: Word) {
        self.memory.lock().unwrap().write(address, value)
    }

    /// Resolve the current instruction's operand field into an address.
    ///
    /// Direct takes IR.value as the address; indexed adds the accumulator
    /// interpreted as a signed integer. In user mode the base register is
    /// added and the result must stay within [RB, RL]; in any mode the
    /// final address must lie inside RAM.
    pub(crate) fn effective_address(&mut self) -> Resolution {
        let mode = match Mode::from_digit(self.ir.mode) {
            Some(mode) => mode,
            None => {
                self.raise(Interrupt::InvalidInstruction);
                return Resolution::Fault;
            }
        };
        let mut address = match mode {
            Mode::Direct => self.ir.value as i64,
            Mode::Indexed => self.ac.to_int() + self.ir.value as i64,
            Mode::Immediate => return Resolution::NoAddress,
        };
        if self.psw.mode == ExecutionMode::User {
            address += self.rb;
            if address < self.rb || address > self.rl {
                self.raise(Interrupt::InvalidAddress);
                return Resolution::Fault;
            }
        }
        if address < 0 || address >= MEM_SIZE as i64 {
            self.raise(Interrupt::InvalidAddress);
            return Resolution::Fault;
        }
        Resolution::Address(address as usize)
    }

    /// The operand as a value: IR.value under immediate mode, otherwise
    /// the word at the effective address. None means a fault was raised
    /// and the opcode must abort.
    pub(crate) fn operand_value(&mut self) -> Option<i64> {
        match self.effective_address() {
            Resolution::Address(address) => Some(self.read_word(address).to_int()),
            Resolution::NoAddress => Some(self.ir.value as i64),
            Resolution::Fault => None,
        }
    }

    /// Update the condition code from the accumulator: zero, negative or
    /// positive. The overflow code is only ever set by arithmetic.
    pub(crate) fn update_condition_code(&mut self) {
        let value = self.ac.to_int();
        self.psw.condition_code = if value == 0 {
            ConditionCode::Zero
        } else if value < 0 {
            ConditionCode::Negative
        } else {
            ConditionCode::Positive
        };
    }

    /// Pre-decrement SP and store at the new top. Returns false, with SP
    /// untouched, when the push would leave RAM; the caller decides which
    /// interrupt (if any) that is.
    pub(crate) fn try_push(&mut self, value: Word) -> bool {
        let new_sp = self.sp - 1;
        if new_sp < 0 || new_sp >= MEM_SIZE as i64 {
            return false;
        }
        self.sp = new_sp;
        self.write_word(new_sp as usize, value);
        true
    }

    /// Read the top word then post-increment SP. An empty stack (SP at or
    /// above the stack base RX) underflows, a pointer outside RAM is an
    /// invalid address; both fault with SP untouched.
    pub(crate) fn try_pop(&mut self) -> Option<Word> {
        if self.sp >= self.rx {
            self.raise(Interrupt::StackUnderflow);
            return None;
        }
        if self.sp < 0 || self.sp >= MEM_SIZE as i64 {
            self.raise(Interrupt::InvalidAddress);
            return None;
        }
        let value = self.read_word(self.sp as usize);
        self.sp += 1;
        Some(value)
    }

    /// Generate an interrupt: record it, save context, mask interrupts and
    /// vector to the handler.
    pub(crate) fn raise(&mut self, interrupt: Interrupt) {
        self.logger
            .interrupt(interrupt.vector_index(), interrupt.description());
        self.enter_interrupt(interrupt);
    }

    /// The context-save protocol. The pre-entry flags are captured first,
    /// then the machine switches to kernel with interrupts masked, pushes
    /// pc, packed flags, AC and RX, and loads the handler address from the
    /// vector entry. RETURN inverts this exactly.
    fn enter_interrupt(&mut self, interrupt: Interrupt) {
        let saved_flags = self.psw.packed_flags();
        self.psw.mode = ExecutionMode::Kernel;
        self.psw.interrupt_enable = false;

        let frame = [
            Word::from_int(self.psw.pc),
            Word::from_int(saved_flags),
            self.ac,
            Word::from_int(self.rx),
        ];
        for word in frame {
            if !self.try_push(word) {
                // The context cannot be saved, so a handler would run on a
                // corrupt stack. Stop the machine instead of recursing.
                self.logger
                    .event("fatal: interrupt context save failed, halting");
                self.halted = true;
                return;
            }
        }

        let handler = self.read_word(interrupt.vector_index()).to_int();
        if handler < 0 || handler >= MEM_SIZE as i64 {
            self.logger
                .event("fatal: interrupt vector points outside memory, halting");
            self.halted = true;
            return;
        }
        self.psw.pc = handler;
    }
}
