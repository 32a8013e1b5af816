use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::constants::memory_layout::{MEM_SIZE, USER_MEM_START};
use crate::cpu::Cpu;
use crate::word::Word;

/// Why a program failed to load. The machine is untouched whenever one of
/// these comes back: the text is parsed completely before a single word is
/// written to memory.
#[derive(Debug)]
pub enum LoadError {
    IoError(io::Error),
    Message(String),
}

impl From<io::Error> for LoadError {
    fn from(error: io::Error) -> Self {
        LoadError::IoError(error)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LoadError::IoError(error) => write!(f, "{}", error),
            LoadError::Message(message) => write!(f, "{}", message),
        }
    }
}

/// What a successful load did.
#[derive(Debug)]
pub struct LoadSummary {
    pub entry_point: i64,
    pub words_loaded: usize,
    pub program_name: Option<String>,
}

pub fn load_file(cpu: &mut Cpu, path: &Path) -> Result<LoadSummary, LoadError> {
    let text = fs::read_to_string(path)?;
    load_str(cpu, &text)
}

/// Parse program text and commit it to memory.
///
/// Line grammar: `_start <N>` sets the entry point (N must lie in user
/// space); `.NumeroPalabras` and `.NombreProg` are informational metadata;
/// other `.`-lines are section delimiters and `/`-lines are comments, both
/// skipped; every remaining non-empty line is one decimal word.
///
/// On success the program image is written at the entry point, RB/RL are
/// set to the user-space bounds, the stack is placed at RL (SP = RX = RL),
/// and the machine stays in kernel mode until a run begins.
pub fn load_str(cpu: &mut Cpu, text: &str) -> Result<LoadSummary, LoadError> {
    let mut entry_point: Option<i64> = None;
    let mut program_name: Option<String> = None;
    let mut words: Vec<Word> = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim_end();
        let line_number = index + 1;
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("_start") {
            let value: i64 = rest.trim().parse().map_err(|_| {
                LoadError::Message(format!("line {}: _start needs a decimal address", line_number))
            })?;
            if value < USER_MEM_START as i64 {
                return Err(LoadError::Message(format!(
                    "entry point {} lies in the reserved operating image",
                    value
                )));
            }
            entry_point = Some(value);
        } else if let Some(rest) = line.strip_prefix(".NumeroPalabras") {
            cpu.logger
                .event(&format!("program metadata: {} words declared", rest.trim()));
        } else if let Some(rest) = line.strip_prefix(".NombreProg") {
            let name = rest.trim().to_string();
            cpu.logger.event(&format!("program metadata: name {}", name));
            program_name = Some(name);
        } else if line.starts_with('.') || line.starts_with('/') {
            continue;
        } else {
            let value: i64 = line.trim().parse().map_err(|_| {
                LoadError::Message(format!(
                    "line {}: expected a decimal word, found {:?}",
                    line_number, line
                ))
            })?;
            if value.unsigned_abs() > 99_999_999 {
                return Err(LoadError::Message(format!(
                    "line {}: {} does not fit in eight decimal digits",
                    line_number, value
                )));
            }
            words.push(Word::from_int(value));
        }
    }

    let entry_point = entry_point.ok_or_else(|| {
        LoadError::Message("program has no _start directive".to_string())
    })?;
    if entry_point as usize + words.len() > MEM_SIZE {
        return Err(LoadError::Message(format!(
            "program of {} words does not fit at address {}",
            words.len(),
            entry_point
        )));
    }

    // Commit. The whole image goes in under one arbiter acquisition; no
    // transfer can be in flight during a load.
    {
        let mut memory = cpu.memory.lock().unwrap();
        for (offset, word) in words.iter().enumerate() {
            memory.write(entry_point as usize + offset, *word);
        }
    }
    cpu.psw.pc = entry_point;
    cpu.halted = false;
    cpu.rb = USER_MEM_START as i64;
    cpu.rl = (MEM_SIZE - 1) as i64;
    cpu.sp = cpu.rl;
    cpu.rx = cpu.rl;
    cpu.logger.event(&format!(
        "program loaded: {} words at {}",
        words.len(),
        entry_point
    ));

    Ok(LoadSummary {
        entry_point,
        words_loaded: words.len(),
        program_name,
    })
}
