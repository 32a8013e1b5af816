use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Local;
use colored::*;

/// Log sink shared by the CPU and the DMA worker. Cloning hands out
/// another handle to the same file. Write failures are swallowed: a broken
/// sink must never disturb the machine.
#[derive(Clone, Default)]
pub struct Logger {
    file: Option<Arc<Mutex<File>>>,
}

impl Logger {
    /// A logger that drops everything. Used by tests.
    pub fn disabled() -> Logger {
        Logger { file: None }
    }

    pub fn to_file(path: &Path) -> std::io::Result<Logger> {
        let file = File::create(path)?;
        Ok(Logger {
            file: Some(Arc::new(Mutex::new(file))),
        })
    }

    /// Untyped event line.
    pub fn event(&self, text: &str) {
        self.write_line(text);
    }

    /// Interrupt record. Echoed to the console as well, so a user at the
    /// shell sees the code without tailing the log file.
    pub fn interrupt(&self, code: usize, description: &str) {
        self.write_line(&format!("interrupt {}: {}", code, description));
        println!(
            "{}",
            format!("!!! interrupt {}: {} !!!", code, description).bright_red()
        );
    }

    /// Per-instruction trace line.
    pub fn instruction(&self, pc: i64, mnemonic: &str, operand: u32) {
        self.write_line(&format!("[pc {:05}] {} {:05}", pc, mnemonic, operand));
    }

    fn write_line(&self, text: &str) {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(file, "[{}] {}", Local::now().format("%H:%M:%S"), text);
            }
        }
    }
}
