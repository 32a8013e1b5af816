use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use colored::*;

use dvm_core::disk::Disk;
use dvm_core::log::Logger;
use dvm_core::machine::{Machine, RunOutcome, DEFAULT_CYCLE_LIMIT};

/// Interactive shell for the decimal sign-magnitude machine.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Program file to load before the prompt appears
    program: Option<PathBuf>,

    /// Disk image path, created on first use
    #[arg(long, default_value = "disk.img")]
    disk: PathBuf,

    /// Log file path
    #[arg(long, default_value = "machine.log")]
    log: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let logger = match Logger::to_file(&cli.log) {
        Ok(logger) => logger,
        Err(error) => {
            eprintln!("could not open log file {}: {}", cli.log.display(), error);
            Logger::disabled()
        }
    };
    let disk = match Disk::load(&cli.disk) {
        Ok(disk) => disk,
        Err(error) => {
            eprintln!(
                "could not read disk image {}: {} (starting with a blank disk)",
                cli.disk.display(),
                error
            );
            Disk::new()
        }
    };
    let mut machine = Machine::new(disk, Some(cli.disk.clone()), logger);

    if let Some(program) = &cli.program {
        load_command(&mut machine, &program.display().to_string());
    }

    println!("{}", "=== decimal virtual machine ===".cyan());
    print_help();

    let stdin = io::stdin();
    loop {
        print!("\nshell> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim();
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "exit" => break,
            "help" => print_help(),
            "load" => {
                if argument.is_empty() {
                    println!("{}", "usage: load <path>".yellow());
                } else {
                    load_command(&mut machine, argument);
                }
            }
            "run" => run_command(&mut machine),
            "debug" => debug_command(&mut machine, &stdin),
            "registers" => print_registers(&machine),
            "memory" => memory_command(&machine, argument),
            _ => println!("{}", "unknown command, try help".yellow()),
        }
    }

    if let Err(error) = machine.shutdown() {
        eprintln!("could not persist the disk image: {}", error);
    }
}

fn print_help() {
    println!("\n{}", "--- commands ---".dimmed());
    println!(" load <path>    load a program into memory");
    println!(" run            execute until the program ends");
    println!(" debug          single-step, one cycle per line ('q' to leave)");
    println!(" registers      show the register file");
    println!(" memory <addr>  show the word at a memory address");
    println!(" help           this text");
    println!(" exit           persist the disk and quit");
}

fn load_command(machine: &mut Machine, path: &str) {
    match machine.load_program(std::path::Path::new(path)) {
        Ok(summary) => {
            let name = summary.program_name.as_deref().unwrap_or(path);
            println!(
                "{}",
                format!(
                    "loaded {}: {} words at {}",
                    name, summary.words_loaded, summary.entry_point
                )
                .green()
            );
        }
        Err(error) => println!("{}", format!("load failed: {}", error).red()),
    }
}

fn run_command(machine: &mut Machine) {
    if machine.cpu.halted {
        println!("{}", "nothing to run: the cpu is halted (load a program)".yellow());
        return;
    }
    println!("{}", "running...".dimmed());
    match machine.run(DEFAULT_CYCLE_LIMIT) {
        RunOutcome::Halted { cycles } => {
            println!("{}", format!("halted after {} cycles", cycles).green());
        }
        RunOutcome::CycleLimit => {
            println!(
                "{}",
                format!("stopped: cycle limit of {} reached", DEFAULT_CYCLE_LIMIT).yellow()
            );
        }
    }
    print_registers(machine);
}

fn debug_command(machine: &mut Machine, stdin: &io::Stdin) {
    println!("{}", "*** debugger: ENTER steps one cycle, 'q' leaves ***".cyan());
    loop {
        print!("[pc {:05}] > ", machine.cpu.psw.pc);
        let _ = io::stdout().flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        if line.trim() == "q" {
            break;
        }

        machine.step();
        print_registers(machine);
        if machine.cpu.halted {
            println!("{}", "cpu halted".yellow());
            break;
        }
    }
}

fn print_registers(machine: &Machine) {
    let cpu = &machine.cpu;
    println!("\n{}", "[cpu registers]".cyan());
    println!(" AC:  {}", cpu.ac.to_string().bright_white());
    println!(" PC:  {:05}", cpu.psw.pc);
    println!(" SP:  {:05}   RX: {:05}", cpu.sp, cpu.rx);
    println!(" RB:  {:05}   RL: {:05}", cpu.rb, cpu.rl);
    println!(
        " PSW: cc={:?} mode={:?} interrupts={}",
        cpu.psw.condition_code,
        cpu.psw.mode,
        if cpu.psw.interrupt_enable { "on" } else { "off" }
    );
    println!(
        " IR:  op={:02} mode={} value={:05}",
        cpu.ir.opcode, cpu.ir.mode, cpu.ir.value
    );
    println!(
        " DMA: {} status={}",
        if cpu.dma.is_busy() { "busy" } else { "idle" },
        if cpu.dma.status_is_error() { "error" } else { "ok" }
    );
}

fn memory_command(machine: &Machine, argument: &str) {
    let address: usize = match argument.parse() {
        Ok(address) => address,
        Err(_) => {
            println!("{}", "usage: memory <address>".yellow());
            return;
        }
    };
    match machine.peek(address) {
        Some(word) => println!(" mem[{}] = {}", address, word),
        None => println!("{}", "address outside RAM (0..1999)".red()),
    }
}
