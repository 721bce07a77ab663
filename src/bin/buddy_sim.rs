//! Interactive buddy allocator simulator.
//!
//! Reads commands from stdin (see [`buddy_fit_sim::command`]) until `exit`
//! or end of input. Set `RUST_LOG=debug` to trace splits and merges.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use buddy_fit_sim::buddy::StatsReporter;
use buddy_fit_sim::{render_map, Command, Memory};
use log::{error, info};

const BANNER: &str =
    "Memory allocation simulator (commands: init, alloc, freeid, freeaddr, show, stats, exit)";

enum Flow {
    Continue,
    Exit,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut memory: Option<Memory> = None;

    println!("{}", BANNER);
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        stdout.flush().context("failed to flush stdout")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read command")?;

        match Command::parse(&line) {
            Ok(Some(command)) => {
                if let Flow::Exit = execute(&mut memory, command) {
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => println!("Error: {}", err),
        }
    }

    info!("simulator exiting");
    Ok(())
}

fn execute(memory: &mut Option<Memory>, command: Command) -> Flow {
    match command {
        Command::Exit => return Flow::Exit,
        Command::Init { capacity } => {
            match Memory::new(capacity) {
                Ok(created) => {
                    println!(
                        "Memory initialized with {} bytes ({} after rounding).",
                        capacity,
                        created.capacity()
                    );
                    *memory = Some(created);
                }
                Err(err) => println!("Error: {}", err),
            }
            return Flow::Continue;
        }
        _ => {}
    }

    let Some(mem) = memory.as_mut() else {
        println!("Error: run `init <size>` first.");
        return Flow::Continue;
    };

    match command {
        Command::Alloc { size, strategy } => match mem.allocate(size, strategy) {
            Ok(id) => {
                if let Some(block) = mem.block(id) {
                    println!(
                        "Allocated: id={} @ {} +{}B (requested={}B) via {}",
                        id, block.start, block.size, size, strategy
                    );
                }
            }
            Err(err) => {
                error!("allocation of {} bytes via {} failed: {}", size, strategy, err);
                println!("Error: {}", err);
            }
        },
        Command::FreeId { id } => match mem.free_by_id(id) {
            Ok(_) => println!("Block id {} freed.", id),
            Err(err) => println!("Error: {}", err),
        },
        Command::FreeAddr { start } => match mem.free_by_address(start) {
            Ok(block) => match block.id() {
                Some(id) => println!("Block @ {} (id={}) freed.", start, id),
                None => println!("Block @ {} freed.", start),
            },
            Err(err) => println!("Error: {}", err),
        },
        Command::Show { width } => print!("{}", render_map(mem, width)),
        Command::Stats => {
            let stats = mem.stats();
            StatsReporter::log_report(&stats);
            println!("{}", stats);
        }
        Command::Init { .. } | Command::Exit => {}
    }
    Flow::Continue
}
