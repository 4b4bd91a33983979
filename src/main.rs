//! Stream Ledger CLI
//!
//! Replays a CSV command log (`type,time,receiver,sender,amount,flow_rate,cancellable`)
//! against an in-memory stream ledger, then prints every remaining stream as
//! CSV sorted by receiver and sender.
//!
//! Commands run in file order at the block time given in their row. A row
//! that fails to parse, names an unknown command, goes back in time, or is
//! rejected by the engine is logged at `warn` with its row number and
//! skipped; replay continues with the next row. After the last row the
//! pool-balance invariant is checked and logged (`warn` if broken).
//!
//! # Usage
//!
//! ```bash
//! cargo run -- commands.csv > streams.csv
//! RUST_LOG=warn cargo run -- commands.csv
//! ```
//!
//! A missing argument or unreadable file exits with status 1 and an error
//! on stderr.

use stream_ledger::{EngineError, Result, StreamEngine};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(EngineError::MissingArgument);
    }

    let input_path = &args[1];
    let file = File::open(input_path)?;
    let reader = BufReader::new(file);

    let mut engine = StreamEngine::new();
    engine.process_csv(reader)?;

    let stdout = io::stdout();
    let handle = stdout.lock();
    engine.write_output(handle)?;

    Ok(())
}
