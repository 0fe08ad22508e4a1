//! Reads a program on stdin and prints its first call cycle, or `-`.

use std::env;
use std::io;
use std::process::ExitCode;

use brilspec_driver::{BrilspecError, find_cycle};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: call-cycles < program.json";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(BrilspecError::Usage(msg)) => {
            eprintln!("{msg}");
            eprintln!("{USAGE}");
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), BrilspecError> {
    let extra = env::args().skip(1).count();
    if extra != 0 {
        return Err(BrilspecError::Usage(format!(
            "expected no arguments, found {extra}"
        )));
    }
    let cycle = find_cycle(io::stdin().lock())?;
    println!("{cycle}");
    Ok(())
}
