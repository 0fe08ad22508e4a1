use std::env;
use std::path::Path;
use std::process::ExitCode;

use brilspec_driver::{BrilspecError, Options, speculate_files};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: brilspec <trace.json> <program.json>";

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
    let args: Vec<String> = env::args().skip(1).collect();
    if matches!(args.first().map(String::as_str), Some("-h" | "--help")) {
        println!("{USAGE}");
        return Ok(());
    }
    let [trace, program] = args.as_slice() else {
        return Err(BrilspecError::Usage(format!(
            "expected 2 arguments, found {}",
            args.len()
        )));
    };
    let options = Options::from_env()?;
    let output = speculate_files(Path::new(trace), Path::new(program), &options)?;
    println!("{output}");
    Ok(())
}
