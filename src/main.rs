use std::process::ExitCode;

use clap::Parser;

use taskflow::cli::{run, Cli, Dispatch};
use taskflow::errors::exit_code;
use taskflow::telemetry::init_telemetry;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_telemetry(cli.verbose) {
        eprintln!("❌ Failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(Dispatch::Completed(_)) => ExitCode::SUCCESS,
        Ok(Dispatch::Unsupported(method)) => {
            println!("unsupported operation: {method}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::from(exit_code(&e))
        }
    }
}
