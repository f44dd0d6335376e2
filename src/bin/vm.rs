//! runs a compiled program, reading `READ` input from stdin and writing
//! `WRITE` output to stdout.
//!
//! run with `--help` for more info.

use std::io::Read;
use std::process::ExitCode;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// compiled program to run (one instruction per line)
    program: String,
    /// echo each executed instruction to stderr
    #[arg(long, default_value_t = false)]
    trace: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.trace {
        tracing_subscriber::EnvFilter::new("trace")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let program = match std::fs::read_to_string(&args.program) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("{}: {err}", args.program);
            return ExitCode::FAILURE;
        }
    };

    let mut input = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut input) {
        eprintln!("stdin: {err}");
        return ExitCode::FAILURE;
    }

    let mut stdout = std::io::stdout();
    match implang::vm::run(&program, &input, &mut stdout, None) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
