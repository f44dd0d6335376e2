//! the main compiler binary. reads a source file, lowers it to the target
//! instruction set, and writes one instruction per line to the output file.
//!
//! run with `--help` for more info.

use std::process::ExitCode;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// source file to compile
    input: String,
    /// where to write the rendered instruction stream
    output: String,
    /// raise the tracing level (equivalent to RUST_LOG=debug)
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let source = match std::fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{}: {err}", args.input);
            return ExitCode::FAILURE;
        }
    };

    match implang::compile(&source) {
        Ok(lines) => match std::fs::write(&args.output, lines.join("\n") + "\n") {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("{}: {err}", args.output);
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
