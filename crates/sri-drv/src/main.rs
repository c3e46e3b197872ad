//! The `sri` binary: read a script, evaluate it, exit 0 or 1.
//!
//! `RUBY_VERBOSE=true` turns on trace-level diagnostics to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Tree-walking interpreter for a Ruby subset.
#[derive(Parser, Debug)]
#[command(name = "sri")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run a Ruby-subset script", long_about = None)]
struct Cli {
    /// Script file to evaluate
    filename: PathBuf,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let source = match std::fs::read_to_string(&cli.filename) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("sri: {}: {}", cli.filename.display(), e);
            return ExitCode::from(1);
        }
    };

    ExitCode::from(sri_drv::evaluate(&source) as u8)
}

fn init_tracing() {
    let verbose = std::env::var("RUBY_VERBOSE").is_ok_and(|v| v == "true");
    let filter = if verbose {
        EnvFilter::new("trace")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
