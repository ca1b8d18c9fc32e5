//! acuerdos - community agreements and weekly chores CLI
//!
//! Browse links and agreements, check off weekly chores and follow how each
//! topic is doing, from a directory of tabular sheets.

use acuerdos::cli::Cli;
use acuerdos::output::print_error;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Tracing is opt-in via RUST_LOG.
    // Keep startup robust: ignore invalid/huge filters.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    let command = cli.command.name();
    let json = cli.json;
    if let Err(err) = cli.run() {
        let _ = print_error(command, &err, json);
        std::process::exit(err.exit_code());
    }
}
