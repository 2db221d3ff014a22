//! Schema migrator CLI
//!
//! Command-line interface for applying, reverting and inspecting database
//! schema migrations.

use clap::Parser;

mod cli;
mod commands;
mod output;

use cli::Cli;
use output::{CommandResult, OutputFormat};

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Parse CLI arguments
    let cli = Cli::parse();
    let format = OutputFormat::from_json_flag(cli.json);

    // Initialize tracing
    init_tracing(cli.verbose, cli.json);

    // Execute command
    if let Err(e) = cli.execute().await {
        let result: CommandResult<()> = CommandResult::failure(format!("{e:#}"));
        if result.print(format).is_err() {
            eprintln!("{e:#}");
        }
        std::process::exit(1);
    }
}

/// Initialize tracing/logging based on verbosity and format.
fn init_tracing(verbose: u8, json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(verbose > 1).with_writer(std::io::stderr))
            .init();
    }
}
