//! Relay CLI entry point.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use relay_cli::cli::Cli;
use relay_cli::commands;
use relay_core::{env_file, AppConfigOverrides};

fn main() {
    // Load .env.local if it exists (for RELAY_ENVIRONMENT etc.)
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    fmt().with_env_filter(filter).with_target(false).init();

    // State dir env file, then process environment, then flags
    let flags = cli.overrides();
    let result = AppConfigOverrides::load(&env_file())
        .map_err(commands::CliError::from)
        .and_then(|stored| commands::execute(cli.command, &stored.or(flags)));

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
