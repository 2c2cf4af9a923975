//! Command-line interface definition using clap.

use clap::{Parser, Subcommand};
use relay_core::config::parse_bool;
use relay_core::AppConfigOverrides;

/// Relay - namespaced events and application lifecycle harness
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Application environment (default: dev)
    #[arg(short, long, env = "RELAY_ENVIRONMENT", global = true)]
    pub environment: Option<String>,

    /// Debug flag (true/false, yes/no, 1/0)
    #[arg(long, env = "RELAY_DEBUG", value_parser = parse_debug_flag, global = true)]
    pub debug: Option<bool>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Boot the application, print its configuration and tear it down
    Boot,

    /// Publish an event on the broadcaster and print what listeners receive
    Publish {
        /// Event name, optionally namespaced (e.g. "app:ready")
        #[arg(required = true)]
        event: String,

        /// Event arguments as JSON; anything else is sent as a string
        args: Vec<String>,
    },

    /// Show how an event name splits into name and namespace
    Parse {
        /// Event name (e.g. "click.menu", "*.menu")
        #[arg(required = true)]
        name: String,
    },

    /// Expand the placeholders of a URL template
    Expand {
        /// URL template (e.g. "/users/{id}")
        #[arg(required = true)]
        template: String,

        /// Placeholder values as key=value
        params: Vec<String>,
    },
}

fn parse_debug_flag(raw: &str) -> Result<bool, String> {
    parse_bool(raw).ok_or_else(|| format!("'{}' is not a boolean", raw))
}

impl Cli {
    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    /// Configuration overrides given on the command line or environment.
    pub fn overrides(&self) -> AppConfigOverrides {
        AppConfigOverrides {
            environment: self.environment.clone(),
            debug: self.debug,
        }
    }
}
