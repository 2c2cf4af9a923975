//! Command handlers for CLI subcommands.

use std::sync::Arc;

use relay_core::{expand_url, AppConfigOverrides, ApplicationController, Container, CoreError};
use relay_events::{Broadcaster, EventError, EventName, Listener, Propagation, Receiver};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::cli::Commands;

/// Errors surfaced by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for command operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Execute a CLI command.
pub fn execute(command: Commands, overrides: &AppConfigOverrides) -> Result<()> {
    match command {
        Commands::Boot => cmd_boot(overrides),
        Commands::Publish { event, args } => cmd_publish(overrides, &event, &args),
        Commands::Parse { name } => {
            println!("{}", describe_name(&name));
            Ok(())
        }
        Commands::Expand { template, params } => {
            println!("{}", cmd_expand(&template, &params)?);
            Ok(())
        }
    }
}

fn cmd_boot(overrides: &AppConfigOverrides) -> Result<()> {
    let container = Arc::new(Container::new());
    let app = ApplicationController::new(overrides, Arc::clone(&container))?;

    println!("Configuration:");
    println!("{}", serde_json::to_string_pretty(app.config())?);
    println!();
    println!("Container parameters:");
    for (key, value) in container.parameters() {
        println!("  {} = {}", key, value);
    }

    app.destroy()?;
    Ok(())
}

fn cmd_publish(overrides: &AppConfigOverrides, event: &str, raw_args: &[String]) -> Result<()> {
    let args: Vec<Value> = raw_args.iter().map(|a| parse_arg(a)).collect();

    let printer = Listener::new(|receiver: &Receiver, args: &[Value]| {
        let rendered = serde_json::to_string(args)?;
        println!("{} received {}", receiver, rendered);
        Ok(Propagation::Continue)
    });

    // A namespaced unsubscribe would drop every listener in that namespace
    let plain = EventName::parse(event).name().unwrap_or(event);
    let bus = Broadcaster::instance();
    bus.subscribe(plain, &printer, None)?;
    let result = publish_from_app(overrides, event, &args);
    bus.unsubscribe(plain, Some(&printer));
    result
}

fn publish_from_app(overrides: &AppConfigOverrides, event: &str, args: &[Value]) -> Result<()> {
    let app = ApplicationController::new(overrides, Arc::new(Container::new()))?;

    info!(event = %event, args = args.len(), "publishing");
    let published = app.fire_broadcast_event(event, args).map(|_| ());

    let destroyed = app.destroy();
    published?;
    destroyed?;
    Ok(())
}

/// Parses a command-line event argument: JSON if it parses, a string otherwise.
pub fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Renders the parts of an event name.
pub fn describe_name(raw: &str) -> String {
    let parsed = EventName::parse(raw);
    format!(
        "name: {}\nnamespace: {}",
        parsed.name().unwrap_or("(any)"),
        parsed.namespace().unwrap_or("(none)")
    )
}

/// Expands a URL template with `key=value` parameters.
pub fn cmd_expand(template: &str, pairs: &[String]) -> Result<String> {
    let mut params = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| CliError::InvalidArgument(format!("expected key=value, got '{}'", pair)))?;
        params.insert(key.to_string(), parse_arg(value));
    }

    let expanded = expand_url(template, &params)?;
    Ok(expanded.url)
}
