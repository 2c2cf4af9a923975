//! Error types for event operations.

use thiserror::Error;

/// Errors that can occur during event operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// The event name cannot be used for this operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A singleton was constructed outside its accessor.
    #[error("illegal construction: {0}")]
    IllegalConstruction(String),

    /// A listener failed while the event was being dispatched.
    #[error("listener for '{event}' failed: {source}")]
    Listener {
        event: String,
        #[source]
        source: ListenerError,
    },
}

/// Error returned by a listener callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    /// Creates a listener error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ListenerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ListenerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<serde_json::Error> for ListenerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("invalid payload: {}", err))
    }
}

/// Result type alias for event operations.
pub type Result<T> = std::result::Result<T, EventError>;
