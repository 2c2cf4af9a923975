//! Error types for Relay core operations.

use relay_events::EventError;
use thiserror::Error;

/// Errors that can occur in controllers, views, requests and configuration.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A view was created without an element.
    #[error("invalid element passed to the view: '{0}'")]
    InvalidElement(String),

    /// A URL placeholder has no value in the request data.
    #[error("no value for placeholder '{{{placeholder}}}' in '{template}'")]
    UnmatchedPlaceholder { placeholder: String, template: String },

    /// A URL template has an unterminated or empty placeholder.
    #[error("invalid url template '{0}'")]
    InvalidTemplate(String),

    /// The environment file could not be read.
    #[error("config error: {0}")]
    Config(#[from] dotenvy::Error),

    /// Event registration or dispatch failed.
    #[error(transparent)]
    Event(#[from] EventError),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
