//! Relay Core - application building blocks on top of `relay-events`.
//!
//! - **application**: Top-level controller that boots and tears down the app
//! - **config**: Environment, debug flag and state paths
//! - **container**: Shared parameters and services
//! - **controller** / **view**: Owners with their own event registries
//! - **request**: API request event lifecycle
//! - **url**: URL placeholder expansion

pub mod application;
pub mod config;
pub mod container;
pub mod controller;
pub mod error;
pub mod request;
pub mod url;
pub mod view;

pub use application::{ApplicationController, DESTROY_EVENT, READY_EVENT};
pub use config::{env_file, state_dir, AppConfig, AppConfigOverrides};
pub use container::Container;
pub use controller::Controller;
pub use error::{CoreError, Result};
pub use request::{ApiRequest, RequestFailure, RequestOptions, RequestOutcome};
pub use url::{expand_url, ExpandedUrl};
pub use view::View;
