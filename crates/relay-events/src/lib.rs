//! Namespaced publish/subscribe events for Relay.
//!
//! This crate provides:
//! - `EventRegistry`: per-owner listener storage with namespaced
//!   registration, bulk removal and ordered, short-circuiting dispatch
//! - `Broadcaster`: the single process-wide registry used for
//!   cross-component notification
//!
//! # Example
//!
//! ```
//! use relay_events::{EventRegistry, Listener, Propagation, Receiver};
//!
//! struct Sidebar {
//!     receiver: Receiver,
//!     events: EventRegistry,
//! }
//!
//! impl Sidebar {
//!     fn toggle(&self) -> relay_events::Result<()> {
//!         self.events.dispatch(&self.receiver, "toggle", &[])?;
//!         Ok(())
//!     }
//! }
//!
//! let sidebar = Sidebar {
//!     receiver: Receiver::new("sidebar"),
//!     events: EventRegistry::new(),
//! };
//!
//! let listener = Listener::new(|receiver: &Receiver, _| {
//!     assert_eq!(receiver.name(), "sidebar");
//!     Ok(Propagation::Continue)
//! });
//! sidebar.events.register("toggle.layout", &listener, None).unwrap();
//! sidebar.toggle().unwrap();
//! ```

pub mod broadcast;
pub mod error;
pub mod listener;
pub mod name;
pub mod registry;

pub use broadcast::Broadcaster;
pub use error::{EventError, ListenerError, Result};
pub use listener::{Listener, ListenerResult, Propagation, Receiver};
pub use name::{EventName, NAMESPACE_SEPARATOR, WILDCARD};
pub use registry::EventRegistry;
