//! View building block.

use relay_events::{EventRegistry, Listener, Receiver};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CoreError, Result};

/// Fired on the view's own registry right before its listeners are released.
pub const DESTROY_EVENT: &str = "destroy";

/// A view bound to a page element, with its own events.
///
/// Concrete views hold a `View` and forward to it. Rendering is left to the
/// embedding UI layer; this type only tracks the element selector and the
/// listener lifecycle.
///
/// Only the owning crate fires a view's events:
///
/// ```compile_fail
/// let view = relay_core::View::new("body").unwrap();
/// view.emit("render", &[]).unwrap();
/// ```
#[derive(Debug)]
pub struct View {
    element: String,
    receiver: Receiver,
    events: EventRegistry,
}

impl View {
    /// Creates a view for the given element selector.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidElement` if the selector is blank.
    pub fn new(element: impl Into<String>) -> Result<Self> {
        let element = element.into();
        if element.trim().is_empty() {
            return Err(CoreError::InvalidElement(element));
        }

        let receiver = Receiver::new(format!("view:{}", element));
        Ok(Self {
            element,
            receiver,
            events: EventRegistry::new(),
        })
    }

    /// The element selector this view is bound to.
    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn register(&self, name: &str, listener: &Listener, context: Option<Receiver>) -> Result<&Self> {
        self.events.register(name, listener, context)?;
        Ok(self)
    }

    pub fn unregister(&self, name: &str, listener: Option<&Listener>) -> &Self {
        self.events.unregister(name, listener);
        self
    }

    pub fn unregister_all(&self, name: Option<&str>) -> &Self {
        self.events.unregister_all(name);
        self
    }

    /// Fires one of this view's events.
    pub(crate) fn emit(&self, name: &str, args: &[Value]) -> Result<&Self> {
        self.events.dispatch(&self.receiver, name, args)?;
        Ok(self)
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.events.listener_count(name)
    }

    /// Fires [`DESTROY_EVENT`], then releases the view's listeners.
    ///
    /// A failing `destroy` listener is logged; teardown still completes.
    pub fn destroy(&self) {
        debug!(element = %self.element, "destroying view");
        if let Err(err) = self.emit(DESTROY_EVENT, &[]) {
            warn!(element = %self.element, error = %err, "destroy listener failed");
        }
        self.events.unregister_all(None);
    }
}
