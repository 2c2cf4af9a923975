//! Listener handles and receivers.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ListenerError;

/// What a listener asks the dispatcher to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Keep invoking the remaining listeners.
    #[default]
    Continue,
    /// Skip the remaining listeners for this dispatch.
    Stop,
}

/// Value returned by a listener callback.
pub type ListenerResult = std::result::Result<Propagation, ListenerError>;

type Callback<C> = dyn Fn(&C, &[Value]) -> ListenerResult + Send + Sync;

/// A shareable listener callback with identity.
///
/// Clones of a `Listener` are the *same* listener: registering a clone twice
/// under one event name is a no-op, and a clone can unregister the original.
/// Two `Listener::new` calls always produce distinct listeners, even for
/// identical closures.
pub struct Listener<C = Receiver> {
    callback: Arc<Callback<C>>,
}

impl<C> Listener<C> {
    /// Wraps a callback invoked with the receiver and the dispatch arguments.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&C, &[Value]) -> ListenerResult + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Returns true if both handles refer to the same listener.
    pub fn same(&self, other: &Self) -> bool {
        // Compare data pointers only; vtable pointers are not unique.
        std::ptr::eq(
            Arc::as_ptr(&self.callback) as *const (),
            Arc::as_ptr(&other.callback) as *const (),
        )
    }

    pub(crate) fn call(&self, receiver: &C, args: &[Value]) -> ListenerResult {
        (self.callback)(receiver, args)
    }
}

impl<C> Clone for Listener<C> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<C> PartialEq for Listener<C> {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl<C> Eq for Listener<C> {}

impl<C> fmt::Debug for Listener<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &(Arc::as_ptr(&self.callback) as *const ()))
            .finish()
    }
}

/// A named receiver a listener is invoked against.
///
/// This is the default context type of a registry: owners identify
/// themselves with a receiver, and a registration may carry its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Receiver {
    name: Arc<str>,
}

impl Receiver {
    /// Creates a receiver with the given name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
        }
    }

    /// The receiver's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
