//! EventRegistry - namespaced listener storage and dispatch.
//!
//! A registry belongs to exactly one owner. The owner forwards
//! `register` / `unregister` / `unregister_all` to its callers and keeps
//! `dispatch` for itself, passing its own receiver as the default context.
//!
//! # Concurrency Patterns
//!
//! - **`RwLock<HashMap>`**: registrations are read on every dispatch and
//!   written occasionally.
//! - **Snapshot dispatch**: the listener list is cloned under the read lock
//!   and the lock is released before any listener runs, so listeners may
//!   register or unregister on the same registry. Such changes apply to the
//!   next dispatch, never to the one in progress.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{EventError, Result};
use crate::listener::{Listener, Propagation, Receiver};
use crate::name::EventName;

/// One listener binding.
struct Registration<C> {
    listener: Listener<C>,
    context: Option<C>,
    namespace: Option<String>,
}

impl<C: Clone> Clone for Registration<C> {
    fn clone(&self) -> Self {
        Self {
            listener: self.listener.clone(),
            context: self.context.clone(),
            namespace: self.namespace.clone(),
        }
    }
}

/// Per-owner event registry.
///
/// `C` is the receiver type listeners are invoked against; it defaults to
/// [`Receiver`].
///
/// # Example
///
/// ```
/// use relay_events::{EventRegistry, Listener, Propagation, Receiver};
/// use serde_json::json;
///
/// let owner = Receiver::new("sidebar");
/// let registry = EventRegistry::new();
///
/// let on_click = Listener::new(|receiver: &Receiver, args| {
///     println!("{} clicked with {:?}", receiver, args);
///     Ok(Propagation::Continue)
/// });
///
/// registry.register("click.menu", &on_click, None).unwrap();
/// registry.dispatch(&owner, "click", &[json!(42)]).unwrap();
///
/// // Drop every listener in the "menu" namespace.
/// registry.unregister_all(Some("*.menu"));
/// assert!(registry.is_empty());
/// ```
pub struct EventRegistry<C = Receiver> {
    events: RwLock<HashMap<String, Vec<Registration<C>>>>,
}

impl<C: Clone> EventRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a listener.
    ///
    /// If `name` contains a namespace (`click.sidebar`), the registration is
    /// tagged with it so it can later be removed without the listener handle.
    /// Registering a listener already bound to the same event name is a
    /// no-op, whatever the namespace or context.
    ///
    /// # Errors
    ///
    /// Returns `EventError::InvalidArgument` if `name` has no concrete event
    /// name (`*`, `*.ns`, empty) or ends with an empty namespace.
    pub fn register(&self, name: &str, listener: &Listener<C>, context: Option<C>) -> Result<&Self> {
        let parsed = EventName::parse(name);
        let event = parsed.name().ok_or_else(|| {
            EventError::InvalidArgument(format!("'{}' does not specify an event name", name))
        })?;
        if parsed.namespace() == Some("") {
            return Err(EventError::InvalidArgument(format!(
                "'{}' has an empty namespace",
                name
            )));
        }

        let mut events = self.write();
        let list = events.entry(event.to_string()).or_default();
        if list.iter().any(|r| r.listener.same(listener)) {
            trace!(event = %event, "listener already registered");
            return Ok(self);
        }

        list.push(Registration {
            listener: listener.clone(),
            context,
            namespace: parsed.namespace().map(str::to_string),
        });
        trace!(event = %event, namespace = ?parsed.namespace(), "listener registered");

        Ok(self)
    }

    /// Removes listeners.
    ///
    /// Without a namespace, removes `listener` from the event; a missing
    /// `listener` makes this a no-op. With a namespace (`click.sidebar`),
    /// removes every listener of that event tagged with the namespace and
    /// ignores `listener`.
    pub fn unregister(&self, name: &str, listener: Option<&Listener<C>>) -> &Self {
        let parsed = EventName::parse(name);
        let Some(event) = parsed.name() else {
            return self;
        };

        let mut events = self.write();
        let Some(list) = events.get_mut(event) else {
            return self;
        };

        match (parsed.namespace(), listener) {
            (Some(namespace), _) => remove_namespace(list, namespace),
            (None, Some(listener)) => {
                if let Some(index) = list.iter().position(|r| r.listener.same(listener)) {
                    list.remove(index);
                }
            }
            (None, None) => {}
        }

        if list.is_empty() {
            events.remove(event);
        }
        self
    }

    /// Removes several listeners at once.
    ///
    /// - `None` or `*`: clears the registry.
    /// - `click`: removes every listener of `click`.
    /// - `click.sidebar`: removes the `sidebar` listeners of `click`.
    /// - `*.sidebar`: removes the `sidebar` listeners of every event.
    pub fn unregister_all(&self, name: Option<&str>) -> &Self {
        let parsed = name.map(EventName::parse);
        let mut events = self.write();

        match parsed.map(|p| (p.name(), p.namespace())) {
            None | Some((None, None)) => {
                debug!(events = events.len(), "clearing all listeners");
                events.clear();
            }
            Some((Some(event), None)) => {
                events.remove(event);
            }
            Some((Some(event), Some(namespace))) => {
                if let Some(list) = events.get_mut(event) {
                    remove_namespace(list, namespace);
                    if list.is_empty() {
                        events.remove(event);
                    }
                }
            }
            Some((None, Some(namespace))) => {
                for list in events.values_mut() {
                    remove_namespace(list, namespace);
                }
                events.retain(|_, list| !list.is_empty());
            }
        }

        self
    }

    /// Fires an event on behalf of the owner.
    ///
    /// Listeners registered for the plain event name run in registration
    /// order, each against its own context or, if it has none, `owner`. A
    /// namespace in `name` is ignored.
    ///
    /// Dispatch stops early when a listener returns [`Propagation::Stop`] or
    /// fails; in both cases the remaining listeners are skipped, not removed.
    ///
    /// # Errors
    ///
    /// Returns `EventError::Listener` with the first listener error.
    pub fn dispatch(&self, owner: &C, name: &str, args: &[Value]) -> Result<&Self> {
        let Some(event) = EventName::parse(name).name() else {
            return Ok(self);
        };

        let snapshot: Vec<Registration<C>> = match self.read().get(event) {
            Some(list) => list.clone(),
            None => return Ok(self),
        };
        trace!(event = %event, listeners = snapshot.len(), "dispatching event");

        for (index, registration) in snapshot.iter().enumerate() {
            let receiver = registration.context.as_ref().unwrap_or(owner);
            let propagation = registration
                .listener
                .call(receiver, args)
                .map_err(|source| EventError::Listener {
                    event: event.to_string(),
                    source,
                })?;

            if propagation == Propagation::Stop {
                debug!(
                    event = %event,
                    skipped = snapshot.len() - index - 1,
                    "propagation stopped by listener"
                );
                break;
            }
        }

        Ok(self)
    }

    /// Returns the number of listeners registered for an event name.
    ///
    /// A namespaced name counts only that namespace's listeners.
    pub fn listener_count(&self, name: &str) -> usize {
        let parsed = EventName::parse(name);
        let Some(event) = parsed.name() else {
            return 0;
        };

        self.read()
            .get(event)
            .map(|list| match parsed.namespace() {
                Some(namespace) => list
                    .iter()
                    .filter(|r| r.namespace.as_deref() == Some(namespace))
                    .count(),
                None => list.len(),
            })
            .unwrap_or(0)
    }

    /// Returns true if `listener` is registered under the event name.
    pub fn is_registered(&self, name: &str, listener: &Listener<C>) -> bool {
        let Some(event) = EventName::parse(name).name() else {
            return false;
        };

        self.read()
            .get(event)
            .map(|list| list.iter().any(|r| r.listener.same(listener)))
            .unwrap_or(false)
    }

    /// Returns the event names that currently have listeners, sorted.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns true if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // No listener runs while a guard is held, so a poisoned map is still
    // consistent and can be recovered.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<Registration<C>>>> {
        self.events.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<Registration<C>>>> {
        self.events.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Clone> Default for EventRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for EventRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        let mut counts: Vec<(&String, usize)> = events.iter().map(|(k, v)| (k, v.len())).collect();
        counts.sort();
        f.debug_struct("EventRegistry").field("events", &counts).finish()
    }
}

fn remove_namespace<C>(list: &mut Vec<Registration<C>>, namespace: &str) {
    list.retain(|r| r.namespace.as_deref() != Some(namespace));
}
