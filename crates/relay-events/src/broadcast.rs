//! Broadcaster - the process-wide event bus.
//!
//! Components that hold no reference to each other publish and subscribe
//! here. Exactly one `Broadcaster` exists per process; it is created on the
//! first call to [`Broadcaster::instance`].
//!
//! # Design
//!
//! - The instance lives in a `OnceLock`, which makes first access atomic
//!   across threads.
//! - [`Broadcaster::new`] is the only constructor and succeeds only while
//!   `instance()` holds the construction guard. The guard is thread-local,
//!   so another thread calling `new()` during first access is still rejected.

use std::cell::Cell;
use std::sync::OnceLock;

use serde_json::Value;
use tracing::debug;

use crate::error::{EventError, Result};
use crate::listener::{Listener, Receiver};
use crate::registry::EventRegistry;

/// Name of the bus's default receiver.
pub const BROADCASTER_RECEIVER: &str = "broadcaster";

static INSTANCE: OnceLock<Broadcaster> = OnceLock::new();

thread_local! {
    static CONSTRUCTING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside `instance()` until dropped.
struct ConstructionGuard;

impl ConstructionGuard {
    fn enter() -> Self {
        CONSTRUCTING.with(|flag| flag.set(true));
        ConstructionGuard
    }
}

impl Drop for ConstructionGuard {
    fn drop(&mut self) {
        CONSTRUCTING.with(|flag| flag.set(false));
    }
}

/// The shared event bus.
///
/// # Example
///
/// ```
/// use relay_events::{Broadcaster, Listener, Propagation};
/// use serde_json::json;
///
/// let bus = Broadcaster::instance();
/// let listener = Listener::new(|_, args| {
///     assert_eq!(args, &[json!("hello")]);
///     Ok(Propagation::Continue)
/// });
///
/// bus.subscribe("doc:greeting", &listener, None).unwrap();
/// bus.publish("doc:greeting", &[json!("hello")]).unwrap();
/// bus.unsubscribe("doc:greeting", Some(&listener));
/// ```
#[derive(Debug)]
pub struct Broadcaster {
    receiver: Receiver,
    events: EventRegistry,
}

impl Broadcaster {
    /// Returns the shared instance, creating it on first use.
    pub fn instance() -> &'static Broadcaster {
        INSTANCE.get_or_init(|| {
            let _guard = ConstructionGuard::enter();
            debug!("creating broadcaster");
            Broadcaster::new().expect("construction guard is held inside instance()")
        })
    }

    /// Guarded constructor.
    ///
    /// # Errors
    ///
    /// Returns `EventError::IllegalConstruction` when called anywhere but
    /// from [`Broadcaster::instance`].
    pub fn new() -> Result<Self> {
        if !CONSTRUCTING.with(Cell::get) {
            return Err(EventError::IllegalConstruction(
                "the broadcaster is a singleton, use Broadcaster::instance()".to_string(),
            ));
        }

        Ok(Self {
            receiver: Receiver::new(BROADCASTER_RECEIVER),
            events: EventRegistry::new(),
        })
    }

    /// Publishes an event to every subscriber.
    ///
    /// See [`EventRegistry::dispatch`] for ordering, short-circuit and error
    /// semantics.
    pub fn publish(&self, name: &str, args: &[Value]) -> Result<&Self> {
        debug!(event = %name, args = args.len(), "publishing broadcast event");
        self.events.dispatch(&self.receiver, name, args)?;
        Ok(self)
    }

    /// Subscribes a listener. See [`EventRegistry::register`].
    pub fn subscribe(
        &self,
        name: &str,
        listener: &Listener,
        context: Option<Receiver>,
    ) -> Result<&Self> {
        self.events.register(name, listener, context)?;
        Ok(self)
    }

    /// Unsubscribes listeners. See [`EventRegistry::unregister`].
    pub fn unsubscribe(&self, name: &str, listener: Option<&Listener>) -> &Self {
        self.events.unregister(name, listener);
        self
    }

    /// Unsubscribes several listeners. See [`EventRegistry::unregister_all`].
    pub fn unsubscribe_all(&self, name: Option<&str>) -> &Self {
        self.events.unregister_all(name);
        self
    }

    /// Number of subscribers for an event name.
    pub fn listener_count(&self, name: &str) -> usize {
        self.events.listener_count(name)
    }

    /// Returns true if `listener` is subscribed under the event name.
    pub fn is_subscribed(&self, name: &str, listener: &Listener) -> bool {
        self.events.is_registered(name, listener)
    }

    /// The receiver listeners without their own context are invoked against.
    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }
}
