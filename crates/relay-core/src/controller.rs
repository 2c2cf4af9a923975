//! Controller building block.
//!
//! A `Controller` gives a module its own event registry plus access to the
//! shared [`Broadcaster`] and the application's [`Container`]. Concrete
//! controllers hold one and forward to it; `emit` stays private to them.

use std::sync::Arc;

use relay_events::{Broadcaster, EventRegistry, Listener, Receiver};
use serde_json::Value;
use tracing::{debug, warn};

use crate::container::Container;
use crate::error::Result;

/// Fired on the controller's own registry right before its listeners are
/// released.
pub const DESTROY_EVENT: &str = "destroy";

/// Base state shared by every controller.
///
/// Local events are fired from inside this crate only:
///
/// ```compile_fail
/// use std::sync::Arc;
/// use relay_core::{Container, Controller};
///
/// let controller = Controller::new("menu", Arc::new(Container::new()));
/// controller.emit("open", &[]).unwrap();
/// ```
#[derive(Debug)]
pub struct Controller {
    name: String,
    receiver: Receiver,
    container: Arc<Container>,
    bus: &'static Broadcaster,
    events: EventRegistry,
}

impl Controller {
    /// Creates a controller bound to the shared broadcaster.
    pub fn new(name: impl Into<String>, container: Arc<Container>) -> Self {
        let name = name.into();
        let receiver = Receiver::new(format!("controller:{}", name));
        Self {
            name,
            receiver,
            container,
            bus: Broadcaster::instance(),
            events: EventRegistry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
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

    pub fn listener_count(&self, name: &str) -> usize {
        self.events.listener_count(name)
    }

    /// Fires one of this controller's own events.
    pub(crate) fn emit(&self, name: &str, args: &[Value]) -> Result<&Self> {
        self.events.dispatch(&self.receiver, name, args)?;
        Ok(self)
    }

    /// Subscribes to a broadcast event.
    ///
    /// The listener is invoked against `context`, or this controller's
    /// receiver when none is given.
    pub fn add_broadcast_listener(
        &self,
        name: &str,
        listener: &Listener,
        context: Option<Receiver>,
    ) -> Result<&Self> {
        let context = context.unwrap_or_else(|| self.receiver.clone());
        self.bus.subscribe(name, listener, Some(context))?;
        Ok(self)
    }

    pub fn remove_broadcast_listener(&self, name: &str, listener: Option<&Listener>) -> &Self {
        self.bus.unsubscribe(name, listener);
        self
    }

    pub fn remove_broadcast_listeners(&self, name: Option<&str>) -> &Self {
        self.bus.unsubscribe_all(name);
        self
    }

    /// Publishes an event on the shared broadcaster.
    pub fn fire_broadcast_event(&self, name: &str, args: &[Value]) -> Result<&Self> {
        self.bus.publish(name, args)?;
        Ok(self)
    }

    /// Fires [`DESTROY_EVENT`] locally, then releases this controller's own
    /// listeners.
    ///
    /// Broadcast subscriptions are left alone; remove them with
    /// [`Controller::remove_broadcast_listener`] before destroying.
    pub fn destroy(&self) {
        debug!(controller = %self.name, "destroying controller");
        if let Err(err) = self.emit(DESTROY_EVENT, &[]) {
            warn!(controller = %self.name, error = %err, "destroy listener failed");
        }
        self.events.unregister_all(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_events::{ListenerError, Propagation};
    use serde_json::json;
    use std::sync::Mutex;

    fn controller(name: &str) -> Controller {
        Controller::new(name, Arc::new(Container::new()))
    }

    #[test]
    fn test_local_events() {
        let controller = controller("menu");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let listener = Listener::new(move |receiver: &Receiver, args: &[Value]| {
            sink.lock()
                .unwrap()
                .push(format!("{}={}", receiver, args[0]));
            Ok(Propagation::Continue)
        });

        controller.register("open", &listener, None).unwrap();
        controller.emit("open", &[json!("file")]).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["controller:menu=\"file\""]);
    }

    #[test]
    fn test_broadcast_between_controllers() {
        let sender = controller("sender");
        let receiver = controller("receiver");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let listener = Listener::new(move |this: &Receiver, args: &[Value]| {
            sink.lock().unwrap().push((this.name().to_string(), args.to_vec()));
            Ok(Propagation::Continue)
        });

        receiver
            .add_broadcast_listener("controller-test:ping", &listener, None)
            .unwrap();
        sender
            .fire_broadcast_event("controller-test:ping", &[json!(1)])
            .unwrap();
        receiver.remove_broadcast_listener("controller-test:ping", Some(&listener));
        sender
            .fire_broadcast_event("controller-test:ping", &[json!(2)])
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "controller:receiver");
        assert_eq!(seen[0].1, vec![json!(1)]);
    }

    #[test]
    fn test_broadcast_listener_with_explicit_context() {
        let c = controller("ctx");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = Listener::new(move |this: &Receiver, _: &[Value]| {
            sink.lock().unwrap().push(this.name().to_string());
            Ok(Propagation::Continue)
        });

        c.add_broadcast_listener("controller-test:ctx", &listener, Some(Receiver::new("panel")))
            .unwrap();
        c.fire_broadcast_event("controller-test:ctx", &[]).unwrap();
        c.remove_broadcast_listener("controller-test:ctx", Some(&listener));

        assert_eq!(*seen.lock().unwrap(), vec!["panel"]);
    }

    #[test]
    fn test_destroy_notifies_local_listeners() {
        let c = controller("teardown");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = Listener::new(move |this: &Receiver, _: &[Value]| {
            sink.lock().unwrap().push(this.name().to_string());
            Ok(Propagation::Continue)
        });
        c.register(DESTROY_EVENT, &listener, None).unwrap();

        c.destroy();

        assert_eq!(*seen.lock().unwrap(), vec!["controller:teardown"]);
        assert_eq!(c.listener_count(DESTROY_EVENT), 0);
    }

    #[test]
    fn test_remove_broadcast_listeners_by_namespace() {
        let c = controller("ns");
        let listener = Listener::new(|_, _| Ok(Propagation::Continue));

        c.add_broadcast_listener("controller-test:a.ctrl-ns", &listener, None)
            .unwrap()
            .add_broadcast_listener("controller-test:b.ctrl-ns", &listener, None)
            .unwrap();
        c.remove_broadcast_listeners(Some("*.ctrl-ns"));

        let bus = Broadcaster::instance();
        assert_eq!(bus.listener_count("controller-test:a"), 0);
        assert_eq!(bus.listener_count("controller-test:b"), 0);
    }

    #[test]
    fn test_broadcast_listener_error_surfaces() {
        let c = controller("failing");
        let listener = Listener::new(|_, _| Err(ListenerError::new("rejected")));

        c.add_broadcast_listener("controller-test:fail", &listener, None)
            .unwrap();
        let result = c.fire_broadcast_event("controller-test:fail", &[]);
        c.remove_broadcast_listener("controller-test:fail", Some(&listener));

        assert!(result.is_err());
    }

    #[test]
    fn test_destroy_clears_local_listeners_only() {
        let c = controller("destroy");
        let listener = Listener::new(|_, _| Ok(Propagation::Continue));

        c.register("local", &listener, None).unwrap();
        c.add_broadcast_listener("controller-test:kept", &listener, None)
            .unwrap();

        c.destroy();

        assert_eq!(c.listener_count("local"), 0);
        assert_eq!(
            Broadcaster::instance().listener_count("controller-test:kept"),
            1
        );
        c.remove_broadcast_listener("controller-test:kept", Some(&listener));
    }

    #[test]
    fn test_container_is_shared() {
        let container = Arc::new(Container::new());
        let c = Controller::new("shared", Arc::clone(&container));

        container.set_parameter("debug", true);
        assert_eq!(c.container().get_parameter("debug"), Some(json!(true)));
    }
}
