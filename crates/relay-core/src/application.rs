//! Application controller.

use std::sync::Arc;

use relay_events::{Listener, Receiver};
use serde_json::json;
use tracing::info;

use crate::config::{AppConfig, AppConfigOverrides};
use crate::container::Container;
use crate::controller::Controller;
use crate::error::Result;
use crate::view::View;

/// Broadcast when the application controller is ready. Args: `[environment]`.
pub const READY_EVENT: &str = "app:ready";

/// Broadcast when the application controller is being destroyed. Args:
/// `[environment]`.
pub const DESTROY_EVENT: &str = "app:destroy";

/// Element the application view is bound to.
pub const ROOT_ELEMENT: &str = "body";

/// Top-level controller: owns the configuration and the root view.
#[derive(Debug)]
pub struct ApplicationController {
    base: Controller,
    config: AppConfig,
    view: View,
}

impl ApplicationController {
    /// Boots the application.
    ///
    /// Publishes `debug` and `environment` into the container, creates the
    /// root view and broadcasts [`READY_EVENT`].
    ///
    /// # Errors
    ///
    /// Returns an error if a `READY_EVENT` subscriber fails.
    pub fn new(overrides: &AppConfigOverrides, container: Arc<Container>) -> Result<Self> {
        let config = AppConfig::default().merged(overrides);

        container.set_parameter("debug", config.debug);
        container.set_parameter("environment", config.environment.clone());

        let app = Self {
            base: Controller::new("application", container),
            view: View::new(ROOT_ELEMENT)?,
            config,
        };

        info!(
            environment = %app.config.environment,
            debug = app.config.debug,
            "application controller initialized"
        );
        app.base
            .fire_broadcast_event(READY_EVENT, &[json!(app.config.environment)])?;

        Ok(app)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn container(&self) -> &Arc<Container> {
        self.base.container()
    }

    pub fn receiver(&self) -> &Receiver {
        self.base.receiver()
    }

    pub fn register(&self, name: &str, listener: &Listener, context: Option<Receiver>) -> Result<&Self> {
        self.base.register(name, listener, context)?;
        Ok(self)
    }

    pub fn unregister(&self, name: &str, listener: Option<&Listener>) -> &Self {
        self.base.unregister(name, listener);
        self
    }

    pub fn unregister_all(&self, name: Option<&str>) -> &Self {
        self.base.unregister_all(name);
        self
    }

    /// Subscribes to a broadcast event on behalf of the application.
    pub fn add_broadcast_listener(
        &self,
        name: &str,
        listener: &Listener,
        context: Option<Receiver>,
    ) -> Result<&Self> {
        self.base.add_broadcast_listener(name, listener, context)?;
        Ok(self)
    }

    pub fn remove_broadcast_listener(&self, name: &str, listener: Option<&Listener>) -> &Self {
        self.base.remove_broadcast_listener(name, listener);
        self
    }

    /// Publishes an event on the shared broadcaster.
    pub fn fire_broadcast_event(&self, name: &str, args: &[serde_json::Value]) -> Result<&Self> {
        self.base.fire_broadcast_event(name, args)?;
        Ok(self)
    }

    /// Tears the application down.
    ///
    /// Broadcasts [`DESTROY_EVENT`], destroys the root view, clears the
    /// container and releases the controller's listeners. Teardown completes
    /// even if a subscriber fails; that error is returned afterwards.
    pub fn destroy(self) -> Result<()> {
        let notified = self
            .base
            .fire_broadcast_event(DESTROY_EVENT, &[json!(self.config.environment)])
            .map(|_| ());

        self.view.destroy();
        self.base.container().clear();
        self.base.destroy();
        info!("application controller destroyed");

        notified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_events::{Broadcaster, ListenerError, Propagation};
    use serde_json::Value;
    use std::sync::Mutex;

    #[test]
    fn test_boot_writes_container_parameters() {
        let container = Arc::new(Container::new());
        let overrides = AppConfigOverrides {
            environment: Some("prod".to_string()),
            debug: Some(false),
        };

        let app = ApplicationController::new(&overrides, Arc::clone(&container)).unwrap();

        assert_eq!(app.config().environment, "prod");
        assert_eq!(container.get_parameter("environment"), Some(json!("prod")));
        assert_eq!(container.get_parameter("debug"), Some(json!(false)));
        assert_eq!(app.view().element(), ROOT_ELEMENT);
        app.destroy().unwrap();
    }

    #[test]
    fn test_default_config() {
        let app =
            ApplicationController::new(&AppConfigOverrides::default(), Arc::new(Container::new()))
                .unwrap();
        assert_eq!(app.config(), &AppConfig::default());
        app.destroy().unwrap();
    }

    #[test]
    fn test_ready_is_broadcast() {
        let seen = Arc::new(Mutex::new(Vec::<Value>::new()));
        let sink = Arc::clone(&seen);
        let listener = Listener::new(move |_: &Receiver, args: &[Value]| {
            sink.lock().unwrap().extend_from_slice(args);
            Ok(Propagation::Continue)
        });

        let bus = Broadcaster::instance();
        bus.subscribe(READY_EVENT, &listener, None).unwrap();
        let overrides = AppConfigOverrides {
            environment: Some("ready-test".to_string()),
            debug: None,
        };
        let app = ApplicationController::new(&overrides, Arc::new(Container::new())).unwrap();
        bus.unsubscribe(READY_EVENT, Some(&listener));

        // Other tests may boot applications concurrently.
        assert!(seen.lock().unwrap().contains(&json!("ready-test")));
        app.destroy().unwrap();
    }

    #[test]
    fn test_destroy_clears_container_and_listeners() {
        let container = Arc::new(Container::new());
        let app =
            ApplicationController::new(&AppConfigOverrides::default(), Arc::clone(&container))
                .unwrap();
        let listener = Listener::new(|_, _| Ok(Propagation::Continue));
        app.register("route", &listener, None).unwrap();
        container.set("router", String::from("hash"));

        app.destroy().unwrap();

        assert!(container.parameters().is_empty());
        assert!(!container.has("router"));
    }

    #[test]
    fn test_destroy_completes_when_subscriber_fails() {
        let container = Arc::new(Container::new());
        let overrides = AppConfigOverrides {
            environment: Some("destroy-fail-test".to_string()),
            debug: None,
        };
        let app = ApplicationController::new(&overrides, Arc::clone(&container)).unwrap();

        // Only this application's environment fails, so concurrent tests
        // are unaffected.
        let failing = Listener::new(|_: &Receiver, args: &[Value]| {
            if args.first() == Some(&json!("destroy-fail-test")) {
                Err(ListenerError::new("cannot stop now"))
            } else {
                Ok(Propagation::Continue)
            }
        });
        app.add_broadcast_listener(DESTROY_EVENT, &failing, None).unwrap();

        let result = app.destroy();
        Broadcaster::instance().unsubscribe(DESTROY_EVENT, Some(&failing));

        assert!(result.is_err());
        assert!(container.parameters().is_empty());
    }
}
