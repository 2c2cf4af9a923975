//! Dependency-injection container.
//!
//! Holds named parameters (JSON values) and named services (any shared
//! type). A container is created once by the application and handed to the
//! components that need it as an `Arc<Container>`; there is no global
//! accessor. `clear()` is the explicit teardown.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

type Service = Arc<dyn Any + Send + Sync>;

/// Parameter and service store shared by controllers.
#[derive(Default)]
pub struct Container {
    params: RwLock<HashMap<String, Value>>,
    services: RwLock<HashMap<String, Service>>,
}

impl Container {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a service by key, if present and of type `T`.
    pub fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        services
            .get(key)
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
    }

    /// Stores a service, replacing any previous one under the key.
    pub fn set<T>(&self, key: impl Into<String>, service: T)
    where
        T: Any + Send + Sync,
    {
        self.set_shared(key, Arc::new(service));
    }

    /// Stores an already shared service.
    pub fn set_shared<T>(&self, key: impl Into<String>, service: Arc<T>)
    where
        T: Any + Send + Sync,
    {
        let key = key.into();
        debug!(key = %key, "service registered");
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, service);
    }

    /// Returns true if a service is stored under the key.
    pub fn has(&self, key: &str) -> bool {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Returns a parameter. A stored `null` reads as `None`.
    pub fn get_parameter(&self, key: &str) -> Option<Value> {
        self.params
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .filter(|value| !value.is_null())
            .cloned()
    }

    /// Stores a parameter.
    pub fn set_parameter(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.params
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Returns all parameters, sorted by key.
    pub fn parameters(&self) -> Vec<(String, Value)> {
        let params = self.params.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<(String, Value)> = params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Removes every parameter and service.
    pub fn clear(&self) {
        debug!("clearing container");
        self.params
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<&String> = services.keys().collect();
        keys.sort();
        f.debug_struct("Container")
            .field("params", &self.parameters())
            .field("services", &keys)
            .finish()
    }
}
