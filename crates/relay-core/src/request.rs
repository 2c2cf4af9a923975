//! API request lifecycle.
//!
//! `ApiRequest` models a call to the backend API and the events it fires on
//! its own registry. The transport is external: the caller marks the request
//! in flight with [`ApiRequest::execute`] and later reports what happened with
//! [`ApiRequest::resolve`].
//!
//! Events:
//!
//! - `success(content)`: the API answered `{"status": true, "content": ...}`
//! - `error({code, message, extra?})`: the API answered with an error, the
//!   response was not an object, the request timed out or the transport failed
//! - `complete()`: after `success` or `error`
//!
//! An aborted request fires none of them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use relay_events::{EventRegistry, Listener, Receiver};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::Result;
use crate::url::expand_url;

/// Fired with the response content.
pub const SUCCESS_EVENT: &str = "success";
/// Fired with a [`RequestFailure`] payload.
pub const ERROR_EVENT: &str = "error";
/// Fired once the request has finished.
pub const COMPLETE_EVENT: &str = "complete";

pub const ERR_500: &str = "500";
pub const ERR_403: &str = "403";
pub const ERR_400: &str = "400";
pub const ERR_TIMEOUT: &str = "timeout";
pub const ERR_UNAUTHORIZED: &str = "unauthorized";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Request options.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub timeout: Duration,
    /// Data sent with the request, minus the keys used by URL placeholders.
    pub data: Map<String, Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            data: Map::new(),
        }
    }
}

/// Payload of the `error` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFailure {
    #[serde(deserialize_with = "code_text")]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl RequestFailure {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: None,
            extra: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }

    fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::String(self.code.clone()))
    }
}

/// Error codes arrive as strings (`"timeout"`) or numbers (`403`).
fn code_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(code) => Ok(code),
        Value::Number(code) => Ok(code.to_string()),
        other => Err(de::Error::invalid_type(
            de::Unexpected::Other(&other.to_string()),
            &"a string or number error code",
        )),
    }
}

/// How a request ended, as reported by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// The server answered; the body is the API envelope.
    Response(Value),
    /// The request timed out.
    Timeout,
    /// The transport failed with an HTTP status.
    Failed {
        status: u16,
        status_text: Option<String>,
        exception: Option<String>,
    },
    /// The request was aborted.
    Aborted,
}

/// API envelope returned by the backend.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    content: Value,
    #[serde(default)]
    error: Option<RequestFailure>,
}

/// A single API request and its events.
#[derive(Debug)]
pub struct ApiRequest {
    id: u64,
    url: String,
    original_url: String,
    options: RequestOptions,
    executing: bool,
    receiver: Receiver,
    events: EventRegistry,
}

impl ApiRequest {
    /// Creates a request for `url`. Ids are unique within the process.
    pub fn new(url: impl Into<String>, options: RequestOptions) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let url = url.into();
        Self {
            id,
            original_url: url.clone(),
            url,
            options,
            executing: false,
            receiver: Receiver::new(format!("request#{}", id)),
            events: EventRegistry::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The URL after placeholder expansion.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn is_executing(&self) -> bool {
        self.executing
    }

    /// Sets the request data and fills the URL placeholders from it.
    ///
    /// Keys used by placeholders are removed from the data.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnmatchedPlaceholder` if the URL needs a key the
    /// data does not have; the request is left unchanged.
    pub fn set_data(&mut self, mut data: Map<String, Value>) -> Result<&mut Self> {
        let expanded = expand_url(&self.original_url, &data)?;
        for key in &expanded.consumed {
            data.remove(key);
        }

        self.url = expanded.url;
        self.options.data = data;
        Ok(self)
    }

    /// Marks the request as in flight. Has no effect if it already is.
    pub fn execute(&mut self) -> &mut Self {
        if !self.executing {
            debug!(id = self.id, url = %self.url, "executing request");
            self.executing = true;
        }
        self
    }

    /// Cancels the request if it is in flight. No events are fired.
    pub fn abort(&mut self) -> &mut Self {
        if self.executing {
            debug!(id = self.id, "aborting request");
            self.executing = false;
        }
        self
    }

    /// Reports the outcome of the in-flight request and fires its events.
    ///
    /// Outcomes for a request that is not in flight are ignored.
    ///
    /// # Errors
    ///
    /// Returns the first listener error; `complete` is not fired in that case.
    pub fn resolve(&mut self, outcome: RequestOutcome) -> Result<&mut Self> {
        if !self.executing {
            warn!(id = self.id, "ignoring outcome for a request that is not executing");
            return Ok(self);
        }
        self.executing = false;

        match outcome {
            RequestOutcome::Aborted => return Ok(self),
            RequestOutcome::Response(body) => self.handle_response(body)?,
            RequestOutcome::Timeout => {
                let failure = RequestFailure::new(ERR_TIMEOUT).with_message(format!(
                    "The request timed out after {} seconds.",
                    self.options.timeout.as_secs_f64()
                ));
                self.fire_failure(&failure)?;
            }
            RequestOutcome::Failed {
                status,
                status_text,
                exception,
            } => {
                let message = exception
                    .filter(|e| !e.is_empty())
                    .or(status_text.filter(|s| !s.is_empty()))
                    .unwrap_or_else(|| "N/A".to_string());
                let failure = RequestFailure::new(status.to_string()).with_message(message);
                self.fire_failure(&failure)?;
            }
        }

        self.fire_event(COMPLETE_EVENT, &[])?;
        Ok(self)
    }

    fn handle_response(&self, body: Value) -> Result<()> {
        if !body.is_object() {
            return self.fire_failure(&RequestFailure::new(ERR_500));
        }

        match serde_json::from_value::<Envelope>(body) {
            Ok(envelope) if envelope.status => {
                self.fire_event(SUCCESS_EVENT, &[envelope.content])?;
                Ok(())
            }
            Ok(envelope) => {
                let failure = envelope.error.unwrap_or_else(|| RequestFailure::new(ERR_500));
                self.fire_failure(&failure)
            }
            Err(err) => {
                warn!(id = self.id, error = %err, "malformed api envelope");
                self.fire_failure(&RequestFailure::new(ERR_500).with_message(err.to_string()))
            }
        }
    }

    fn fire_failure(&self, failure: &RequestFailure) -> Result<()> {
        debug!(id = self.id, code = %failure.code, "request failed");
        self.fire_event(ERROR_EVENT, &[failure.to_value()])?;
        Ok(())
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

    /// Fires an event on this request.
    pub fn fire_event(&self, name: &str, args: &[Value]) -> Result<&Self> {
        self.events.dispatch(&self.receiver, name, args)?;
        Ok(self)
    }

    /// Aborts the request and releases its listeners.
    pub fn destroy(&mut self) {
        self.abort();
        self.events.unregister_all(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use relay_events::{ListenerError, Propagation};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<(String, Vec<Value>)>>>;

    /// Registers a recorder for every request event.
    fn watch(request: &ApiRequest) -> Log {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        for event in [SUCCESS_EVENT, ERROR_EVENT, COMPLETE_EVENT] {
            let sink = Arc::clone(&log);
            let listener = Listener::new(move |_: &Receiver, args: &[Value]| {
                sink.lock().unwrap().push((event.to_string(), args.to_vec()));
                Ok(Propagation::Continue)
            });
            request.register(event, &listener, None).unwrap();
        }
        log
    }

    fn names(log: &Log) -> Vec<String> {
        log.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let a = ApiRequest::new("/a", RequestOptions::default());
        let b = ApiRequest::new("/b", RequestOptions::default());
        assert!(b.id() > a.id());
        assert!(a.id() >= 1);
        assert_eq!(a.receiver().name(), format!("request#{}", a.id()));
    }

    #[test]
    fn test_success_then_complete() {
        let mut request = ApiRequest::new("/users", RequestOptions::default());
        let log = watch(&request);

        request.execute();
        assert!(request.is_executing());
        request
            .resolve(RequestOutcome::Response(json!({"status": true, "content": {"id": 1}})))
            .unwrap();

        assert!(!request.is_executing());
        assert_eq!(names(&log), vec!["success", "complete"]);
        assert_eq!(log.lock().unwrap()[0].1, vec![json!({"id": 1})]);
    }

    #[test]
    fn test_api_error_envelope() {
        let mut request = ApiRequest::new("/users", RequestOptions::default());
        let log = watch(&request);

        request.execute();
        request
            .resolve(RequestOutcome::Response(json!({
                "status": false,
                "error": {"code": "403", "message": "forbidden", "extra": {"role": "guest"}}
            })))
            .unwrap();

        assert_eq!(names(&log), vec!["error", "complete"]);
        assert_eq!(
            log.lock().unwrap()[0].1,
            vec![json!({"code": "403", "message": "forbidden", "extra": {"role": "guest"}})]
        );
    }

    #[test]
    fn test_api_error_with_numeric_code() {
        let mut request = ApiRequest::new("/users", RequestOptions::default());
        let log = watch(&request);

        request.execute();
        request
            .resolve(RequestOutcome::Response(json!({
                "status": false,
                "error": {"code": 403, "message": "forbidden"}
            })))
            .unwrap();

        assert_eq!(names(&log), vec!["error", "complete"]);
        assert_eq!(
            log.lock().unwrap()[0].1,
            vec![json!({"code": "403", "message": "forbidden"})]
        );
    }

    #[test]
    fn test_non_object_response_is_500() {
        let mut request = ApiRequest::new("/users", RequestOptions::default());
        let log = watch(&request);

        request.execute();
        request
            .resolve(RequestOutcome::Response(json!("<html>")))
            .unwrap();

        assert_eq!(names(&log), vec!["error", "complete"]);
        assert_eq!(log.lock().unwrap()[0].1, vec![json!({"code": ERR_500})]);
    }

    #[test]
    fn test_timeout_message() {
        let options = RequestOptions {
            timeout: Duration::from_millis(2500),
            ..Default::default()
        };
        let mut request = ApiRequest::new("/slow", options);
        let log = watch(&request);

        request.execute();
        request.resolve(RequestOutcome::Timeout).unwrap();

        assert_eq!(
            log.lock().unwrap()[0].1,
            vec![json!({
                "code": ERR_TIMEOUT,
                "message": "The request timed out after 2.5 seconds."
            })]
        );
    }

    #[test]
    fn test_transport_failure_message_fallbacks() {
        let cases = [
            (Some("Not Found"), Some("boom"), "boom"),
            (Some("Not Found"), None, "Not Found"),
            (None, Some(""), "N/A"),
        ];

        for (status_text, exception, expected) in cases {
            let mut request = ApiRequest::new("/x", RequestOptions::default());
            let log = watch(&request);
            request.execute();
            request
                .resolve(RequestOutcome::Failed {
                    status: 404,
                    status_text: status_text.map(str::to_string),
                    exception: exception.map(str::to_string),
                })
                .unwrap();

            assert_eq!(
                log.lock().unwrap()[0].1,
                vec![json!({"code": "404", "message": expected})]
            );
        }
    }

    #[test]
    fn test_abort_fires_nothing() {
        let mut request = ApiRequest::new("/users", RequestOptions::default());
        let log = watch(&request);

        request.execute().abort();
        assert!(!request.is_executing());

        // A late response for the aborted request is ignored
        request
            .resolve(RequestOutcome::Response(json!({"status": true})))
            .unwrap();
        assert!(names(&log).is_empty());
    }

    #[test]
    fn test_outcome_without_execute_is_ignored() {
        let mut request = ApiRequest::new("/users", RequestOptions::default());
        let log = watch(&request);

        request.resolve(RequestOutcome::Timeout).unwrap();
        assert!(names(&log).is_empty());
    }

    #[test]
    fn test_listener_error_skips_complete() {
        let mut request = ApiRequest::new("/users", RequestOptions::default());
        let failing = Listener::new(|_, _| Err(ListenerError::new("bad content")));
        request.register(SUCCESS_EVENT, &failing, None).unwrap();
        let log = watch(&request);

        request.execute();
        let result = request.resolve(RequestOutcome::Response(json!({"status": true, "content": 1})));

        assert!(matches!(result, Err(CoreError::Event(_))));
        assert!(!names(&log).contains(&"complete".to_string()));
    }

    #[test]
    fn test_set_data_fills_placeholders() {
        let mut request = ApiRequest::new("/projects/{id}/items", RequestOptions::default());
        let data = json!({"id": "relay", "limit": 10}).as_object().cloned().unwrap();

        request.set_data(data).unwrap();

        assert_eq!(request.url(), "/projects/relay/items");
        assert_eq!(request.options().data.get("limit"), Some(&json!(10)));
        assert!(request.options().data.get("id").is_none());
    }

    #[test]
    fn test_set_data_uses_original_url() {
        let mut request = ApiRequest::new("/projects/{id}", RequestOptions::default());

        request
            .set_data(json!({"id": 1}).as_object().cloned().unwrap())
            .unwrap();
        request
            .set_data(json!({"id": 2}).as_object().cloned().unwrap())
            .unwrap();

        assert_eq!(request.url(), "/projects/2");
    }

    #[test]
    fn test_set_data_unmatched_placeholder() {
        let mut request = ApiRequest::new("/projects/{id}", RequestOptions::default());
        let result = request.set_data(Map::new());

        assert!(matches!(result, Err(CoreError::UnmatchedPlaceholder { .. })));
        assert_eq!(request.url(), "/projects/{id}");
    }

    #[test]
    fn test_destroy_aborts_and_releases_listeners() {
        let mut request = ApiRequest::new("/users", RequestOptions::default());
        let log = watch(&request);

        request.execute();
        request.destroy();

        assert!(!request.is_executing());
        request.fire_event(COMPLETE_EVENT, &[]).unwrap();
        assert!(names(&log).is_empty());
    }

    #[test]
    fn test_failure_serialization_skips_missing_fields() {
        let failure = RequestFailure::new(ERR_UNAUTHORIZED);
        assert_eq!(failure.to_value(), json!({"code": "unauthorized"}));
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({"code": "unauthorized"})
        );
    }
}
