//! Event name parsing.
//!
//! An event identifier is an event name optionally followed by a namespace:
//!
//! ```text
//! click            -> name "click", no namespace
//! click.sidebar    -> name "click", namespace "sidebar"
//! *                -> no name, no namespace
//! *.sidebar        -> no name, namespace "sidebar"
//! ```
//!
//! Only the first `.` separates the two parts; everything after it is the
//! namespace, verbatim.

use std::fmt;

/// Token standing for "every event name".
pub const WILDCARD: &str = "*";

/// Separator between the event name and its namespace.
pub const NAMESPACE_SEPARATOR: char = '.';

/// A parsed event identifier, borrowing from the raw string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventName<'a> {
    name: Option<&'a str>,
    namespace: Option<&'a str>,
}

impl<'a> EventName<'a> {
    /// Parses a raw event identifier.
    ///
    /// An empty name or the wildcard yields `None` for the name. Parsing never
    /// fails; operations decide which combinations they accept.
    pub fn parse(raw: &'a str) -> Self {
        let (name, namespace) = match raw.split_once(NAMESPACE_SEPARATOR) {
            Some((name, namespace)) => (name, Some(namespace)),
            None => (raw, None),
        };

        let name = if name.is_empty() || name == WILDCARD {
            None
        } else {
            Some(name)
        };

        Self { name, namespace }
    }

    /// The concrete event name, if any.
    pub fn name(&self) -> Option<&'a str> {
        self.name
    }

    /// The namespace, if any.
    pub fn namespace(&self) -> Option<&'a str> {
        self.namespace
    }

    /// True if this identifier targets every event name.
    pub fn is_wildcard(&self) -> bool {
        self.name.is_none()
    }
}

impl fmt::Display for EventName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.unwrap_or(WILDCARD))?;
        if let Some(namespace) = self.namespace {
            write!(f, "{}{}", NAMESPACE_SEPARATOR, namespace)?;
        }
        Ok(())
    }
}
