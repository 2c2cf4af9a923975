//! URL placeholder expansion.
//!
//! Request URLs may carry `{name}` placeholders filled from request data:
//!
//! ```
//! use relay_core::url::expand_url;
//! use serde_json::json;
//!
//! let params = json!({"id": 42, "page": 2});
//! let expanded = expand_url("/users/{id}", params.as_object().unwrap()).unwrap();
//! assert_eq!(expanded.url, "/users/42");
//! assert_eq!(expanded.consumed, vec!["id"]);
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// Regex matching a `{name}` placeholder.
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").expect("Invalid placeholder regex"));

/// Result of expanding a URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedUrl {
    /// The URL with every placeholder substituted.
    pub url: String,
    /// Keys of `params` used by the template, in first-use order.
    pub consumed: Vec<String>,
}

/// Returns the placeholder names in a template, in order of appearance.
///
/// # Errors
///
/// Returns `CoreError::InvalidTemplate` for an empty `{}` placeholder or an
/// unbalanced brace.
pub fn placeholders(template: &str) -> Result<Vec<String>> {
    let names: Vec<String> = PLACEHOLDER_REGEX
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect();

    if names.iter().any(|n| n.trim().is_empty()) {
        return Err(CoreError::InvalidTemplate(template.to_string()));
    }

    let stripped = PLACEHOLDER_REGEX.replace_all(template, "");
    if stripped.contains('{') || stripped.contains('}') {
        return Err(CoreError::InvalidTemplate(template.to_string()));
    }

    Ok(names)
}

/// Substitutes `{key}` placeholders with values from `params`.
///
/// Keys match case-insensitively. Strings are inserted verbatim; other values
/// use their JSON text. Every occurrence of a placeholder is replaced.
///
/// # Errors
///
/// Returns `CoreError::UnmatchedPlaceholder` if a placeholder has no value,
/// or `CoreError::InvalidTemplate` if the template is malformed.
pub fn expand_url(template: &str, params: &Map<String, Value>) -> Result<ExpandedUrl> {
    let mut consumed: Vec<String> = Vec::new();

    for placeholder in placeholders(template)? {
        let key = lookup_key(params, &placeholder).ok_or_else(|| CoreError::UnmatchedPlaceholder {
            placeholder: placeholder.clone(),
            template: template.to_string(),
        })?;
        if !consumed.contains(&key) {
            consumed.push(key);
        }
    }

    let url = PLACEHOLDER_REGEX
        .replace_all(template, |caps: &regex::Captures<'_>| {
            lookup_key(params, &caps[1])
                .and_then(|key| params.get(&key))
                .map(value_text)
                .unwrap_or_default()
        })
        .into_owned();

    Ok(ExpandedUrl { url, consumed })
}

fn lookup_key(params: &Map<String, Value>, placeholder: &str) -> Option<String> {
    if params.contains_key(placeholder) {
        return Some(placeholder.to_string());
    }
    params
        .keys()
        .find(|k| k.eq_ignore_ascii_case(placeholder))
        .cloned()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
