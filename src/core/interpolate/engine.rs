//! Placeholder resolution
//!
//! Templates contain `${...}` placeholders. Each placeholder body is
//! resolved, in order, as:
//!
//! 1. a supplied value (`None` values render as `!{name-NULL}`)
//! 2. a required name that was not supplied (`!{name-missing}`)
//! 3. a built-in function expression (errors render as `!{error: ...}`,
//!    including names that are neither supplied nor built-in)
//! 4. `name:default`, falling back to the literal default
//!
//! An expression that evaluates to no value (an unset `env(...)`) is left in
//! the output verbatim.
//! Resolved values are themselves interpolated, so supplied values may
//! reference other placeholders.

use super::functions::{self, ExpressionError};
use serde_json::{Map, Value};
use std::collections::HashMap;

const PLACEHOLDER_PREFIX: &str = "${";
const PLACEHOLDER_SUFFIX: char = '}';
const VALUE_SEPARATOR: char = ':';

/// Template interpolation engine
///
/// Engines are immutable once built; [`InterpolateEngine::with_value`]
/// returns an extended copy so a shared engine can be specialised per
/// artifact without locking.
#[derive(Debug, Clone, Default)]
pub struct InterpolateEngine {
    values: HashMap<String, Option<String>>,
    required: Vec<String>,
}

impl InterpolateEngine {
    /// Creates an engine from supplied values and required names
    pub fn new<S: AsRef<str>>(values: HashMap<String, Option<String>>, required: &[S]) -> Self {
        Self {
            values,
            required: required.iter().map(|name| name.as_ref().to_string()).collect(),
        }
    }

    /// Creates an engine from a JSON argument object
    ///
    /// Strings are used as-is, `null` becomes an absent value and every other
    /// JSON value is rendered as compact JSON text.
    pub fn from_json_args<S: AsRef<str>>(args: &Map<String, Value>, required: &[S]) -> Self {
        let values = args
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                };
                (key.clone(), rendered)
            })
            .collect();
        Self::new(values, required)
    }

    /// Returns a copy with one more supplied value
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), Some(value.into()));
        self
    }

    /// Supplied value for `key`, if any
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_deref())
    }

    /// Whether `name` is one of the required names
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Expands every placeholder in `template`
    ///
    /// Never fails; problems are rendered into the output as markers.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use nexus_ingest::core::interpolate::InterpolateEngine;
    ///
    /// let engine = InterpolateEngine::new(HashMap::new(), &["artifactId"])
    ///     .with_value("fsHome", "/data");
    /// assert_eq!(engine.interpolate("${fsHome}/x.json"), "/data/x.json");
    /// assert_eq!(engine.interpolate("${artifactId}"), "!{artifactId-missing}");
    /// assert_eq!(engine.interpolate("${region:us-east-1}"), "us-east-1");
    /// ```
    pub fn interpolate(&self, template: &str) -> String {
        let mut visiting = Vec::new();
        self.parse(template, &mut visiting)
    }

    fn parse(&self, template: &str, visiting: &mut Vec<String>) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find(PLACEHOLDER_PREFIX) {
            out.push_str(&rest[..start]);
            let body_and_tail = &rest[start + PLACEHOLDER_PREFIX.len()..];

            let Some(end) = find_placeholder_end(body_and_tail) else {
                out.push_str(&rest[start..]);
                return out;
            };

            let raw_body = &body_and_tail[..end];
            let key = self.parse(raw_body, visiting);
            match self.resolve(&key, visiting) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push_str(PLACEHOLDER_PREFIX);
                    out.push_str(raw_body);
                    out.push(PLACEHOLDER_SUFFIX);
                }
            }
            rest = &body_and_tail[end + 1..];
        }

        out.push_str(rest);
        out
    }

    fn resolve(&self, key: &str, visiting: &mut Vec<String>) -> Option<String> {
        if visiting.iter().any(|k| k == key) {
            tracing::warn!(placeholder = key, "Circular placeholder reference");
            return Some(format!("!{{error: circular placeholder reference '{key}'}}"));
        }

        let resolution = match self.resolve_placeholder(key) {
            Resolution::Unresolved | Resolution::Failed(_)
                if key.contains(VALUE_SEPARATOR) =>
            {
                let (name, default) = key.split_once(VALUE_SEPARATOR)?;
                match self.resolve_placeholder(name) {
                    Resolution::Unresolved
                    | Resolution::Failed(ExpressionError::UnknownPlaceholder(_)) => {
                        Resolution::Value(default.to_string())
                    }
                    other => other,
                }
            }
            other => other,
        };

        let value = match resolution {
            Resolution::Value(value) => value,
            Resolution::Unresolved => return None,
            Resolution::Failed(error) => {
                tracing::error!(placeholder = key, error = %error, "Unable to evaluate placeholder");
                return Some(format!("!{{error: {error}}}"));
            }
        };

        visiting.push(key.to_string());
        let expanded = self.parse(&value, visiting);
        visiting.pop();
        Some(expanded)
    }

    fn resolve_placeholder(&self, name: &str) -> Resolution {
        if let Some(value) = self.values.get(name) {
            return Resolution::Value(match value {
                Some(v) => v.clone(),
                None => format!("!{{{name}-NULL}}"),
            });
        }

        if self.is_required(name) {
            return Resolution::Value(format!("!{{{name}-missing}}"));
        }

        match functions::evaluate(name, &self.values) {
            Ok(Some(value)) => Resolution::Value(value),
            Ok(None) => Resolution::Unresolved,
            Err(e) => Resolution::Failed(e),
        }
    }
}

enum Resolution {
    Value(String),
    Unresolved,
    Failed(ExpressionError),
}

/// Index of the `}` closing a placeholder body, honouring nested braces
fn find_placeholder_end(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (index, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            PLACEHOLDER_SUFFIX if depth == 0 => return Some(index),
            PLACEHOLDER_SUFFIX => depth -= 1,
            _ => {}
        }
    }
    None
}
