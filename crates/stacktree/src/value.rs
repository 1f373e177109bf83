//! Property values carried by resource inputs and outputs
//!
//! Engine payloads are arbitrary JSON. They are converted once, at the
//! decoding edge, into [`PropertyValue`] so the diff engine can match on a
//! closed set of shapes instead of poking at untyped JSON.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

/// Property bag keyed by property name, iterated in key order
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Key the engine uses to mark a wrapped secret value
pub const SECRET_SIGNATURE_KEY: &str = "4dabf18193072939515e22adb298388d";

/// Signature value paired with [`SECRET_SIGNATURE_KEY`] for secrets
pub const SECRET_SIGNATURE: &str = "1b47061264138c4ac30d75fd1eb44270";

/// Rendered form of a value that is only known once the change is applied
pub const COMPUTED_MARKER: &str = "[unknown]";

/// Rendered form of a masked secret
pub const SECRET_MARKER: &str = "[secret]";

static COMPUTED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("computed placeholder pattern is valid")
});

/// A JSON-like property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged, from = "serde_json::Value")]
pub enum PropertyValue {
    #[default]
    Null,
    Bool(bool),
    /// Engine numbers are doubles: integers beyond 2^53 lose precision and
    /// may compare equal to their neighbours.
    Number(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Object(PropertyMap),
}

impl PropertyValue {
    /// Whether this is a string shaped like a canonical UUID, which the
    /// engine uses for values not known until apply
    pub fn is_computed(&self) -> bool {
        matches!(self, Self::String(s) if s.len() == 36 && COMPUTED_PATTERN.is_match(s))
    }

    /// Whether this is an engine secret wrapper
    pub fn is_secret(&self) -> bool {
        match self {
            Self::Object(map) => matches!(
                map.get(SECRET_SIGNATURE_KEY),
                Some(Self::String(sig)) if sig == SECRET_SIGNATURE
            ),
            _ => false,
        }
    }

    /// The value wrapped by a secret, if this is one
    pub fn secret_value(&self) -> Option<&PropertyValue> {
        match self {
            Self::Object(map) if self.is_secret() => map.get("value"),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&PropertyMap> {
        match self {
            Self::Object(map) if !self.is_secret() => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PropertyValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Render the value for display
    ///
    /// Secrets stay masked unless `reveal_secrets` is set.
    pub fn render(&self, reveal_secrets: bool) -> String {
        let mut out = String::new();
        self.render_into(&mut out, reveal_secrets);
        out
    }

    fn render_into(&self, out: &mut String, reveal_secrets: bool) {
        if self.is_computed() {
            out.push_str(COMPUTED_MARKER);
            return;
        }
        if self.is_secret() {
            match self.secret_value() {
                Some(inner) if reveal_secrets => inner.render_into(out, reveal_secrets),
                _ => out.push_str(SECRET_MARKER),
            }
            return;
        }

        match self {
            Self::Null => out.push_str("null"),
            Self::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Self::Number(n) => out.push_str(&format_number(*n)),
            Self::String(s) => {
                out.push('"');
                out.push_str(s);
                out.push('"');
            }
            Self::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.render_into(out, reveal_secrets);
                }
                out.push(']');
            }
            Self::Object(map) => {
                if map.is_empty() {
                    out.push_str("{}");
                    return;
                }
                out.push_str("{ ");
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(key);
                    out.push_str(": ");
                    value.render_into(out, reveal_secrets);
                }
                out.push_str(" }");
            }
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

/// Format a number, dropping the fractional part when it is zero
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Convert a JSON object into a property map
///
/// Anything other than an object yields an empty map.
pub fn property_map(value: serde_json::Value) -> PropertyMap {
    match PropertyValue::from(value) {
        PropertyValue::Object(map) => map,
        _ => PropertyMap::new(),
    }
}
