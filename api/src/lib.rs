pub mod apisports;
pub mod client;
pub mod espn;
pub mod extract;
pub mod places;

use serde_json::Value;

// ---------------------------------------------------------------------------
// Extraction result: what a single column lookup produced
// ---------------------------------------------------------------------------

/// Result of pulling one field out of an external record.
///
/// `Absent` is the "not there" marker: a missing key anywhere on the path,
/// a JSON `null`, or an empty array all collapse into it, so callers never
/// confuse "no data" with a real value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Field {
    /// A value read straight out of the record.
    Value(Value),
    /// Raw response body from following a `$ref` link. Left undecoded.
    Body(String),
    #[default]
    Absent,
}

impl Field {
    /// Wrap a looked-up value, folding "no data" shapes into `Absent`.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Field::Absent,
            Value::Array(items) if items.is_empty() => Field::Absent,
            other => Field::Value(other.clone()),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    /// Column value for a flat record: `Absent` becomes `null`, a raw body
    /// is stored as text.
    pub fn into_column(self) -> Value {
        match self {
            Field::Value(v) => v,
            Field::Body(text) => Value::String(text),
            Field::Absent => Value::Null,
        }
    }

    /// Decode the field as JSON. A raw body is parsed; an unparseable body
    /// counts as absent.
    pub fn decode(&self) -> Option<Value> {
        match self {
            Field::Value(v) => Some(v.clone()),
            Field::Body(text) => serde_json::from_str(text).ok(),
            Field::Absent => None,
        }
    }

    /// Render a scalar as text the way it would read in a sentence:
    /// strings without quotes, everything else in its JSON form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Field::Value(Value::String(s)) => Some(s.clone()),
            Field::Value(v) => Some(v.to_string()),
            Field::Body(text) => Some(text.clone()),
            Field::Absent => None,
        }
    }
}

/// `{"$ref": "..."}` link target, if `value` is shaped like one.
pub fn reference_url(value: &Value) -> Option<&str> {
    value.get("$ref").and_then(Value::as_str)
}
