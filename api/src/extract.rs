//! Best-effort field lookup over decoded API records.
//!
//! External schemas are sparse and undocumented, so a missing key is never an
//! error here: it resolves to [`Field::Absent`] and the caller stores `null`.
//! The only failures that surface are network/HTTP failures while following
//! a `$ref` link.

use crate::client::{ApiResult, HttpClient};
use crate::{Field, reference_url};
use serde_json::Value;

/// Field name whose value is an address-like object rendered as
/// `"city, state, country"`.
pub const BIRTHPLACE: &str = "birthplace";

/// Where a column's value lives inside an external record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    /// Object to step into before reading `key`.
    pub subpath: Option<&'static str>,
    /// Treat `key` as a `{"$ref": url}` link and return the fetched body.
    pub dereference: bool,
}

impl FieldSpec {
    pub const fn plain(key: &'static str) -> Self {
        Self { key, subpath: None, dereference: false }
    }

    pub const fn reference(key: &'static str) -> Self {
        Self { key, subpath: None, dereference: true }
    }

    pub const fn nested(subpath: &'static str, key: &'static str) -> Self {
        Self { key, subpath: Some(subpath), dereference: false }
    }

    pub const fn nested_reference(subpath: &'static str, key: &'static str) -> Self {
        Self { key, subpath: Some(subpath), dereference: true }
    }
}

/// Look up `key` (optionally inside `record[subpath]`) without any network
/// access.
pub fn lookup(record: &Value, key: &str, subpath: Option<&str>) -> Field {
    let Some(record) = scope(record, subpath) else {
        return Field::Absent;
    };

    if key == BIRTHPLACE {
        return birthplace(record);
    }

    record.get(key).map(Field::from_value).unwrap_or_default()
}

/// Resolve `spec` against `record`, following a `$ref` link when asked to.
///
/// A dereference issues exactly one GET and hands back the raw body; when the
/// link itself is missing no request is made. A link answering 404 counts as
/// absent, any other failure is an error.
pub async fn extract(client: &HttpClient, record: &Value, spec: &FieldSpec) -> ApiResult<Field> {
    if !spec.dereference {
        return Ok(lookup(record, spec.key, spec.subpath));
    }

    let url = scope(record, spec.subpath)
        .and_then(|r| r.get(spec.key))
        .and_then(reference_url);

    match url {
        Some(url) => Ok(client
            .get_text_if_found(url)
            .await?
            .map(Field::Body)
            .unwrap_or_default()),
        None => Ok(Field::Absent),
    }
}

fn scope<'a>(record: &'a Value, subpath: Option<&str>) -> Option<&'a Value> {
    match subpath {
        Some(path) if !path.is_empty() => record.get(path),
        _ => Some(record),
    }
}

fn birthplace(record: &Value) -> Field {
    let Some(place) = record.get(BIRTHPLACE) else {
        return Field::Absent;
    };

    let part = |key: &str| {
        place
            .get(key)
            .map(Field::from_value)
            .and_then(|f| f.as_text())
    };

    match (part("city"), part("state"), part("country")) {
        (Some(city), Some(state), Some(country)) => {
            Field::Value(Value::String(format!("{city}, {state}, {country}")))
        }
        _ => Field::Absent,
    }
}
