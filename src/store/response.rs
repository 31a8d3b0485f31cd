//! Shapes of the `/applications/` response body.
//!
//! The backend has returned the same logical list in five different envelopes over
//! time. They are classified here, once, and never leak past the store.

use crate::model::ApplicationRecord;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum ApplicationsPayload {
    /// `[ ... ]`
    Bare(Vec<Value>),
    /// `{ "data": { "applications": [ ... ] } }`
    NestedApplications(Vec<Value>),
    /// `{ "data": [ ... ] }`
    DataList(Vec<Value>),
    /// `{ "data": { ... } }`
    DataSingle(Value),
    /// `{ "applications": [ ... ] }` or `{ "applications": { ... } }`
    Applications(Vec<Value>),
    Unrecognized,
}

/// Mirrors the truthiness check the web console used: null, false, 0 and "" are absent.
fn present(v: Option<&Value>) -> Option<&Value> {
    v.filter(|v| match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        _ => true,
    })
}

impl From<Value> for ApplicationsPayload {
    fn from(value: Value) -> Self {
        let mut obj = match value {
            Value::Array(items) => return ApplicationsPayload::Bare(items),
            Value::Object(obj) => obj,
            _ => return ApplicationsPayload::Unrecognized,
        };

        if present(obj.get("data")).is_some() {
            let data = obj.remove("data").unwrap_or(Value::Null);
            return match data {
                Value::Object(mut inner)
                    if matches!(inner.get("applications"), Some(Value::Array(_))) =>
                {
                    match inner.remove("applications") {
                        Some(Value::Array(items)) => ApplicationsPayload::NestedApplications(items),
                        _ => ApplicationsPayload::Unrecognized,
                    }
                }
                Value::Array(items) => ApplicationsPayload::DataList(items),
                single => ApplicationsPayload::DataSingle(single),
            };
        }

        if present(obj.get("applications")).is_some() {
            return match obj.remove("applications") {
                Some(Value::Array(items)) => ApplicationsPayload::Applications(items),
                Some(single) => ApplicationsPayload::Applications(vec![single]),
                None => ApplicationsPayload::Unrecognized,
            };
        }

        ApplicationsPayload::Unrecognized
    }
}

impl ApplicationsPayload {
    pub fn shape(&self) -> &'static str {
        match self {
            ApplicationsPayload::Bare(_) => "array",
            ApplicationsPayload::NestedApplications(_) => "data.applications",
            ApplicationsPayload::DataList(_) => "data[]",
            ApplicationsPayload::DataSingle(_) => "data{}",
            ApplicationsPayload::Applications(_) => "applications",
            ApplicationsPayload::Unrecognized => "unrecognized",
        }
    }

    /// Flatten into records in response order. Entries that are not objects are dropped.
    pub fn into_records(self) -> Vec<ApplicationRecord> {
        let items = match self {
            ApplicationsPayload::Bare(items)
            | ApplicationsPayload::NestedApplications(items)
            | ApplicationsPayload::DataList(items)
            | ApplicationsPayload::Applications(items) => items,
            ApplicationsPayload::DataSingle(single) => vec![single],
            ApplicationsPayload::Unrecognized => Vec::new(),
        };

        items
            .into_iter()
            .enumerate()
            .filter_map(|(idx, item)| {
                if !item.is_object() {
                    debug!(idx, "skipping non-object application entry");
                    return None;
                }
                match serde_json::from_value::<ApplicationRecord>(item) {
                    Ok(r) => Some(r),
                    Err(e) => {
                        debug!(idx, error = %e, "skipping unreadable application entry");
                        None
                    }
                }
            })
            .collect()
    }
}
