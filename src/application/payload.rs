//! Typed edit payload, parsed once at the boundary.
//!
//! A payload is either an array of lines or an object `{ "lines": [...] }`.
//! Each line carries its scalar fields plus three control keys:
//!
//! ```text
//! changed   (alias _changed)   true on the single line the user edited
//! original  (alias _original)  snapshot of that line before the edit
//! children  (alias subLines)   sub-lines; absent means "not sent"
//! ```

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::LineData;

const CHANGED_KEYS: [&str; 2] = ["changed", "_changed"];
const ORIGINAL_KEYS: [&str; 2] = ["original", "_original"];
const CHILDREN_KEYS: [&str; 2] = ["children", "subLines"];

/// Quantity and price of the edited line as they were before the edit.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// The line flagged as changed by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct EditedLine {
    pub current: LineData,
    pub baseline: Option<Baseline>,
    pub children: Option<Vec<EditPayload>>,
}

/// Any other line of the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct UntouchedLine {
    pub current: LineData,
    pub children: Option<Vec<EditPayload>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditPayload {
    Edited(EditedLine),
    Untouched(UntouchedLine),
}

impl EditPayload {
    pub fn current(&self) -> &LineData {
        match self {
            EditPayload::Edited(line) => &line.current,
            EditPayload::Untouched(line) => &line.current,
        }
    }

    pub fn children(&self) -> Option<&[EditPayload]> {
        match self {
            EditPayload::Edited(line) => line.children.as_deref(),
            EditPayload::Untouched(line) => line.children.as_deref(),
        }
    }

    pub fn is_edited(&self) -> bool {
        matches!(self, EditPayload::Edited(_))
    }
}

/// Parse a payload document from JSON text.
pub fn parse_payload_str(text: &str) -> ApplicationResult<Vec<EditPayload>> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ApplicationError::malformed("$", e.to_string()))?;
    parse_payload(&value)
}

/// Parse a payload document; fails on the first malformed line, before any mutation.
#[instrument(level = "debug", skip_all)]
pub fn parse_payload(value: &Value) -> ApplicationResult<Vec<EditPayload>> {
    match value {
        Value::Array(_) => parse_lines(value, "$"),
        Value::Object(map) => match map.get("lines") {
            Some(lines) => parse_lines(lines, "$.lines"),
            None => Err(ApplicationError::malformed("$", "expected an array of lines or a \"lines\" key")),
        },
        _ => Err(ApplicationError::malformed("$", "expected an array or an object")),
    }
}

fn parse_lines(value: &Value, path: &str) -> ApplicationResult<Vec<EditPayload>> {
    let Value::Array(items) = value else {
        return Err(ApplicationError::malformed(path, "expected an array of lines"));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_line(item, &format!("{path}[{i}]")))
        .collect()
}

fn parse_line(value: &Value, path: &str) -> ApplicationResult<EditPayload> {
    let Value::Object(map) = value else {
        return Err(ApplicationError::malformed(path, "expected a line object"));
    };

    let changed = CHANGED_KEYS
        .iter()
        .any(|key| matches!(map.get(*key), Some(Value::Bool(true))));

    let scalars: Map<String, Value> = map
        .iter()
        .filter(|(key, _)| !is_control_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let current: LineData = serde_json::from_value(Value::Object(scalars))
        .map_err(|e| ApplicationError::malformed(path, e.to_string()))?;
    if !current.has_identity() {
        return Err(ApplicationError::malformed(path, "line needs an id or a clientId"));
    }

    let children = match first_present(map, &CHILDREN_KEYS) {
        Some((key, children)) => Some(parse_lines(children, &format!("{path}.{key}"))?),
        None => None,
    };

    if !changed {
        return Ok(EditPayload::Untouched(UntouchedLine { current, children }));
    }

    for field in ["quantity", "price"] {
        if !matches!(map.get(field), Some(v) if !v.is_null()) {
            return Err(ApplicationError::malformed(path, format!("edited line is missing {field}")));
        }
    }
    let baseline = match first_present(map, &ORIGINAL_KEYS) {
        Some((key, original)) => Some(
            Baseline::deserialize(original)
                .map_err(|e| ApplicationError::malformed(format!("{path}.{key}"), e.to_string()))?,
        ),
        None => None,
    };

    Ok(EditPayload::Edited(EditedLine {
        current,
        baseline,
        children,
    }))
}

fn is_control_key(key: &str) -> bool {
    CHANGED_KEYS.contains(&key) || ORIGINAL_KEYS.contains(&key) || CHILDREN_KEYS.contains(&key)
}

/// First of `keys` holding a non-null value.
fn first_present<'a>(map: &'a Map<String, Value>, keys: &[&'static str]) -> Option<(&'static str, &'a Value)> {
    keys.iter()
        .find_map(|&key| map.get(key).filter(|v| !v.is_null()).map(|v| (key, v)))
}
