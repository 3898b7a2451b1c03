//! Audit event model
//!
//! An [`AuditEvent`] is one NDJSON line: timestamp, event type, status and a
//! flat, insertion-ordered context of primitive values.

use crate::error::{AuditError, AuditResult};
use crate::sanitize::{clean_value, sanitize};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Outcome recorded by an audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    /// Operation was allowed
    Success,
    /// Operation was rejected
    Failure,
}

impl AuditStatus {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "success",
            AuditStatus::Failure => "failure",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primitive context value
///
/// Nested structures are unrepresentable on purpose; use
/// [`AuditContext::try_from_json`] to convert untyped input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    /// JSON null
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// String (sanitized on insertion)
    Str(String),
}

impl ContextValue {
    /// Borrow as string, if this is a string value
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ContextValue::Str(s) => Some(s),
            _ => None,
        }
    }

    fn cleaned(self) -> Self {
        match self {
            ContextValue::Str(s) => ContextValue::Str(clean_value(&s)),
            other => other,
        }
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::Str(value.to_owned())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::Str(value)
    }
}

impl From<&String> for ContextValue {
    fn from(value: &String) -> Self {
        ContextValue::Str(value.clone())
    }
}

impl From<&Path> for ContextValue {
    fn from(value: &Path) -> Self {
        ContextValue::Str(value.to_string_lossy().into_owned())
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Bool(value)
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        ContextValue::Int(value)
    }
}

impl From<i32> for ContextValue {
    fn from(value: i32) -> Self {
        ContextValue::Int(i64::from(value))
    }
}

impl From<u32> for ContextValue {
    fn from(value: u32) -> Self {
        ContextValue::Int(i64::from(value))
    }
}

impl From<u64> for ContextValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(ContextValue::Str(value.to_string()), ContextValue::Int)
    }
}

impl From<usize> for ContextValue {
    fn from(value: usize) -> Self {
        i64::try_from(value).map_or(ContextValue::Str(value.to_string()), ContextValue::Int)
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        ContextValue::Float(value)
    }
}

impl<T: Into<ContextValue>> From<Option<T>> for ContextValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ContextValue::Null, Into::into)
    }
}

/// Ordered context map of an audit event
///
/// Keys and string values are sanitized as they are inserted, so the map
/// never holds control characters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditContext(IndexMap<String, ContextValue>);

impl AuditContext {
    /// Create an empty context
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<ContextValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value, replacing any previous value for the key
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<ContextValue>) {
        self.0
            .insert(sanitize(key.as_ref()), value.into().cleaned());
    }

    /// Look up a value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.0.get(key)
    }

    /// Look up a string value
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ContextValue::as_str)
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Convert an untyped JSON object
    ///
    /// # Errors
    /// - `AuditError::ContextNotObject` if `value` is not an object
    /// - `AuditError::NonPrimitiveContext` if any member is an array or object
    pub fn try_from_json(value: Value) -> AuditResult<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => return Err(AuditError::ContextNotObject(json_type_name(&other))),
        };

        let mut ctx = Self::new();
        for (key, member) in map {
            let converted = match member {
                Value::Null => ContextValue::Null,
                Value::Bool(b) => ContextValue::Bool(b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => ContextValue::Int(i),
                    None => n
                        .as_f64()
                        .map_or_else(|| ContextValue::Str(n.to_string()), ContextValue::Float),
                },
                Value::String(s) => ContextValue::Str(s),
                nested @ (Value::Array(_) | Value::Object(_)) => {
                    return Err(AuditError::NonPrimitiveContext {
                        key,
                        found: json_type_name(&nested),
                    });
                }
            };
            ctx.insert(key, converted);
        }
        Ok(ctx)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One structured audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    #[serde(with = "rfc3339")]
    timestamp: DateTime<Utc>,
    event_type: String,
    status: AuditStatus,
    context: AuditContext,
}

impl AuditEvent {
    /// Create event stamped with the current UTC time
    ///
    /// # Errors
    /// `AuditError::InvalidEvent` if `event_type` is blank
    pub fn new(
        event_type: impl AsRef<str>,
        status: AuditStatus,
        context: AuditContext,
    ) -> AuditResult<Self> {
        let event_type = event_type.as_ref().trim();
        if event_type.is_empty() {
            return Err(AuditError::InvalidEvent(
                "event_type must not be empty".to_string(),
            ));
        }
        Ok(Self {
            // Wire format carries microseconds; keep the in-memory value identical.
            timestamp: Utc::now().trunc_subsecs(6),
            event_type: clean_value(event_type),
            status,
            context,
        })
    }

    /// Event timestamp
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Event type tag
    #[inline]
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Event status
    #[inline]
    #[must_use]
    pub fn status(&self) -> AuditStatus {
        self.status
    }

    /// Event context
    #[inline]
    #[must_use]
    pub fn context(&self) -> &AuditContext {
        &self.context
    }

    /// Serialize as a single NDJSON line (without the trailing newline)
    ///
    /// # Errors
    /// Propagates serializer failures
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

mod rfc3339 {
    use super::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn context_preserves_insertion_order() {
        let ctx = AuditContext::new()
            .with("operation", "save")
            .with("path", "docs/sessions/a.json")
            .with("reason", "traversal");
        let keys: Vec<_> = ctx.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["operation", "path", "reason"]);
    }

    #[test]
    fn context_sanitizes_keys_and_values() {
        let ctx = AuditContext::new().with("pa\nth", "evil\npath");
        assert_eq!(ctx.get_str("pa\u{FFFD}th"), Some("evil\u{FFFD}path"));
    }

    #[test]
    fn try_from_json_rejects_nested_values() {
        let err = AuditContext::try_from_json(json!({"ok": 1, "bad": {"x": 1}})).unwrap_err();
        assert!(matches!(
            err,
            AuditError::NonPrimitiveContext { ref key, found: "object" } if key == "bad"
        ));

        let err = AuditContext::try_from_json(json!({"list": [1, 2]})).unwrap_err();
        assert!(matches!(err, AuditError::NonPrimitiveContext { found: "array", .. }));
    }

    #[test]
    fn try_from_json_rejects_non_objects() {
        let err = AuditContext::try_from_json(json!("flat")).unwrap_err();
        assert!(matches!(err, AuditError::ContextNotObject("string")));
    }

    #[test]
    fn try_from_json_accepts_primitives() {
        let ctx = AuditContext::try_from_json(json!({
            "s": "v", "b": true, "i": -3, "f": 1.5, "n": null
        }))
        .unwrap();
        assert_eq!(ctx.get("b"), Some(&ContextValue::Bool(true)));
        assert_eq!(ctx.get("i"), Some(&ContextValue::Int(-3)));
        assert_eq!(ctx.get("f"), Some(&ContextValue::Float(1.5)));
        assert_eq!(ctx.get("n"), Some(&ContextValue::Null));
    }

    #[test]
    fn blank_event_type_is_rejected() {
        assert!(AuditEvent::new("  ", AuditStatus::Success, AuditContext::new()).is_err());
    }

    #[test]
    fn json_line_has_expected_shape() {
        let event = AuditEvent::new(
            "path_validation",
            AuditStatus::Failure,
            AuditContext::new().with("reason", "traversal").with("allowed", false),
        )
        .unwrap();
        let line = event.to_json_line().unwrap();
        assert!(!line.contains('\n'));

        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["event_type"], "path_validation");
        assert_eq!(parsed["status"], "failure");
        assert_eq!(parsed["context"]["reason"], "traversal");
        assert_eq!(parsed["context"]["allowed"], false);
        assert!(parsed["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn event_roundtrips_through_json() {
        let event = AuditEvent::new(
            "guard_init",
            AuditStatus::Success,
            AuditContext::new().with("mode", "test").with("roots", 3_usize),
        )
        .unwrap();
        let parsed: AuditEvent = serde_json::from_str(&event.to_json_line().unwrap()).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn option_maps_to_null() {
        let value: ContextValue = Option::<&str>::None.into();
        assert_eq!(value, ContextValue::Null);
    }
}
