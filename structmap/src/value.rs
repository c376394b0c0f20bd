use crate::error::{Result, StructMapError};
use crate::mapper::LoadContext;
use crate::schema::{FieldType, ScalarType};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// A field value on its way to or from a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    /// Structured blob contents, encoded by the mapper's codec when bound.
    Structured(serde_json::Value),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
            Value::Structured(_) => "structured",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Real(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Structured(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// A Rust type that can be stored in one column.
///
/// The declared field type comes from the Rust type itself, so a record's
/// descriptor and its values cannot drift apart.
pub trait Column: Sized {
    fn field_type() -> FieldType;

    fn nullable() -> bool {
        false
    }

    fn to_value(&self) -> Result<Value>;

    fn from_value(value: Value, cx: &mut LoadContext<'_>) -> Result<Self>;
}

pub(crate) fn mismatch(expected: impl fmt::Display, got: &Value) -> StructMapError {
    StructMapError::Schema(format!("expected {expected} value, got {}", got.kind()))
}

impl Column for i64 {
    fn field_type() -> FieldType {
        FieldType::Scalar(ScalarType::Integer)
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Integer(*self))
    }

    fn from_value(value: Value, _cx: &mut LoadContext<'_>) -> Result<Self> {
        match value {
            Value::Integer(n) => Ok(n),
            other => Err(mismatch(ScalarType::Integer, &other)),
        }
    }
}

impl Column for i32 {
    fn field_type() -> FieldType {
        FieldType::Scalar(ScalarType::Integer)
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Integer(i64::from(*self)))
    }

    fn from_value(value: Value, _cx: &mut LoadContext<'_>) -> Result<Self> {
        match value {
            Value::Integer(n) => i32::try_from(n).map_err(|_| {
                StructMapError::DataIntegrity(format!("stored integer {n} does not fit in i32"))
            }),
            other => Err(mismatch(ScalarType::Integer, &other)),
        }
    }
}

impl Column for f64 {
    fn field_type() -> FieldType {
        FieldType::Scalar(ScalarType::Real)
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Real(*self))
    }

    fn from_value(value: Value, _cx: &mut LoadContext<'_>) -> Result<Self> {
        match value {
            Value::Real(x) => Ok(x),
            other => Err(mismatch(ScalarType::Real, &other)),
        }
    }
}

impl Column for String {
    fn field_type() -> FieldType {
        FieldType::Scalar(ScalarType::Text)
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Text(self.clone()))
    }

    fn from_value(value: Value, _cx: &mut LoadContext<'_>) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch(ScalarType::Text, &other)),
        }
    }
}

impl Column for DateTime<Utc> {
    fn field_type() -> FieldType {
        FieldType::Scalar(ScalarType::Timestamp)
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Timestamp(*self))
    }

    fn from_value(value: Value, _cx: &mut LoadContext<'_>) -> Result<Self> {
        match value {
            Value::Timestamp(t) => Ok(t),
            other => Err(mismatch(ScalarType::Timestamp, &other)),
        }
    }
}

impl<C: Column> Column for Option<C> {
    fn field_type() -> FieldType {
        C::field_type()
    }

    fn nullable() -> bool {
        true
    }

    fn to_value(&self) -> Result<Value> {
        match self {
            Some(inner) => inner.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: Value, cx: &mut LoadContext<'_>) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => C::from_value(other, cx).map(Some),
        }
    }
}

// ── Structured blobs ─────────────────────────────────────────────

fn to_structured<T: Serialize>(value: &T) -> Result<Value> {
    Ok(Value::Structured(serde_json::to_value(value)?))
}

fn from_structured<T: DeserializeOwned>(value: Value) -> Result<T> {
    match value {
        Value::Structured(json) => serde_json::from_value(json)
            .map_err(|e| StructMapError::Codec(format!("cannot decode blob column: {e}"))),
        other => Err(mismatch("structured", &other)),
    }
}

impl<V> Column for HashMap<String, V>
where
    V: Serialize + DeserializeOwned,
{
    fn field_type() -> FieldType {
        FieldType::Blob
    }

    fn to_value(&self) -> Result<Value> {
        to_structured(self)
    }

    fn from_value(value: Value, _cx: &mut LoadContext<'_>) -> Result<Self> {
        from_structured(value)
    }
}

impl<V> Column for BTreeMap<String, V>
where
    V: Serialize + DeserializeOwned,
{
    fn field_type() -> FieldType {
        FieldType::Blob
    }

    fn to_value(&self) -> Result<Value> {
        to_structured(self)
    }

    fn from_value(value: Value, _cx: &mut LoadContext<'_>) -> Result<Self> {
        from_structured(value)
    }
}

impl Column for serde_json::Value {
    fn field_type() -> FieldType {
        FieldType::Blob
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Structured(self.clone()))
    }

    fn from_value(value: Value, _cx: &mut LoadContext<'_>) -> Result<Self> {
        match value {
            Value::Structured(json) => Ok(json),
            other => Err(mismatch("structured", &other)),
        }
    }
}

/// Stores any serde type as a structured blob column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blob<T>(pub T);

impl<T> Blob<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Blob<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Blob<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> Column for Blob<T>
where
    T: Serialize + DeserializeOwned,
{
    fn field_type() -> FieldType {
        FieldType::Blob
    }

    fn to_value(&self) -> Result<Value> {
        to_structured(&self.0)
    }

    fn from_value(value: Value, _cx: &mut LoadContext<'_>) -> Result<Self> {
        from_structured(value).map(Blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_types() {
        assert_eq!(i64::field_type(), FieldType::Scalar(ScalarType::Integer));
        assert_eq!(String::field_type(), FieldType::Scalar(ScalarType::Text));
        assert_eq!(f64::field_type(), FieldType::Scalar(ScalarType::Real));
        assert_eq!(
            <DateTime<Utc>>::field_type(),
            FieldType::Scalar(ScalarType::Timestamp)
        );
        assert_eq!(<HashMap<String, i64>>::field_type(), FieldType::Blob);
        assert_eq!(<Blob<Vec<String>>>::field_type(), FieldType::Blob);
        assert!(!String::nullable());
        assert!(<Option<String>>::nullable());
    }

    #[test]
    fn test_to_value() {
        assert_eq!(5i64.to_value().unwrap(), Value::Integer(5));
        assert_eq!(7i32.to_value().unwrap(), Value::Integer(7));
        assert_eq!(None::<f64>.to_value().unwrap(), Value::Null);

        let mut map = HashMap::new();
        map.insert("some_data".to_string(), 5i64);
        assert_eq!(
            map.to_value().unwrap(),
            Value::Structured(serde_json::json!({ "some_data": 5 }))
        );
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Integer(3).to_string(), "3");
        assert_eq!(Value::from("abc").to_string(), "\"abc\"");
        assert_eq!(Value::Null.to_string(), "NULL");
    }
}
