use crate::codec::BlobCodec;
use crate::error::{Result, StructMapError};
use crate::schema::{ColumnDef, FieldType, ScalarType};
use crate::value::Value;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value as SqlValue;

/// Convert a field value into a bound parameter for `column`.
///
/// The value must match the column's declared type exactly; no coercion.
pub fn bind_value(column: &ColumnDef, value: Value, codec: &dyn BlobCodec) -> Result<SqlValue> {
    let expected = match &column.field_type {
        FieldType::Scalar(scalar) => Some(*scalar),
        FieldType::Reference(target) => Some(target.id_type),
        FieldType::Blob => None,
    };

    match (expected, value) {
        (_, Value::Null) if column.nullable => Ok(SqlValue::Null),
        (_, Value::Null) => Err(StructMapError::Schema(format!(
            "cannot bind NULL to non-nullable column {}",
            column.name
        ))),
        (Some(ScalarType::Integer), Value::Integer(n)) => Ok(SqlValue::Integer(n)),
        (Some(ScalarType::Text), Value::Text(s)) => Ok(SqlValue::Text(s)),
        (Some(ScalarType::Real), Value::Real(x)) => Ok(SqlValue::Real(x)),
        (Some(ScalarType::Timestamp), Value::Timestamp(t)) => Ok(SqlValue::Text(
            t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        )),
        (None, Value::Structured(json)) => Ok(SqlValue::Text(codec.encode(&json)?)),
        (_, other) => Err(StructMapError::Schema(format!(
            "cannot bind {} value to column {} declared as {}",
            other.kind(),
            column.name,
            column.field_type
        ))),
    }
}

/// Convert a stored column value back into a field value.
pub fn decode_value(column: &ColumnDef, raw: SqlValue, codec: &dyn BlobCodec) -> Result<Value> {
    let expected = match &column.field_type {
        FieldType::Scalar(scalar) => Some(*scalar),
        FieldType::Reference(target) => Some(target.id_type),
        FieldType::Blob => None,
    };

    match (expected, raw) {
        (_, SqlValue::Null) => Ok(Value::Null),
        (Some(ScalarType::Integer), SqlValue::Integer(n)) => Ok(Value::Integer(n)),
        (Some(ScalarType::Text), SqlValue::Text(s)) => Ok(Value::Text(s)),
        (Some(ScalarType::Real), SqlValue::Real(x)) => Ok(Value::Real(x)),
        (Some(ScalarType::Timestamp), SqlValue::Text(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
            .map_err(|e| {
                StructMapError::DataIntegrity(format!(
                    "column {} holds an invalid timestamp {s:?}: {e}",
                    column.name
                ))
            }),
        (None, SqlValue::Text(s)) => codec.decode(&s).map(Value::Structured).map_err(|e| {
            StructMapError::Codec(format!(
                "column {} cannot be decoded as {}: {e}",
                column.name,
                codec.name()
            ))
        }),
        (_, other) => Err(StructMapError::DataIntegrity(format!(
            "column {} declared as {} holds a {:?} value",
            column.name,
            column.field_type,
            other.data_type()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::schema::{FieldDescriptor, SqlType};
    use chrono::TimeZone;

    fn column(field: FieldDescriptor) -> ColumnDef {
        ColumnDef {
            name: field.name,
            sql_type: field.field_type.sql_type(),
            field_type: field.field_type,
            nullable: field.nullable,
            identity: field.identity,
            references: None,
        }
    }

    #[test]
    fn test_bind_matching_scalars() {
        let age = column(FieldDescriptor::column::<i64>("age"));
        assert_eq!(
            bind_value(&age, Value::Integer(50), &JsonCodec).unwrap(),
            SqlValue::Integer(50)
        );

        let ratio = column(FieldDescriptor::column::<f64>("ratio"));
        assert_eq!(
            bind_value(&ratio, Value::Real(0.5), &JsonCodec).unwrap(),
            SqlValue::Real(0.5)
        );
    }

    #[test]
    fn test_bind_type_mismatch_is_schema_error() {
        let age = column(FieldDescriptor::column::<i64>("age"));
        let err = bind_value(&age, Value::Text("50".into()), &JsonCodec).unwrap_err();
        assert!(matches!(err, StructMapError::Schema(ref m) if m.contains("age")));

        // no silent integer -> real coercion either
        let ratio = column(FieldDescriptor::column::<f64>("ratio"));
        assert!(matches!(
            bind_value(&ratio, Value::Integer(1), &JsonCodec),
            Err(StructMapError::Schema(_))
        ));
    }

    #[test]
    fn test_bind_null() {
        let nickname = column(FieldDescriptor::column::<Option<String>>("nickname"));
        assert_eq!(
            bind_value(&nickname, Value::Null, &JsonCodec).unwrap(),
            SqlValue::Null
        );

        let name = column(FieldDescriptor::column::<String>("name"));
        assert!(matches!(
            bind_value(&name, Value::Null, &JsonCodec),
            Err(StructMapError::Schema(_))
        ));
    }

    #[test]
    fn test_timestamp_round_trip() {
        let date = column(FieldDescriptor::column::<DateTime<Utc>>("date"));
        assert_eq!(date.sql_type, SqlType::Text);
        let t = Utc.with_ymd_and_hms(2020, 2, 3, 4, 5, 6).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);

        let bound = bind_value(&date, Value::Timestamp(t), &JsonCodec).unwrap();
        assert_eq!(bound, SqlValue::Text("2020-02-03T04:05:06.123456789Z".into()));
        assert_eq!(
            decode_value(&date, bound, &JsonCodec).unwrap(),
            Value::Timestamp(t)
        );
    }

    #[test]
    fn test_blob_encoded_with_codec() {
        let data = column(FieldDescriptor::column::<serde_json::Value>("data"));
        let json = serde_json::json!({ "some_data": 5 });
        let bound = bind_value(&data, Value::Structured(json.clone()), &JsonCodec).unwrap();
        assert_eq!(bound, SqlValue::Text("{\"some_data\":5}".into()));
        assert_eq!(
            decode_value(&data, bound, &JsonCodec).unwrap(),
            Value::Structured(json)
        );
    }

    #[test]
    fn test_decode_unexpected_storage_class() {
        let age = column(FieldDescriptor::column::<i64>("age"));
        assert!(matches!(
            decode_value(&age, SqlValue::Text("x".into()), &JsonCodec),
            Err(StructMapError::DataIntegrity(_))
        ));
    }
}
