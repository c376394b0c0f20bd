use super::types::{
    ColumnDef, FieldType, Identity, RecordDescriptor, ScalarType, TableSchema,
};
use crate::error::{Result, StructMapError};
use regex::Regex;
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::OnceLock;

static SQL_IDENTIFIER: OnceLock<Regex> = OnceLock::new();

fn sql_identifier() -> &'static Regex {
    SQL_IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
    })
}

/// A validated field of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedField {
    pub name: &'static str,
    pub field_type: FieldType,
    pub nullable: bool,
    pub identity: Option<Identity>,
    /// Name of the referenced record type, for reference fields.
    pub references: Option<&'static str>,
}

impl ExtractedField {
    pub fn is_identifier(&self) -> bool {
        self.identity.is_some()
    }
}

/// Validate a record descriptor and list its fields in declaration order.
///
/// Reference targets are validated too, once each, so self-referential and
/// mutually referential records terminate.
pub fn extract(descriptor: &RecordDescriptor) -> Result<Vec<ExtractedField>> {
    let mut seen = HashSet::new();
    seen.insert(descriptor.type_id);
    extract_with(descriptor, &mut seen)
}

fn extract_with(
    descriptor: &RecordDescriptor,
    seen: &mut HashSet<TypeId>,
) -> Result<Vec<ExtractedField>> {
    check_name("record", descriptor.name, descriptor.name)?;
    check_name("table", descriptor.table, descriptor.name)?;

    let identifiers: Vec<_> = descriptor
        .fields
        .iter()
        .filter(|f| f.is_identifier())
        .map(|f| f.name)
        .collect();
    match identifiers.len() {
        1 => {}
        0 => {
            return Err(StructMapError::Schema(format!(
                "{} declares no identifier field",
                descriptor.name
            )))
        }
        _ => {
            return Err(StructMapError::Schema(format!(
                "{} declares {} identifier fields ({}), expected exactly one",
                descriptor.name,
                identifiers.len(),
                identifiers.join(", ")
            )))
        }
    }

    let mut names = HashSet::new();
    let mut fields = Vec::with_capacity(descriptor.fields.len());

    for field in &descriptor.fields {
        check_name("column", field.name, descriptor.name)?;
        if !names.insert(field.name) {
            return Err(StructMapError::Schema(format!(
                "{} declares column '{}' twice",
                descriptor.name, field.name
            )));
        }

        if let Some(identity) = field.identity {
            check_identifier(descriptor.name, field.name, &field.field_type, identity)?;
            if field.nullable {
                return Err(StructMapError::Schema(format!(
                    "identifier {}.{} cannot be nullable",
                    descriptor.name, field.name
                )));
            }
        }

        let references = match &field.field_type {
            FieldType::Reference(target) => {
                if seen.insert(target.type_id) {
                    let target_descriptor = (target.describe)();
                    extract_with(&target_descriptor, seen).map_err(|e| {
                        StructMapError::Schema(format!(
                            "{}.{} references {}, which is not a valid record type: {e}",
                            descriptor.name, field.name, target.record
                        ))
                    })?;
                    check_target_identifier(descriptor.name, field.name, target, &target_descriptor)?;
                }
                Some(target.record)
            }
            _ => None,
        };

        fields.push(ExtractedField {
            name: field.name,
            field_type: field.field_type,
            nullable: field.nullable,
            identity: field.identity,
            references,
        });
    }

    Ok(fields)
}

/// Build the table schema for a record type.
pub fn build_schema(descriptor: &RecordDescriptor) -> Result<TableSchema> {
    let fields = extract(descriptor)?;

    let mut columns = Vec::with_capacity(fields.len());
    let mut id_index = 0;
    for (index, field) in fields.into_iter().enumerate() {
        if field.is_identifier() {
            id_index = index;
        }
        let references = match &field.field_type {
            FieldType::Reference(target) => {
                let target_descriptor = (target.describe)();
                let id_field = target_descriptor
                    .fields
                    .iter()
                    .find(|f| f.is_identifier())
                    .ok_or_else(|| {
                        StructMapError::Schema(format!(
                            "{} has no identifier to reference",
                            target.record
                        ))
                    })?;
                Some((target_descriptor.table, id_field.name))
            }
            _ => None,
        };
        columns.push(ColumnDef {
            name: field.name,
            sql_type: field.field_type.sql_type(),
            field_type: field.field_type,
            nullable: field.nullable,
            identity: field.identity,
            references,
        });
    }

    Ok(TableSchema::new(
        descriptor.name,
        descriptor.table,
        columns,
        id_index,
    ))
}

fn check_name(kind: &str, name: &str, record: &str) -> Result<()> {
    if sql_identifier().is_match(name) {
        Ok(())
    } else {
        Err(StructMapError::Schema(format!(
            "{kind} name '{name}' in {record} is not a valid SQL identifier"
        )))
    }
}

fn check_identifier(
    record: &str,
    field: &str,
    field_type: &FieldType,
    identity: Identity,
) -> Result<()> {
    let scalar = match field_type {
        FieldType::Scalar(scalar @ (ScalarType::Integer | ScalarType::Text)) => *scalar,
        other => {
            return Err(StructMapError::Schema(format!(
                "identifier {record}.{field} has unsupported type {other}, expected integer or text"
            )))
        }
    };
    match (scalar, identity) {
        (ScalarType::Text, Identity::AutoIncrement) => Err(StructMapError::Schema(format!(
            "identifier {record}.{field} is text and cannot auto-increment"
        ))),
        (ScalarType::Integer, Identity::Generated(strategy)) => {
            Err(StructMapError::Schema(format!(
                "identifier {record}.{field} is an integer and cannot use the {strategy:?} generator"
            )))
        }
        _ => Ok(()),
    }
}

fn check_target_identifier(
    record: &str,
    field: &str,
    target: &super::types::ReferenceTarget,
    target_descriptor: &RecordDescriptor,
) -> Result<()> {
    let declared = target_descriptor
        .fields
        .iter()
        .find(|f| f.is_identifier())
        .map(|f| f.field_type);
    if declared == Some(FieldType::Scalar(target.id_type)) {
        Ok(())
    } else {
        Err(StructMapError::Schema(format!(
            "{record}.{field} expects a {} identifier on {}",
            target.id_type, target.record
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{FieldDescriptor, ReferenceTarget, SqlType};
    use crate::value::Value;
    use crate::{DbId, ForeignKey, Record};
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Record)]
    struct Author {
        id: DbId<i64>,
        name: String,
        age: i64,
    }

    #[derive(Debug, Clone, PartialEq, Record)]
    struct Book {
        id: DbId<String>,
        author: ForeignKey<Author>,
        data: HashMap<String, i64>,
    }

    fn descriptor(name: &'static str, fields: Vec<FieldDescriptor>) -> RecordDescriptor {
        RecordDescriptor {
            name,
            table: name,
            type_id: TypeId::of::<()>(),
            fields,
        }
    }

    #[test]
    fn test_extract_derived_record() {
        let fields = extract(&Book::descriptor()).unwrap();
        assert_eq!(fields.len(), 3);
        assert!(fields[0].is_identifier());
        assert_eq!(fields[0].identity, Some(Identity::Supplied));
        assert_eq!(fields[1].references, Some("Author"));
        assert_eq!(fields[2].field_type, FieldType::Blob);
    }

    #[test]
    fn test_build_schema_column_order_and_types() {
        let schema = build_schema(&Book::descriptor()).unwrap();
        assert_eq!(schema.table, "Book");
        let names: Vec<_> = schema.columns.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["id", "author", "data"]);
        assert_eq!(schema.id_column().sql_type, SqlType::Text);
        // reference column stores the author's integer id
        assert_eq!(schema.columns[1].sql_type, SqlType::Integer);
        assert_eq!(schema.columns[1].references, Some(("Author", "id")));
        assert_eq!(schema.columns[2].sql_type, SqlType::Text);
    }

    #[test]
    fn test_integer_identifier_auto_increments() {
        let schema = build_schema(&Author::descriptor()).unwrap();
        assert_eq!(schema.id_column().identity, Some(Identity::AutoIncrement));
        assert_eq!(schema.id_index(), 0);
    }

    #[test]
    fn test_no_identifier_rejected() {
        let d = descriptor("Plain", vec![FieldDescriptor::column::<String>("name")]);
        let err = extract(&d).unwrap_err();
        assert!(matches!(err, StructMapError::Schema(ref m) if m.contains("no identifier")));
    }

    #[test]
    fn test_two_identifiers_rejected() {
        let d = descriptor(
            "Twice",
            vec![
                FieldDescriptor::identifier::<i64>("a", None),
                FieldDescriptor::identifier::<String>("b", None),
            ],
        );
        let err = extract(&d).unwrap_err();
        assert!(matches!(err, StructMapError::Schema(ref m) if m.contains("2 identifier")));
    }

    #[test]
    fn test_unsupported_identifier_type_rejected() {
        let mut id = FieldDescriptor::identifier::<i64>("id", None);
        id.field_type = FieldType::Blob;
        let d = descriptor("Blobby", vec![id]);
        assert!(matches!(extract(&d), Err(StructMapError::Schema(_))));

        let mut id = FieldDescriptor::identifier::<i64>("id", None);
        id.field_type = FieldType::Scalar(ScalarType::Real);
        let d = descriptor("Floaty", vec![id]);
        assert!(matches!(extract(&d), Err(StructMapError::Schema(_))));
    }

    #[test]
    fn test_generator_on_integer_identifier_rejected() {
        let mut id = FieldDescriptor::identifier::<i64>("id", None);
        id.identity = Some(Identity::Generated(crate::AutoIdStrategy::Ulid));
        let d = descriptor("Numbered", vec![id]);
        assert!(matches!(extract(&d), Err(StructMapError::Schema(_))));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let d = descriptor(
            "Odd",
            vec![
                FieldDescriptor::identifier::<i64>("id", None),
                FieldDescriptor::column::<String>("drop table"),
            ],
        );
        assert!(matches!(extract(&d), Err(StructMapError::Schema(_))));

        let d = RecordDescriptor {
            table: "bad-name",
            ..descriptor("Odd", vec![FieldDescriptor::identifier::<i64>("id", None)])
        };
        assert!(matches!(extract(&d), Err(StructMapError::Schema(_))));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let d = descriptor(
            "Dup",
            vec![
                FieldDescriptor::identifier::<i64>("id", None),
                FieldDescriptor::column::<String>("name"),
                FieldDescriptor::column::<i64>("name"),
            ],
        );
        let err = extract(&d).unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    struct Broken;

    impl Record for Broken {
        type Id = i64;
        const NAME: &'static str = "Broken";

        fn fields() -> Vec<FieldDescriptor> {
            vec![FieldDescriptor::column::<String>("name")]
        }

        fn id(&self) -> Option<&i64> {
            None
        }

        fn set_id(&mut self, _id: Option<i64>) {}

        fn value_at(&self, _index: usize) -> crate::Result<Value> {
            Ok(Value::Null)
        }

        fn from_row(_row: &mut crate::RowReader<'_, '_>) -> crate::Result<Self> {
            Ok(Broken)
        }
    }

    #[test]
    fn test_reference_to_invalid_record_rejected() {
        let d = descriptor(
            "Holder",
            vec![
                FieldDescriptor::identifier::<i64>("id", None),
                FieldDescriptor {
                    name: "broken",
                    field_type: FieldType::Reference(ReferenceTarget::of::<Broken>()),
                    nullable: false,
                    identity: None,
                },
            ],
        );
        let err = extract(&d).unwrap_err();
        assert!(err.to_string().contains("not a valid record type"));
    }
}
