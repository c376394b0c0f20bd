use crate::record::{Identifier, Record};
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::fmt;

/// Scalar semantic types a field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Integer,
    Text,
    Real,
    Timestamp,
}

impl ScalarType {
    /// Column type used to store this scalar. Timestamps are RFC 3339 text.
    pub fn sql_type(self) -> SqlType {
        match self {
            ScalarType::Integer => SqlType::Integer,
            ScalarType::Text | ScalarType::Timestamp => SqlType::Text,
            ScalarType::Real => SqlType::Real,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Integer => "integer",
            ScalarType::Text => "text",
            ScalarType::Real => "real",
            ScalarType::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// SQL column types emitted in DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Integer,
    Text,
    Real,
}

impl SqlType {
    pub fn as_sql(self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Text => "TEXT",
            SqlType::Real => "REAL",
        }
    }
}

/// Strategy for generating text identifiers before insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoIdStrategy {
    Ulid,
    Uuid,
    Nanoid,
}

impl AutoIdStrategy {
    pub fn generate(self) -> String {
        match self {
            AutoIdStrategy::Ulid => ulid::Ulid::new().to_string().to_lowercase(),
            AutoIdStrategy::Uuid => uuid::Uuid::new_v4().to_string(),
            AutoIdStrategy::Nanoid => nanoid::nanoid!(),
        }
    }
}

/// How the identifier column gets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Backend-assigned integer row id, captured after insert.
    AutoIncrement,
    /// Set by the caller before insert.
    Supplied,
    /// Generated by the mapper before insert.
    Generated(AutoIdStrategy),
}

/// The record a reference field points at.
///
/// The target's own fields are only reachable through `describe`, so
/// self-referential records can be described without recursing.
#[derive(Clone, Copy)]
pub struct ReferenceTarget {
    pub record: &'static str,
    pub table: &'static str,
    pub type_id: TypeId,
    pub id_type: ScalarType,
    pub describe: fn() -> RecordDescriptor,
}

impl ReferenceTarget {
    pub fn of<T: Record>() -> Self {
        ReferenceTarget {
            record: T::NAME,
            table: T::TABLE,
            type_id: TypeId::of::<T>(),
            id_type: <T::Id as Identifier>::SCALAR,
            describe: T::descriptor,
        }
    }
}

impl PartialEq for ReferenceTarget {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
            && self.record == other.record
            && self.table == other.table
            && self.id_type == other.id_type
    }
}

impl fmt::Debug for ReferenceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceTarget")
            .field("record", &self.record)
            .field("table", &self.table)
            .field("id_type", &self.id_type)
            .finish()
    }
}

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldType {
    Scalar(ScalarType),
    /// Structured value stored as one encoded text column.
    Blob,
    Reference(ReferenceTarget),
}

impl FieldType {
    /// Stored column type. A reference stores the target's identifier type.
    pub fn sql_type(&self) -> SqlType {
        match self {
            FieldType::Scalar(scalar) => scalar.sql_type(),
            FieldType::Blob => SqlType::Text,
            FieldType::Reference(target) => target.id_type.sql_type(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(scalar) => write!(f, "{scalar}"),
            FieldType::Blob => f.write_str("blob"),
            FieldType::Reference(target) => write!(f, "reference to {}", target.record),
        }
    }
}

/// Declared description of one field of a record type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub field_type: FieldType,
    pub nullable: bool,
    /// Set on the identifier field only.
    pub identity: Option<Identity>,
}

impl FieldDescriptor {
    /// A plain column whose type is declared by its Rust type.
    pub fn column<C: crate::value::Column>(name: &'static str) -> Self {
        FieldDescriptor {
            name,
            field_type: C::field_type(),
            nullable: C::nullable(),
            identity: None,
        }
    }

    /// The identifier column. Integer ids are backend-assigned unless a
    /// strategy is given; text ids are caller-supplied unless a strategy is given.
    pub fn identifier<I: Identifier>(name: &'static str, strategy: Option<AutoIdStrategy>) -> Self {
        let identity = match (I::SCALAR, strategy) {
            (_, Some(strategy)) => Identity::Generated(strategy),
            (ScalarType::Integer, None) => Identity::AutoIncrement,
            _ => Identity::Supplied,
        };
        FieldDescriptor {
            name,
            field_type: FieldType::Scalar(I::SCALAR),
            nullable: false,
            identity: Some(identity),
        }
    }

    pub fn is_identifier(&self) -> bool {
        self.identity.is_some()
    }
}

/// Everything a record type declares about itself.
#[derive(Debug, Clone)]
pub struct RecordDescriptor {
    pub name: &'static str,
    pub table: &'static str,
    pub type_id: TypeId,
    pub fields: Vec<FieldDescriptor>,
}

/// One column of a derived table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub field_type: FieldType,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub identity: Option<Identity>,
    /// `(table, column)` of the referenced identifier, for reference columns.
    pub references: Option<(&'static str, &'static str)>,
}

impl ColumnDef {
    pub fn is_identifier(&self) -> bool {
        self.identity.is_some()
    }
}

/// Relational mapping of a record type. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub record: &'static str,
    pub table: &'static str,
    pub columns: Vec<ColumnDef>,
    id_index: usize,
}

impl TableSchema {
    pub(crate) fn new(
        record: &'static str,
        table: &'static str,
        columns: Vec<ColumnDef>,
        id_index: usize,
    ) -> Self {
        TableSchema {
            record,
            table,
            columns,
            id_index,
        }
    }

    pub fn id_column(&self) -> &ColumnDef {
        &self.columns[self.id_index]
    }

    pub fn id_index(&self) -> usize {
        self.id_index
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Every column except the identifier, in declaration order.
    pub fn data_columns(&self) -> impl Iterator<Item = (usize, &ColumnDef)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_identifier())
    }
}
