use crate::error::{Result, StructMapError};
use crate::mapper::{LoadContext, RowReader};
use crate::schema::{FieldDescriptor, FieldType, RecordDescriptor, ScalarType};
use crate::value::{mismatch, Column, Value};
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::fmt;

/// A struct that maps onto one table.
///
/// Usually written by `#[derive(Record)]`. A hand-written impl lists its
/// fields in declaration order and keeps `value_at` and `from_row` in that
/// same order.
pub trait Record: Sized + 'static {
    type Id: Identifier;

    /// Record type name. Registration conflicts are detected by this name.
    const NAME: &'static str;

    const TABLE: &'static str = Self::NAME;

    fn fields() -> Vec<FieldDescriptor>;

    fn id(&self) -> Option<&Self::Id>;

    fn set_id(&mut self, id: Option<Self::Id>);

    /// Column value of the field at `index`.
    fn value_at(&self, index: usize) -> Result<Value>;

    /// Rebuild a record from a row, reading fields in declaration order.
    fn from_row(row: &mut RowReader<'_, '_>) -> Result<Self>;

    fn descriptor() -> RecordDescriptor {
        RecordDescriptor {
            name: Self::NAME,
            table: Self::TABLE,
            type_id: TypeId::of::<Self>(),
            fields: Self::fields(),
        }
    }
}

/// A scalar type usable as a record identifier.
pub trait Identifier: Column + Clone + PartialEq + fmt::Debug + 'static {
    const SCALAR: ScalarType;

    fn from_id_value(value: Value) -> Result<Self>;
}

impl Identifier for i64 {
    const SCALAR: ScalarType = ScalarType::Integer;

    fn from_id_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(n) => Ok(n),
            other => Err(mismatch(ScalarType::Integer, &other)),
        }
    }
}

impl Identifier for String {
    const SCALAR: ScalarType = ScalarType::Text;

    fn from_id_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch(ScalarType::Text, &other)),
        }
    }
}

/// Identifier slot of a record: empty until the record is stored (or the
/// caller supplies a value).
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DbId<I>(Option<I>);

impl<I> DbId<I> {
    pub fn new() -> Self {
        DbId(None)
    }

    pub fn get(&self) -> Option<&I> {
        self.0.as_ref()
    }

    pub fn set(&mut self, id: Option<I>) {
        self.0 = id;
    }

    pub fn take(&mut self) -> Option<I> {
        self.0.take()
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

impl<I> From<I> for DbId<I> {
    fn from(id: I) -> Self {
        DbId(Some(id))
    }
}

impl From<&str> for DbId<String> {
    fn from(id: &str) -> Self {
        DbId(Some(id.to_string()))
    }
}

impl<I: fmt::Debug> fmt::Debug for DbId<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(id) => write!(f, "DbId({id:?})"),
            None => f.write_str("DbId(unset)"),
        }
    }
}

/// Names the identifier type wrapped by an identifier field type.
pub trait IdField {
    type Id: Identifier;
}

impl<I: Identifier> IdField for DbId<I> {
    type Id = I;
}

impl<I: Identifier> Column for DbId<I> {
    fn field_type() -> FieldType {
        FieldType::Scalar(I::SCALAR)
    }

    fn to_value(&self) -> Result<Value> {
        match &self.0 {
            Some(id) => id.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: Value, _cx: &mut LoadContext<'_>) -> Result<Self> {
        match value {
            Value::Null => Err(StructMapError::DataIntegrity(
                "stored row has a NULL identifier".into(),
            )),
            other => I::from_id_value(other).map(|id| DbId(Some(id))),
        }
    }
}
