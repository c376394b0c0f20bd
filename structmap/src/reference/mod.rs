// Foreign keys: typed references between record types, stored as the
// referenced record's identifier and hydrated eagerly on load.

use crate::error::{Result, StructMapError};
use crate::mapper::LoadContext;
use crate::record::Record;
use crate::schema::{FieldType, ReferenceTarget};
use crate::value::{Column, Value};
use std::fmt;

/// A field pointing at another record.
///
/// Built from a live instance (unresolved) or produced by a load (resolved,
/// carrying the hydrated target). Either way the target must have an
/// identifier before the owning record can be written. The target is boxed,
/// so a record may reference its own type.
pub struct ForeignKey<T: Record> {
    record: Box<T>,
    resolved: bool,
}

impl<T: Record> ForeignKey<T> {
    pub fn new(record: T) -> Self {
        ForeignKey {
            record: Box::new(record),
            resolved: false,
        }
    }

    pub fn get(&self) -> &T {
        &self.record
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.record
    }

    pub fn into_inner(self) -> T {
        *self.record
    }

    /// Identifier of the referenced record, if it has one.
    pub fn id(&self) -> Option<&T::Id> {
        self.record.id()
    }

    /// True when this reference was loaded from storage.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }
}

impl<T: Record> From<T> for ForeignKey<T> {
    fn from(record: T) -> Self {
        ForeignKey::new(record)
    }
}

impl<T: Record + Clone> Clone for ForeignKey<T> {
    fn clone(&self) -> Self {
        ForeignKey {
            record: self.record.clone(),
            resolved: self.resolved,
        }
    }
}

impl<T: Record + PartialEq> PartialEq for ForeignKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record
    }
}

impl<T: Record + fmt::Debug> fmt::Debug for ForeignKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ForeignKey").field(&self.record).finish()
    }
}

/// Column value for a reference: the referenced record's identifier.
pub fn to_column_value<T: Record>(reference: &ForeignKey<T>) -> Result<Value> {
    match reference.id() {
        Some(id) => id.to_value(),
        None => Err(StructMapError::UnpersistedReference(T::NAME.to_string())),
    }
}

/// Load the referenced record for a stored identifier.
pub fn from_column_value<T: Record>(id: Value, cx: &mut LoadContext<'_>) -> Result<ForeignKey<T>> {
    match cx.load::<T>(id.clone())? {
        Some(record) => Ok(ForeignKey {
            record: Box::new(record),
            resolved: true,
        }),
        None => Err(StructMapError::ReferenceNotFound {
            table: T::TABLE.to_string(),
            id: id.to_string(),
        }),
    }
}

impl<T: Record> Column for ForeignKey<T> {
    fn field_type() -> FieldType {
        FieldType::Reference(ReferenceTarget::of::<T>())
    }

    fn to_value(&self) -> Result<Value> {
        to_column_value(self)
    }

    fn from_value(value: Value, cx: &mut LoadContext<'_>) -> Result<Self> {
        from_column_value(value, cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DbId, Record};

    #[derive(Debug, Clone, PartialEq, Record)]
    struct Author {
        id: DbId<i64>,
        name: String,
    }

    #[test]
    fn test_unpersisted_reference_rejected() {
        let author = Author {
            id: DbId::new(),
            name: "pirulo".into(),
        };
        let reference = ForeignKey::new(author);
        let err = to_column_value(&reference).unwrap_err();
        assert!(matches!(err, StructMapError::UnpersistedReference(ref name) if name == "Author"));
    }

    #[test]
    fn test_persisted_reference_yields_identifier() {
        let author = Author {
            id: DbId::from(12),
            name: "pirulo".into(),
        };
        let reference = ForeignKey::from(author);
        assert_eq!(to_column_value(&reference).unwrap(), Value::Integer(12));
        assert!(!reference.is_resolved());
    }

    #[test]
    fn test_reference_field_type() {
        match <ForeignKey<Author>>::field_type() {
            FieldType::Reference(target) => {
                assert_eq!(target.record, "Author");
                assert_eq!(target.id_type, crate::ScalarType::Integer);
            }
            other => panic!("unexpected field type {other:?}"),
        }
    }
}
