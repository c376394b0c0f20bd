use crate::error::{Result, StructMapError};
use crate::record::Record;
use crate::schema::{build_schema, RecordDescriptor, TableSchema};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug)]
struct Entry {
    schema: Arc<TableSchema>,
    /// Rust types accepted under this record name.
    types: Vec<TypeId>,
}

/// Catalogue of registered record types, keyed by record name.
///
/// Reads are concurrent. Writes happen only during registration, which is
/// expected to finish before the mapper is shared.
#[derive(Debug, Default)]
pub struct Registry {
    tables: RwLock<HashMap<&'static str, Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Derive and store the schema for a record type.
    ///
    /// Registering an identical schema again is a no-op, and the registering
    /// type becomes usable under that name. A different schema under an
    /// already registered name is a schema error.
    pub fn register(&self, descriptor: &RecordDescriptor) -> Result<Arc<TableSchema>> {
        let schema = build_schema(descriptor)?;

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = tables.get_mut(descriptor.name) {
            if *existing.schema == schema {
                log::warn!("{} already registered with an identical schema", descriptor.name);
                if !existing.types.contains(&descriptor.type_id) {
                    existing.types.push(descriptor.type_id);
                }
                return Ok(existing.schema.clone());
            }
            return Err(StructMapError::Schema(format!(
                "{} is already registered with a different schema",
                descriptor.name
            )));
        }
        if let Some(other) = tables.values().find(|e| e.schema.table == schema.table) {
            return Err(StructMapError::Schema(format!(
                "table {} is already mapped by {}",
                schema.table, other.schema.record
            )));
        }

        log::info!(
            "Registered {} as table {} ({} columns)",
            descriptor.name,
            schema.table,
            schema.columns.len()
        );
        let schema = Arc::new(schema);
        tables.insert(
            descriptor.name,
            Entry {
                schema: schema.clone(),
                types: vec![descriptor.type_id],
            },
        );
        Ok(schema)
    }

    /// Schema for `T`. A type whose registration was rejected is not
    /// registered, even when another type holds its name.
    pub fn schema_for<T: Record>(&self) -> Result<Arc<TableSchema>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(T::NAME)
            .filter(|entry| entry.types.contains(&TypeId::of::<T>()))
            .map(|entry| entry.schema.clone())
            .ok_or_else(|| StructMapError::NotRegistered(T::NAME.to_string()))
    }

    pub fn is_registered<T: Record>(&self) -> bool {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(T::NAME)
            .is_some_and(|entry| entry.types.contains(&TypeId::of::<T>()))
    }

    /// True when any type is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.contains_key(name)
    }

    /// Registered record names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = tables.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
