mod load;

pub use load::{LoadContext, RowReader};

use crate::codec::BlobCodec;
use crate::config::MapperConfig;
use crate::connection::{ConnectionFactory, SqliteFactory};
use crate::error::{Result, StructMapError};
use crate::record::{Identifier, Record};
use crate::registry::Registry;
use crate::schema::{ColumnDef, Identity, TableSchema};
use crate::sql;
use crate::value::{Column, Value};
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Which fields an update writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fields<'a> {
    /// Every field except the identifier.
    #[default]
    All,
    /// Only the named columns. A field renamed with
    /// `#[structmap(column = "...")]` is named by its column.
    Only(&'a [&'a str]),
}

/// The entry point: a registry of record types plus the connection factory
/// every operation runs through.
///
/// Each operation opens one connection from the factory and issues its
/// statements on it. Nothing spans operations; there are no transactions.
pub struct Mapper {
    factory: Box<dyn ConnectionFactory>,
    registry: Registry,
    codec: Box<dyn BlobCodec>,
    config: MapperConfig,
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("registry", &self.registry)
            .field("codec", &self.codec)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Mapper {
    pub fn new(factory: impl ConnectionFactory + 'static) -> Self {
        Mapper::with_config(factory, MapperConfig::default())
    }

    pub fn with_config(factory: impl ConnectionFactory + 'static, config: MapperConfig) -> Self {
        Mapper {
            factory: Box::new(factory),
            registry: Registry::new(),
            codec: config.blob_codec.codec(),
            config,
        }
    }

    /// Build a mapper over the SQLite file named in the config.
    pub fn from_config(config: MapperConfig) -> Result<Self> {
        config.validate()?;
        let path = config.database.clone().ok_or_else(|| {
            StructMapError::Config("no database path configured".into())
        })?;
        let mut factory =
            SqliteFactory::new(path).enforce_foreign_keys(config.enforce_foreign_keys);
        if let Some(ms) = config.busy_timeout_ms {
            factory = factory.busy_timeout(Duration::from_millis(ms));
        }
        Ok(Mapper::with_config(factory, config))
    }

    /// Replace the blob codec. Existing blob columns must already use it.
    pub fn with_codec(mut self, codec: impl BlobCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn codec(&self) -> &dyn BlobCodec {
        self.codec.as_ref()
    }

    fn connect(&self) -> Result<Connection> {
        self.factory
            .connect()
            .map_err(StructMapError::execution("opening a connection"))
    }

    // ── Registry ─────────────────────────────────────────────────────

    /// Register a record type, deriving its table schema.
    pub fn register<T: Record>(&self) -> Result<Arc<TableSchema>> {
        self.registry.register(&T::descriptor())
    }

    pub fn schema_for<T: Record>(&self) -> Result<Arc<TableSchema>> {
        self.registry.schema_for::<T>()
    }

    pub fn is_registered<T: Record>(&self) -> bool {
        self.registry.is_registered::<T>()
    }

    /// Names of all registered record types, sorted.
    pub fn registered(&self) -> Vec<&'static str> {
        self.registry.names()
    }

    // ── Table lifecycle ──────────────────────────────────────────────

    pub fn create_table<T: Record>(&self) -> Result<()> {
        let schema = self.schema_for::<T>()?;
        let sql = sql::create_table(&schema, self.config.foreign_key_constraints);
        self.execute(&sql, &[], format!("creating table {}", schema.table))?;
        log::info!("Created table {}", schema.table);
        Ok(())
    }

    pub fn drop_table<T: Record>(&self) -> Result<()> {
        let schema = self.schema_for::<T>()?;
        let sql = sql::drop_table(&schema);
        self.execute(&sql, &[], format!("dropping table {}", schema.table))?;
        log::info!("Dropped table {}", schema.table);
        Ok(())
    }

    /// Delete every row of a table. Returns the number of rows removed.
    pub fn clear_table<T: Record>(&self) -> Result<usize> {
        let schema = self.schema_for::<T>()?;
        let sql = sql::clear(&schema);
        self.execute(&sql, &[], format!("clearing table {}", schema.table))
    }

    // ── CRUD ─────────────────────────────────────────────────────────

    /// Insert a record and return its identifier.
    ///
    /// When the identifier is backend-assigned or generated, it is written
    /// back into `record`.
    pub fn insert<T: Record>(&self, record: &mut T) -> Result<T::Id> {
        let schema = self.schema_for::<T>()?;
        let id_column = schema.id_column();

        // a generated id reaches the record only once the row exists
        let mut generated = None;
        if record.id().is_none() {
            match id_column.identity {
                Some(Identity::Generated(strategy)) => {
                    generated = Some(T::Id::from_id_value(Value::Text(strategy.generate()))?);
                }
                Some(Identity::Supplied) => {
                    return Err(StructMapError::Schema(format!(
                        "identifier {}.{} must be set before insert",
                        T::NAME,
                        id_column.name
                    )))
                }
                _ => {}
            }
        }

        let mut columns: Vec<&ColumnDef> = Vec::with_capacity(schema.columns.len());
        let mut params = Vec::with_capacity(schema.columns.len());
        for (index, column) in schema.columns.iter().enumerate() {
            let value = match &generated {
                Some(id) if column.is_identifier() => id.to_value()?,
                _ => record.value_at(index)?,
            };
            if column.is_identifier() && value.is_null() {
                continue;
            }
            params.push(sql::bind_value(column, value, self.codec())?);
            columns.push(column);
        }

        let sql = sql::insert(&schema, &columns);
        let conn = self.connect()?;
        log::debug!("{sql}");
        conn.execute(&sql, rusqlite::params_from_iter(params.iter()))
            .map_err(StructMapError::execution(format!(
                "inserting into {}",
                schema.table
            )))?;

        let id = match generated.or_else(|| record.id().cloned()) {
            Some(id) => id,
            None => T::Id::from_id_value(Value::Integer(conn.last_insert_rowid()))?,
        };
        record.set_id(Some(id.clone()));
        Ok(id)
    }

    /// Load a record by identifier. A missing row is `Ok(None)`.
    pub fn select_one<T: Record>(&self, id: &T::Id) -> Result<Option<T>> {
        let id = id.to_value()?;
        let conn = self.connect()?;
        let mut cx = LoadContext::new(self, &conn);
        cx.load::<T>(id)
    }

    /// Load every record of a type, ordered by identifier.
    pub fn select_all<T: Record>(&self) -> Result<Vec<T>> {
        let conn = self.connect()?;
        let mut cx = LoadContext::new(self, &conn);
        cx.load_all::<T>()
    }

    pub fn exists<T: Record>(&self, id: &T::Id) -> Result<bool> {
        let schema = self.schema_for::<T>()?;
        let id = sql::bind_value(schema.id_column(), id.to_value()?, self.codec())?;
        let sql = sql::count_by_id(&schema);
        let conn = self.connect()?;
        log::debug!("{sql}");
        let count: i64 = conn
            .query_row(&sql, [id], |row| row.get(0))
            .map_err(StructMapError::execution(format!(
                "counting rows in {}",
                schema.table
            )))?;
        Ok(count > 0)
    }

    /// Write the selected fields of a stored record.
    ///
    /// The statement applies all of the fields or none of them; a record
    /// whose row no longer exists is an execution error.
    pub fn update<T: Record>(&self, record: &T, fields: Fields<'_>) -> Result<()> {
        let schema = self.schema_for::<T>()?;
        let id = record
            .id()
            .ok_or_else(|| StructMapError::NotPersisted(T::NAME.to_string()))?;

        let selected = select_columns(&schema, fields)?;
        if selected.is_empty() {
            return Err(StructMapError::Schema(format!(
                "update of {} names no fields",
                T::NAME
            )));
        }

        let mut columns = Vec::with_capacity(selected.len());
        let mut params = Vec::with_capacity(selected.len() + 1);
        for index in selected {
            let column = &schema.columns[index];
            params.push(sql::bind_value(column, record.value_at(index)?, self.codec())?);
            columns.push(column);
        }
        params.push(sql::bind_value(schema.id_column(), id.to_value()?, self.codec())?);

        let sql = sql::update(&schema, &columns);
        let changed = self.execute(&sql, &params, format!("updating {}", schema.table))?;
        if changed == 0 {
            return Err(StructMapError::Execution {
                context: format!("updating {} with id {:?}", schema.table, id),
                source: rusqlite::Error::QueryReturnedNoRows,
            });
        }
        Ok(())
    }

    /// Delete a stored record's row and clear its identifier.
    pub fn delete<T: Record>(&self, record: &mut T) -> Result<()> {
        let schema = self.schema_for::<T>()?;
        let id = record
            .id()
            .ok_or_else(|| StructMapError::NotPersisted(T::NAME.to_string()))?;
        let param = sql::bind_value(schema.id_column(), id.to_value()?, self.codec())?;

        let sql = sql::delete(&schema);
        let changed = self.execute(&sql, &[param], format!("deleting from {}", schema.table))?;
        if changed == 0 {
            return Err(StructMapError::Execution {
                context: format!("deleting from {} with id {:?}", schema.table, id),
                source: rusqlite::Error::QueryReturnedNoRows,
            });
        }
        record.set_id(None);
        Ok(())
    }

    /// The identifier of a record of a registered type.
    pub fn get_identifier<T: Record>(&self, record: &T) -> Result<Option<T::Id>> {
        if !self.is_registered::<T>() {
            return Err(StructMapError::NotRegistered(T::NAME.to_string()));
        }
        Ok(record.id().cloned())
    }

    fn execute(&self, sql: &str, params: &[SqlValue], context: String) -> Result<usize> {
        let conn = self.connect()?;
        log::debug!("{sql}");
        conn.execute(sql, rusqlite::params_from_iter(params.iter()))
            .map_err(StructMapError::execution(context))
    }
}

/// Column indexes written by an update, in schema order.
fn select_columns(schema: &TableSchema, fields: Fields<'_>) -> Result<Vec<usize>> {
    match fields {
        Fields::All => Ok(schema.data_columns().map(|(index, _)| index).collect()),
        Fields::Only(names) => {
            let mut selected = Vec::with_capacity(names.len());
            for name in names {
                let index = schema.column_index(name).ok_or_else(|| {
                    StructMapError::Schema(format!("{} has no field named {name}", schema.record))
                })?;
                if schema.columns[index].is_identifier() {
                    return Err(StructMapError::Schema(format!(
                        "identifier {}.{name} cannot be updated",
                        schema.record
                    )));
                }
                selected.push(index);
            }
            selected.sort_unstable();
            selected.dedup();
            Ok(selected)
        }
    }
}
