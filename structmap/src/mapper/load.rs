use super::Mapper;
use crate::error::{Result, StructMapError};
use crate::record::Record;
use crate::schema::TableSchema;
use crate::sql;
use crate::value::{Column, Value};
use rusqlite::Connection;

/// State of one load: the connection it runs on and the chain of rows
/// currently being hydrated, used to stop on reference cycles.
pub struct LoadContext<'a> {
    mapper: &'a Mapper,
    conn: &'a Connection,
    chain: Vec<(&'static str, Value)>,
}

impl<'a> LoadContext<'a> {
    pub(crate) fn new(mapper: &'a Mapper, conn: &'a Connection) -> Self {
        LoadContext {
            mapper,
            conn,
            chain: Vec::new(),
        }
    }

    /// Load one record by identifier, hydrating its references.
    pub fn load<T: Record>(&mut self, id: Value) -> Result<Option<T>> {
        let schema = self.mapper.schema_for::<T>()?;
        let id_param = sql::bind_value(schema.id_column(), id.clone(), self.mapper.codec())?;

        let sql = sql::select_by_id(&schema);
        log::debug!("{sql}");
        let mut rows = self.fetch(&schema, &sql, [id_param])?;
        match rows.len() {
            0 => Ok(None),
            1 => {
                let values = rows.pop().unwrap_or_default();
                self.hydrate::<T>(&schema, id, values).map(Some)
            }
            n => Err(StructMapError::DataIntegrity(format!(
                "{} rows in {} share identifier {id}",
                n, schema.table
            ))),
        }
    }

    /// Load every row of a table, ordered by identifier.
    pub(crate) fn load_all<T: Record>(&mut self) -> Result<Vec<T>> {
        let schema = self.mapper.schema_for::<T>()?;
        let sql = sql::select_all(&schema);
        log::debug!("{sql}");
        let rows = self.fetch(&schema, &sql, [])?;

        let mut records = Vec::with_capacity(rows.len());
        for values in rows {
            let id = values
                .get(schema.id_index())
                .cloned()
                .unwrap_or(Value::Null);
            records.push(self.hydrate::<T>(&schema, id, values)?);
        }
        Ok(records)
    }

    fn fetch<P: rusqlite::Params>(
        &self,
        schema: &TableSchema,
        sql: &str,
        params: P,
    ) -> Result<Vec<Vec<Value>>> {
        let context = format!("selecting from {}", schema.table);
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(StructMapError::execution(context.clone()))?;
        let mut rows = stmt
            .query(params)
            .map_err(StructMapError::execution(context.clone()))?;

        let mut result = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(StructMapError::execution(context.clone()))?
        {
            let mut values = Vec::with_capacity(schema.columns.len());
            for (i, column) in schema.columns.iter().enumerate() {
                let raw: rusqlite::types::Value = row
                    .get(i)
                    .map_err(StructMapError::execution(context.clone()))?;
                values.push(sql::decode_value(column, raw, self.mapper.codec())?);
            }
            result.push(values);
        }
        Ok(result)
    }

    fn hydrate<T: Record>(
        &mut self,
        schema: &TableSchema,
        id: Value,
        values: Vec<Value>,
    ) -> Result<T> {
        let key = (schema.table, id);
        if let Some(start) = self.chain.iter().position(|entry| *entry == key) {
            let mut path: Vec<String> = self.chain[start..]
                .iter()
                .map(|(table, id)| format!("{table}({id})"))
                .collect();
            path.push(format!("{}({})", key.0, key.1));
            log::warn!("Reference cycle while loading: {}", path.join(" -> "));
            return Err(StructMapError::CyclicReference(path.join(" -> ")));
        }
        let max_depth = self.mapper.config().max_reference_depth;
        // chain length is the number of reference hops taken to reach this row
        if self.chain.len() > max_depth {
            return Err(StructMapError::ReferenceDepthExceeded(max_depth));
        }

        self.chain.push(key);
        let result = {
            let mut reader = RowReader {
                values: values.into_iter(),
                cx: &mut *self,
            };
            T::from_row(&mut reader)
        };
        self.chain.pop();
        result
    }
}

/// Hands out the columns of one row to `Record::from_row`, in order.
pub struct RowReader<'r, 'a> {
    values: std::vec::IntoIter<Value>,
    cx: &'r mut LoadContext<'a>,
}

impl<'r, 'a> RowReader<'r, 'a> {
    /// Decode the next column into the type of the field named `field`.
    pub fn next<C: Column>(&mut self, field: &str) -> Result<C> {
        let value = self.values.next().ok_or_else(|| {
            StructMapError::DataIntegrity(format!("row has no column for field {field}"))
        })?;
        C::from_value(value, self.cx).map_err(|e| match e {
            StructMapError::Schema(message) => {
                StructMapError::Schema(format!("field {field}: {message}"))
            }
            other => other,
        })
    }
}
