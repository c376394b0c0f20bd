//! structmap - map typed Rust structs onto SQLite tables.
//!
//! Record types describe their fields statically (usually through
//! `#[derive(Record)]`), a [`Mapper`] derives table schemas from those
//! descriptions, and CRUD operations generate parameterized SQL from the
//! schemas. References between records are [`ForeignKey`] fields, stored as
//! the referenced identifier and loaded eagerly.
//!
//! ```no_run
//! use structmap::{DbId, ForeignKey, Mapper, Record, SqliteFactory};
//! use std::collections::HashMap;
//!
//! #[derive(Debug, Clone, PartialEq, Record)]
//! struct Author {
//!     id: DbId<i64>,
//!     name: String,
//! }
//!
//! #[derive(Debug, Clone, PartialEq, Record)]
//! struct Book {
//!     id: DbId<String>,
//!     author: ForeignKey<Author>,
//!     data: HashMap<String, i64>,
//! }
//!
//! # fn main() -> structmap::Result<()> {
//! let mapper = Mapper::new(SqliteFactory::new("library.db"));
//! mapper.register::<Author>()?;
//! mapper.register::<Book>()?;
//! mapper.create_table::<Author>()?;
//! mapper.create_table::<Book>()?;
//!
//! let mut author = Author { id: DbId::new(), name: "pirulo".into() };
//! let id = mapper.insert(&mut author)?;
//!
//! let mut book = Book {
//!     id: DbId::from("super_string_id"),
//!     author: ForeignKey::new(author),
//!     data: HashMap::from([("some_data".to_string(), 5)]),
//! };
//! mapper.insert(&mut book)?;
//!
//! let loaded = mapper.select_one::<Author>(&id)?;
//! assert!(loaded.is_some());
//! # Ok(())
//! # }
//! ```

extern crate self as structmap;

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod mapper;
pub mod record;
pub mod reference;
pub mod registry;
pub mod schema;
pub mod sql;
pub mod value;

pub use codec::{BlobCodec, CodecKind, JsonCodec, YamlCodec};
pub use config::{parse_config, parse_config_str, MapperConfig};
pub use connection::{ConnectionFactory, SqliteFactory};
pub use error::{Result, StructMapError};
pub use mapper::{Fields, LoadContext, Mapper, RowReader};
pub use record::{DbId, IdField, Identifier, Record};
pub use reference::ForeignKey;
pub use schema::{
    AutoIdStrategy, ColumnDef, FieldDescriptor, FieldType, Identity, RecordDescriptor,
    ReferenceTarget, ScalarType, SqlType, TableSchema,
};
pub use structmap_derive::Record;
pub use value::{Blob, Column, Value};
