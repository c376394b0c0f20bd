//! `#[derive(Record)]` for structmap.
//!
//! Container attributes, all under `#[structmap(...)]`:
//! - `name = "..."` overrides the record name (defaults to the struct name)
//! - `table = "..."` overrides the table name (defaults to the record name)
//! - `snake_case` uses the snake_case form of the record name as table name
//!
//! Field attributes:
//! - `column = "..."` overrides the column name
//! - `auto = "ulid" | "uuid" | "nanoid"` generates a text identifier on insert
//!
//! The identifier is the one field typed `DbId<_>`.

use proc_macro::TokenStream;

mod attr;
mod record;

#[proc_macro_derive(Record, attributes(structmap))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input.into()).into()
}
