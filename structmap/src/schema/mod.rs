pub mod extract;
pub mod types;

pub use extract::{build_schema, extract, ExtractedField};
pub use types::*;
