// SQL text generation from table schemas. Statements use numbered `?N`
// placeholders; values are bound by the mapper.

pub mod bind;

use crate::schema::{ColumnDef, Identity, TableSchema};

pub use bind::{bind_value, decode_value};

fn quote(ident: &str) -> String {
    format!("\"{ident}\"")
}

fn column_ddl(column: &ColumnDef, foreign_keys: bool) -> String {
    let mut ddl = format!("{} {}", quote(column.name), column.sql_type.as_sql());
    match column.identity {
        Some(Identity::AutoIncrement) => ddl.push_str(" PRIMARY KEY AUTOINCREMENT"),
        Some(_) => ddl.push_str(" PRIMARY KEY NOT NULL"),
        None => {
            if !column.nullable {
                ddl.push_str(" NOT NULL");
            }
            if let (true, Some((table, id))) = (foreign_keys, column.references) {
                ddl.push_str(&format!(" REFERENCES {}({})", quote(table), quote(id)));
            }
        }
    }
    ddl
}

pub fn create_table(schema: &TableSchema, foreign_keys: bool) -> String {
    let columns: Vec<String> = schema
        .columns
        .iter()
        .map(|c| column_ddl(c, foreign_keys))
        .collect();
    format!(
        "CREATE TABLE {} ({})",
        quote(schema.table),
        columns.join(", ")
    )
}

pub fn drop_table(schema: &TableSchema) -> String {
    format!("DROP TABLE {}", quote(schema.table))
}

fn column_list(schema: &TableSchema) -> String {
    schema
        .columns
        .iter()
        .map(|c| quote(c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// INSERT of the given columns, bound as `?1..?N` in the same order.
pub fn insert(schema: &TableSchema, columns: &[&ColumnDef]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote(c.name)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(schema.table),
        names.join(", "),
        placeholders.join(", ")
    )
}

/// SELECT of every column by identifier, bound as `?1`.
pub fn select_by_id(schema: &TableSchema) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = ?1",
        column_list(schema),
        quote(schema.table),
        quote(schema.id_column().name)
    )
}

pub fn select_all(schema: &TableSchema) -> String {
    format!(
        "SELECT {} FROM {} ORDER BY {}",
        column_list(schema),
        quote(schema.table),
        quote(schema.id_column().name)
    )
}

pub fn count_by_id(schema: &TableSchema) -> String {
    format!(
        "SELECT COUNT(*) FROM {} WHERE {} = ?1",
        quote(schema.table),
        quote(schema.id_column().name)
    )
}

/// UPDATE of the given columns bound as `?1..?N`, keyed by the identifier
/// bound last as `?N+1`.
pub fn update(schema: &TableSchema, columns: &[&ColumnDef]) -> String {
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ?{}", quote(c.name), i + 1))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {} = ?{}",
        quote(schema.table),
        assignments.join(", "),
        quote(schema.id_column().name),
        columns.len() + 1
    )
}

pub fn delete(schema: &TableSchema) -> String {
    format!(
        "DELETE FROM {} WHERE {} = ?1",
        quote(schema.table),
        quote(schema.id_column().name)
    )
}

pub fn clear(schema: &TableSchema) -> String {
    format!("DELETE FROM {}", quote(schema.table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::build_schema;
    use crate::{DbId, ForeignKey, Record};
    use pretty_assertions::assert_eq;
    use sqlparser::dialect::SQLiteDialect;
    use sqlparser::parser::Parser;
    use std::collections::HashMap;

    #[derive(Debug, Record)]
    struct Author {
        id: DbId<i64>,
        name: String,
        nickname: Option<String>,
    }

    #[derive(Debug, Record)]
    struct Book {
        id: DbId<String>,
        author: ForeignKey<Author>,
        data: HashMap<String, i64>,
    }

    fn parses(sql: &str) {
        let statements = Parser::parse_sql(&SQLiteDialect {}, sql)
            .unwrap_or_else(|e| panic!("generated SQL does not parse: {sql}: {e}"));
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_create_table() {
        let author = build_schema(&Author::descriptor()).unwrap();
        let sql = create_table(&author, true);
        assert_eq!(
            sql,
            "CREATE TABLE \"Author\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
             \"name\" TEXT NOT NULL, \"nickname\" TEXT)"
        );
        parses(&sql);
    }

    #[test]
    fn test_create_table_with_reference() {
        let book = build_schema(&Book::descriptor()).unwrap();
        let sql = create_table(&book, true);
        assert_eq!(
            sql,
            "CREATE TABLE \"Book\" (\"id\" TEXT PRIMARY KEY NOT NULL, \
             \"author\" INTEGER NOT NULL REFERENCES \"Author\"(\"id\"), \
             \"data\" TEXT NOT NULL)"
        );
        parses(&sql);

        let without = create_table(&book, false);
        assert!(!without.contains("REFERENCES"));
    }

    #[test]
    fn test_dml_statements() {
        let author = build_schema(&Author::descriptor()).unwrap();
        let data: Vec<_> = author.data_columns().map(|(_, c)| c).collect();

        let sql = insert(&author, &data);
        assert_eq!(
            sql,
            "INSERT INTO \"Author\" (\"name\", \"nickname\") VALUES (?1, ?2)"
        );
        parses(&sql);

        let sql = select_by_id(&author);
        assert_eq!(
            sql,
            "SELECT \"id\", \"name\", \"nickname\" FROM \"Author\" WHERE \"id\" = ?1"
        );
        parses(&sql);

        let sql = update(&author, &data[..1]);
        assert_eq!(sql, "UPDATE \"Author\" SET \"name\" = ?1 WHERE \"id\" = ?2");
        parses(&sql);

        let sql = delete(&author);
        assert_eq!(sql, "DELETE FROM \"Author\" WHERE \"id\" = ?1");
        parses(&sql);

        parses(&drop_table(&author));
        parses(&select_all(&author));
        parses(&count_by_id(&author));
        parses(&clear(&author));
    }
}
