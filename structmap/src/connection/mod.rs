use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Opens a connection for each mapper operation.
pub trait ConnectionFactory: Send + Sync {
    fn connect(&self) -> rusqlite::Result<Connection>;
}

impl<F> ConnectionFactory for F
where
    F: Fn() -> rusqlite::Result<Connection> + Send + Sync,
{
    fn connect(&self) -> rusqlite::Result<Connection> {
        self()
    }
}

/// Opens a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteFactory {
    path: PathBuf,
    busy_timeout: Option<Duration>,
    enforce_foreign_keys: bool,
}

impl SqliteFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SqliteFactory {
            path: path.into(),
            busy_timeout: None,
            enforce_foreign_keys: false,
        }
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    pub fn enforce_foreign_keys(mut self, enforce: bool) -> Self {
        self.enforce_foreign_keys = enforce;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConnectionFactory for SqliteFactory {
    fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        if let Some(timeout) = self.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        // bundled SQLite may default to enforcing, so always set it
        conn.pragma_update(None, "foreign_keys", self.enforce_foreign_keys)?;
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_factory() {
        let factory = || Connection::open_in_memory();
        let conn = factory.connect().unwrap();
        let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0)).unwrap();
        assert_eq!(one, 1);
    }

    #[test]
    fn test_sqlite_factory_shares_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let factory = SqliteFactory::new(tmp.path().join("test.db"))
            .busy_timeout(Duration::from_millis(100))
            .enforce_foreign_keys(true);

        factory
            .connect()
            .unwrap()
            .execute_batch("CREATE TABLE t (x INTEGER)")
            .unwrap();

        let conn = factory.connect().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_foreign_keys_off_unless_enforced() {
        let tmp = tempfile::TempDir::new().unwrap();
        let conn = SqliteFactory::new(tmp.path().join("test.db"))
            .connect()
            .unwrap();
        conn.execute_batch(
            "CREATE TABLE parent (id INTEGER PRIMARY KEY);
             CREATE TABLE child (id INTEGER PRIMARY KEY, parent INTEGER REFERENCES parent(id));",
        )
        .unwrap();

        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 0);
        conn.execute("INSERT INTO child (id, parent) VALUES (1, 42)", [])
            .unwrap();
    }
}
