//! SQLite store for installer settings.

mod migrations;

use rusqlite::{Connection, OptionalExtension};
use std::path::PathBuf;

/// Key/value store backing [`crate::Settings`].
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    /// Open the database at the default location.
    ///
    /// Default path: `~/.local/share/devsuite/devsuite.db`
    pub fn open() -> anyhow::Result<Self> {
        let path = Self::default_path()?;
        Self::open_at(path)
    }

    /// Open the database at a specific path.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open_at(path: PathBuf) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        tracing::debug!(path = %path.display(), "Opened settings database");

        Ok(Self { conn, path })
    }

    /// Get the default database path.
    ///
    /// Returns `~/.local/share/devsuite/devsuite.db` (or platform equivalent).
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join("devsuite").join("devsuite.db"))
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
        })
    }

    /// Bring the schema up to date. Applied migrations are skipped.
    pub fn migrate(&mut self) -> anyhow::Result<()> {
        migrations::run_migrations(&mut self.conn)
    }

    /// Get the database file path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    // =========================================================================
    // Settings Storage
    // =========================================================================

    /// Store a value under `key`, replacing any previous one.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, unixepoch())
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            [key, value],
        )?;
        Ok(())
    }

    /// Read one stored value, `None` if the key was never written.
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row("SELECT value FROM settings WHERE key = ?", [key], |row| row.get(0))
            .optional()
    }

    /// Delete a setting from the database.
    pub fn delete_setting(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn memory_db() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn test_open_at_creates_parents_and_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("devsuite").join("devsuite.db");
        {
            let mut db = Database::open_at(path.clone()).unwrap();
            db.migrate().unwrap();
            db.set_setting("settings", "{}").unwrap();
            assert_eq!(db.path(), &path);
        }

        let mut db = Database::open_at(path).unwrap();
        db.migrate().unwrap();
        assert_eq!(db.get_setting("settings").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_default_path() {
        let path = Database::default_path().unwrap();
        assert!(path.ends_with("devsuite/devsuite.db"));
    }

    #[test]
    fn test_settings_crud() {
        let db = memory_db();
        assert_eq!(db.get_setting("settings").unwrap(), None);

        db.set_setting("settings", "{}").unwrap();
        db.set_setting("settings", r#"{"probe_timeout_secs":3}"#).unwrap();
        assert_eq!(
            db.get_setting("settings").unwrap().as_deref(),
            Some(r#"{"probe_timeout_secs":3}"#)
        );

        db.delete_setting("settings").unwrap();
        assert_eq!(db.get_setting("settings").unwrap(), None);
    }
}
