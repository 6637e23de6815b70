//! Schema migrations, applied once each and recorded in `schema_migrations`.

use anyhow::Context;
use rusqlite::Connection;

/// Applied in order; names are never reused.
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_settings",
    "CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL DEFAULT (unixepoch())
    );",
)];

pub fn run_migrations(conn: &mut Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            name TEXT PRIMARY KEY,
            applied_at INTEGER NOT NULL DEFAULT (unixepoch())
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let tx = conn.transaction()?;
        let applied: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE name = ?)",
            [name],
            |row| row.get(0),
        )?;
        if applied {
            continue;
        }

        tracing::info!(migration = %name, "Running migration");
        tx.execute_batch(sql)
            .with_context(|| format!("Migration {} failed", name))?;
        tx.execute("INSERT INTO schema_migrations (name) VALUES (?)", [name])?;
        tx.commit()?;
    }

    Ok(())
}
