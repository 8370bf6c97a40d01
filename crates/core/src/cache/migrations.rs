//! Schema for the cache stores.
//!
//! The applied version lives in SQLite's `user_version` header field, so a
//! database file carries its own schema level with no bookkeeping table.

use super::Error;
use tokio_rusqlite::{Connection, rusqlite};

/// Schema steps in order; step `n` brings the database to version `n`.
const STEPS: &[&str] = &[include_str!("../../migrations/001_stores.sql")];

/// Version a fully migrated database reports.
pub const SCHEMA_VERSION: i64 = STEPS.len() as i64;

fn user_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Bring the database up to [`SCHEMA_VERSION`].
///
/// Each step and its version bump commit together. A database written by a
/// newer build is refused rather than opened with an unknown layout.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let current = user_version(conn)?;
        let applied = usize::try_from(current)
            .ok()
            .filter(|&applied| applied <= STEPS.len())
            .ok_or_else(|| {
                Error::MigrationFailed(format!(
                    "database schema version {current} is not supported (expected at most {SCHEMA_VERSION})"
                ))
            })?;

        for (version, sql) in (1_i64..).zip(STEPS.iter()).skip(applied) {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("schema step {version}: {e}")))?;
            tx.pragma_update(None, "user_version", version)?;
            tx.commit()?;
            tracing::debug!(version, "applied cache schema step");
        }
        Ok(())
    })
    .await
    .map_err(Error::from)
}
