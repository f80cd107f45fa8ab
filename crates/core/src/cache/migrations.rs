//! Schema versions for the SQLite cache.
//!
//! `schema_version` records each applied batch. A batch and its version row
//! commit together, so a failing batch leaves the schema at the last good
//! version and the next start retries it.

use super::Error;
use tokio_rusqlite::{Connection, params};

type Migration = (i64, &'static str);

const MIGRATIONS: &[Migration] = &[
    (1, include_str!("../../migrations/001_documents.sql")),
    (2, include_str!("../../migrations/002_fingerprints.sql")),
];

/// Bring the cache schema up to the latest version.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    apply(conn, MIGRATIONS).await
}

async fn apply(conn: &Connection, migrations: &'static [Migration]) -> Result<(), Error> {
    conn.call(move |conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version    INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current: i64 =
            conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))?;

        for &(version, sql) in migrations.iter().filter(|(v, _)| *v > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .and_then(|()| {
                    tx.execute(
                        "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                        params![version, chrono::Utc::now().to_rfc3339()],
                    )
                })
                .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            tx.commit()?;
            tracing::debug!(version, "cache schema upgraded");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
