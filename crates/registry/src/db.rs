use anyhow::{Context, Result};
use tokio_rusqlite::Connection;
use tracing::info;

/// Async wrapper around the registry's SQLite database.
///
/// All SQL runs on `tokio_rusqlite`'s dedicated background thread, which
/// doubles as the single-writer serialization point for case-number
/// allocation: closures execute one at a time, in submission order.
pub struct RegistryDb {
    conn: Connection,
}

impl RegistryDb {
    pub async fn open(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create DB directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .await
            .with_context(|| format!("failed to open registry DB: {path}"))?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok::<_, rusqlite::Error>(())
        })
        .await
        .map_err(|e| anyhow::anyhow!("failed to set DB pragmas: {e}"))?;

        let db = Self { conn };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub async fn open_memory() -> Result<Self> {
        let conn = Connection::open(":memory:")
            .await
            .context("failed to open in-memory DB")?;

        conn.call(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok::<_, rusqlite::Error>(())
        })
        .await
        .map_err(|e| anyhow::anyhow!("failed to set pragmas: {e}"))?;

        let db = Self { conn };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Execute a closure on the background SQLite thread.
    /// The closure receives `&mut rusqlite::Connection`.
    pub async fn call<F, R>(&self, function: F) -> Result<R>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, rusqlite::Error> + Send + 'static,
        R: Send + 'static,
    {
        self.conn
            .call(function)
            .await
            .map_err(|e| anyhow::anyhow!("DB call failed: {e}"))
    }

    async fn run_migrations(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                run_migrations_sync(conn)?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .map_err(|e| anyhow::anyhow!("failed to run registry DB migrations: {e}"))?;
        info!("registry DB migrations complete");
        Ok(())
    }
}

fn run_migrations_sync(conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        );",
    )?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    let migrations: Vec<(&str, &str)> =
        vec![("001", include_str!("../migrations/001_initial.sql"))];

    for (i, (_name, sql)) in migrations.iter().enumerate() {
        let version = (i + 1) as i64;
        if version > current_version {
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [version],
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_db() {
        let db = RegistryDb::open_memory().await.unwrap();

        let tables: Vec<String> = db
            .call(|conn| {
                let mut stmt = conn
                    .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
                let rows = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(rows)
            })
            .await
            .unwrap();

        assert!(tables.contains(&"wallet_reports".to_string()));
        assert!(tables.contains(&"schema_version".to_string()));
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let db = RegistryDb::open_memory().await.unwrap();

        db.call(|conn| {
            run_migrations_sync(conn)?;
            Ok::<_, rusqlite::Error>(())
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_unique_constraints() {
        let db = RegistryDb::open_memory().await.unwrap();

        let insert = |addr: &str, case: i64| {
            format!(
                "INSERT INTO wallet_reports
                     (wallet_address, case_number, evidence_submitted_at, first_seen, last_updated)
                 VALUES ('{addr}', {case}, '2026-01-01T00:00:00Z',
                         '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')"
            )
        };

        db.call({
            let sql = insert(&"a".repeat(32), 1);
            move |conn| conn.execute_batch(&sql)
        })
        .await
        .unwrap();

        // Same address again must violate the UNIQUE constraint
        let dup_addr = db
            .call({
                let sql = insert(&"a".repeat(32), 2);
                move |conn| conn.execute_batch(&sql)
            })
            .await;
        assert!(dup_addr.is_err());

        // Distinct address but a reused case number must also fail
        let dup_case = db
            .call({
                let sql = insert(&"b".repeat(32), 1);
                move |conn| conn.execute_batch(&sql)
            })
            .await;
        assert!(dup_case.is_err());
    }

    #[tokio::test]
    async fn test_open_file_db() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test_registry.db");
        let db = RegistryDb::open(path.to_str().unwrap()).await.unwrap();

        let count: i64 = db
            .call(|conn| {
                conn.query_row("SELECT COUNT(*) FROM wallet_reports", [], |row| row.get(0))
            })
            .await
            .unwrap();

        assert_eq!(count, 0);
    }
}
