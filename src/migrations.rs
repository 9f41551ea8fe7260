//! Versioned schema migrations for the ratings database.
//!
//! Migrations run in ascending `version` order. Each one is applied inside a
//! transaction together with its row in `schema_migrations`, so a version is
//! recorded exactly when its changes are committed.

use anyhow::{Context, Result};
use chrono::Utc;
use log::info;
use rusqlite::{Connection, OptionalExtension, Transaction, params};

pub const RATINGS_TABLE: &str = "valoraciones";

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    apply: fn(&Transaction<'_>) -> Result<()>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_valoraciones",
        apply: create_valoraciones,
    },
    Migration {
        version: 2,
        name: "add_captador",
        apply: add_captador,
    },
];

fn create_valoraciones(tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS valoraciones (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre TEXT,
            posicion TEXT,
            club TEXT,
            valoracion INTEGER,
            comentario TEXT
        );
        "#,
    )
    .context("create valoraciones table")?;
    Ok(())
}

// Older databases may already carry the column; only add it when absent.
fn add_captador(tx: &Transaction<'_>) -> Result<()> {
    if column_exists(tx, RATINGS_TABLE, "captador")? {
        return Ok(());
    }
    tx.execute_batch("ALTER TABLE valoraciones ADD COLUMN captador TEXT;")
        .context("add captador column")?;
    Ok(())
}

/// Applies every migration not yet recorded and returns the newly applied versions.
pub fn run_pending(conn: &mut Connection) -> Result<Vec<i64>> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );
        "#,
    )
    .context("ensure schema_migrations exists")?;

    let mut applied = Vec::new();
    for migration in MIGRATIONS {
        if is_applied(conn, migration.version)? {
            continue;
        }
        let tx = conn
            .transaction()
            .with_context(|| format!("begin migration {}", migration.version))?;
        (migration.apply)(&tx).with_context(|| {
            format!("apply migration {} ({})", migration.version, migration.name)
        })?;
        tx.execute(
            "INSERT INTO schema_migrations(version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, Utc::now().to_rfc3339()],
        )
        .context("record migration")?;
        tx.commit()
            .with_context(|| format!("commit migration {}", migration.version))?;
        info!(
            "applied migration {} ({})",
            migration.version, migration.name
        );
        applied.push(migration.version);
    }
    Ok(applied)
}

pub fn applied_versions(conn: &Connection) -> Result<Vec<i64>> {
    let mut stmt = conn
        .prepare("SELECT version FROM schema_migrations ORDER BY version ASC")
        .context("prepare applied versions query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, i64>(0))
        .context("query applied versions")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode migration version")?);
    }
    Ok(out)
}

pub fn latest_version() -> i64 {
    MIGRATIONS.iter().map(|m| m.version).max().unwrap_or(0)
}

pub fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect table_info for {table}"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        if row.get::<_, String>(1)? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn is_applied(conn: &Connection, version: i64) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM schema_migrations WHERE version = ?1",
            params![version],
            |_| Ok(()),
        )
        .optional()
        .context("query schema_migrations")?
        .is_some();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_strictly_ascending() {
        let versions: Vec<i64> = MIGRATIONS.iter().map(|m| m.version).collect();
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(latest_version(), 2);
    }

    #[test]
    fn second_run_applies_nothing() {
        let mut conn = Connection::open_in_memory().expect("in-memory db");
        assert_eq!(run_pending(&mut conn).expect("first run"), vec![1, 2]);
        assert!(run_pending(&mut conn).expect("second run").is_empty());
        assert_eq!(applied_versions(&conn).expect("versions"), vec![1, 2]);
        assert!(column_exists(&conn, RATINGS_TABLE, "captador").expect("table_info"));
    }
}
