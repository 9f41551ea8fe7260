use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::migrations;

pub type RatingId = i64;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str =
    "SELECT id, captador, nombre, posicion, club, valoracion, comentario FROM valoraciones";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub id: RatingId,
    /// `None` for rows written before the captador column existed.
    pub captador: Option<String>,
    pub nombre: String,
    pub posicion: String,
    pub club: String,
    pub valoracion: i64,
    pub comentario: String,
}

/// A rating ready to be stored. Fields are written verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRating {
    pub captador: String,
    pub nombre: String,
    pub posicion: String,
    pub club: String,
    pub valoracion: i64,
    pub comentario: String,
}

/// SQLite-backed rating history. Every call opens its own connection and
/// drops it before returning.
#[derive(Debug, Clone)]
pub struct RatingStore {
    path: PathBuf,
}

impl RatingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create db directory {}", parent.display()))?;
        }
        let conn = Connection::open(&self.path)
            .with_context(|| format!("open sqlite db {}", self.path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("configure sqlite busy timeout")?;
        Ok(conn)
    }

    /// Creates or upgrades the schema. Safe to call on every start; existing
    /// rows are never touched. Returns the migration versions applied now.
    pub fn bootstrap(&self) -> Result<Vec<i64>> {
        let mut conn = self.connect()?;
        let applied = migrations::run_pending(&mut conn)?;
        info!(
            "rating store ready at {} ({} migration(s) applied)",
            self.path.display(),
            applied.len()
        );
        Ok(applied)
    }

    pub fn applied_migrations(&self) -> Result<Vec<i64>> {
        let conn = self.connect()?;
        migrations::applied_versions(&conn)
    }

    pub fn insert(&self, rating: &NewRating) -> Result<RatingId> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO valoraciones (captador, nombre, posicion, club, valoracion, comentario)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                rating.captador,
                rating.nombre,
                rating.posicion,
                rating.club,
                rating.valoracion,
                rating.comentario,
            ],
        )
        .context("insert rating")?;
        let id = conn.last_insert_rowid();
        debug!("stored rating {id} for {}", rating.nombre);
        Ok(id)
    }

    /// All ratings in insertion order.
    pub fn list_all(&self) -> Result<Vec<RatingRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY id ASC"))
            .context("prepare list ratings query")?;
        let rows = stmt
            .query_map([], parse_rating_row)
            .context("query ratings")?;
        collect_rows(rows)
    }

    pub fn list_for_player(&self, nombre: &str) -> Result<Vec<RatingRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE nombre = ?1 ORDER BY id ASC"))
            .context("prepare player ratings query")?;
        let rows = stmt
            .query_map(params![nombre], parse_rating_row)
            .context("query player ratings")?;
        collect_rows(rows)
    }

    pub fn get(&self, id: RatingId) -> Result<Option<RatingRecord>> {
        let conn = self.connect()?;
        conn.query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            params![id],
            parse_rating_row,
        )
        .optional()
        .context("query rating by id")
    }

    /// Overwrites the comment of one rating. Returns the number of rows
    /// changed; an unknown id changes nothing and is not an error.
    pub fn update_comment(&self, id: RatingId, comentario: &str) -> Result<usize> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE valoraciones SET comentario = ?1 WHERE id = ?2",
                params![comentario, id],
            )
            .context("update rating comment")?;
        debug!("comment update for rating {id} touched {changed} row(s)");
        Ok(changed)
    }
}

fn parse_rating_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RatingRecord> {
    Ok(RatingRecord {
        id: row.get(0)?,
        captador: row.get(1)?,
        nombre: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        posicion: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        club: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        valoracion: row.get::<_, Option<i64>>(5)?.unwrap_or_default(),
        comentario: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
    })
}

fn collect_rows<I>(rows: I) -> Result<Vec<RatingRecord>>
where
    I: Iterator<Item = rusqlite::Result<RatingRecord>>,
{
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode rating row")?);
    }
    Ok(out)
}
