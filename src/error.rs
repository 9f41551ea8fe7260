use thiserror::Error;

/// Failures a handler reports back to the captador.
///
/// Storage and export failures keep the underlying `anyhow` chain so the
/// full context is printed with `{:#}`.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("could not load {0}")]
    Fetch(String),
    #[error("column '{0}' is missing from the roster")]
    ColumnMissing(String),
    #[error("{0}")]
    Validation(String),
    #[error("player '{0}' not found")]
    NotFound(String),
    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),
    #[error("export failed: {0:#}")]
    Export(anyhow::Error),
}

impl ScoutError {
    pub fn column_missing(column: &str) -> Self {
        Self::ColumnMissing(column.to_string())
    }
}
