use std::collections::HashMap;
use std::io::Cursor;

use anyhow::{Context, Result, anyhow};
use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use log::{info, warn};
use once_cell::unsync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

use crate::error::ScoutError;
use crate::http_client::http_client;
use crate::scouting::{COL_CREST_URL, COL_TEAM};
use crate::table::{Cell, Table};

/// Where spreadsheet payloads come from.
pub trait SheetSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpSheetSource {
    client: &'static Client,
}

impl HttpSheetSource {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
        })
    }
}

impl SheetSource for HttpSheetSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, "Mozilla/5.0")
            .send()
            .context("request failed")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("http {status} for {url}"));
        }
        let body = resp.bytes().context("failed reading body")?;
        Ok(body.to_vec())
    }
}

/// Parses the first worksheet of an xlsx workbook. The first row is the
/// header; rows with no values are dropped.
pub fn parse_sheet(bytes: &[u8]) -> Result<Table> {
    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(Cursor::new(bytes)).context("payload is not an xlsx workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook has no worksheets"))?
        .context("failed reading first worksheet")?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Table::default());
    };
    let columns = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let name = cell.to_string().trim().to_string();
            if name.is_empty() {
                format!("Unnamed: {idx}")
            } else {
                name
            }
        })
        .collect::<Vec<_>>();

    let mut table = Table::new(columns);
    for row in rows {
        let cells = row.iter().map(cell_from_data).collect::<Vec<_>>();
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        table.push_row(cells);
    }
    Ok(table)
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Float(n) => Cell::Number(*n),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

/// Team name to crest image URL. Needs `EQUIPO` and `URL_ESCUDO`.
pub fn crest_map_from_table(table: &Table) -> Result<HashMap<String, String>, ScoutError> {
    let team_idx = table
        .column_index(COL_TEAM)
        .ok_or_else(|| ScoutError::column_missing(COL_TEAM))?;
    let url_idx = table
        .column_index(COL_CREST_URL)
        .ok_or_else(|| ScoutError::column_missing(COL_CREST_URL))?;
    let mut out = HashMap::new();
    for row in table.rows() {
        let (Some(team), Some(url)) = (row[team_idx].text(), row[url_idx].text()) else {
            continue;
        };
        out.entry(team).or_insert(url);
    }
    Ok(out)
}

struct Loaded<T> {
    value: T,
    error: Option<ScoutError>,
}

/// Loads the roster and crest sheets once and serves them from memory until
/// [`RosterProvider::invalidate`] is called. A failed load is cached as an
/// empty value together with its error, so it is not retried implicitly.
pub struct RosterProvider<S = HttpSheetSource> {
    source: S,
    roster_url: String,
    crests_url: Option<String>,
    roster: OnceCell<Loaded<Table>>,
    crests: OnceCell<Loaded<HashMap<String, String>>>,
}

impl<S: SheetSource> RosterProvider<S> {
    pub fn new(source: S, roster_url: impl Into<String>) -> Self {
        Self {
            source,
            roster_url: roster_url.into(),
            crests_url: None,
            roster: OnceCell::new(),
            crests: OnceCell::new(),
        }
    }

    /// Without a crest sheet the crest map stays empty and nothing is fetched.
    pub fn with_crests(mut self, crests_url: impl Into<String>) -> Self {
        self.crests_url = Some(crests_url.into());
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.roster.get().is_some()
    }

    pub fn roster(&self) -> &Table {
        &self.loaded_roster().value
    }

    /// Error from the last roster load, if it degraded to an empty table.
    pub fn roster_error(&self) -> Option<&ScoutError> {
        self.loaded_roster().error.as_ref()
    }

    pub fn crest_map(&self) -> &HashMap<String, String> {
        &self.loaded_crests().value
    }

    pub fn crest_error(&self) -> Option<&ScoutError> {
        self.loaded_crests().error.as_ref()
    }

    pub fn crest_for(&self, team: &str) -> Option<&str> {
        self.crest_map().get(team).map(String::as_str)
    }

    pub fn invalidate(&mut self) {
        self.roster.take();
        self.crests.take();
        info!("roster cache cleared");
    }

    fn loaded_roster(&self) -> &Loaded<Table> {
        self.roster.get_or_init(|| match self.fetch_table(&self.roster_url) {
            Ok(table) => {
                info!(
                    "roster loaded: {} rows, {} columns",
                    table.len(),
                    table.columns().len()
                );
                Loaded {
                    value: table,
                    error: None,
                }
            }
            Err(err) => {
                warn!("roster load failed: {err:#}");
                Loaded {
                    value: Table::default(),
                    error: Some(ScoutError::Fetch(format!("roster: {err:#}"))),
                }
            }
        })
    }

    fn loaded_crests(&self) -> &Loaded<HashMap<String, String>> {
        self.crests.get_or_init(|| {
            let Some(url) = self.crests_url.as_deref() else {
                return Loaded {
                    value: HashMap::new(),
                    error: None,
                };
            };
            let table = match self.fetch_table(url) {
                Ok(table) => table,
                Err(err) => {
                    warn!("crest sheet load failed: {err:#}");
                    return Loaded {
                        value: HashMap::new(),
                        error: Some(ScoutError::Fetch(format!("crests: {err:#}"))),
                    };
                }
            };
            match crest_map_from_table(&table) {
                Ok(map) => Loaded {
                    value: map,
                    error: None,
                },
                Err(err) => {
                    warn!("crest sheet unusable: {err}");
                    Loaded {
                        value: HashMap::new(),
                        error: Some(err),
                    }
                }
            }
        })
    }

    fn fetch_table(&self, url: &str) -> Result<Table> {
        let bytes = self
            .source
            .fetch(url)
            .with_context(|| format!("fetch {url}"))?;
        parse_sheet(&bytes).with_context(|| format!("parse spreadsheet from {url}"))
    }
}
