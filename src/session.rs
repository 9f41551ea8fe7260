use std::collections::VecDeque;
use std::path::Path;

use anyhow::Result;
use log::{error, info, warn};
use serde::Serialize;

use crate::error::ScoutError;
use crate::export::{self, ExportReport};
use crate::ratings::{RatingId, RatingRecord, RatingStore};
use crate::roster::{HttpSheetSource, RosterProvider, SheetSource};
use crate::scouting::{self, Comparison, PlayerView, RatingForm, RosterFilter, COL_NAME};
use crate::table::Table;

const MAX_NOTICES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Bounded log of messages meant for the captador.
#[derive(Debug, Default)]
pub struct Notices {
    entries: VecDeque<Notice>,
}

impl Notices {
    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.entries.push_back(Notice {
            level,
            message: message.into(),
        });
        while self.entries.len() > MAX_NOTICES {
            self.entries.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Warn, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.entries.iter()
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        self.entries.drain(..).collect()
    }
}

/// One captador's working context: the rating store, the memoized roster and
/// the notices produced by each request.
///
/// Handlers never panic on bad input or missing data. Every failure is both
/// returned and recorded as an error notice.
pub struct ScoutSession<S = HttpSheetSource> {
    store: RatingStore,
    roster: RosterProvider<S>,
    notices: Notices,
}

impl<S: SheetSource> ScoutSession<S> {
    /// Bootstraps the store. A schema failure here is fatal for the session.
    pub fn open(store: RatingStore, roster: RosterProvider<S>) -> Result<Self> {
        store.bootstrap()?;
        Ok(Self {
            store,
            roster,
            notices: Notices::default(),
        })
    }

    pub fn store(&self) -> &RatingStore {
        &self.store
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    /// Loads the roster if needed and reports a failed or empty load.
    pub fn roster(&mut self) -> &Table {
        let first_load = !self.roster.is_loaded();
        let table = self.roster.roster();
        if first_load {
            if let Some(err) = self.roster.roster_error() {
                self.notices.error(err.to_string());
            } else if table.is_empty() {
                self.notices.error("roster could not be loaded or is empty");
            }
        }
        table
    }

    pub fn refresh_roster(&mut self) {
        self.roster.invalidate();
        self.notices.info("roster will be reloaded on next use");
    }

    pub fn submit_rating(&mut self, form: &RatingForm) -> Result<RatingId, ScoutError> {
        let rating = match scouting::validate_rating(form) {
            Ok(rating) => rating,
            Err(err) => return Err(self.fail(err)),
        };
        match self.store.insert(&rating) {
            Ok(id) => {
                info!("rating {id} saved by {} for {}", rating.captador, rating.nombre);
                self.notices.info("rating saved");
                Ok(id)
            }
            Err(err) => Err(self.fail(ScoutError::Storage(err))),
        }
    }

    /// Returns `false` when no rating has that id.
    pub fn update_comment(&mut self, id: RatingId, comentario: &str) -> Result<bool, ScoutError> {
        match self.store.update_comment(id, comentario) {
            Ok(0) => {
                self.notices.warn(format!("no rating with id {id}"));
                Ok(false)
            }
            Ok(_) => {
                self.notices.info(format!("comment of rating {id} updated"));
                Ok(true)
            }
            Err(err) => Err(self.fail(ScoutError::Storage(err))),
        }
    }

    pub fn ratings(&mut self) -> Result<Vec<RatingRecord>, ScoutError> {
        self.store
            .list_all()
            .map_err(|err| self.fail(ScoutError::Storage(err)))
    }

    pub fn player_names(&mut self) -> Result<Vec<String>, ScoutError> {
        self.require_roster()?;
        scouting::player_names(self.roster.roster()).map_err(|err| self.fail(err))
    }

    pub fn teams(&mut self) -> Result<Vec<String>, ScoutError> {
        self.require_roster()?;
        scouting::teams(self.roster.roster()).map_err(|err| self.fail(err))
    }

    pub fn column_range(&mut self, column: &str) -> Result<Option<(f64, f64)>, ScoutError> {
        self.require_roster()?;
        scouting::column_range(self.roster.roster(), column).map_err(|err| self.fail(err))
    }

    pub fn filter_roster(&mut self, filter: &RosterFilter) -> Result<Table, ScoutError> {
        self.require_roster()?;
        scouting::filter_roster(self.roster.roster(), filter).map_err(|err| self.fail(err))
    }

    pub fn player_view(&mut self, name: &str) -> Result<PlayerView, ScoutError> {
        let ratings = self
            .store
            .list_for_player(name)
            .map_err(|err| self.fail(ScoutError::Storage(err)))?;
        self.roster();
        if self.roster.roster_error().is_none() && !self.roster.roster().has_column(COL_NAME) {
            self.notices
                .warn(ScoutError::column_missing(COL_NAME).to_string());
        }
        if let Some(err) = self.roster.crest_error() {
            warn!("crests unavailable: {err}");
        }
        Ok(scouting::player_view(
            self.roster.roster(),
            ratings,
            name,
            self.roster.crest_map(),
        ))
    }

    pub fn compare(&mut self, first: &str, second: &str) -> Result<Comparison, ScoutError> {
        self.require_roster()?;
        scouting::compare_players(self.roster.roster(), first, second)
            .map_err(|err| self.fail(err))
    }

    pub fn export_ratings(&mut self, path: &Path) -> Result<ExportReport, ScoutError> {
        let ratings = self.ratings()?;
        match export::export_ratings(path, &ratings) {
            Ok(report) => {
                self.notices.info(format!(
                    "exported {} rating(s) to {}",
                    report.ratings,
                    path.display()
                ));
                Ok(report)
            }
            Err(err) => Err(self.fail(ScoutError::Export(err))),
        }
    }

    /// Roster queries fail with the fetch error instead of running against
    /// the empty table a failed load leaves behind.
    fn require_roster(&mut self) -> Result<(), ScoutError> {
        let first_load = !self.roster.is_loaded();
        self.roster();
        let Some(err) = self.roster.roster_error() else {
            return Ok(());
        };
        let err = match err {
            ScoutError::Fetch(cause) => ScoutError::Fetch(cause.clone()),
            other => ScoutError::Fetch(other.to_string()),
        };
        if first_load {
            // roster() already reported this load.
            return Err(err);
        }
        Err(self.fail(err))
    }

    fn fail(&mut self, err: ScoutError) -> ScoutError {
        error!("{err}");
        self.notices.error(err.to_string());
        err
    }
}
