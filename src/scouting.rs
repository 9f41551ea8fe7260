use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ScoutError;
use crate::ratings::{NewRating, RatingRecord};
use crate::table::{Cell, Table};

pub const COL_NAME: &str = "NOMBRE";
pub const COL_TEAM: &str = "EQUIPO";
pub const COL_AGE: &str = "EDAD";
pub const COL_MATCHES: &str = "PJ";
pub const COL_CREST_URL: &str = "URL_ESCUDO";

/// Metrics summed per player for the comparison charts.
pub const METRIC_COLUMNS: [&str; 4] = ["Goles", "Asist.", "TA", "TR"];

pub const POSITIONS: [&str; 4] = ["Delantera", "Centrocampista", "Defensa", "Portera"];
pub const RATING_VALUES: [i64; 4] = [3, 5, 7, 9];

/// Raw input of the rating form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingForm {
    pub captador: String,
    pub nombre: String,
    pub posicion: String,
    pub club: String,
    pub valoracion: i64,
    pub comentario: String,
}

pub fn validate_rating(form: &RatingForm) -> Result<NewRating, ScoutError> {
    let required = [
        ("captador", &form.captador),
        ("nombre", &form.nombre),
        ("club", &form.club),
        ("comentario", &form.comentario),
    ];
    let missing = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| *field)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(ScoutError::Validation(format!(
            "please fill in every field (missing: {})",
            missing.join(", ")
        )));
    }
    if !POSITIONS.contains(&form.posicion.as_str()) {
        return Err(ScoutError::Validation(format!(
            "unknown position '{}' (expected one of {})",
            form.posicion,
            POSITIONS.join(", ")
        )));
    }
    if !RATING_VALUES.contains(&form.valoracion) {
        return Err(ScoutError::Validation(format!(
            "rating must be one of 3, 5, 7 or 9 (got {})",
            form.valoracion
        )));
    }
    Ok(NewRating {
        captador: form.captador.clone(),
        nombre: form.nombre.clone(),
        posicion: form.posicion.clone(),
        club: form.club.clone(),
        valoracion: form.valoracion,
        comentario: form.comentario.clone(),
    })
}

pub fn player_names(roster: &Table) -> Result<Vec<String>, ScoutError> {
    roster
        .unique_text(COL_NAME)
        .ok_or_else(|| ScoutError::column_missing(COL_NAME))
}

pub fn teams(roster: &Table) -> Result<Vec<String>, ScoutError> {
    roster
        .unique_text(COL_TEAM)
        .ok_or_else(|| ScoutError::column_missing(COL_TEAM))
}

/// Slider bounds for a numeric column; `Ok(None)` when it holds no numbers.
pub fn column_range(roster: &Table, column: &str) -> Result<Option<(f64, f64)>, ScoutError> {
    roster
        .numeric_range(column)
        .ok_or_else(|| ScoutError::column_missing(column))
}

/// Roster filter. `team: None` keeps every team; ranges are inclusive on
/// both ends and drop rows whose value is missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterFilter {
    pub team: Option<String>,
    pub age: Option<(f64, f64)>,
    pub matches: Option<(f64, f64)>,
}

pub fn filter_roster(roster: &Table, filter: &RosterFilter) -> Result<Table, ScoutError> {
    let team_idx = match &filter.team {
        Some(_) => Some(
            roster
                .column_index(COL_TEAM)
                .ok_or_else(|| ScoutError::column_missing(COL_TEAM))?,
        ),
        None => None,
    };
    let age = range_predicate(roster, COL_AGE, filter.age)?;
    let matches = range_predicate(roster, COL_MATCHES, filter.matches)?;

    Ok(roster.filter_rows(|row| {
        if let (Some(idx), Some(team)) = (team_idx, filter.team.as_deref())
            && row[idx].text().as_deref() != Some(team)
        {
            return false;
        }
        [age, matches].iter().flatten().all(|(idx, lo, hi)| {
            row[*idx]
                .number()
                .is_some_and(|n| n >= *lo && n <= *hi)
        })
    }))
}

fn range_predicate(
    roster: &Table,
    column: &str,
    range: Option<(f64, f64)>,
) -> Result<Option<(usize, f64, f64)>, ScoutError> {
    let Some((lo, hi)) = range else {
        return Ok(None);
    };
    let idx = roster
        .column_index(column)
        .ok_or_else(|| ScoutError::column_missing(column))?;
    Ok(Some((idx, lo, hi)))
}

pub fn average_rating(ratings: &[RatingRecord]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let total: i64 = ratings.iter().map(|r| r.valoracion).sum();
    Some(total as f64 / ratings.len() as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRatingSummary {
    pub nombre: String,
    pub count: usize,
    pub average: f64,
}

/// Rating count and mean per player, in order of each player's first rating.
pub fn summarize_ratings(ratings: &[RatingRecord]) -> Vec<PlayerRatingSummary> {
    let mut order: Vec<&str> = Vec::new();
    let mut totals: HashMap<&str, (usize, i64)> = HashMap::new();
    for rating in ratings {
        let entry = totals.entry(rating.nombre.as_str()).or_insert_with(|| {
            order.push(rating.nombre.as_str());
            (0, 0)
        });
        entry.0 += 1;
        entry.1 += rating.valoracion;
    }
    order
        .into_iter()
        .filter_map(|name| {
            let (count, total) = totals.get(name)?;
            Some(PlayerRatingSummary {
                nombre: name.to_string(),
                count: *count,
                average: *total as f64 / *count as f64,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub name: String,
    pub roster_rows: Table,
    pub ratings: Vec<RatingRecord>,
    pub average: Option<f64>,
    pub crest_url: Option<String>,
}

/// Joins a player's roster rows with their ratings. The crest comes from the
/// player's roster team, falling back to the club of the latest rating.
pub fn player_view(
    roster: &Table,
    ratings: Vec<RatingRecord>,
    name: &str,
    crests: &HashMap<String, String>,
) -> PlayerView {
    let roster_rows = rows_for_player(roster, name);
    let team = roster_rows
        .cell(0, COL_TEAM)
        .and_then(Cell::text)
        .or_else(|| ratings.last().map(|r| r.club.clone()));
    let crest_url = team.and_then(|t| crests.get(&t).cloned());
    PlayerView {
        name: name.to_string(),
        average: average_rating(&ratings),
        roster_rows,
        ratings,
        crest_url,
    }
}

fn rows_for_player(roster: &Table, name: &str) -> Table {
    match roster.column_index(COL_NAME) {
        Some(idx) => roster.filter_rows(|row| row[idx].text().as_deref() == Some(name)),
        None => Table::new(roster.columns().to_vec()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricValue {
    pub metric: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerMetrics {
    pub name: String,
    pub rows: Table,
    pub metrics: Vec<MetricValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub first: PlayerMetrics,
    pub second: PlayerMetrics,
    /// Metric columns absent from the roster; they are left out of `metrics`.
    pub missing_metrics: Vec<String>,
}

/// Side-by-side data for two players: their roster rows and the summed
/// metric values a radar or bar chart would plot.
pub fn compare_players(
    roster: &Table,
    first: &str,
    second: &str,
) -> Result<Comparison, ScoutError> {
    if !roster.has_column(COL_NAME) {
        return Err(ScoutError::column_missing(COL_NAME));
    }
    let names = player_names(roster)?;
    for name in [first, second] {
        if !names.iter().any(|n| n == name) {
            return Err(ScoutError::NotFound(name.to_string()));
        }
    }

    let missing_metrics = METRIC_COLUMNS
        .iter()
        .filter(|m| !roster.has_column(m))
        .map(|m| m.to_string())
        .collect();

    Ok(Comparison {
        first: player_metrics(roster, first),
        second: player_metrics(roster, second),
        missing_metrics,
    })
}

fn player_metrics(roster: &Table, name: &str) -> PlayerMetrics {
    let rows = rows_for_player(roster, name);
    let metrics = METRIC_COLUMNS
        .iter()
        .filter_map(|metric| {
            let idx = rows.column_index(metric)?;
            let value: f64 = rows.rows().iter().filter_map(|r| r[idx].number()).sum();
            Some(MetricValue {
                metric: metric.to_string(),
                value,
            })
        })
        .collect();
    PlayerMetrics {
        name: name.to_string(),
        rows,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn roster() -> Table {
        Table::from_rows(
            ["NOMBRE", "EQUIPO", "EDAD", "PJ", "Goles", "Asist."]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            vec![
                vec![
                    text("Ana"),
                    text("Club A"),
                    Cell::Number(21.0),
                    Cell::Number(20.0),
                    Cell::Number(8.0),
                    Cell::Number(3.0),
                ],
                vec![
                    text("Bea"),
                    text("Club B"),
                    Cell::Number(25.0),
                    Cell::Number(12.0),
                    Cell::Number(2.0),
                    Cell::Empty,
                ],
                vec![
                    text("Cris"),
                    text("Club A"),
                    Cell::Empty,
                    Cell::Number(5.0),
                    Cell::Number(0.0),
                    Cell::Number(1.0),
                ],
            ],
        )
    }

    fn rating(nombre: &str, valoracion: i64) -> RatingRecord {
        RatingRecord {
            id: 0,
            captador: Some("Ana".to_string()),
            nombre: nombre.to_string(),
            posicion: "Delantera".to_string(),
            club: "Club A".to_string(),
            valoracion,
            comentario: "ok".to_string(),
        }
    }

    fn form() -> RatingForm {
        RatingForm {
            captador: "Ana".to_string(),
            nombre: "Jugadora X".to_string(),
            posicion: "Delantera".to_string(),
            club: "Club A".to_string(),
            valoracion: 7,
            comentario: "buena".to_string(),
        }
    }

    #[test]
    fn average_of_three_five_seven_is_five() {
        let ratings = vec![rating("X", 3), rating("X", 5), rating("X", 7)];
        assert_eq!(average_rating(&ratings), Some(5.0));
        assert_eq!(average_rating(&[]), None);
    }

    #[test]
    fn team_filter_is_exact_match() {
        let filter = RosterFilter {
            team: Some("Club A".to_string()),
            ..Default::default()
        };
        let out = filter_roster(&roster(), &filter).expect("filter");
        assert_eq!(player_names(&out).expect("names"), vec!["Ana", "Cris"]);

        let partial = RosterFilter {
            team: Some("Club".to_string()),
            ..Default::default()
        };
        assert!(filter_roster(&roster(), &partial).expect("filter").is_empty());
    }

    #[test]
    fn ranges_include_both_bounds() {
        let filter = RosterFilter {
            matches: Some((12.0, 20.0)),
            ..Default::default()
        };
        let out = filter_roster(&roster(), &filter).expect("filter");
        assert_eq!(player_names(&out).expect("names"), vec!["Ana", "Bea"]);
    }

    #[test]
    fn age_range_drops_rows_without_age() {
        let filter = RosterFilter {
            age: Some((0.0, 99.0)),
            ..Default::default()
        };
        let out = filter_roster(&roster(), &filter).expect("filter");
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn team_filter_without_team_column_reports_it() {
        let table = Table::from_rows(vec!["NOMBRE".to_string()], vec![vec![text("Ana")]]);
        let filter = RosterFilter {
            team: Some("Club A".to_string()),
            ..Default::default()
        };
        let err = filter_roster(&table, &filter).expect_err("missing column");
        assert!(matches!(err, ScoutError::ColumnMissing(c) if c == "EQUIPO"));
    }

    #[test]
    fn summary_groups_by_player_in_first_seen_order() {
        let ratings = vec![rating("B", 9), rating("A", 3), rating("B", 7)];
        let summary = summarize_ratings(&ratings);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].nombre, "B");
        assert_eq!(summary[0].count, 2);
        assert_eq!(summary[0].average, 8.0);
        assert_eq!(summary[1].average, 3.0);
    }

    #[test]
    fn comparison_sums_metrics_and_lists_missing_ones() {
        let cmp = compare_players(&roster(), "Ana", "Bea").expect("compare");
        assert_eq!(
            cmp.first.metrics,
            vec![
                MetricValue { metric: "Goles".to_string(), value: 8.0 },
                MetricValue { metric: "Asist.".to_string(), value: 3.0 },
            ]
        );
        assert_eq!(cmp.second.metrics[1].value, 0.0);
        assert_eq!(cmp.missing_metrics, vec!["TA", "TR"]);
    }

    #[test]
    fn comparison_rejects_unknown_player() {
        let err = compare_players(&roster(), "Ana", "Zoe").expect_err("unknown");
        assert!(matches!(err, ScoutError::NotFound(n) if n == "Zoe"));
    }

    #[test]
    fn player_view_takes_crest_from_roster_team() {
        let crests = HashMap::from([("Club B".to_string(), "https://img/b.png".to_string())]);
        let view = player_view(&roster(), vec![rating("Bea", 5)], "Bea", &crests);
        assert_eq!(view.roster_rows.len(), 1);
        assert_eq!(view.average, Some(5.0));
        assert_eq!(view.crest_url.as_deref(), Some("https://img/b.png"));
    }

    #[test]
    fn valid_form_is_stored_verbatim() {
        let new = validate_rating(&form()).expect("valid");
        assert_eq!(new.nombre, "Jugadora X");
        assert_eq!(new.valoracion, 7);
    }

    #[test]
    fn blank_fields_and_bad_values_are_rejected() {
        let mut blank = form();
        blank.club = "  ".to_string();
        assert!(matches!(
            validate_rating(&blank),
            Err(ScoutError::Validation(m)) if m.contains("club")
        ));

        let mut bad_rating = form();
        bad_rating.valoracion = 6;
        assert!(validate_rating(&bad_rating).is_err());

        let mut bad_position = form();
        bad_position.posicion = "Lateral".to_string();
        assert!(validate_rating(&bad_position).is_err());
    }
}
