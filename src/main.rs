use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use rfef_scout::config::ScoutConfig;
use rfef_scout::logs::init_logger;
use rfef_scout::ratings::{RatingRecord, RatingStore};
use rfef_scout::roster::{HttpSheetSource, RosterProvider};
use rfef_scout::scouting::{Comparison, PlayerView, RatingForm, RosterFilter};
use rfef_scout::session::{NoticeLevel, ScoutSession};
use rfef_scout::table::Table;

#[derive(Parser)]
#[command(name = "rfef_scout", about = "Scouting and rating of 1-2 RFEF players")]
struct Cli {
    /// Ratings database file (overrides SCOUT_DB_PATH).
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create or upgrade the ratings database.
    Init,
    /// Show applied schema migrations.
    Migrations,
    /// Save a new rating.
    Rate {
        #[arg(long)]
        captador: String,
        #[arg(long)]
        nombre: String,
        #[arg(long, default_value = "Delantera")]
        posicion: String,
        #[arg(long)]
        club: String,
        #[arg(long)]
        valoracion: i64,
        #[arg(long)]
        comentario: String,
    },
    /// List every saved rating.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Replace the comment of a rating.
    Comment { id: i64, text: String },
    /// List player names from the roster.
    Players,
    /// Roster rows, ratings and average for one player.
    Player {
        name: String,
        #[arg(long)]
        json: bool,
    },
    /// Filter the roster by team, age and matches played.
    Filter {
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        age_min: Option<f64>,
        #[arg(long)]
        age_max: Option<f64>,
        #[arg(long)]
        pj_min: Option<f64>,
        #[arg(long)]
        pj_max: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Compare two players side by side.
    Compare {
        first: String,
        second: String,
        #[arg(long)]
        json: bool,
    },
    /// Write every rating to an xlsx workbook.
    Export { path: PathBuf },
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cli = Cli::parse();
    let mut config = ScoutConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    init_logger(config.log_level)?;

    let store = RatingStore::new(config.db_path.clone());
    let source = HttpSheetSource::new(config.http_timeout_secs)?;
    let mut provider = RosterProvider::new(source, config.roster_url.clone());
    if let Some(url) = config.crests_url.clone() {
        provider = provider.with_crests(url);
    }
    let mut session = ScoutSession::open(store, provider)
        .with_context(|| format!("cannot open ratings db {}", config.db_path.display()))?;

    let outcome = run(&mut session, cli.command);
    for notice in session.drain_notices() {
        let tag = match notice.level {
            NoticeLevel::Info => "INFO",
            NoticeLevel::Warn => "WARN",
            NoticeLevel::Error => "ERROR",
        };
        eprintln!("[{tag}] {}", notice.message);
    }
    outcome
}

fn run(session: &mut ScoutSession, command: Command) -> Result<()> {
    match command {
        Command::Init => {
            println!("Database ready: {}", session.store().path().display());
        }
        Command::Migrations => {
            for version in session.store().applied_migrations()? {
                println!("{version}");
            }
        }
        Command::Rate {
            captador,
            nombre,
            posicion,
            club,
            valoracion,
            comentario,
        } => {
            let form = RatingForm {
                captador,
                nombre,
                posicion,
                club,
                valoracion,
                comentario,
            };
            let id = session.submit_rating(&form)?;
            println!("Saved rating {id}");
        }
        Command::List { json } => {
            let ratings = session.ratings()?;
            if json {
                print_json(&ratings)?;
            } else {
                print_ratings(&ratings);
            }
        }
        Command::Comment { id, text } => {
            if session.update_comment(id, &text)? {
                println!("Updated rating {id}");
            }
        }
        Command::Players => {
            for name in session.player_names()? {
                println!("{name}");
            }
        }
        Command::Player { name, json } => {
            let view = session.player_view(&name)?;
            if json {
                print_json(&view)?;
            } else {
                print_player(&view);
            }
        }
        Command::Filter {
            team,
            age_min,
            age_max,
            pj_min,
            pj_max,
            json,
        } => {
            let filter = RosterFilter {
                team,
                age: bounds(age_min, age_max),
                matches: bounds(pj_min, pj_max),
            };
            let table = session.filter_roster(&filter)?;
            if json {
                print_json(&table)?;
            } else {
                print_table(&table);
            }
        }
        Command::Compare {
            first,
            second,
            json,
        } => {
            let comparison = session.compare(&first, &second)?;
            if json {
                print_json(&comparison)?;
            } else {
                print_comparison(&comparison);
            }
        }
        Command::Export { path } => {
            let report = session.export_ratings(&path)?;
            println!(
                "Exported {} rating(s) for {} player(s) to {}",
                report.ratings,
                report.players,
                path.display()
            );
        }
    }
    Ok(())
}

fn bounds(min: Option<f64>, max: Option<f64>) -> Option<(f64, f64)> {
    if min.is_none() && max.is_none() {
        return None;
    }
    Some((
        min.unwrap_or(f64::NEG_INFINITY),
        max.unwrap_or(f64::INFINITY),
    ))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{json}");
    Ok(())
}

fn print_ratings(ratings: &[RatingRecord]) {
    if ratings.is_empty() {
        println!("No ratings saved yet.");
        return;
    }
    for r in ratings {
        println!("#{} Captador: {}", r.id, r.captador.as_deref().unwrap_or("-"));
        println!("  {} - {} at {}", r.nombre, r.posicion, r.club);
        println!("  Rating: {}", r.valoracion);
        println!("  Comment: {}", r.comentario);
    }
}

fn print_player(view: &PlayerView) {
    println!("{}", view.name);
    if let Some(url) = &view.crest_url {
        println!("Crest: {url}");
    }
    if !view.roster_rows.is_empty() {
        print_table(&view.roster_rows);
    }
    print_ratings(&view.ratings);
    match view.average {
        Some(avg) => println!("Average rating: {avg:.2} ({} rating(s))", view.ratings.len()),
        None => println!("Average rating: n/a"),
    }
}

fn print_comparison(cmp: &Comparison) {
    for player in [&cmp.first, &cmp.second] {
        println!("== {}", player.name);
        print_table(&player.rows);
        for m in &player.metrics {
            println!("  {}: {}", m.metric, m.value);
        }
    }
    if !cmp.missing_metrics.is_empty() {
        println!("Missing metrics: {}", cmp.missing_metrics.join(", "));
    }
}

fn print_table(table: &Table) {
    println!("{}", table.columns().join("\t"));
    for row in table.rows() {
        let line = row
            .iter()
            .map(|c| c.text().unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\t");
        println!("{line}");
    }
    println!("({} row(s))", table.len());
}
