use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use rfef_scout::ratings::RatingRecord;
use rfef_scout::scouting::{RosterFilter, filter_roster, summarize_ratings};
use rfef_scout::table::{Cell, Table};

fn sample_roster(rows: usize) -> Table {
    let columns = ["NOMBRE", "EQUIPO", "EDAD", "PJ", "Goles", "Asist.", "TA", "TR"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let rows = (0..rows)
        .map(|idx| {
            vec![
                Cell::Text(format!("Jugadora {idx}")),
                Cell::Text(format!("Club {}", idx % 32)),
                Cell::Number((17 + idx % 18) as f64),
                Cell::Number((idx % 30) as f64),
                Cell::Number((idx % 12) as f64),
                Cell::Number((idx % 7) as f64),
                Cell::Number((idx % 5) as f64),
                Cell::Number((idx % 2) as f64),
            ]
        })
        .collect();
    Table::from_rows(columns, rows)
}

fn sample_ratings(count: usize) -> Vec<RatingRecord> {
    (0..count)
        .map(|idx| RatingRecord {
            id: idx as i64 + 1,
            captador: Some(format!("Captador {}", idx % 4)),
            nombre: format!("Jugadora {}", idx % 150),
            posicion: "Defensa".to_string(),
            club: format!("Club {}", idx % 32),
            valoracion: [3, 5, 7, 9][idx % 4],
            comentario: "ok".to_string(),
        })
        .collect()
}

fn bench_roster_filter(c: &mut Criterion) {
    let roster = sample_roster(800);
    let filter = RosterFilter {
        team: Some("Club 3".to_string()),
        age: Some((18.0, 30.0)),
        matches: Some((5.0, 29.0)),
    };
    c.bench_function("roster_filter", |b| {
        b.iter(|| {
            let out = filter_roster(black_box(&roster), black_box(&filter)).unwrap();
            black_box(out.len());
        })
    });
}

fn bench_rating_summary(c: &mut Criterion) {
    let ratings = sample_ratings(2_000);
    c.bench_function("rating_summary", |b| {
        b.iter(|| {
            let summary = summarize_ratings(black_box(&ratings));
            black_box(summary.len());
        })
    });
}

criterion_group!(benches, bench_roster_filter, bench_rating_summary);
criterion_main!(benches);
