use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::ratings::RatingRecord;
use crate::scouting::summarize_ratings;

pub const RATINGS_SHEET: &str = "Valoraciones";
pub const SUMMARY_SHEET: &str = "Resumen";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub ratings: usize,
    pub players: usize,
}

pub fn export_ratings(path: &Path, ratings: &[RatingRecord]) -> Result<ExportReport> {
    let (mut workbook, report) = build_workbook(ratings)?;
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(report)
}

/// Same workbook as [`export_ratings`], kept in memory.
pub fn ratings_workbook_bytes(ratings: &[RatingRecord]) -> Result<Vec<u8>> {
    let (mut workbook, _) = build_workbook(ratings)?;
    workbook
        .save_to_buffer()
        .context("failed serializing workbook")
}

fn build_workbook(ratings: &[RatingRecord]) -> Result<(Workbook, ExportReport)> {
    let summary = summarize_ratings(ratings);
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(RATINGS_SHEET)?;
        write_header(
            sheet,
            &["ID", "Captador", "Nombre", "Posición", "Club", "Valoración", "Comentario"],
        )?;
        for (idx, r) in ratings.iter().enumerate() {
            let row = idx as u32 + 1;
            sheet
                .write_number(row, 0, r.id as f64)
                .with_context(|| format!("write rating id ({row})"))?;
            write_text(sheet, row, 1, r.captador.as_deref().unwrap_or_default())?;
            write_text(sheet, row, 2, &r.nombre)?;
            write_text(sheet, row, 3, &r.posicion)?;
            write_text(sheet, row, 4, &r.club)?;
            sheet
                .write_number(row, 5, r.valoracion as f64)
                .with_context(|| format!("write rating value ({row})"))?;
            write_text(sheet, row, 6, &r.comentario)?;
        }
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SUMMARY_SHEET)?;
        write_header(sheet, &["Nombre", "Valoraciones", "Media"])?;
        for (idx, s) in summary.iter().enumerate() {
            let row = idx as u32 + 1;
            write_text(sheet, row, 0, &s.nombre)?;
            sheet
                .write_number(row, 1, s.count as f64)
                .with_context(|| format!("write summary count ({row})"))?;
            sheet
                .write_number(row, 2, s.average)
                .with_context(|| format!("write summary mean ({row})"))?;
        }
    }

    let report = ExportReport {
        ratings: ratings.len(),
        players: summary.len(),
    };
    Ok((workbook, report))
}

fn write_header(sheet: &mut Worksheet, names: &[&str]) -> Result<()> {
    for (col, name) in names.iter().enumerate() {
        write_text(sheet, 0, col as u16, name)?;
    }
    Ok(())
}

fn write_text(sheet: &mut Worksheet, row: u32, col: u16, value: &str) -> Result<()> {
    // Blank cells stay unwritten so readers see them as empty.
    if value.is_empty() {
        return Ok(());
    }
    sheet
        .write_string(row, col, value)
        .with_context(|| format!("write cell ({row},{col})"))?;
    Ok(())
}
