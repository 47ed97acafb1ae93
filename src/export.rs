use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::Deserialize;

use crate::board::Board;
use crate::grade::{Grade, TierScheme};
use crate::state::MergedRow;

pub const EXPORT_COLUMNS: [&str; 9] = [
    "name",
    "team",
    "position",
    "line",
    "projection",
    "std_dev",
    "edge_pct",
    "win_probability",
    "grade",
];

/// One exported row read back from delimited text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExportedRow {
    pub name: String,
    pub team: Option<String>,
    pub position: Option<String>,
    pub line: Option<f64>,
    pub projection: Option<f64>,
    pub std_dev: Option<f64>,
    pub edge_pct: Option<f64>,
    pub win_probability: Option<f64>,
    pub grade: Option<Grade>,
}

pub struct ExportReport {
    pub rows: usize,
    pub priced: usize,
}

pub fn export_csv(path: &Path, rows: &[MergedRow]) -> Result<ExportReport> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed creating {}", path.display()))?;
    write_csv(file, rows).with_context(|| format!("failed writing {}", path.display()))
}

pub fn write_csv<W: Write>(out: W, rows: &[MergedRow]) -> Result<ExportReport> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(EXPORT_COLUMNS).context("write header")?;
    let mut priced = 0usize;
    for row in rows {
        if row.outcome.result().is_some() {
            priced += 1;
        }
        writer.write_record(row_cells(row)).context("write row")?;
    }
    writer.flush().context("flush csv")?;
    Ok(ExportReport {
        rows: rows.len(),
        priced,
    })
}

pub fn read_csv<R: Read>(rdr: R) -> Result<Vec<ExportedRow>> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut out = Vec::new();
    for (idx, result) in reader.deserialize::<ExportedRow>().enumerate() {
        let row = result.with_context(|| format!("invalid export row {}", idx + 1))?;
        out.push(row);
    }
    Ok(out)
}

fn row_cells(row: &MergedRow) -> [String; 9] {
    let result = row.outcome.result();
    [
        row.player.name.clone(),
        row.player.team.clone().unwrap_or_default(),
        row.player.position.clone().unwrap_or_default(),
        opt_to_string(row.line),
        opt_to_string(row.projection),
        opt_to_string(row.std_dev),
        opt_to_string(result.map(|r| r.edge_pct)),
        opt_to_string(result.map(|r| r.win_probability)),
        opt_to_string(result.map(|r| r.grade)),
    ]
}

/// Workbook with the ranked board on one sheet and the run counts on another.
pub fn export_xlsx(path: &Path, board: &Board, scheme: TierScheme) -> Result<ExportReport> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Board")?;
        write_board_sheet(sheet, &board.rows, scheme)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        let summary = [
            ("Players", board.rows.len()),
            ("Priced", board.priced),
            ("No line", board.incomplete),
            ("Rejected", board.rejected),
            ("Unmatched lines", board.unmatched_lines),
            ("Lines without a name", board.blank_lines),
            ("Duplicate lines", board.duplicate_lines),
            ("Malformed dropped", board.malformed_lines),
        ];
        for (idx, (label, count)) in summary.iter().enumerate() {
            sheet.write_string(idx as u32, 0, *label)?;
            sheet.write_number(idx as u32, 1, *count as f64)?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        rows: board.rows.len(),
        priced: board.priced,
    })
}

fn write_board_sheet(sheet: &mut Worksheet, rows: &[MergedRow], scheme: TierScheme) -> Result<()> {
    let bold = Format::new().set_bold();
    for (col, name) in EXPORT_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &bold)?;
    }
    sheet.write_string_with_format(0, EXPORT_COLUMNS.len() as u16, "tier", &bold)?;

    for (idx, row) in rows.iter().enumerate() {
        let r = (idx + 1) as u32;
        let result = row.outcome.result();
        sheet.write_string(r, 0, &row.player.name)?;
        write_opt_string(sheet, r, 1, row.player.team.as_deref())?;
        write_opt_string(sheet, r, 2, row.player.position.as_deref())?;
        write_opt_number(sheet, r, 3, row.line)?;
        write_opt_number(sheet, r, 4, row.projection)?;
        write_opt_number(sheet, r, 5, row.std_dev)?;
        write_opt_number(sheet, r, 6, result.map(|x| x.edge_pct))?;
        write_opt_number(sheet, r, 7, result.map(|x| x.win_probability))?;
        write_opt_string(sheet, r, 8, result.map(|x| x.grade.as_str()))?;
        write_opt_string(sheet, r, 9, result.map(|x| scheme.label(x.win_probability)))?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_opt_string(sheet: &mut Worksheet, row: u32, col: u16, value: Option<&str>) -> Result<()> {
    if let Some(v) = value {
        sheet
            .write_string(row, col, v)
            .with_context(|| format!("write cell ({row},{col})"))?;
    }
    Ok(())
}

fn write_opt_number(sheet: &mut Worksheet, row: u32, col: u16, value: Option<f64>) -> Result<()> {
    if let Some(v) = value {
        sheet
            .write_number(row, col, v)
            .with_context(|| format!("write cell ({row},{col})"))?;
    }
    Ok(())
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
