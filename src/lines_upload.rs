use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use crate::error::IngestError;
use crate::state::LineProjection;

const PLAYER_ALIASES: &[&str] = &["player", "player_name", "name"];
const LINE_ALIASES: &[&str] = &["underdog_line", "line"];
const PROJECTION_ALIASES: &[&str] = &["your_projection", "projection"];
const STD_DEV_ALIASES: &[&str] = &["std_dev", "stddev", "sd"];

/// Preferred header names for an upload. Built-in aliases are tried after these.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineColumns {
    pub player: Option<String>,
    pub line: Option<String>,
    pub projection: Option<String>,
    pub std_dev: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LinesUpload {
    pub lines: Vec<LineProjection>,
    /// Rows dropped for a blank player or an unparseable number.
    pub malformed: usize,
}

struct ColumnIndex {
    player: usize,
    line: usize,
    projection: usize,
    std_dev: Option<usize>,
}

pub fn load_lines_csv(path: &Path, columns: &LineColumns) -> Result<LinesUpload, IngestError> {
    let file = std::fs::File::open(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let upload = parse_lines_csv(file, columns)?;
    info!(
        path = %path.display(),
        lines = upload.lines.len(),
        malformed = upload.malformed,
        "lines upload loaded"
    );
    Ok(upload)
}

pub fn parse_lines_csv<R: Read>(rdr: R, columns: &LineColumns) -> Result<LinesUpload, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(rdr);
    let headers = reader.headers()?.clone();
    let index = resolve_columns(&headers, columns)?;

    let mut out = LinesUpload::default();
    for (row_idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("skipping unreadable lines row {}: {}", row_idx + 1, e);
                out.malformed += 1;
                continue;
            }
        };
        match parse_record(&record, &index) {
            Some(line) => out.lines.push(line),
            None => {
                warn!("skipping malformed lines row {}", row_idx + 1);
                out.malformed += 1;
            }
        }
    }
    Ok(out)
}

fn resolve_columns(
    headers: &csv::StringRecord,
    columns: &LineColumns,
) -> Result<ColumnIndex, IngestError> {
    let find = |preferred: &Option<String>, aliases: &[&str]| -> Option<usize> {
        let wanted = preferred
            .iter()
            .map(|s| s.as_str())
            .chain(aliases.iter().copied());
        for name in wanted {
            let name = name.trim().to_lowercase();
            if let Some(idx) = headers.iter().position(|h| h.trim().to_lowercase() == name) {
                return Some(idx);
            }
        }
        None
    };

    let player = find(&columns.player, PLAYER_ALIASES)
        .ok_or_else(|| IngestError::MissingColumn(wanted_label(&columns.player, PLAYER_ALIASES)))?;
    let line = find(&columns.line, LINE_ALIASES)
        .ok_or_else(|| IngestError::MissingColumn(wanted_label(&columns.line, LINE_ALIASES)))?;
    let projection = find(&columns.projection, PROJECTION_ALIASES).ok_or_else(|| {
        IngestError::MissingColumn(wanted_label(&columns.projection, PROJECTION_ALIASES))
    })?;
    let std_dev = find(&columns.std_dev, STD_DEV_ALIASES);

    Ok(ColumnIndex {
        player,
        line,
        projection,
        std_dev,
    })
}

fn wanted_label(preferred: &Option<String>, aliases: &[&str]) -> String {
    match preferred {
        Some(p) => p.clone(),
        None => aliases.join("|"),
    }
}

fn parse_record(record: &csv::StringRecord, index: &ColumnIndex) -> Option<LineProjection> {
    let player_name = record.get(index.player)?.trim();
    if player_name.is_empty() {
        return None;
    }
    let line = parse_cell(record.get(index.line))?;
    let projection = parse_cell(record.get(index.projection))?;
    let std_dev = match index.std_dev {
        Some(idx) => parse_cell(record.get(idx))?,
        None => None,
    };
    Some(LineProjection {
        player_name: player_name.to_string(),
        line,
        projection,
        std_dev,
    })
}

/// `Some(None)` for an empty cell, `None` when the cell holds something that is not a
/// finite number.
fn parse_cell(raw: Option<&str>) -> Option<Option<f64>> {
    let s = raw.unwrap_or("").trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("na") {
        return Some(None);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(Some(v)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_underdog_column_names() {
        let csv_data = "\
player,underdog_line,your_projection,std_dev
Jalen Brunson,26.5,28.1,5.5
Josh Hart,9.5,8.0,
";
        let upload = parse_lines_csv(csv_data.as_bytes(), &LineColumns::default()).unwrap();
        assert_eq!(upload.malformed, 0);
        assert_eq!(upload.lines.len(), 2);
        assert_eq!(upload.lines[0].player_name, "Jalen Brunson");
        assert_eq!(upload.lines[0].line, Some(26.5));
        assert_eq!(upload.lines[0].std_dev, Some(5.5));
        assert_eq!(upload.lines[1].std_dev, None);
    }

    #[test]
    fn reads_generic_column_names_without_std_dev() {
        let csv_data = "\
player_name,line,projection
A,10,12
";
        let upload = parse_lines_csv(csv_data.as_bytes(), &LineColumns::default()).unwrap();
        assert_eq!(upload.lines.len(), 1);
        assert_eq!(upload.lines[0].projection, Some(12.0));
        assert_eq!(upload.lines[0].std_dev, None);
    }

    #[test]
    fn preferred_column_names_win_over_aliases() {
        let csv_data = "\
Name,Line,Proj,Spread
A,10,12,2
";
        let columns = LineColumns {
            player: None,
            line: None,
            projection: Some("Proj".to_string()),
            std_dev: Some("Spread".to_string()),
        };
        let upload = parse_lines_csv(csv_data.as_bytes(), &columns).unwrap();
        assert_eq!(upload.lines[0].projection, Some(12.0));
        assert_eq!(upload.lines[0].std_dev, Some(2.0));
    }

    #[test]
    fn non_numeric_rows_are_dropped_and_counted() {
        let csv_data = "\
player,underdog_line,your_projection
A,ten,12
B,10,inf
,10,12
C,10,
D,7.5,8
";
        let upload = parse_lines_csv(csv_data.as_bytes(), &LineColumns::default()).unwrap();
        assert_eq!(upload.malformed, 3);
        let names: Vec<_> = upload.lines.iter().map(|l| l.player_name.as_str()).collect();
        assert_eq!(names, ["C", "D"]);
        assert_eq!(upload.lines[0].projection, None);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let csv_data = "player,underdog_line\nA,10\n";
        let err = parse_lines_csv(csv_data.as_bytes(), &LineColumns::default()).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn(_)));
    }

    #[test]
    fn short_rows_read_missing_cells_as_absent() {
        let csv_data = "player,underdog_line,your_projection,std_dev\nA,10,12\n";
        let upload = parse_lines_csv(csv_data.as_bytes(), &LineColumns::default()).unwrap();
        assert_eq!(upload.lines.len(), 1);
        assert_eq!(upload.lines[0].std_dev, None);
    }
}
