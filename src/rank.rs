use std::cmp::Ordering;

use crate::state::MergedRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Edge,
    WinProbability,
    Name,
}

impl SortKey {
    pub fn next(self) -> Self {
        match self {
            SortKey::Edge => SortKey::WinProbability,
            SortKey::WinProbability => SortKey::Name,
            SortKey::Name => SortKey::Edge,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Edge => "EDGE",
            SortKey::WinProbability => "WIN%",
            SortKey::Name => "NAME",
        }
    }
}

/// Edge descending, absent edges last. Stable, so ties keep input order.
pub fn rank_by_edge(rows: &mut [MergedRow]) {
    rows.sort_by(|a, b| desc_absent_last(a.edge_pct(), b.edge_pct()));
}

pub fn sort_rows(rows: &mut [MergedRow], key: SortKey) {
    match key {
        SortKey::Edge => rank_by_edge(rows),
        SortKey::WinProbability => {
            rows.sort_by(|a, b| desc_absent_last(a.win_probability(), b.win_probability()))
        }
        SortKey::Name => rows.sort_by(|a, b| a.player.name.trim().cmp(b.player.name.trim())),
    }
}

fn desc_absent_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        // Priced values are never NaN; `-0.0` and `0.0` must tie.
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{EdgeOutcome, compute_row};
    use crate::state::PlayerRecord;

    fn row(name: &str, projection: Option<f64>, line: f64) -> MergedRow {
        MergedRow {
            player: PlayerRecord::new(name),
            line: Some(line),
            projection,
            std_dev: Some(4.0),
            outcome: compute_row(projection, Some(line), Some(4.0)),
        }
    }

    fn names(rows: &[MergedRow]) -> Vec<&str> {
        rows.iter().map(|r| r.player.name.as_str()).collect()
    }

    #[test]
    fn edge_descending_with_absent_last() {
        let mut rows = vec![
            row("none-1", None, 10.0),
            row("low", Some(9.0), 10.0),
            row("high", Some(14.0), 10.0),
            row("none-2", None, 10.0),
            row("mid", Some(11.0), 10.0),
        ];
        rank_by_edge(&mut rows);
        assert_eq!(names(&rows), ["high", "mid", "low", "none-1", "none-2"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let mut rows = vec![
            row("b", Some(12.0), 10.0),
            row("a", Some(12.0), 10.0),
            row("c", Some(12.0), 10.0),
        ];
        rank_by_edge(&mut rows);
        assert_eq!(names(&rows), ["b", "a", "c"]);
    }

    #[test]
    fn zero_edges_on_negative_and_positive_lines_tie() {
        let mut rows = vec![
            row("negative-line", Some(-3.0), -3.0),
            row("positive-line", Some(3.0), 3.0),
        ];
        assert!(rows[0].edge_pct().is_some_and(|e| e == 0.0 && e.is_sign_negative()));
        rank_by_edge(&mut rows);
        assert_eq!(names(&rows), ["negative-line", "positive-line"]);

        let mut rows = vec![
            row("positive-line", Some(3.0), 3.0),
            row("negative-line", Some(-3.0), -3.0),
        ];
        rank_by_edge(&mut rows);
        assert_eq!(names(&rows), ["positive-line", "negative-line"]);
    }

    #[test]
    fn rejected_rows_sort_with_absent() {
        let mut rows = vec![
            MergedRow {
                player: PlayerRecord::new("zero-line"),
                line: Some(0.0),
                projection: Some(2.0),
                std_dev: Some(1.0),
                outcome: compute_row(Some(2.0), Some(0.0), Some(1.0)),
            },
            row("neg", Some(8.0), 10.0),
        ];
        assert!(matches!(rows[0].outcome, EdgeOutcome::Rejected(_)));
        rank_by_edge(&mut rows);
        assert_eq!(names(&rows), ["neg", "zero-line"]);
    }

    #[test]
    fn sort_by_name_and_back() {
        let mut rows = vec![row("Cole", Some(8.0), 10.0), row("Abe", Some(12.0), 10.0)];
        sort_rows(&mut rows, SortKey::Name);
        assert_eq!(names(&rows), ["Abe", "Cole"]);
        sort_rows(&mut rows, SortKey::WinProbability);
        assert_eq!(names(&rows), ["Abe", "Cole"]);
        assert_eq!(SortKey::Name.next(), SortKey::Edge);
    }
}
