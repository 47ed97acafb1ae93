use tracing::info;

use crate::edge::EdgeOutcome;
use crate::merge::{MergeConfig, merge};
use crate::rank::rank_by_edge;
use crate::state::{LineProjection, MergedRow, PlayerRecord};

/// Ranked rows plus the aggregate counts a presenter shows alongside them.
#[derive(Debug, Clone, Default)]
pub struct Board {
    pub rows: Vec<MergedRow>,
    pub priced: usize,
    pub incomplete: usize,
    pub rejected: usize,
    pub skipped_roster: usize,
    pub blank_lines: usize,
    pub unmatched_lines: usize,
    pub duplicate_lines: usize,
    /// Upload rows dropped before the merge; filled in by the caller that parsed them.
    pub malformed_lines: usize,
}

impl Board {
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} players | {} priced | {} no line | {} rejected",
            self.rows.len(),
            self.priced,
            self.incomplete,
            self.rejected
        );
        if self.unmatched_lines > 0 {
            out.push_str(&format!(" | {} unmatched lines", self.unmatched_lines));
        }
        if self.blank_lines > 0 {
            out.push_str(&format!(" | {} lines without a name", self.blank_lines));
        }
        if self.malformed_lines > 0 {
            out.push_str(&format!(" | {} malformed dropped", self.malformed_lines));
        }
        out
    }
}

pub fn build_board(
    roster: &[PlayerRecord],
    lines: &[LineProjection],
    config: &MergeConfig,
) -> Board {
    let report = merge(roster, lines, config);
    let mut rows = report.rows;

    let mut priced = 0usize;
    let mut incomplete = 0usize;
    let mut rejected = 0usize;
    for row in &rows {
        match row.outcome {
            EdgeOutcome::Computed(_) => priced += 1,
            EdgeOutcome::Incomplete => incomplete += 1,
            EdgeOutcome::Rejected(_) => rejected += 1,
        }
    }

    rank_by_edge(&mut rows);
    info!(players = rows.len(), priced, incomplete, rejected, "board built");

    Board {
        rows,
        priced,
        incomplete,
        rejected,
        skipped_roster: report.skipped_roster,
        blank_lines: report.blank_lines,
        unmatched_lines: report.unmatched_lines,
        duplicate_lines: report.duplicate_lines,
        malformed_lines: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_every_outcome_once() {
        let roster = vec![
            PlayerRecord::new("priced"),
            PlayerRecord::new("zero"),
            PlayerRecord::new("bare"),
        ];
        let lines = vec![
            LineProjection {
                player_name: "priced".to_string(),
                line: Some(4.5),
                projection: Some(5.5),
                std_dev: None,
            },
            LineProjection {
                player_name: "zero".to_string(),
                line: Some(0.0),
                projection: Some(1.0),
                std_dev: None,
            },
        ];
        let board = build_board(
            &roster,
            &lines,
            &MergeConfig {
                default_std_dev: Some(1.5),
            },
        );
        assert_eq!(board.rows.len(), 3);
        assert_eq!((board.priced, board.rejected, board.incomplete), (1, 1, 1));
        assert_eq!(board.rows[0].player.name, "priced");
        assert!(board.summary().starts_with("3 players | 1 priced"));
    }

    #[test]
    fn summary_reports_nameless_lines() {
        let lines = vec![LineProjection {
            player_name: " ".to_string(),
            line: Some(4.5),
            projection: Some(5.5),
            std_dev: Some(1.0),
        }];
        let board = build_board(&[PlayerRecord::new("a")], &lines, &MergeConfig::default());
        assert_eq!(board.blank_lines, 1);
        assert!(board.summary().contains("1 lines without a name"));
    }
}
