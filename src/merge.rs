use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::edge::{EdgeOutcome, compute_row};
use crate::state::{LineProjection, MergedRow, PlayerRecord};

/// Row counts below this are priced on the calling thread.
const PAR_THRESHOLD: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MergeConfig {
    /// Applied to every line without its own std_dev. `None` leaves such rows incomplete.
    pub default_std_dev: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub rows: Vec<MergedRow>,
    /// Roster records dropped for a blank name.
    pub skipped_roster: usize,
    /// Lines dropped for a blank player name.
    pub blank_lines: usize,
    /// Lines whose player is not on the roster.
    pub unmatched_lines: usize,
    /// Lines superseded by a later line for the same player.
    pub duplicate_lines: usize,
}

/// Join key: case-sensitive, surrounding whitespace ignored.
pub fn normalize_name(raw: &str) -> &str {
    raw.trim()
}

/// Left join of `roster` with `lines` by normalized name.
///
/// Every roster player with a non-blank name yields exactly one row, in roster order.
/// When several lines name the same player the last one wins, so the join never fans out.
pub fn merge(
    roster: &[PlayerRecord],
    lines: &[LineProjection],
    config: &MergeConfig,
) -> MergeReport {
    let mut by_name: HashMap<&str, &LineProjection> = HashMap::with_capacity(lines.len());
    let mut duplicate_lines = 0usize;
    let mut blank_lines = 0usize;
    for line in lines {
        let key = normalize_name(&line.player_name);
        if key.is_empty() {
            blank_lines += 1;
            continue;
        }
        if by_name.insert(key, line).is_some() {
            warn!("duplicate line for '{}', using latest value", key);
            duplicate_lines += 1;
        }
    }

    let mut skipped_roster = 0usize;
    let mut matched: HashSet<&str> = HashSet::new();
    let mut joined: Vec<(&PlayerRecord, Option<&LineProjection>)> =
        Vec::with_capacity(roster.len());
    for player in roster {
        let key = normalize_name(&player.name);
        if key.is_empty() {
            skipped_roster += 1;
            continue;
        }
        let line = by_name.get(key).copied();
        if line.is_some() {
            matched.insert(key);
        }
        joined.push((player, line));
    }
    let unmatched_lines = by_name.keys().filter(|k| !matched.contains(*k)).count();

    let rows = if joined.len() >= PAR_THRESHOLD {
        joined
            .par_iter()
            .map(|(player, line)| merged_row(player, *line, config))
            .collect()
    } else {
        joined
            .iter()
            .map(|(player, line)| merged_row(player, *line, config))
            .collect()
    };

    debug!(
        rows = joined.len(),
        skipped_roster, blank_lines, unmatched_lines, duplicate_lines, "merge complete"
    );

    MergeReport {
        rows,
        skipped_roster,
        blank_lines,
        unmatched_lines,
        duplicate_lines,
    }
}

fn merged_row(
    player: &PlayerRecord,
    line: Option<&LineProjection>,
    config: &MergeConfig,
) -> MergedRow {
    let Some(line) = line else {
        return MergedRow {
            player: player.clone(),
            line: None,
            projection: None,
            std_dev: None,
            outcome: EdgeOutcome::Incomplete,
        };
    };
    let std_dev = line.std_dev.or(config.default_std_dev);
    MergedRow {
        player: player.clone(),
        line: line.line,
        projection: line.projection,
        std_dev,
        outcome: compute_row(line.projection, line.line, std_dev),
    }
}

/// Keep the first record per normalized name. For feeds that list a player more than once.
pub fn dedupe_roster_by_name(roster: Vec<PlayerRecord>) -> Vec<PlayerRecord> {
    let mut seen: HashSet<String> = HashSet::with_capacity(roster.len());
    roster
        .into_iter()
        .filter(|p| seen.insert(normalize_name(&p.name).to_string()))
        .collect()
}
