use std::collections::VecDeque;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::board::{Board, build_board};
use crate::edge::EdgeOutcome;
use crate::grade::TierScheme;
use crate::merge::MergeConfig;
use crate::rank::{SortKey, sort_rows};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
}

impl PlayerRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            team: None,
            position: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineProjection {
    pub player_name: String,
    #[serde(default)]
    pub line: Option<f64>,
    #[serde(default)]
    pub projection: Option<f64>,
    #[serde(default)]
    pub std_dev: Option<f64>,
}

/// One roster player joined with its line (if any) and the priced outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub player: PlayerRecord,
    pub line: Option<f64>,
    pub projection: Option<f64>,
    /// Effective std_dev after default filling.
    pub std_dev: Option<f64>,
    pub outcome: EdgeOutcome,
}

impl MergedRow {
    pub fn edge_pct(&self) -> Option<f64> {
        self.outcome.edge_pct()
    }

    pub fn win_probability(&self) -> Option<f64> {
        self.outcome.win_probability()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum League {
    Nba,
    Nfl,
    Mlb,
    Nhl,
}

impl League {
    pub const ALL: [League; 4] = [League::Nba, League::Nfl, League::Mlb, League::Nhl];

    pub fn next(self) -> Self {
        match self {
            League::Nba => League::Nfl,
            League::Nfl => League::Mlb,
            League::Mlb => League::Nhl,
            League::Nhl => League::Nba,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            League::Nba => "nba",
            League::Nfl => "nfl",
            League::Mlb => "mlb",
            League::Nhl => "nhl",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase();
        League::ALL.into_iter().find(|l| l.key() == key)
    }
}

pub fn league_label(league: League) -> &'static str {
    match league {
        League::Nba => "NBA",
        League::Nfl => "NFL",
        League::Mlb => "MLB",
        League::Nhl => "NHL",
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub league: League,
    pub sort: SortKey,
    pub scheme: TierScheme,
    pub merge_config: MergeConfig,
    pub roster: Vec<PlayerRecord>,
    pub roster_loading: bool,
    pub roster_errors: Vec<String>,
    pub lines: Vec<LineProjection>,
    pub lines_path: Option<PathBuf>,
    pub lines_malformed: usize,
    pub board: Board,
    pub selected: usize,
    pub updated: Option<String>,
    pub help_overlay: bool,
    pub logs: VecDeque<String>,
}

impl AppState {
    pub fn new(league: League, merge_config: MergeConfig, scheme: TierScheme) -> Self {
        Self {
            league,
            sort: SortKey::Edge,
            scheme,
            merge_config,
            roster: Vec::new(),
            roster_loading: false,
            roster_errors: Vec::new(),
            lines: Vec::new(),
            lines_path: None,
            lines_malformed: 0,
            board: Board::default(),
            selected: 0,
            updated: None,
            help_overlay: false,
            logs: VecDeque::new(),
        }
    }

    pub fn cycle_league(&mut self) {
        self.league = self.league.next();
        self.roster.clear();
        self.roster_errors.clear();
        self.roster_loading = false;
        self.board = Board::default();
        self.selected = 0;
        self.updated = None;
        self.push_log(format!("[INFO] League: {}", league_label(self.league)));
    }

    pub fn cycle_sort(&mut self) {
        self.sort = self.sort.next();
        sort_rows(&mut self.board.rows, self.sort);
        self.selected = 0;
    }

    pub fn toggle_scheme(&mut self) {
        self.scheme = self.scheme.toggle();
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.board.rows.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_row(&self) -> Option<&MergedRow> {
        self.board.rows.get(self.selected)
    }

    /// Re-run the merge and re-apply the active sort.
    pub fn rebuild_board(&mut self) {
        let mut board = build_board(&self.roster, &self.lines, &self.merge_config);
        board.malformed_lines = self.lines_malformed;
        if self.sort != SortKey::Edge {
            sort_rows(&mut board.rows, self.sort);
        }
        self.board = board;
        if self.selected >= self.board.rows.len() {
            self.selected = self.board.rows.len().saturating_sub(1);
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    SetRoster {
        league: League,
        players: Vec<PlayerRecord>,
        errors: Vec<String>,
        fetched_at: String,
    },
    SetLines {
        path: PathBuf,
        lines: Vec<LineProjection>,
        malformed: usize,
    },
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    FetchRoster { league: League, refresh: bool },
    LoadLines { path: PathBuf },
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::SetRoster {
            league,
            players,
            errors,
            fetched_at,
        } => {
            // A late response for a league the user already left.
            if league != state.league {
                return;
            }
            state.roster_loading = false;
            for err in errors.iter().take(3) {
                state.push_log(format!("[WARN] Roster: {err}"));
            }
            if errors.len() > 3 {
                state.push_log(format!("[WARN] Roster: {} more errors", errors.len() - 3));
            }
            state.push_log(format!(
                "[INFO] Fetched {} players for {}",
                players.len(),
                league_label(league)
            ));
            state.roster = players;
            state.roster_errors = errors;
            state.updated = Some(fetched_at);
            state.rebuild_board();
        }
        Delta::SetLines {
            path,
            lines,
            malformed,
        } => {
            state.push_log(format!(
                "[INFO] Loaded {} lines from {}",
                lines.len(),
                path.display()
            ));
            if malformed > 0 {
                state.push_log(format!("[WARN] Dropped {malformed} malformed rows"));
            }
            state.lines = lines;
            state.lines_path = Some(path);
            state.lines_malformed = malformed;
            state.rebuild_board();
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
