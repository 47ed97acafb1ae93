use std::path::PathBuf;

use prop_edge::grade::TierScheme;
use prop_edge::merge::MergeConfig;
use prop_edge::rank::SortKey;
use prop_edge::state::{AppState, Delta, League, LineProjection, PlayerRecord, apply_delta};

fn state() -> AppState {
    AppState::new(
        League::Nba,
        MergeConfig {
            default_std_dev: Some(4.0),
        },
        TierScheme::Letter,
    )
}

fn roster_delta(league: League) -> Delta {
    Delta::SetRoster {
        league,
        players: vec![
            PlayerRecord::new("Zed"),
            PlayerRecord::new("Amy"),
            PlayerRecord::new("Mo"),
        ],
        errors: Vec::new(),
        fetched_at: "12:00:00".to_string(),
    }
}

fn lines_delta() -> Delta {
    Delta::SetLines {
        path: PathBuf::from("lines.csv"),
        lines: vec![
            LineProjection {
                player_name: "Zed".to_string(),
                line: Some(10.0),
                projection: Some(12.0),
                std_dev: None,
            },
            LineProjection {
                player_name: "Amy".to_string(),
                line: Some(10.0),
                projection: Some(15.0),
                std_dev: Some(1.0),
            },
        ],
        malformed: 1,
    }
}

#[test]
fn roster_then_lines_builds_ranked_board() {
    let mut state = state();
    apply_delta(&mut state, roster_delta(League::Nba));
    assert_eq!(state.board.rows.len(), 3);
    assert_eq!(state.board.priced, 0);
    assert_eq!(state.updated.as_deref(), Some("12:00:00"));

    apply_delta(&mut state, lines_delta());
    let names: Vec<&str> = state.board.rows.iter().map(|r| r.player.name.as_str()).collect();
    assert_eq!(names, vec!["Amy", "Zed", "Mo"]);
    assert_eq!(state.board.priced, 2);
    assert_eq!(state.board.malformed_lines, 1);
    let zed = state.board.rows.iter().find(|r| r.player.name == "Zed").unwrap();
    assert_eq!(zed.std_dev, Some(4.0));
    assert!(state.logs.iter().any(|l| l.contains("Dropped 1 malformed")));
}

#[test]
fn stale_league_roster_is_ignored() {
    let mut state = state();
    state.cycle_league();
    assert_eq!(state.league, League::Nfl);
    state.roster_loading = true;

    apply_delta(&mut state, roster_delta(League::Nba));
    assert!(state.board.rows.is_empty());
    assert!(state.roster_loading);

    apply_delta(&mut state, roster_delta(League::Nfl));
    assert_eq!(state.board.rows.len(), 3);
    assert!(!state.roster_loading);
}

#[test]
fn roster_errors_are_logged_and_kept() {
    let mut state = state();
    let errors: Vec<String> = (1..=5).map(|i| format!("team {i} failed")).collect();
    apply_delta(
        &mut state,
        Delta::SetRoster {
            league: League::Nba,
            players: vec![PlayerRecord::new("Amy")],
            errors,
            fetched_at: "09:30:00".to_string(),
        },
    );
    assert_eq!(state.roster_errors.len(), 5);
    let warns = state.logs.iter().filter(|l| l.starts_with("[WARN]")).count();
    assert_eq!(warns, 4);
}

#[test]
fn sort_cycle_reorders_and_returns_to_edge() {
    let mut state = state();
    apply_delta(&mut state, roster_delta(League::Nba));
    apply_delta(&mut state, lines_delta());

    state.cycle_sort();
    assert_eq!(state.sort, SortKey::WinProbability);
    assert_eq!(state.board.rows[0].player.name, "Amy");

    state.cycle_sort();
    assert_eq!(state.sort, SortKey::Name);
    let names: Vec<&str> = state.board.rows.iter().map(|r| r.player.name.as_str()).collect();
    assert_eq!(names, vec!["Amy", "Mo", "Zed"]);

    // Rebuilds keep the active sort.
    apply_delta(&mut state, lines_delta());
    assert_eq!(state.board.rows[1].player.name, "Mo");

    state.cycle_sort();
    assert_eq!(state.sort, SortKey::Edge);
    assert_eq!(state.board.rows[2].player.name, "Mo");
}

#[test]
fn selection_is_clamped_to_board() {
    let mut state = state();
    apply_delta(&mut state, roster_delta(League::Nba));
    for _ in 0..10 {
        state.select_next();
    }
    assert_eq!(state.selected, 2);
    state.select_prev();
    assert_eq!(state.selected_row().map(|r| r.player.name.as_str()), Some("Amy"));

    state.cycle_league();
    assert_eq!(state.selected, 0);
    assert!(state.selected_row().is_none());
}

#[test]
fn tier_scheme_toggles() {
    let mut state = state();
    assert_eq!(state.scheme, TierScheme::Letter);
    state.toggle_scheme();
    assert_eq!(state.scheme, TierScheme::Strength);
    assert_eq!(state.scheme.label(0.66), "Strong");
    state.toggle_scheme();
    assert_eq!(state.scheme.label(0.66), "A");
}

#[test]
fn log_buffer_is_bounded() {
    let mut state = state();
    for i in 0..250 {
        apply_delta(&mut state, Delta::Log(format!("[INFO] message {i}")));
    }
    assert_eq!(state.logs.len(), 200);
    assert_eq!(state.logs.front().map(String::as_str), Some("[INFO] message 50"));
}
