use std::path::Path;
use std::thread;

use anyhow::{Context, Result};
use rayon::prelude::*;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::FetchOptions;
use crate::http_cache::{self, fetch_json_cached};
use crate::http_client::http_client;
use crate::merge::dedupe_roster_by_name;
use crate::state::{League, PlayerRecord, league_label};

const NBA_PLAYERS_URL: &str = "https://www.balldontlie.io/api/v1/players";
const NBA_PER_PAGE: u32 = 100;
const NFL_ATHLETES_URL: &str = "https://sports.core.api.espn.com/v3/sports/football/nfl/athletes";
const NFL_PAGE_LIMIT: u32 = 500;
const MLB_API_URL: &str = "https://statsapi.mlb.com/api/v1";
const MLB_SPORT_ID: u32 = 1;
const NHL_API_URL: &str = "https://statsapi.web.nhl.com/api/v1";

/// A roster plus every page or team request that failed while building it.
/// A non-empty `errors` means `players` is partial.
#[derive(Debug, Clone, Default)]
pub struct RosterFetch {
    pub players: Vec<PlayerRecord>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RosterPage {
    pub players: Vec<PlayerRecord>,
    /// Total pages when the provider reports it.
    pub page_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TeamRef {
    pub id: u32,
    pub name: String,
}

pub fn fetch_roster(league: League, opts: &FetchOptions) -> Result<RosterFetch> {
    let client = http_client(opts.http_timeout)?;
    let fetched = match league {
        League::Nba => {
            let headers = nba_headers(opts);
            let fetch = |url: &str| fetch_with_headers(client, url, &headers);
            fetch_paginated(&fetch, opts, nba_page_url, parse_nba_players_json)
        }
        League::Nfl => {
            let fetch = |url: &str| fetch_json_cached(client, url, &[]);
            let mut out = fetch_paginated(&fetch, opts, nfl_page_url, parse_espn_athletes_json)?;
            let before = out.players.len();
            out.players = dedupe_roster_by_name(out.players);
            if out.players.len() < before {
                info!(dropped = before - out.players.len(), "deduplicated NFL athletes by name");
            }
            Ok(out)
        }
        League::Mlb => fetch_by_team(
            &|url: &str| fetch_json_cached(client, url, &[]),
            opts,
            &format!("{MLB_API_URL}/teams?sportId={MLB_SPORT_ID}"),
            |id| format!("{MLB_API_URL}/teams/{id}/roster"),
        ),
        League::Nhl => fetch_by_team(
            &|url: &str| fetch_json_cached(client, url, &[]),
            opts,
            &format!("{NHL_API_URL}/teams"),
            |id| format!("{NHL_API_URL}/teams/{id}/roster"),
        ),
    };
    http_cache::flush();
    let fetched = fetched?;

    info!(
        league = league_label(league),
        players = fetched.players.len(),
        errors = fetched.errors.len(),
        "roster fetched"
    );
    Ok(fetched)
}

/// Offline roster: a JSON array of `{ "name", "team", "position" }` objects.
pub fn load_roster_json(path: &Path) -> Result<Vec<PlayerRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed reading roster {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid roster json in {}", path.display()))
}

fn nba_page_url(page: u32) -> String {
    format!("{NBA_PLAYERS_URL}?page={page}&per_page={NBA_PER_PAGE}")
}

fn nfl_page_url(page: u32) -> String {
    format!("{NFL_ATHLETES_URL}?page={page}&limit={NFL_PAGE_LIMIT}")
}

fn nba_headers(opts: &FetchOptions) -> Vec<(String, String)> {
    opts.balldontlie_api_key
        .iter()
        .map(|key| ("Authorization".to_string(), key.clone()))
        .collect()
}

fn fetch_with_headers(client: &Client, url: &str, headers: &[(String, String)]) -> Result<String> {
    let headers: Vec<(&str, &str)> = headers
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    fetch_json_cached(client, url, &headers)
}

/// Walks pages from 1 until an empty page, the reported page count or `max_pages`.
/// A failure on the first page fails the fetch; later failures keep what was collected.
/// Stopping at `max_pages` while pages still had players is reported as an error.
fn fetch_paginated<F>(
    fetch: &F,
    opts: &FetchOptions,
    page_url: fn(u32) -> String,
    parse: fn(&str) -> Result<RosterPage>,
) -> Result<RosterFetch>
where
    F: Fn(&str) -> Result<String>,
{
    let max_pages = opts.max_pages as u32;
    let mut out = RosterFetch::default();

    for page in 1..=max_pages {
        let url = page_url(page);
        let parsed = match fetch(url.as_str()).and_then(|body| parse(&body)) {
            Ok(parsed) => parsed,
            Err(err) if page == 1 => return Err(err.context(format!("roster page {page}"))),
            Err(err) => {
                warn!(page, "roster page failed: {err:#}");
                out.errors.push(format!("page {page}: {err:#}"));
                break;
            }
        };
        if parsed.players.is_empty() {
            break;
        }
        out.players.extend(parsed.players);
        if parsed.page_count.is_some_and(|count| page >= count) {
            break;
        }
        if page == max_pages {
            warn!(max_pages, "roster truncated at page limit");
            out.errors.push(format!("stopped at max_pages={max_pages}, roster is partial"));
            break;
        }
        if !opts.page_delay.is_zero() {
            thread::sleep(opts.page_delay);
        }
    }
    Ok(out)
}

/// Team list first, then one roster request per team on the fetch pool.
fn fetch_by_team<F>(
    fetch: &F,
    opts: &FetchOptions,
    teams_url: &str,
    roster_url: impl Fn(u32) -> String + Sync,
) -> Result<RosterFetch>
where
    F: Fn(&str) -> Result<String> + Sync,
{
    let body = fetch(teams_url).context("team list request failed")?;
    let teams = parse_team_list_json(&body)?;
    if teams.is_empty() {
        return Err(anyhow::anyhow!("no teams in {teams_url}"));
    }

    let results: Vec<(TeamRef, Result<Vec<PlayerRecord>>)> =
        with_fetch_pool(opts.parallelism, || {
            teams
                .into_par_iter()
                .map(|team| {
                    let roster = fetch(roster_url(team.id).as_str())
                        .and_then(|body| parse_team_roster_json(&body, &team.name));
                    if !opts.page_delay.is_zero() {
                        thread::sleep(opts.page_delay / 2);
                    }
                    (team, roster)
                })
                .collect()
        });

    let mut out = RosterFetch::default();
    for (team, roster) in results {
        match roster {
            Ok(players) => out.players.extend(players),
            Err(err) => {
                warn!(team = %team.name, "team roster failed: {err:#}");
                out.errors.push(format!("{} ({}): {err:#}", team.name, team.id));
            }
        }
    }
    Ok(out)
}

fn with_fetch_pool<T>(threads: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}

#[derive(Debug, Deserialize)]
struct NbaPlayersResponse {
    #[serde(default)]
    data: Vec<NbaPlayer>,
    meta: Option<NbaMeta>,
}

#[derive(Debug, Deserialize)]
struct NbaPlayer {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    position: Option<String>,
    team: Option<NbaTeam>,
}

#[derive(Debug, Deserialize)]
struct NbaTeam {
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NbaMeta {
    total_pages: Option<u32>,
}

pub fn parse_nba_players_json(raw: &str) -> Result<RosterPage> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(RosterPage::default());
    }
    let parsed: NbaPlayersResponse =
        serde_json::from_str(trimmed).context("invalid nba players json")?;
    let players = parsed
        .data
        .into_iter()
        .map(|p| PlayerRecord {
            name: format!("{} {}", p.first_name.trim(), p.last_name.trim())
                .trim()
                .to_string(),
            team: p.team.and_then(|t| non_empty(t.full_name)),
            position: non_empty(p.position),
        })
        .collect();
    Ok(RosterPage {
        players,
        page_count: parsed.meta.and_then(|m| m.total_pages),
    })
}

#[derive(Debug, Deserialize)]
struct EspnAthletesResponse {
    #[serde(default)]
    items: Vec<EspnAthlete>,
    #[serde(rename = "pageCount")]
    page_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EspnAthlete {
    #[serde(rename = "fullName")]
    full_name: Option<String>,
    team: Option<EspnTeam>,
    position: Option<EspnPosition>,
}

#[derive(Debug, Deserialize)]
struct EspnTeam {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EspnPosition {
    abbreviation: Option<String>,
}

/// Athletes without a name are skipped here; the feed lists plenty of them.
pub fn parse_espn_athletes_json(raw: &str) -> Result<RosterPage> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(RosterPage::default());
    }
    let parsed: EspnAthletesResponse =
        serde_json::from_str(trimmed).context("invalid espn athletes json")?;
    let players = parsed
        .items
        .into_iter()
        .filter_map(|a| {
            let name = non_empty(a.full_name)?;
            Some(PlayerRecord {
                name,
                team: a.team.and_then(|t| non_empty(t.display_name)),
                position: a.position.and_then(|p| non_empty(p.abbreviation)),
            })
        })
        .collect();
    Ok(RosterPage {
        players,
        page_count: parsed.page_count,
    })
}

#[derive(Debug, Deserialize)]
struct TeamListResponse {
    #[serde(default)]
    teams: Vec<TeamRef>,
}

pub fn parse_team_list_json(raw: &str) -> Result<Vec<TeamRef>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let parsed: TeamListResponse = serde_json::from_str(trimmed).context("invalid team list json")?;
    Ok(parsed.teams)
}

#[derive(Debug, Deserialize)]
struct TeamRosterResponse {
    #[serde(default)]
    roster: Vec<RosterEntry>,
}

#[derive(Debug, Deserialize)]
struct RosterEntry {
    person: RosterPerson,
    position: Option<RosterPosition>,
}

#[derive(Debug, Deserialize)]
struct RosterPerson {
    #[serde(rename = "fullName")]
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RosterPosition {
    abbreviation: Option<String>,
    code: Option<String>,
}

/// Roster shape shared by the MLB and NHL stats APIs. MLB names the position
/// `abbreviation`, NHL names it `code`. Entries without a name are dropped.
pub fn parse_team_roster_json(raw: &str, team_name: &str) -> Result<Vec<PlayerRecord>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let parsed: TeamRosterResponse = serde_json::from_str(trimmed).context("invalid roster json")?;
    let team = non_empty(Some(team_name.to_string()));
    Ok(parsed
        .roster
        .into_iter()
        .filter_map(|entry| {
            Some(PlayerRecord {
                name: non_empty(entry.person.full_name)?,
                team: team.clone(),
                position: entry
                    .position
                    .and_then(|p| non_empty(p.abbreviation).or_else(|| non_empty(p.code))),
            })
        })
        .collect())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use anyhow::anyhow;

    use super::*;

    fn opts(max_pages: usize) -> FetchOptions {
        FetchOptions {
            parallelism: 2,
            page_delay: Duration::ZERO,
            max_pages,
            ..FetchOptions::default()
        }
    }

    fn nba_page(names: &[&str], total_pages: Option<u32>) -> String {
        let data: Vec<String> = names
            .iter()
            .map(|n| format!(r#"{{"first_name":"{n}","last_name":"X"}}"#))
            .collect();
        let meta = total_pages
            .map(|t| format!(r#","meta":{{"total_pages":{t}}}"#))
            .unwrap_or_default();
        format!(r#"{{"data":[{}]{meta}}}"#, data.join(","))
    }

    /// Canned bodies by URL; anything else is a failed request.
    fn canned(bodies: HashMap<String, String>) -> impl Fn(&str) -> Result<String> + Sync {
        move |url: &str| {
            bodies
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("http 503 for {url}"))
        }
    }

    #[test]
    fn stops_on_empty_page_without_errors() {
        let fetch = canned(HashMap::from([
            (nba_page_url(1), nba_page(&["Ann", "Bo"], None)),
            (nba_page_url(2), nba_page(&["Cy"], None)),
            (nba_page_url(3), nba_page(&[], None)),
        ]));
        let out = fetch_paginated(&fetch, &opts(10), nba_page_url, parse_nba_players_json).unwrap();
        assert_eq!(out.players.len(), 3);
        assert!(out.errors.is_empty());
    }

    #[test]
    fn stops_at_reported_page_count_without_errors() {
        let fetch = canned(HashMap::from([(nba_page_url(1), nba_page(&["Ann"], Some(1)))]));
        let out = fetch_paginated(&fetch, &opts(1), nba_page_url, parse_nba_players_json).unwrap();
        assert_eq!(out.players.len(), 1);
        assert!(out.errors.is_empty());
    }

    #[test]
    fn page_limit_with_more_pages_is_reported_as_partial() {
        let fetch = canned(HashMap::from([
            (nba_page_url(1), nba_page(&["Ann", "Bo"], Some(50))),
            (nba_page_url(2), nba_page(&["Cy"], Some(50))),
        ]));
        let out = fetch_paginated(&fetch, &opts(1), nba_page_url, parse_nba_players_json).unwrap();
        assert_eq!(out.players.len(), 2);
        assert_eq!(out.errors.len(), 1);
        assert!(out.errors[0].contains("max_pages=1"));
    }

    #[test]
    fn first_page_failure_fails_the_fetch() {
        let fetch = canned(HashMap::new());
        let err =
            fetch_paginated(&fetch, &opts(5), nba_page_url, parse_nba_players_json).unwrap_err();
        assert!(format!("{err:#}").contains("roster page 1"));
    }

    #[test]
    fn later_page_failure_keeps_collected_players() {
        let fetch = canned(HashMap::from([
            (nba_page_url(1), nba_page(&["Ann", "Bo"], None)),
            (nba_page_url(2), "<html>bad gateway</html>".to_string()),
        ]));
        let out = fetch_paginated(&fetch, &opts(5), nba_page_url, parse_nba_players_json).unwrap();
        assert_eq!(out.players.len(), 2);
        assert_eq!(out.errors.len(), 1);
        assert!(out.errors[0].starts_with("page 2:"));
    }

    fn team_url(id: u32) -> String {
        format!("https://stats.test/teams/{id}/roster")
    }

    const TEAMS: &str = r#"{"teams":[{"id":1,"name":"Oilers"},{"id":2,"name":"Flames"}]}"#;
    const ROSTER: &str =
        r#"{"roster":[{"person":{"fullName":"Connor McDavid"},"position":{"code":"C"}}]}"#;

    #[test]
    fn failed_team_is_collected_next_to_partial_roster() {
        let fetch = canned(HashMap::from([
            ("https://stats.test/teams".to_string(), TEAMS.to_string()),
            (team_url(1), ROSTER.to_string()),
        ]));
        let out = fetch_by_team(&fetch, &opts(1), "https://stats.test/teams", team_url).unwrap();
        assert_eq!(out.players.len(), 1);
        assert_eq!(out.players[0].team.as_deref(), Some("Oilers"));
        assert_eq!(out.errors.len(), 1);
        assert!(out.errors[0].starts_with("Flames (2)"));
    }

    #[test]
    fn team_list_failure_fails_the_fetch() {
        let fetch = canned(HashMap::new());
        assert!(fetch_by_team(&fetch, &opts(1), "https://stats.test/teams", team_url).is_err());

        let empty = canned(HashMap::from([(
            "https://stats.test/teams".to_string(),
            r#"{"teams":[]}"#.to_string(),
        )]));
        assert!(fetch_by_team(&empty, &opts(1), "https://stats.test/teams", team_url).is_err());
    }
}
