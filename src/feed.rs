use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use chrono::Local;
use tracing::warn;

use crate::config::FetchOptions;
use crate::http_cache;
use crate::lines_upload::{LineColumns, load_lines_csv};
use crate::roster_fetch::fetch_roster;
use crate::state::{Delta, ProviderCommand, league_label};

/// Background worker for the dashboard: blocking fetches and file reads happen here,
/// results come back as deltas. Exits when the command channel closes.
pub fn spawn_provider(
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
    fetch: FetchOptions,
    columns: LineColumns,
) {
    thread::spawn(move || {
        for cmd in cmd_rx {
            match cmd {
                ProviderCommand::FetchRoster { league, refresh } => {
                    if refresh {
                        http_cache::clear_session();
                    }
                    let _ = tx.send(Delta::Log(format!(
                        "[INFO] Fetching {} roster",
                        league_label(league)
                    )));
                    match fetch_roster(league, &fetch) {
                        Ok(roster) => {
                            let _ = tx.send(Delta::SetRoster {
                                league,
                                players: roster.players,
                                errors: roster.errors,
                                fetched_at: Local::now().format("%H:%M:%S").to_string(),
                            });
                        }
                        Err(err) => {
                            warn!(league = league_label(league), "roster fetch failed: {err:#}");
                            let _ = tx.send(Delta::SetRoster {
                                league,
                                players: Vec::new(),
                                errors: vec![format!("{err:#}")],
                                fetched_at: Local::now().format("%H:%M:%S").to_string(),
                            });
                        }
                    }
                }
                ProviderCommand::LoadLines { path } => match load_lines_csv(&path, &columns) {
                    Ok(upload) => {
                        let _ = tx.send(Delta::SetLines {
                            path,
                            lines: upload.lines,
                            malformed: upload.malformed,
                        });
                    }
                    Err(err) => {
                        warn!(path = %path.display(), "lines upload failed: {err}");
                        let _ = tx.send(Delta::Log(format!("[WARN] Lines upload: {err}")));
                    }
                },
            }
        }
    });
}
