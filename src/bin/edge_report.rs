use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use prop_edge::board::build_board;
use prop_edge::config::{AppConfig, parse_std_dev};
use prop_edge::export;
use prop_edge::http_cache;
use prop_edge::lines_upload::load_lines_csv;
use prop_edge::roster_fetch::{fetch_roster, load_roster_json};
use prop_edge::state::{League, league_label};

#[derive(Debug, Default)]
struct ReportArgs {
    league: Option<String>,
    lines: Option<PathBuf>,
    roster: Option<PathBuf>,
    std_dev: Option<String>,
    out: Option<PathBuf>,
    xlsx: Option<PathBuf>,
    top: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1).collect())?;
    let mut config = AppConfig::from_env()?;
    http_cache::set_session_ttl(config.cache_ttl);

    if let Some(raw) = args.league.as_deref() {
        config.league = League::parse(raw).with_context(|| format!("unknown league {raw}"))?;
    }
    if let Some(raw) = args.std_dev.as_deref() {
        config.merge.default_std_dev = Some(parse_std_dev(raw)?);
    }

    let lines_path = args
        .lines
        .or(config.lines_path.clone())
        .context("no lines file: pass --lines <csv> or set EDGE_LINES_CSV")?;
    let upload = load_lines_csv(&lines_path, &config.columns)?;

    let (roster, roster_errors) = match args.roster.as_deref() {
        Some(path) => (load_roster_json(path)?, Vec::new()),
        None => {
            let fetched = fetch_roster(config.league, &config.fetch)?;
            (fetched.players, fetched.errors)
        }
    };

    let mut board = build_board(&roster, &upload.lines, &config.merge);
    board.malformed_lines = upload.malformed;

    println!("Prop edge report: {}", league_label(config.league));
    println!("Lines: {} ({} rows)", lines_path.display(), upload.lines.len());
    println!("{}", board.summary());
    if board.duplicate_lines > 0 {
        println!("Duplicate lines (last kept): {}", board.duplicate_lines);
    }
    if board.skipped_roster > 0 {
        println!("Roster entries without a name: {}", board.skipped_roster);
    }
    if !roster_errors.is_empty() {
        println!("Roster errors: {}", roster_errors.len());
        for err in roster_errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    println!();
    for row in board.rows.iter().take(args.top.unwrap_or(15)) {
        let Some(result) = row.outcome.result() else {
            continue;
        };
        println!(
            "{:<28} {:>8.2}% {:>6.1}% {:<3} {}",
            row.player.name,
            result.edge_pct,
            result.win_probability * 100.0,
            result.grade.as_str(),
            config.scheme.label(result.win_probability)
        );
    }

    if let Some(path) = args.out {
        let report = export::export_csv(&path, &board.rows)?;
        println!("Wrote {} rows ({} priced) to {}", report.rows, report.priced, path.display());
    }
    if let Some(path) = args.xlsx {
        let report = export::export_xlsx(&path, &board, config.scheme)?;
        println!("Wrote {} rows to {}", report.rows, path.display());
    }

    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<ReportArgs> {
    let mut out = ReportArgs::default();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg.clone(), None),
        };
        let mut value = || -> Result<String> {
            let raw = match inline.clone() {
                Some(v) => v,
                None => iter.next().with_context(|| format!("{flag} needs a value"))?,
            };
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                bail!("{flag} needs a value");
            }
            Ok(trimmed.to_string())
        };
        match flag.as_str() {
            "--league" => out.league = Some(value()?),
            "--lines" => out.lines = Some(PathBuf::from(value()?)),
            "--roster" => out.roster = Some(PathBuf::from(value()?)),
            "--std-dev" => out.std_dev = Some(value()?),
            "--out" => out.out = Some(PathBuf::from(value()?)),
            "--xlsx" => out.xlsx = Some(PathBuf::from(value()?)),
            "--top" => {
                let raw = value()?;
                out.top = Some(raw.parse().with_context(|| format!("invalid --top {raw}"))?);
            }
            other => bail!("unknown argument {other}"),
        }
    }
    Ok(out)
}
