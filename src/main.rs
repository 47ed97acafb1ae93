use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState};
use tracing_subscriber::EnvFilter;

use prop_edge::config::AppConfig;
use prop_edge::edge::EdgeOutcome;
use prop_edge::error::EdgeError;
use prop_edge::export;
use prop_edge::http_cache;
use prop_edge::state::{self, AppState, MergedRow, ProviderCommand, apply_delta, league_label};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
}

impl App {
    fn new(state: AppState, cmd_tx: Option<mpsc::Sender<ProviderCommand>>) -> Self {
        Self {
            state,
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('s') => self.state.cycle_sort(),
            KeyCode::Char('t') => self.state.toggle_scheme(),
            KeyCode::Char('l') | KeyCode::Char('L') => {
                self.state.cycle_league();
                self.request_roster(false);
            }
            KeyCode::Char('r') | KeyCode::Char('R') => self.request_roster(true),
            KeyCode::Char('e') => self.export_csv(),
            KeyCode::Char('x') => self.export_xlsx(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            _ => {}
        }
    }

    fn send(&mut self, cmd: ProviderCommand) -> bool {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log("[INFO] Provider unavailable");
            return false;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log("[WARN] Provider request failed");
            return false;
        }
        true
    }

    fn request_roster(&mut self, refresh: bool) {
        let league = self.state.league;
        if self.send(ProviderCommand::FetchRoster { league, refresh }) {
            self.state.roster_loading = true;
        }
    }

    fn request_lines(&mut self, path: PathBuf) {
        self.send(ProviderCommand::LoadLines { path });
    }

    fn export_csv(&mut self) {
        let path = export_path(&self.state, "csv");
        match export::export_csv(&path, &self.state.board.rows) {
            Ok(report) => self.state.push_log(format!(
                "[INFO] Exported {} rows ({} priced) to {}",
                report.rows,
                report.priced,
                path.display()
            )),
            Err(err) => self.state.push_log(format!("[WARN] Export failed: {err:#}")),
        }
    }

    fn export_xlsx(&mut self) {
        let path = export_path(&self.state, "xlsx");
        match export::export_xlsx(&path, &self.state.board, self.state.scheme) {
            Ok(report) => self.state.push_log(format!(
                "[INFO] Exported {} rows to {}",
                report.rows,
                path.display()
            )),
            Err(err) => self.state.push_log(format!("[WARN] Export failed: {err:#}")),
        }
    }
}

fn export_path(state: &AppState, ext: &str) -> PathBuf {
    PathBuf::from(format!(
        "{}_edges_{}.{ext}",
        state.league.key(),
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}

fn main() -> io::Result<()> {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            std::process::exit(2);
        }
    };
    init_file_logging(config.log_file.as_ref());
    http_cache::set_session_ttl(config.cache_ttl);

    let lines_path = parse_lines_arg().or_else(|| config.lines_path.clone());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    prop_edge::feed::spawn_provider(tx, cmd_rx, config.fetch.clone(), config.columns.clone());

    let mut state = AppState::new(config.league, config.merge, config.scheme);
    if config.merge.default_std_dev.is_none() {
        state.push_log("[INFO] No EDGE_DEFAULT_STD_DEV set; rows without std_dev stay unpriced");
    }
    let mut app = App::new(state, Some(cmd_tx));
    if let Some(path) = lines_path {
        app.request_lines(path);
    } else {
        app.state.push_log("[INFO] No lines file; pass --lines <csv> or set EDGE_LINES_CSV");
    }
    app.request_roster(false);

    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

/// The terminal is in raw mode, so logs only go to a file when one is configured.
fn init_file_logging(path: Option<&PathBuf>) {
    let Some(path) = path else {
        return;
    };
    let Ok(file) = File::create(path) else {
        eprintln!("cannot open log file {}", path.display());
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

fn parse_lines_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--lines=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--lines" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<state::Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    render_board(frame, chunks[1], &app.state);

    let console = Paragraph::new(console_text(&app.state))
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().title("Console").borders(Borders::TOP));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(concat!(
        "j/k/↑/↓ Move | s Sort | t Tiers | l League | r Refetch ",
        "| e CSV | x XLSX | ? Help | q Quit",
    ));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let status = if state.roster_loading {
        "loading roster...".to_string()
    } else {
        state.board.summary()
    };
    let updated = state.updated.as_deref().unwrap_or("-");
    let lines = state
        .lines_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "no lines file".to_string());
    format!(
        " PROP EDGE | {} | Sort: {} | Tiers: {}\n {status}\n Lines: {lines} | Updated: {updated}",
        league_label(state.league),
        state.sort.label(),
        scheme_label(state.scheme),
    )
}

fn render_board(frame: &mut Frame, area: Rect, state: &AppState) {
    if state.board.rows.is_empty() {
        let msg = if state.roster_loading {
            "Fetching roster..."
        } else {
            "No players for this league"
        };
        let empty = Paragraph::new(msg).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(
        ["Player", "Team", "Pos", "Line", "Proj", "SD", "Edge%", "Win%", "Tier"]
            .into_iter()
            .map(Cell::from),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = state.board.rows.iter().map(|row| board_row(row, state));
    let widths = [
        Constraint::Min(18),
        Constraint::Length(22),
        Constraint::Length(5),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(6),
        Constraint::Length(8),
        Constraint::Length(7),
        Constraint::Length(9),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .highlight_style(Style::default().fg(Color::White).bg(Color::DarkGray));

    let mut table_state = TableState::default().with_selected(Some(state.selected));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn board_row<'a>(row: &'a MergedRow, state: &AppState) -> Row<'a> {
    let (edge, win, tier, style) = match row.outcome {
        EdgeOutcome::Computed(result) => (
            format!("{:+.2}", result.edge_pct),
            format!("{:.1}", result.win_probability * 100.0),
            state.scheme.label(result.win_probability).to_string(),
            Style::default(),
        ),
        EdgeOutcome::Incomplete => (
            "-".to_string(),
            "-".to_string(),
            "-".to_string(),
            Style::default().fg(Color::DarkGray),
        ),
        EdgeOutcome::Rejected(err) => (
            "-".to_string(),
            "-".to_string(),
            rejection_label(err).to_string(),
            Style::default().fg(Color::Yellow),
        ),
    };
    Row::new(vec![
        Cell::from(row.player.name.as_str()),
        Cell::from(row.player.team.as_deref().unwrap_or("")),
        Cell::from(row.player.position.as_deref().unwrap_or("")),
        Cell::from(opt_num(row.line)),
        Cell::from(opt_num(row.projection)),
        Cell::from(opt_num(row.std_dev)),
        Cell::from(edge),
        Cell::from(win),
        Cell::from(tier),
    ])
    .style(style)
}

fn opt_num(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".to_string())
}

fn rejection_label(err: EdgeError) -> &'static str {
    match err {
        EdgeError::InvalidStdDev(_) => "BAD SD",
        EdgeError::DivisionByZeroEdge => "ZERO LN",
        EdgeError::NonFiniteOperand(_) => "BAD NUM",
    }
}

fn scheme_label(scheme: prop_edge::grade::TierScheme) -> &'static str {
    match scheme {
        prop_edge::grade::TierScheme::Letter => "A+..F",
        prop_edge::grade::TierScheme::Strength => "Strong/Moderate/Weak",
    }
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(4)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Prop Edge - Help",
        "",
        "  j/k or ↑/↓   Move",
        "  s            Cycle sort (edge, win prob, name)",
        "  t            Letter grades / Strong-Moderate-Weak",
        "  l            Next league (NBA, NFL, MLB, NHL)",
        "  r            Refetch roster",
        "  e            Export CSV",
        "  x            Export XLSX",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Edge% = (projection - line) / line * 100",
        "Win%  = P(outcome > line), normal around the projection",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
