mod app;
mod state;
mod ui;

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use coinboard_core::workspace;
use coinboard_types::config::AppConfig;

use crate::commands::helpers::market_queries;
use app::Action;
use state::App;

const TICK: Duration = Duration::from_millis(200);

/// The terminal belongs to the UI, so logs go to `logs/tui.log`.
pub fn init_logging(config: &AppConfig, verbose: bool) -> Result<()> {
    let path = workspace::resolve("logs/tui.log")?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let default_level = if verbose || config.system.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

/// `coinboard tui`: launch the interactive terminal interface.
pub async fn run(config: &AppConfig) -> Result<()> {
    let queries = market_queries(config)?;

    // ── Setup terminal ──────────────────────────────────────────
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // ── Initialize app state ────────────────────────────────────
    let mut app = App::new(queries, config);
    app.start();

    // ── Main loop ───────────────────────────────────────────────
    let result = run_loop(&mut terminal, &mut app);

    // ── Teardown (always runs) ──────────────────────────────────
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // ── Draw ────────────────────────────────────────────────
        terminal.draw(|frame| ui::render(frame, app))?;

        // ── Input ───────────────────────────────────────────────
        // Hand the worker over while blocked so fetch tasks keep running.
        if tokio::task::block_in_place(|| event::poll(TICK))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                match app::handle_key(app, key.code, key.modifiers) {
                    Action::None => {}
                    Action::Quit => return Ok(()),
                    Action::Refresh => app.refresh(),
                    Action::Tab(idx) => app.set_tab(idx),
                    Action::NextTab => app.next_tab(),
                    Action::PrevTab => app.prev_tab(),
                    Action::ScrollUp => app.scroll_up(),
                    Action::ScrollDown => app.scroll_down(),
                    Action::ToggleHelp => app.toggle_help(),
                    Action::Open => app.open_selected(),
                    Action::Back => app.back(),
                    Action::Sort(key) => app.sort(key),
                    Action::NextPage => app.next_page(),
                    Action::PrevPage => app.prev_page(),
                    Action::NextRange => app.next_range(),
                    Action::StartFilter => app.start_filter(),
                    Action::FilterInput(c) => app.filter_input(c),
                    Action::FilterBackspace => app.filter_backspace(),
                    Action::FilterCommit => app.commit_filter(),
                    Action::FilterCancel => app.cancel_filter(),
                }
            }
        }

        // ── Fetch results + background refresh ──────────────────
        app.tick();
    }
}
