//! TUI host: renders a 2D spike raster (time on X, neuron IDs on Y) for a
//! LIF sheet projecting through a shared conv kernel onto an AELIF layer.
//! Controls: [s] Step, [r] Run/Pause, [p] Enable STDP, [q] Quit

mod app;
mod backend;
mod ui;

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute, terminal,
};
use ratatui::{backend::CrosstermBackend, Terminal};

use app::App;
use backend::{CoreBackend, SnnBackend};
use ui::draw;

const SEED: u64 = 7;
const RASTER_WIDTH: usize = 80;
const TICK_RATE: Duration = Duration::from_millis(100);

type Tui = Terminal<CrosstermBackend<Stdout>>;

fn main() -> Result<()> {
    // Network construction can fail; do it while the terminal is still in cooked mode.
    let app = App::new(CoreBackend::new(SEED)?, RASTER_WIDTH);

    let mut terminal = enter_terminal()?;
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        default_hook(panic_info);
    }));

    let outcome = run(&mut terminal, app);
    restore_terminal()?;
    outcome
}

fn enter_terminal() -> Result<Tui> {
    terminal::enable_raw_mode()?;
    let setup = || -> Result<Tui> {
        execute!(io::stdout(), terminal::EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        terminal.clear()?;
        Ok(terminal)
    };
    setup().map_err(|err| {
        let _ = restore_terminal();
        err
    })
}

fn restore_terminal() -> Result<()> {
    terminal::disable_raw_mode()?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen)?;
    Ok(())
}

fn run<B: SnnBackend>(terminal: &mut Tui, mut app: App<B>) -> Result<()> {
    let mut last_tick = Instant::now();
    loop {
        draw(terminal, &app)?;

        if event::poll(TICK_RATE.saturating_sub(last_tick.elapsed()))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !handle_key(&mut app, key.code) {
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            if app.running {
                app.step();
            }
            last_tick = Instant::now();
        }
    }
}

/// Apply one key press. Returns `false` when the host should exit.
fn handle_key<B: SnnBackend>(app: &mut App<B>, code: KeyCode) -> bool {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return false,
        KeyCode::Char('s') => app.step(),
        KeyCode::Char('r') => app.toggle_running(),
        #[cfg(feature = "plasticity")]
        KeyCode::Char('p') => app.backend.enable_default_plasticity(),
        _ => {}
    }
    true
}
