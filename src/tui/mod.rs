pub mod app;
pub mod ui;

use std::sync::mpsc::Receiver;
use std::time::Duration;
use std::{error::Error, io};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::warn;
use app::{App, InputMode};
use ui::ui;

use crate::watcher::{self, StoreEvent};
use crate::Session;

const TICK: Duration = Duration::from_millis(250);

pub fn run_tui(session: &mut Session) -> Result<(), Box<dyn Error>> {
    // Watch for edits made by other processes; the UI still works without it.
    let dir = session.store().dir();
    std::fs::create_dir_all(&dir)?;
    let watch = match watcher::watch_data_dir(&dir) {
        Ok(pair) => Some(pair),
        Err(e) => {
            warn!(error = %e, "file watching disabled");
            None
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app = App::new(session);

    // Run loop
    let res = run_app(&mut terminal, &mut app, session, watch.as_ref().map(|(_, rx)| rx));

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    session: &mut Session,
    changes: Option<&Receiver<StoreEvent>>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app, &*session))?;

        if !event::poll(TICK)? {
            if let Some(rx) = changes {
                let events = watcher::drain(rx);
                if !events.is_empty() {
                    for e in events {
                        session.handle_store_event(e);
                    }
                    app.reload(session);
                }
            }
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match app.input_mode {
                InputMode::Normal => {
                    app.status = None;
                    match key.code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Down | KeyCode::Char('j') => app.next(),
                        KeyCode::Up | KeyCode::Char('k') => app.previous(),
                        KeyCode::Char(' ') => app.toggle_selected(session),
                        KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(session),
                        KeyCode::Char('a') => app.start_add(),
                        KeyCode::Char('e') => app.start_edit(),
                        KeyCode::Char('x') => app.clear_completed(session),
                        KeyCode::Char('w') => app.switch_workspace(session),
                        KeyCode::Char('f') => app.cycle_filter(session),
                        KeyCode::Left | KeyCode::Char('h') => app.shift_day(session, -1),
                        KeyCode::Right | KeyCode::Char('l') => app.shift_day(session, 1),
                        KeyCode::Char('[') => app.shift_day(session, -7),
                        KeyCode::Char(']') => app.shift_day(session, 7),
                        KeyCode::Char('<') => app.shift_month(session, -1),
                        KeyCode::Char('>') => app.shift_month(session, 1),
                        KeyCode::Char('t') => app.go_today(session),
                        KeyCode::Char('v') => app.toggle_view(session),
                        KeyCode::Enter => app.open_day(session),
                        _ => {}
                    }
                }
                InputMode::Editing | InputMode::Adding => match key.code {
                    KeyCode::Enter => app.handle_input(session),
                    KeyCode::Esc => app.cancel_input(),
                    KeyCode::Char(c) => {
                        app.input_buffer.push(c);
                    }
                    KeyCode::Backspace => {
                        app.input_buffer.pop();
                    }
                    _ => {}
                },
            }
        }
    }
}
