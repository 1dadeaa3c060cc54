mod app;
mod editor;
mod event;
pub mod keymap;
mod view;

use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self as ct_event, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::prelude::*;
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::clipboard::{Clipboard, SystemClipboard};
use crate::settings::Settings;
use crate::state::AppState;
use crate::watch;
use app::App;
use event::KeyAction;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Run the interactive UI until the user quits.
pub fn run(db_path: &Path, conn: Connection, settings: &Settings) -> Result<()> {
    let mut state = AppState::new(conn);
    state.load()?;

    // A missing clipboard only matters once something is copied.
    let clipboard = match SystemClipboard::new() {
        Ok(c) => Some(Box::new(c) as Box<dyn Clipboard>),
        Err(e) => {
            warn!(error = %e, "starting without clipboard");
            None
        }
    };
    let mut app = App::new(state, clipboard, settings.export_dir());

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, db_path);

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    db_path: &Path,
) -> Result<()> {
    let (_watcher, rx) = watch::watch_db(db_path)?;

    loop {
        terminal.draw(|frame| view::render(frame, app))?;

        if ct_event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = ct_event::read()? {
                if key.kind == KeyEventKind::Press {
                    match event::handle_key(app, key) {
                        KeyAction::Continue => {}
                        KeyAction::Quit => return Ok(()),
                        KeyAction::Edit { target, initial } => {
                            let content = match editor::open_editor(terminal, &initial) {
                                Ok(content) => Some(content),
                                Err(e) => {
                                    app.error(e.to_string());
                                    None
                                }
                            };
                            app.finish_edit(&target, content);
                        }
                        KeyAction::ComposeContent { submit } => {
                            let initial = app
                                .form_mut()
                                .map(|f| f.content.clone())
                                .unwrap_or_default();
                            match editor::open_editor(terminal, &initial) {
                                Ok(content) => {
                                    if let Some(form) = app.form_mut() {
                                        form.content = content;
                                        form.error = None;
                                    }
                                    if submit {
                                        app.submit_create();
                                    }
                                }
                                Err(e) => {
                                    if let Some(form) = app.form_mut() {
                                        form.error = Some(e.to_string());
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        // Non-blocking check for writes from another process.
        if watch::drain_events(&rx) {
            debug!("database changed on disk, reloading");
            app.refresh();
        }
    }
}
