use std::io::{self, Write as _};
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::prelude::*;
use tracing::debug;

/// `$VISUAL`, then `$EDITOR`.
fn editor_command() -> Result<String> {
    ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|cmd| !cmd.trim().is_empty())
        .ok_or_else(|| anyhow!("neither $VISUAL nor $EDITOR is set"))
}

/// Runs `editor` on a temp copy of `text` and returns the saved file as is.
fn edit_in(editor: &str, text: &str) -> Result<String> {
    let mut draft = tempfile::Builder::new()
        .prefix("promption-")
        .suffix(".md")
        .tempfile()
        .context("could not create draft file")?;
    draft
        .write_all(text.as_bytes())
        .and_then(|()| draft.flush())
        .context("could not write draft file")?;
    let draft_path = draft.path().to_path_buf();
    debug!(editor, path = %draft_path.display(), "opening editor");

    let status = Command::new(editor)
        .arg(&draft_path)
        .status()
        .with_context(|| format!("could not start '{editor}'"))?;
    if !status.success() {
        bail!("'{editor}' exited with {status}");
    }

    std::fs::read_to_string(&draft_path).context("could not read draft file")
}

/// Hands the screen to the user's editor on `text` and returns what was
/// saved. The terminal is restored even if the editor fails to start.
pub fn open_editor(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    text: &str,
) -> Result<String> {
    let editor = editor_command()?;

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    let outcome = edit_in(&editor, text);

    execute!(terminal.backend_mut(), EnterAlternateScreen)?;
    terminal::enable_raw_mode()?;
    terminal.clear()?;

    outcome
}
