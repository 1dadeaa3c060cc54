use std::ffi::OsString;
use std::path::Path;
use std::sync::mpsc::{self, Receiver};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::debug;

use crate::error::Result;

/// Writes to the database or a file sharing its name as prefix. Access
/// events are skipped: our own reads would otherwise trigger reloads.
fn touches_db(event: &Event, db_name: &OsString) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event.paths.iter().any(|p| {
        p.file_name()
            .is_some_and(|name| name.as_encoded_bytes().starts_with(db_name.as_encoded_bytes()))
    })
}

/// Creates a watcher for the database file and returns a receiver for change events.
/// The watcher must be kept alive for events to be received.
pub fn watch_db(db_path: &Path) -> Result<(RecommendedWatcher, Receiver<()>)> {
    let (tx, rx) = mpsc::channel();
    let db_name = db_path.file_name().map(OsString::from).unwrap_or_default();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            // -wal and -shm siblings share the database file name as prefix
            if touches_db(&event, &db_name) {
                let _ = tx.send(());
            }
        }
    })?;

    // Watch the parent directory since SQLite uses temp files during writes
    let watch_path = match db_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    watcher.watch(watch_path, RecursiveMode::NonRecursive)?;
    debug!(path = %watch_path.display(), "watching database directory");

    Ok((watcher, rx))
}

/// Drains pending events. Returns true if there was at least one.
pub fn drain_events(rx: &Receiver<()>) -> bool {
    let mut changed = false;
    while rx.try_recv().is_ok() {
        changed = true;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn event(path: &str) -> Event {
        Event::new(notify::EventKind::Any).add_path(PathBuf::from(path))
    }

    #[test]
    fn matches_db_and_sidecar_files() {
        let name = OsString::from("promption.db");
        assert!(touches_db(&event("/x/promption.db"), &name));
        assert!(touches_db(&event("/x/promption.db-wal"), &name));
        assert!(!touches_db(&event("/x/config.toml"), &name));
    }

    #[test]
    fn ignores_reads() {
        let name = OsString::from("promption.db");
        let read = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/x/promption.db"));
        assert!(!touches_db(&read, &name));
    }

    #[test]
    fn drain_reports_pending_events() {
        let (tx, rx) = mpsc::channel();
        assert!(!drain_events(&rx));
        tx.send(()).unwrap();
        tx.send(()).unwrap();
        assert!(drain_events(&rx));
        assert!(!drain_events(&rx));
    }
}
