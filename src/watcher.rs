//! File system watcher for changes made to the data directory by another
//! process (a second terminal running `daymark defaults add`, for instance).

use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::Result;

/// Which data file changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreEvent {
    TasksChanged,
    TemplatesChanged,
    PrefsChanged,
}

/// Maps a raw notify event onto the data files it touched.
fn classify(event: &Event) -> Vec<StoreEvent> {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return Vec::new();
    }
    let mut out = Vec::new();
    for path in &event.paths {
        let kind = match path.file_name().and_then(|n| n.to_str()) {
            Some("tasks.json") => StoreEvent::TasksChanged,
            Some("defaults.json") => StoreEvent::TemplatesChanged,
            Some("prefs.json") => StoreEvent::PrefsChanged,
            _ => continue,
        };
        if !out.contains(&kind) {
            out.push(kind);
        }
    }
    out
}

/// Starts watching `dir`. The watcher stops when the returned handle is
/// dropped.
pub fn watch_data_dir(dir: &Path) -> Result<(RecommendedWatcher, Receiver<StoreEvent>)> {
    let (tx, rx): (Sender<StoreEvent>, Receiver<StoreEvent>) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: std::result::Result<Event, notify::Error>| {
            if let Ok(event) = res {
                for kind in classify(&event) {
                    let _ = tx.send(kind);
                }
            }
        },
        Config::default(),
    )?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok((watcher, rx))
}

/// Drains everything queued on `rx`, collapsing bursts into one event per
/// kind.
pub fn drain(rx: &Receiver<StoreEvent>) -> Vec<StoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if !events.contains(&event) {
            events.push(event);
        }
    }
    events
}
