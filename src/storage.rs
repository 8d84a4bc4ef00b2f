use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{iso, timestamp, DefaultTemplate, Prefs, Task, Workspace};

/// Returns the path to the tasks file (`tasks.json`).
///
/// The path is determined in the following order:
/// 1. `DAYMARK_DB` environment variable.
/// 2. `~/.local/share/daymark/tasks.json` (on Linux).
/// 3. `./tasks.json` (fallback).
pub fn default_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("DAYMARK_DB") {
        return PathBuf::from(path);
    }
    match dirs::data_local_dir() {
        Some(mut p) => {
            p.push("daymark");
            p.push("tasks.json");
            p
        }
        None => PathBuf::from("tasks.json"),
    }
}

fn read_file(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }
    let mut f = OpenOptions::new().read(true).open(path).ok()?;
    let mut s = String::new();
    f.read_to_string(&mut s).ok()?;
    Some(s)
}

/// Writes `value` through a temp file in the target directory and renames it
/// over `path`, so readers never observe a half-written file.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let s = serde_json::to_string_pretty(value)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(s.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Reads a JSON array, returning an empty list when the file is missing or
/// cannot be parsed.
fn read_array(path: &Path) -> Vec<Value> {
    let Some(s) = read_file(path) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<Value>>(&s) {
        Ok(values) => values,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unparseable data file, treating as empty");
            Vec::new()
        }
    }
}

/// Rewrites the legacy `tab` key and workspace aliases in place.
///
/// Missing or unknown tags become the default workspace.
fn normalize_workspace(obj: &mut Map<String, Value>) -> bool {
    let mut changed = false;
    if let Some(tab) = obj.remove("tab") {
        changed = true;
        if !obj.contains_key("workspace") {
            obj.insert("workspace".into(), tab);
        }
    }
    let current = obj.get("workspace").and_then(Value::as_str);
    let resolved = current.and_then(Workspace::from_tag).unwrap_or_default();
    if current != Some(resolved.as_str()) {
        obj.insert("workspace".into(), Value::from(resolved.as_str()));
        changed = true;
    }
    changed
}

fn is_blank(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key)
        .and_then(Value::as_str)
        .map_or(true, |s| s.is_empty())
}

/// Normalizes one raw task record. Returns whether anything was rewritten.
///
/// Running it on an already-normalized record is a no-op.
fn normalize_task(value: &mut Value, today: &str, now: &str) -> bool {
    let Some(obj) = value.as_object_mut() else {
        return false;
    };
    let mut changed = normalize_workspace(obj);
    if is_blank(obj, "date") {
        obj.insert("date".into(), Value::from(today));
        changed = true;
    }
    if is_blank(obj, "createdAt") {
        obj.insert("createdAt".into(), Value::from(now));
        changed = true;
    }
    if is_blank(obj, "lastModified") {
        let created = obj.get("createdAt").cloned().unwrap_or_else(|| Value::from(now));
        obj.insert("lastModified".into(), created);
        changed = true;
    }
    changed
}

fn decode_each<T: DeserializeOwned>(values: Vec<Value>, what: &str) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<T>(v) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %e, "dropping malformed {} record", what);
                None
            }
        })
        .collect()
}

/// Normalizes and decodes raw task records, from disk or from a remote
/// snapshot.
///
/// Returns the tasks and whether normalization rewrote any record.
pub fn decode_tasks(mut raw: Vec<Value>, today: NaiveDate, now: DateTime<Utc>) -> (Vec<Task>, bool) {
    let today = iso(today);
    let now = timestamp(now);
    let mut migrated = false;
    for v in raw.iter_mut() {
        migrated |= normalize_task(v, &today, &now);
    }
    (decode_each(raw, "task"), migrated)
}

/// Loads all tasks from a tasks file.
///
/// Returns an empty vector if the file does not exist or cannot be read.
/// The boolean reports whether legacy records were migrated.
pub fn load_tasks(path: &Path) -> (Vec<Task>, bool) {
    decode_tasks(read_array(path), Local::now().date_naive(), Utc::now())
}

/// Saves the given list of tasks, overwriting the file.
pub fn save_tasks(path: &Path, tasks: &[Task]) -> Result<()> {
    write_json(path, tasks)
}

/// Loads all default templates. Legacy `tab` keys and aliases are accepted.
pub fn load_templates(path: &Path) -> Vec<DefaultTemplate> {
    let mut raw = read_array(path);
    for v in raw.iter_mut() {
        if let Some(obj) = v.as_object_mut() {
            normalize_workspace(obj);
        }
    }
    decode_each(raw, "default")
}

/// Saves the given list of templates.
pub fn save_templates(path: &Path, templates: &[DefaultTemplate]) -> Result<()> {
    write_json(path, templates)
}

/// Loads preferences, falling back to defaults on a missing or corrupt file.
pub fn load_prefs(path: &Path) -> Prefs {
    read_file(path)
        .and_then(|s| match serde_json::from_str(&s) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(error = %e, "unparseable prefs, using defaults");
                None
            }
        })
        .unwrap_or_default()
}

pub fn save_prefs(path: &Path, prefs: &Prefs) -> Result<()> {
    write_json(path, prefs)
}

/// Durable local cache of every task in both workspaces.
///
/// Owns the live collection. Every mutation elsewhere is read-modify-write
/// against [`LocalStore::tasks_mut`] followed by [`LocalStore::persist`];
/// there is no per-record transaction.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    tasks: Vec<Task>,
}

impl LocalStore {
    /// Opens the store at `path` and loads it, re-persisting if legacy
    /// records were migrated.
    pub fn open(path: impl Into<PathBuf>) -> LocalStore {
        let mut store = LocalStore {
            path: path.into(),
            tasks: Vec::new(),
        };
        store.reload();
        store
    }

    /// Opens the store at [`default_db_path`].
    pub fn from_env() -> LocalStore {
        LocalStore::open(default_db_path())
    }

    /// Re-reads the collection from disk. Returns whether a migration ran.
    pub fn reload(&mut self) -> bool {
        let (tasks, migrated) = load_tasks(&self.path);
        self.tasks = tasks;
        if migrated {
            debug!(count = self.tasks.len(), "migrated legacy task records");
            if let Err(e) = self.persist() {
                warn!(error = %e, "failed to persist migrated tasks");
            }
        }
        migrated
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut Vec<Task> {
        &mut self.tasks
    }

    /// Writes the full collection.
    pub fn persist(&self) -> Result<()> {
        save_tasks(&self.path, &self.tasks)
    }

    /// Replaces the whole collection and persists it.
    pub fn replace(&mut self, tasks: Vec<Task>) -> Result<()> {
        self.tasks = tasks;
        self.persist()
    }

    /// Tasks of one workspace on one date, in stored order.
    pub fn tasks_for<'a>(&'a self, workspace: Workspace, date: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |t| t.is_on(workspace, date))
    }

    /// All tasks of one workspace.
    pub fn tasks_in(&self, workspace: Workspace) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.iter().filter(move |t| t.workspace == workspace)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the tasks file and its siblings.
    pub fn dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn templates_path(&self) -> PathBuf {
        self.dir().join("defaults.json")
    }

    pub fn prefs_path(&self) -> PathBuf {
        self.dir().join("prefs.json")
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir().join("config.json")
    }

    /// Deletes the tasks, defaults and prefs files.
    pub fn delete_database(&mut self) -> Result<()> {
        for p in [self.path.clone(), self.templates_path(), self.prefs_path()] {
            if p.exists() {
                fs::remove_file(p)?;
            }
        }
        self.tasks.clear();
        Ok(())
    }
}
