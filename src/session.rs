//! The explicit context every component works through: active workspace,
//! active date, the local store, the templates and the optional sync
//! coordinator.

use chrono::{Local, NaiveDate, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::calendar::{self, DaySummary};
use crate::config::Settings;
use crate::defaults::{materialize, MaterializationWindow};
use crate::error::{Error, Result};
use crate::models::{iso, parse_date, DefaultTemplate, Filter, Prefs, Task, View, Workspace};
use crate::retention;
use crate::storage::{self, LocalStore};
use crate::sync::{Reconciliation, SyncCoordinator};
use crate::watcher::StoreEvent;

/// Result of editing a task's title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Renamed,
    /// The new title was empty, so the task was deleted.
    Deleted,
}

pub struct Session {
    store: LocalStore,
    templates: Vec<DefaultTemplate>,
    prefs: Prefs,
    settings: Settings,
    sync: Option<SyncCoordinator>,
    /// Fixed "today"; `None` follows the local clock.
    pinned_today: Option<NaiveDate>,
}

impl Session {
    /// Builds a session over an already-opened store, loading templates and
    /// preferences from the store's directory.
    pub fn new(store: LocalStore, settings: Settings) -> Session {
        let templates = storage::load_templates(&store.templates_path());
        let prefs = storage::load_prefs(&store.prefs_path());
        Session {
            store,
            templates,
            prefs,
            settings,
            sync: None,
            pinned_today: None,
        }
    }

    /// Pins "today", for deterministic window and retention decisions.
    pub fn with_today(mut self, today: NaiveDate) -> Session {
        self.pinned_today = Some(today);
        self
    }

    /// The pinned date, otherwise the local date at the time of the call, so
    /// a long-running session rolls over at midnight.
    pub fn today(&self) -> NaiveDate {
        self.pinned_today.unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn attach_sync(&mut self, mut sync: SyncCoordinator) {
        sync.set_token(self.prefs.auth_token.clone());
        self.sync = Some(sync);
    }

    pub fn sync(&self) -> Option<&SyncCoordinator> {
        self.sync.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.sync.as_ref().is_some_and(SyncCoordinator::is_connected)
    }

    /// Startup reconciliation with the remote store, if one is attached.
    pub async fn reconcile(&mut self) -> Reconciliation {
        match self.sync.as_mut() {
            Some(sync) => sync.reconcile_on_startup(&mut self.store).await,
            None => Reconciliation::Offline,
        }
    }

    /// Load-time housekeeping that runs after reconciliation: the retention
    /// sweep, then materialization for the active date.
    pub fn finish_startup(&mut self) {
        let today = self.today();
        if retention::sweep(self.store.tasks_mut(), today, self.settings.retention_days) {
            self.commit_logged();
        }
        let date = self.active_date();
        self.apply_defaults(&date, self.workspace());
    }

    /// Waits for background pushes to settle. Call before the process exits.
    pub async fn flush_sync(&self) -> Vec<Result<()>> {
        match &self.sync {
            Some(sync) => sync.flush().await,
            None => Vec::new(),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.tasks()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn prefs(&self) -> &Prefs {
        &self.prefs
    }

    pub fn workspace(&self) -> Workspace {
        self.prefs.workspace
    }

    /// The selected date, or today when none is stored or it is corrupt.
    pub fn active_day(&self) -> NaiveDate {
        self.prefs
            .date
            .as_deref()
            .and_then(parse_date)
            .unwrap_or_else(|| self.today())
    }

    pub fn active_date(&self) -> String {
        iso(self.active_day())
    }

    fn save_prefs(&self) -> Result<()> {
        storage::save_prefs(&self.store.prefs_path(), &self.prefs)
    }

    pub fn switch_workspace(&mut self, workspace: Workspace) -> Result<()> {
        self.prefs.workspace = workspace;
        self.save_prefs()
    }

    /// Makes `date` the active date, materializing its defaults first.
    /// Returns whether any default was created.
    pub fn select_date(&mut self, date: &str) -> Result<bool> {
        let day = parse_date(date).ok_or_else(|| Error::InvalidDate(date.to_string()))?;
        let date = iso(day);
        let created = self.apply_defaults(&date, self.workspace());
        self.prefs.date = Some(date);
        self.save_prefs()?;
        Ok(created)
    }

    pub fn set_view(&mut self, view: View) -> Result<()> {
        self.prefs.view = view;
        self.save_prefs()
    }

    /// Stores (or clears) the bearer token and hands it to the sync client.
    pub fn set_auth_token(&mut self, token: Option<String>) -> Result<()> {
        self.prefs.auth_token = token.clone();
        if let Some(sync) = self.sync.as_mut() {
            sync.set_token(token);
        }
        self.save_prefs()
    }

    /// Persists the full collection and launches a background push.
    fn commit(&mut self) -> Result<()> {
        self.store.persist()?;
        if let Some(sync) = &self.sync {
            sync.push_snapshot(self.store.tasks().to_vec());
        }
        Ok(())
    }

    fn commit_logged(&mut self) {
        if let Err(e) = self.commit() {
            warn!(error = %e, "failed to persist tasks");
        }
    }

    /// Adds a task on the active date in the active workspace.
    pub fn add_task(&mut self, title: &str) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::EmptyTitle);
        }
        let task = Task::new(title, &self.active_date(), self.workspace(), Utc::now());
        self.store.tasks_mut().insert(0, task.clone());
        self.commit()?;
        Ok(task)
    }

    /// Flips completion. Returns the new state.
    pub fn toggle_task(&mut self, id: &str) -> Result<bool> {
        let task = self
            .store
            .find_mut(id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        task.completed = !task.completed;
        task.touch(Utc::now());
        let completed = task.completed;
        self.commit()?;
        Ok(completed)
    }

    /// Renames a task; an empty title deletes it instead.
    pub fn edit_task(&mut self, id: &str, title: &str) -> Result<EditOutcome> {
        let title = title.trim();
        if title.is_empty() {
            self.delete_task(id)?;
            return Ok(EditOutcome::Deleted);
        }
        let task = self
            .store
            .find_mut(id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        task.title = title.to_string();
        task.touch(Utc::now());
        self.commit()?;
        Ok(EditOutcome::Renamed)
    }

    pub fn delete_task(&mut self, id: &str) -> Result<()> {
        let tasks = self.store.tasks_mut();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(Error::TaskNotFound(id.to_string()));
        }
        self.commit()
    }

    /// Removes completed tasks on the active date in the active workspace.
    pub fn clear_completed(&mut self) -> Result<usize> {
        let (workspace, date) = (self.workspace(), self.active_date());
        let tasks = self.store.tasks_mut();
        let before = tasks.len();
        tasks.retain(|t| !(t.is_on(workspace, &date) && t.completed));
        let removed = before - tasks.len();
        if removed > 0 {
            self.commit()?;
        }
        Ok(removed)
    }

    /// Tasks of the active workspace and date, in stored order.
    pub fn visible_tasks(&self, filter: Filter) -> Vec<&Task> {
        let date = self.active_date();
        self.store
            .tasks()
            .iter()
            .filter(|t| t.is_on(self.workspace(), &date) && filter.matches(t))
            .collect()
    }

    pub fn templates(&self) -> &[DefaultTemplate] {
        &self.templates
    }

    pub fn reload_templates(&mut self) {
        self.templates = storage::load_templates(&self.store.templates_path());
    }

    pub fn reload_tasks(&mut self) {
        self.store.reload();
    }

    pub fn add_template(&mut self, weekday: u8, title: &str, workspace: Workspace) -> Result<DefaultTemplate> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::EmptyTitle);
        }
        if weekday > 6 {
            return Err(Error::InvalidWeekday(weekday.to_string()));
        }
        let template = DefaultTemplate {
            id: Uuid::new_v4().to_string(),
            weekday,
            title: title.to_string(),
            workspace,
        };
        self.templates.push(template.clone());
        storage::save_templates(&self.store.templates_path(), &self.templates)?;
        Ok(template)
    }

    /// Removes a template. Tasks already materialized from it are kept.
    pub fn remove_template(&mut self, id: &str) -> Result<DefaultTemplate> {
        let idx = self
            .templates
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::TemplateNotFound(id.to_string()))?;
        let removed = self.templates.remove(idx);
        storage::save_templates(&self.store.templates_path(), &self.templates)?;
        Ok(removed)
    }

    pub fn window(&self) -> Option<MaterializationWindow> {
        MaterializationWindow::for_today(self.today(), &self.settings.window)
    }

    /// Materializes the templates matching `date` and `workspace`.
    ///
    /// Persists (and pushes) only when something was created. Returns
    /// whether any task was created.
    pub fn apply_defaults(&mut self, date: &str, workspace: Workspace) -> bool {
        let window = self.window();
        let created = materialize(
            self.store.tasks_mut(),
            &self.templates,
            date,
            workspace,
            window.as_ref(),
            Utc::now(),
        );
        if created > 0 {
            self.commit_logged();
        }
        created > 0
    }

    /// Materializes the active workspace's defaults for several dates with a
    /// single write.
    pub fn apply_defaults_for(&mut self, dates: &[NaiveDate]) -> bool {
        let window = self.window();
        let workspace = self.workspace();
        let now = Utc::now();
        let mut created = 0;
        for date in dates {
            created += materialize(
                self.store.tasks_mut(),
                &self.templates,
                &iso(*date),
                workspace,
                window.as_ref(),
                now,
            );
        }
        if created > 0 {
            self.commit_logged();
        }
        created > 0
    }

    pub fn count_for(&self, workspace: Workspace, date: &str) -> usize {
        calendar::count_for(self.store.tasks(), workspace, date)
    }

    pub fn completed_count_for(&self, workspace: Workspace, date: &str) -> usize {
        calendar::completed_count_for(self.store.tasks(), workspace, date)
    }

    pub fn heat_level(&self, workspace: Workspace, date: &str) -> u8 {
        calendar::heat_for(self.store.tasks(), workspace, date)
    }

    /// Per-date summaries of a month view for the active workspace, after
    /// materializing defaults across the visible grid.
    pub fn month_summary(&mut self, year: i32, month: u32) -> Vec<DaySummary> {
        let grid = calendar::month_grid(year, month);
        self.apply_defaults_for(&grid);
        calendar::summarize(self.store.tasks(), self.workspace(), &grid)
    }

    /// Per-date summaries of the week containing `date`.
    pub fn week_summary(&mut self, date: NaiveDate) -> Vec<DaySummary> {
        let week = calendar::week_of(date);
        self.apply_defaults_for(&week);
        calendar::summarize(self.store.tasks(), self.workspace(), &week)
    }

    /// Reacts to a change made to the data directory by another process.
    pub fn handle_store_event(&mut self, event: StoreEvent) {
        debug!(?event, "storage changed externally");
        match event {
            StoreEvent::TasksChanged => self.reload_tasks(),
            StoreEvent::TemplatesChanged => {
                self.reload_templates();
                let date = self.active_date();
                self.apply_defaults(&date, self.workspace());
            }
            StoreEvent::PrefsChanged => {
                self.prefs = storage::load_prefs(&self.store.prefs_path());
            }
        }
    }

    /// Deletes every local data file.
    pub fn reset(&mut self) -> Result<()> {
        self.store.delete_database()?;
        self.templates.clear();
        self.prefs = Prefs::default();
        Ok(())
    }
}
