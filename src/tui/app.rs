use chrono::{Datelike, Duration, NaiveDate};
use ratatui::widgets::TableState;

use crate::calendar::{self, DaySummary};
use crate::models::{iso, parse_weekday, DefaultTemplate, Filter, Task, View};
use crate::session::{EditOutcome, Session};

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
    Adding,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Tasks,
    Calendar,
    Defaults,
}

/// State for the two-step "Add Default" wizard.
#[derive(Default)]
pub struct AddState {
    pub weekday: Option<u8>,
    pub step: usize, // 0: Weekday, 1: Title
}

pub struct App {
    /// Visible tasks of the active day, refreshed by [`App::reload`].
    pub tasks: Vec<Task>,
    pub templates: Vec<DefaultTemplate>,
    pub week: Vec<DaySummary>,
    pub month: Vec<DaySummary>,
    pub view_month: (i32, u32),
    pub state: TableState,
    pub template_state: TableState,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub target_id: Option<String>,
    pub add_state: AddState,
    pub filter: Filter,
    /// One-line feedback shown in the help bar.
    pub status: Option<String>,
}

impl App {
    /// Creates a new App for the session's active day.
    pub fn new(session: &mut Session) -> App {
        let day = session.active_day();
        let view_mode = match session.prefs().view {
            View::Tasks => ViewMode::Tasks,
            View::Calendar => ViewMode::Calendar,
        };
        let mut app = App {
            tasks: Vec::new(),
            templates: Vec::new(),
            week: Vec::new(),
            month: Vec::new(),
            view_month: (day.year(), day.month()),
            state: TableState::default(),
            template_state: TableState::default(),
            view_mode,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            target_id: None,
            add_state: AddState::default(),
            filter: Filter::All,
            status: None,
        };
        app.reload(session);
        app
    }

    /// Re-reads everything shown on screen. Defaults are materialized for
    /// the visible week and month before their heat is computed.
    pub fn reload(&mut self, session: &mut Session) {
        let day = session.active_day();
        self.week = session.week_summary(day);
        let (y, m) = self.view_month;
        self.month = session.month_summary(y, m);
        self.tasks = session.visible_tasks(self.filter).into_iter().cloned().collect();
        self.templates = session.templates().to_vec();
        clamp_selection(&mut self.state, self.tasks.len());
        clamp_selection(&mut self.template_state, self.templates.len());
    }

    /// Selects the next item in the current list.
    pub fn next(&mut self) {
        match self.view_mode {
            ViewMode::Tasks => step_selection(&mut self.state, self.tasks.len(), 1),
            ViewMode::Defaults => step_selection(&mut self.template_state, self.templates.len(), 1),
            ViewMode::Calendar => {}
        }
    }

    /// Selects the previous item in the current list.
    pub fn previous(&mut self) {
        match self.view_mode {
            ViewMode::Tasks => step_selection(&mut self.state, self.tasks.len(), -1),
            ViewMode::Defaults => step_selection(&mut self.template_state, self.templates.len(), -1),
            ViewMode::Calendar => {}
        }
    }

    fn selected_task_id(&self) -> Option<String> {
        self.state
            .selected()
            .and_then(|i| self.tasks.get(i))
            .map(|t| t.id.clone())
    }

    fn report<T>(&mut self, result: crate::Result<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.status = Some(e.to_string());
                None
            }
        }
    }

    /// Toggles the currently selected task.
    pub fn toggle_selected(&mut self, session: &mut Session) {
        if self.view_mode != ViewMode::Tasks {
            return;
        }
        if let Some(id) = self.selected_task_id() {
            let result = session.toggle_task(&id);
            self.report(result);
            self.reload(session);
        }
    }

    /// Deletes the currently selected task or default.
    pub fn delete_selected(&mut self, session: &mut Session) {
        match self.view_mode {
            ViewMode::Tasks => {
                if let Some(id) = self.selected_task_id() {
                    let result = session.delete_task(&id);
                    self.report(result);
                }
            }
            ViewMode::Defaults => {
                let id = self
                    .template_state
                    .selected()
                    .and_then(|i| self.templates.get(i))
                    .map(|t| t.id.clone());
                if let Some(id) = id {
                    let result = session.remove_template(&id);
                    if let Some(t) = self.report(result) {
                        self.status = Some(format!("Removed default '{}'", t.title));
                    }
                }
            }
            ViewMode::Calendar => return,
        }
        self.reload(session);
    }

    pub fn clear_completed(&mut self, session: &mut Session) {
        let result = session.clear_completed();
        if let Some(n) = self.report(result) {
            self.status = Some(format!("Cleared {} completed", n));
        }
        self.reload(session);
    }

    /// Moves the active day by `days`, following it with the week strip and
    /// the month grid.
    pub fn shift_day(&mut self, session: &mut Session, days: i64) {
        let Some(target) = session.active_day().checked_add_signed(Duration::days(days)) else {
            return;
        };
        self.select_day(session, target);
    }

    pub fn go_today(&mut self, session: &mut Session) {
        let today = session.today();
        self.select_day(session, today);
    }

    fn select_day(&mut self, session: &mut Session, day: NaiveDate) {
        let result = session.select_date(&iso(day));
        self.report(result);
        self.view_month = (day.year(), day.month());
        self.reload(session);
    }

    /// Pages the month grid without changing the active day.
    pub fn shift_month(&mut self, session: &mut Session, delta: i32) {
        let (y, m) = self.view_month;
        match calendar::shift_month(y, m, delta) {
            Some(ym) => self.view_month = ym,
            None => self.status = Some("No months beyond this one".into()),
        }
        self.reload(session);
    }

    pub fn switch_workspace(&mut self, session: &mut Session) {
        let result = session.switch_workspace(session.workspace().toggle());
        self.report(result);
        self.state.select(None);
        self.reload(session);
    }

    pub fn cycle_filter(&mut self, session: &mut Session) {
        self.filter = self.filter.next();
        self.reload(session);
    }

    /// Cycles Tasks -> Calendar -> Defaults. The tasks/calendar choice is
    /// remembered across sessions.
    pub fn toggle_view(&mut self, session: &mut Session) {
        self.view_mode = match self.view_mode {
            ViewMode::Tasks => ViewMode::Calendar,
            ViewMode::Calendar => ViewMode::Defaults,
            ViewMode::Defaults => ViewMode::Tasks,
        };
        let pref = match self.view_mode {
            ViewMode::Calendar => View::Calendar,
            _ => View::Tasks,
        };
        let result = session.set_view(pref);
        self.report(result);
    }

    /// Jumps from the calendar to the active day's task list.
    pub fn open_day(&mut self, session: &mut Session) {
        if self.view_mode != ViewMode::Calendar {
            return;
        }
        self.view_mode = ViewMode::Tasks;
        let result = session.set_view(View::Tasks);
        self.report(result);
    }

    /// Starts the "Add" flow for the current view.
    pub fn start_add(&mut self) {
        if self.view_mode == ViewMode::Calendar {
            return;
        }
        self.input_mode = InputMode::Adding;
        self.input_buffer.clear();
        self.add_state = AddState::default();
    }

    /// Starts renaming the selected task.
    pub fn start_edit(&mut self) {
        if self.view_mode != ViewMode::Tasks {
            return;
        }
        if let Some(i) = self.state.selected() {
            if let Some(t) = self.tasks.get(i) {
                self.target_id = Some(t.id.clone());
                self.input_buffer = t.title.clone();
                self.input_mode = InputMode::Editing;
            }
        }
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
        self.target_id = None;
    }

    /// Handles the Enter key in editing or adding mode.
    pub fn handle_input(&mut self, session: &mut Session) {
        match self.input_mode {
            InputMode::Adding => self.handle_adding_input(session),
            InputMode::Editing => self.handle_editing_input(session),
            InputMode::Normal => {}
        }
    }

    fn handle_adding_input(&mut self, session: &mut Session) {
        match self.view_mode {
            ViewMode::Tasks => {
                let result = session.add_task(&self.input_buffer);
                if self.report(result).is_some() {
                    self.input_mode = InputMode::Normal;
                    self.input_buffer.clear();
                    self.state.select(Some(0));
                }
            }
            ViewMode::Defaults => match self.add_state.step {
                0 => {
                    // Weekday
                    match parse_weekday(&self.input_buffer) {
                        Some(d) => {
                            self.add_state.weekday = Some(d);
                            self.add_state.step += 1;
                            self.input_buffer.clear();
                        }
                        None => self.status = Some(format!("Unknown weekday '{}'", self.input_buffer)),
                    }
                }
                1 => {
                    // Title
                    let weekday = self.add_state.weekday.unwrap_or(0);
                    let result = session.add_template(weekday, &self.input_buffer, session.workspace());
                    if self.report(result).is_some() {
                        let date = session.active_date();
                        session.apply_defaults(&date, session.workspace());
                        self.input_mode = InputMode::Normal;
                        self.input_buffer.clear();
                    }
                }
                _ => {}
            },
            ViewMode::Calendar => self.input_mode = InputMode::Normal,
        }
        self.reload(session);
    }

    fn handle_editing_input(&mut self, session: &mut Session) {
        if let Some(id) = self.target_id.take() {
            let result = session.edit_task(&id, &self.input_buffer);
            if let Some(EditOutcome::Deleted) = self.report(result) {
                self.status = Some("Empty title, task removed".into());
            }
        }
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
        self.reload(session);
    }
}

fn clamp_selection(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else if let Some(i) = state.selected() {
        if i >= len {
            state.select(Some(len - 1));
        }
    } else {
        state.select(Some(0));
    }
}

fn step_selection(state: &mut TableState, len: usize, delta: isize) {
    if len == 0 {
        return;
    }
    let i = match state.selected() {
        Some(i) => (i as isize + delta).rem_euclid(len as isize) as usize,
        None => 0,
    };
    state.select(Some(i));
}
