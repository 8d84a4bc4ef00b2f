use std::io::{self, Write};

use chrono::{Datelike, NaiveDate};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::calendar::{shift_month, DaySummary};
use crate::error::{Error, Result};
use crate::models::{
    iso, parse_date, parse_weekday, weekday_name, DefaultTemplate, Filter, Task, Workspace, WEEKDAY_NAMES,
};
use crate::remote::RemoteClient;
use crate::session::{EditOutcome, Session};
use crate::sync::Reconciliation;

/// Table color for a heat level.
pub fn heat_color(heat: u8) -> Color {
    match heat {
        0 => Color::Reset,
        1 => Color::DarkYellow,
        2 => Color::Yellow,
        3 => Color::Green,
        _ => Color::DarkGreen,
    }
}

/// Single-glyph heat indicator.
pub fn heat_glyph(heat: u8) -> &'static str {
    match heat {
        0 => "·",
        1 => "░",
        2 => "▒",
        3 => "▓",
        _ => "█",
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Resolves a full id or a unique id prefix.
pub fn resolve_id(session: &Session, prefix: &str) -> Result<String> {
    let matches: Vec<&Task> = session
        .tasks()
        .iter()
        .filter(|t| t.id.starts_with(prefix))
        .collect();
    match matches.as_slice() {
        [one] => Ok(one.id.clone()),
        _ => match session.tasks().iter().find(|t| t.id == prefix) {
            Some(t) => Ok(t.id.clone()),
            None => Err(Error::TaskNotFound(prefix.to_string())),
        },
    }
}

/// Resolves a full template id or a unique template id prefix.
pub fn resolve_template_id(session: &Session, prefix: &str) -> Result<String> {
    let matches: Vec<&DefaultTemplate> = session
        .templates()
        .iter()
        .filter(|t| t.id.starts_with(prefix))
        .collect();
    match matches.as_slice() {
        [one] => Ok(one.id.clone()),
        _ => match session.templates().iter().find(|t| t.id == prefix) {
            Some(t) => Ok(t.id.clone()),
            None => Err(Error::TemplateNotFound(prefix.to_string())),
        },
    }
}

/// Adds a task on the active date, or on `date` after selecting it.
pub fn cmd_add(session: &mut Session, title: String, date: Option<String>) {
    if let Some(d) = date {
        if let Err(e) = session.select_date(&d) {
            eprintln!("{}", e);
            return;
        }
    }
    match session.add_task(&title) {
        Ok(task) => println!("Task added (id = {}) on {}", short_id(&task.id), task.date),
        Err(e) => eprintln!("{}", e),
    }
}

/// Lists the active workspace's tasks for the active date.
///
/// Defaults for the date are materialized first.
pub fn cmd_list(session: &mut Session, date: Option<String>, filter: Filter) {
    let date = date.unwrap_or_else(|| session.active_date());
    if let Err(e) = session.select_date(&date) {
        eprintln!("{}", e);
        return;
    }
    let tasks = session.visible_tasks(filter);
    let header = format!(
        "{} · {} · {}",
        session.workspace().label(),
        session.active_day().format("%a %b %-d, %Y"),
        filter.label()
    );
    if tasks.is_empty() {
        println!("{}\nNo tasks found.", header);
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);
    for t in tasks {
        let (status, color) = if t.completed {
            ("Done", Color::Green)
        } else {
            ("Open", Color::Yellow)
        };
        let mut title = Cell::new(&t.title);
        if t.completed {
            title = title.add_attribute(Attribute::CrossedOut);
        }
        table.add_row(vec![Cell::new(short_id(&t.id)), title, Cell::new(status).fg(color)]);
    }
    println!("{}\n{table}", header);
}

pub fn cmd_toggle(session: &mut Session, id: String) {
    let result = resolve_id(session, &id).and_then(|id| session.toggle_task(&id));
    match result {
        Ok(true) => println!("Task {} marked as done.", id),
        Ok(false) => println!("Task {} reopened.", id),
        Err(e) => eprintln!("{}", e),
    }
}

/// Renames a task. An empty title deletes it.
pub fn cmd_edit(session: &mut Session, id: String, title: String) {
    let result = resolve_id(session, &id).and_then(|full| session.edit_task(&full, &title));
    match result {
        Ok(EditOutcome::Renamed) => println!("Task {} updated.", id),
        Ok(EditOutcome::Deleted) => println!("Empty title, task {} removed.", id),
        Err(e) => eprintln!("{}", e),
    }
}

pub fn cmd_remove(session: &mut Session, id: String) {
    let result = resolve_id(session, &id).and_then(|full| session.delete_task(&full));
    match result {
        Ok(()) => println!("Task {} removed.", id),
        Err(e) => eprintln!("{}", e),
    }
}

/// Clears completed tasks on the active date.
pub fn cmd_clear(session: &mut Session) {
    match session.clear_completed() {
        Ok(0) => println!("Nothing to clear."),
        Ok(n) => println!("Cleared {} completed task{}.", n, if n == 1 { "" } else { "s" }),
        Err(e) => eprintln!("{}", e),
    }
}

/// Shows or switches the active workspace.
pub fn cmd_workspace(session: &mut Session, workspace: Option<Workspace>) {
    match workspace {
        None => println!("{}", session.workspace()),
        Some(w) => match session.switch_workspace(w) {
            Ok(()) => println!("Switched to {}.", w),
            Err(e) => eprintln!("{}", e),
        },
    }
}

/// Shows or selects the active date. Accepts `YYYY-MM-DD` or `today`.
pub fn cmd_date(session: &mut Session, date: Option<String>) {
    let Some(date) = date else {
        println!("{}", session.active_date());
        return;
    };
    let date = if date == "today" { iso(session.today()) } else { date };
    match session.select_date(&date) {
        Ok(created) => {
            println!("Selected {}.", session.active_date());
            if created {
                println!("Added defaults for this day.");
            }
        }
        Err(e) => eprintln!("{}", e),
    }
}

fn day_cell(s: &DaySummary, session: &Session, in_month: bool) -> Cell {
    let mut text = format!("{:>2}", s.date.day());
    if s.count > 0 {
        text.push_str(&format!(" {}/{}", s.completed, s.count));
    }
    if s.date == session.active_day() {
        text.push('*');
    }
    let mut cell = Cell::new(format!("{} {}", heat_glyph(s.heat), text)).fg(heat_color(s.heat));
    if !in_month {
        cell = cell.add_attribute(Attribute::Dim);
    }
    if s.date == session.today() {
        cell = cell.add_attribute(Attribute::Bold);
    }
    cell
}

fn parse_month(s: &str) -> Option<(i32, u32)> {
    let (y, m) = s.split_once('-')?;
    let (y, m) = (y.parse().ok()?, m.parse().ok()?);
    NaiveDate::from_ymd_opt(y, m, 1).map(|_| (y, m))
}

/// Prints a month grid colored by completion heat.
pub fn cmd_cal(session: &mut Session, month: Option<String>, offset: i32) {
    let active = session.active_day();
    let (year, month) = match month.as_deref() {
        None => (active.year(), active.month()),
        Some(s) => match parse_month(s) {
            Some(ym) => ym,
            None => {
                eprintln!("Invalid month '{}'. Use YYYY-MM.", s);
                return;
            }
        },
    };
    let Some((year, month)) = shift_month(year, month, offset) else {
        eprintln!("Month offset {} is out of range.", offset);
        return;
    };
    let summaries = session.month_summary(year, month);
    let session = &*session;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(WEEKDAY_NAMES.iter().map(|d| Cell::new(d).add_attribute(Attribute::Bold)));
    for week in summaries.chunks(7) {
        table.add_row(
            week.iter()
                .map(|s| day_cell(s, session, s.date.month() == month))
                .collect::<Vec<_>>(),
        );
    }
    let title = NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_default();
    println!("{} · {}\n{table}", title, session.workspace().label());
}

/// Prints the week containing the active date.
pub fn cmd_week(session: &mut Session) {
    let summaries = session.week_summary(session.active_day());
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(
        summaries
            .iter()
            .map(|s| Cell::new(s.date.format("%a %b %-d")).add_attribute(Attribute::Bold)),
    );
    table.add_row(
        summaries
            .iter()
            .map(|s| {
                let text = if s.count > 0 {
                    format!("{} {}/{}", heat_glyph(s.heat), s.completed, s.count)
                } else {
                    heat_glyph(0).to_string()
                };
                Cell::new(text).fg(heat_color(s.heat))
            })
            .collect::<Vec<_>>(),
    );
    println!("{} · week of {}\n{table}", session.workspace().label(), summaries[0].date);
}

/// Adds a weekly default.
pub fn cmd_defaults_add(session: &mut Session, weekday: String, title: String, workspace: Option<Workspace>) {
    let Some(day) = parse_weekday(&weekday) else {
        eprintln!("{}", Error::InvalidWeekday(weekday));
        return;
    };
    let workspace = workspace.unwrap_or(session.workspace());
    match session.add_template(day, &title, workspace) {
        Ok(t) => {
            println!("Default '{}' added for {} ({}).", t.title, weekday_name(t.weekday), t.workspace);
            // Make it show up right away if today's date is affected.
            let date = session.active_date();
            session.apply_defaults(&date, session.workspace());
        }
        Err(e) => eprintln!("{}", e),
    }
}

pub fn cmd_defaults_list(session: &Session) {
    let templates = session.templates();
    if templates.is_empty() {
        println!("No defaults found.");
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["ID", "Day", "Title", "Workspace"]);
    for t in templates {
        table.add_row(vec![
            short_id(&t.id).to_string(),
            weekday_name(t.weekday).to_string(),
            t.title.clone(),
            t.workspace.to_string(),
        ]);
    }
    println!("{table}");
}

pub fn cmd_defaults_remove(session: &mut Session, id: String) {
    let result = resolve_template_id(session, &id).and_then(|full| session.remove_template(&full));
    match result {
        Ok(t) => println!("Default '{}' removed.", t.title),
        Err(e) => eprintln!("{}", e),
    }
}

/// Reports what startup reconciliation decided.
pub fn cmd_sync(session: &Session, outcome: Reconciliation) {
    let Some(sync) = session.sync() else {
        println!("No server configured, running local-only.");
        return;
    };
    let server = sync.client().base_url();
    match outcome {
        Reconciliation::Offline => println!("Server {} unreachable, running local-only.", server),
        Reconciliation::AdoptedRemote(n) => println!("Loaded {} tasks from {}.", n, server),
        Reconciliation::PushedLocal(n) => println!("Server empty, uploading {} local tasks to {}.", n, server),
        Reconciliation::BothEmpty => println!("Connected to {}; nothing to sync.", server),
    }
}

fn remote_client(session: &Session) -> Option<RemoteClient> {
    let client = session.sync().map(|s| s.client().clone());
    if client.is_none() {
        eprintln!("No server configured. Set DAYMARK_SERVER or pass --server.");
    }
    client
}

/// Lists the remote snapshot, optionally for one date.
pub async fn cmd_remote_list(session: &Session, date: Option<String>) {
    let Some(client) = remote_client(session) else { return };
    if let Some(d) = &date {
        if parse_date(d).is_none() {
            eprintln!("{}", Error::InvalidDate(d.clone()));
            return;
        }
    }
    match client.fetch_tasks(date.as_deref()).await {
        Ok(tasks) if tasks.is_empty() => println!("Remote has no tasks."),
        Ok(tasks) => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["ID", "Date", "Workspace", "Title", "Done"]);
            for t in &tasks {
                table.add_row(vec![
                    short_id(&t.id).to_string(),
                    t.date.clone(),
                    t.workspace.to_string(),
                    t.title.clone(),
                    if t.completed { "yes".into() } else { String::new() },
                ]);
            }
            println!("{table}");
        }
        Err(e) => eprintln!("{}", e),
    }
}

/// Replaces the remote collection with the local one and waits for it.
pub async fn cmd_remote_push(session: &Session) {
    let Some(client) = remote_client(session) else { return };
    match client.replace_all(session.tasks()).await {
        Ok(()) => println!("Pushed {} tasks.", session.tasks().len()),
        Err(e) => eprintln!("{}", e),
    }
}

pub async fn cmd_auth_status(session: &Session) {
    let logged_in = session.prefs().auth_token.is_some();
    println!("Token: {}", if logged_in { "present" } else { "none" });
    let Some(client) = remote_client(session) else { return };
    match client.users_exist().await {
        Ok(true) => println!("Server has registered users."),
        Ok(false) => println!("Server has no users yet; run `daymark auth register`."),
        Err(e) => eprintln!("{}", e),
    }
}

/// Logs in (or registers) and stores the returned token.
pub async fn cmd_auth_login(session: &mut Session, username: String, password: String, register: bool) {
    let Some(client) = remote_client(session) else { return };
    let result = if register {
        client.register(&username, &password).await
    } else {
        client.login(&username, &password).await
    };
    match result.and_then(|token| session.set_auth_token(Some(token))) {
        Ok(()) => println!("Logged in as {}.", username),
        Err(e) => eprintln!("Login failed: {}", e),
    }
}

pub fn cmd_auth_logout(session: &mut Session) {
    match session.set_auth_token(None) {
        Ok(()) => println!("Logged out."),
        Err(e) => eprintln!("{}", e),
    }
}

/// Resets the local database by deleting tasks, defaults and prefs.
pub fn cmd_reset(session: &mut Session, force: bool) {
    if !force {
        print!("Are you sure you want to delete all local tasks and defaults? This cannot be undone. [y/N] ");
        let _ = io::stdout().flush();
        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() || input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return;
        }
    }

    if let Err(e) = session.reset() {
        eprintln!("Failed to reset database: {}", e);
    } else {
        println!("Database reset successfully.");
    }
}
