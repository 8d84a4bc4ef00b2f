use chrono::Datelike;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use super::app::{App, InputMode, ViewMode};
use crate::calendar::DaySummary;
use crate::commands::heat_glyph;
use crate::models::{weekday_name, WEEKDAY_NAMES};
use crate::Session;

/// Background for a heat level; 0 keeps the terminal default.
fn heat_style(heat: u8) -> Style {
    match heat {
        0 => Style::default(),
        1 => Style::default().fg(Color::Black).bg(Color::Yellow),
        2 => Style::default().fg(Color::Black).bg(Color::LightYellow),
        3 => Style::default().fg(Color::Black).bg(Color::LightGreen),
        _ => Style::default().fg(Color::Black).bg(Color::Green),
    }
}

fn header_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

pub fn ui(f: &mut Frame, app: &mut App, session: &Session) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Week strip
            Constraint::Min(0),    // Main view
            Constraint::Length(3), // Help
        ].as_ref())
        .split(f.area());

    draw_week(f, app, session, chunks[0]);

    match app.view_mode {
        ViewMode::Tasks => draw_tasks(f, app, session, chunks[1]),
        ViewMode::Calendar => draw_month(f, app, session, chunks[1]),
        ViewMode::Defaults => draw_defaults(f, app, session, chunks[1]),
    }

    let help_text = match app.input_mode {
        InputMode::Normal => match app.view_mode {
            ViewMode::Tasks => "q: Quit | a: Add | e: Edit | Space: Done | d: Del | x: Clear Done | f: Filter | w: Workspace | h/l: Day | [/]: Week | t: Today | v: View",
            ViewMode::Calendar => "q: Quit | h/l: Day | [/]: Week | </>: Month | t: Today | Enter: Open Day | w: Workspace | v: View",
            ViewMode::Defaults => "q: Quit | a: Add Default | d: Del | w: Workspace | v: View",
        },
        InputMode::Editing => "Enter: Save (empty deletes) | Esc: Cancel",
        InputMode::Adding => "Enter: Next Step | Esc: Cancel",
    };
    let help_line = match &app.status {
        Some(msg) => format!("{}  |  {}", msg, help_text),
        None => help_text.to_string(),
    };

    let help = Paragraph::new(help_line)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[2]);

    // Render Input Box if needed
    if app.input_mode != InputMode::Normal {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);

        let title_string;
        let title = match app.input_mode {
            InputMode::Adding => match app.view_mode {
                ViewMode::Defaults => match (app.add_state.step, app.add_state.weekday) {
                    (0, _) => "Add Default: Enter Weekday (0-6 or mon..sun)",
                    (_, Some(d)) => {
                        title_string = format!("Add Default for {}: Enter Title", weekday_name(d));
                        title_string.as_str()
                    }
                    _ => "Add Default",
                },
                _ => {
                    title_string = format!("Add Task for {}", session.active_date());
                    title_string.as_str()
                }
            },
            InputMode::Editing => "Edit Title",
            InputMode::Normal => "",
        };

        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));

        f.render_widget(input, area);
    }
}

fn draw_week(f: &mut Frame, app: &App, session: &Session, area: Rect) {
    let active = session.active_day();
    let today = session.today();
    let cells: Vec<Cell> = app
        .week
        .iter()
        .map(|d| {
            let label = format!(
                "{} {:>2} {}",
                WEEKDAY_NAMES[d.date.weekday().num_days_from_sunday() as usize],
                d.date.day(),
                heat_glyph(d.heat)
            );
            Cell::from(label).style(day_style(d, active, today, None))
        })
        .collect();
    let widths = [Constraint::Ratio(1, 7); 7];
    let sync = if session.is_connected() { "online" } else { "local" };
    let title = format!(
        "Daymark - {} - {} ({})",
        session.workspace().label(),
        session.active_date(),
        sync
    );
    let table = Table::new(vec![Row::new(cells)], widths)
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(table, area);
}

fn day_style(d: &DaySummary, active: chrono::NaiveDate, today: chrono::NaiveDate, month: Option<u32>) -> Style {
    let mut style = heat_style(d.heat);
    if month.is_some_and(|m| d.date.month() != m) {
        style = style.add_modifier(Modifier::DIM);
    }
    if d.date == today {
        style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    }
    if d.date == active {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

fn draw_tasks(f: &mut Frame, app: &mut App, session: &Session, area: Rect) {
    let rows: Vec<Row> = app
        .tasks
        .iter()
        .map(|t| {
            let style = if t.completed {
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(if t.completed { "[x]" } else { "[ ]" }),
                Cell::from(t.title.clone()),
            ])
            .style(style)
        })
        .collect();

    let widths = [Constraint::Length(4), Constraint::Min(20)];

    let date = session.active_date();
    let count = session.count_for(session.workspace(), &date);
    let done = session.completed_count_for(session.workspace(), &date);
    let title = format!("Tasks {}/{} done [{}]", done, count, app.filter.label());

    let table = Table::new(rows, widths)
        .header(Row::new(vec!["", "Title"]).style(header_style()).bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn draw_month(f: &mut Frame, app: &App, session: &Session, area: Rect) {
    let (year, month) = app.view_month;
    let active = session.active_day();
    let today = session.today();
    let rows: Vec<Row> = app
        .month
        .chunks(7)
        .map(|week| {
            let cells: Vec<Cell> = week
                .iter()
                .map(|d| {
                    let text = if d.count > 0 {
                        format!("{:>2} {}/{}", d.date.day(), d.completed, d.count)
                    } else {
                        format!("{:>2}", d.date.day())
                    };
                    Cell::from(text).style(day_style(d, active, today, Some(month)))
                })
                .collect();
            Row::new(cells).height(2)
        })
        .collect();

    let widths = [Constraint::Ratio(1, 7); 7];
    let title = format!("{}-{:02}", year, month);
    let table = Table::new(rows, widths)
        .header(Row::new(WEEKDAY_NAMES.to_vec()).style(header_style()).bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title(title));

    f.render_widget(table, area);
}

fn draw_defaults(f: &mut Frame, app: &mut App, session: &Session, area: Rect) {
    let workspace = session.workspace();
    let rows: Vec<Row> = app
        .templates
        .iter()
        .map(|t| {
            let style = if t.workspace == workspace {
                Style::default()
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Row::new(vec![
                Cell::from(weekday_name(t.weekday)),
                Cell::from(t.title.clone()),
                Cell::from(t.workspace.label()),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Min(20),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, widths)
        .header(Row::new(vec!["Day", "Title", "Workspace"]).style(header_style()).bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title("Weekly Defaults"))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.template_state);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}
