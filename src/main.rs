//! # Daymark
//!
//! A terminal task tracker for date-scoped tasks in two workspaces
//! (`personal` and `work`). Tasks live in a local JSON store first and are
//! mirrored to an optional remote server on a best-effort basis.
//!
//! ## Features
//!
//! *   **Per-day lists**: every task belongs to one calendar date.
//! *   **Weekly defaults**: recurring templates ("Standup" every Monday) are
//!     added to a day automatically when it is viewed, from Nov 1 of the
//!     current year up to 30 days ahead.
//! *   **Heat calendar**: each day is shaded by how much of it got done.
//! *   **Remote sync**: on startup the server copy wins if it has data,
//!     otherwise local data is uploaded; every change is then pushed in the
//!     background.
//!
//! ## Usage
//!
//! ```bash
//! daymark                      # interactive UI
//! daymark add "Write report"   # add to the selected day
//! daymark list --date 2025-11-10
//! daymark defaults add mon "Standup" --workspace work
//! daymark cal
//! ```
//!
//! ## Data Storage
//!
//! Tasks are saved in your local data directory:
//! *   Linux: `~/.local/share/daymark/tasks.json`
//! *   macOS: `~/Library/Application Support/daymark/tasks.json`
//! *   Windows: `%APPDATA%\daymark\tasks.json`
//!
//! Override with the `DAYMARK_DB` environment variable. `defaults.json`,
//! `prefs.json` and `config.json` sit next to it.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;

use daymark::commands::*;
use daymark::config::Settings;
use daymark::logging;
use daymark::models::{Filter, Workspace};
use daymark::remote::RemoteClient;
use daymark::storage::{default_db_path, LocalStore};
use daymark::sync::{Reconciliation, SyncCoordinator};
use daymark::tui::run_tui;
use daymark::Session;

#[derive(Parser)]
#[command(name = "daymark")]
#[command(about = "Per-day task tracker with weekly defaults and a heat calendar", long_about = None)]
struct Cli {
    /// Remote task store base URL, e.g. http://localhost:3000/api
    #[arg(long, global = true, env = "DAYMARK_SERVER")]
    server: Option<String>,
    /// Skip the remote store entirely
    #[arg(long, global = true)]
    offline: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task to the selected day
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        /// Day in YYYY-MM-DD (also selects it)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// List tasks for the selected day
    List {
        /// Day in YYYY-MM-DD (also selects it)
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short, long, value_enum, default_value_t = Filter::All)]
        filter: Filter,
    },
    /// Toggle a task done/open
    Toggle { id: String },
    /// Rename a task (an empty title deletes it)
    Edit { id: String, title: String },
    /// Remove a task
    Remove { id: String },
    /// Remove completed tasks from the selected day
    Clear,
    /// Show or switch the active workspace
    Workspace {
        #[arg(value_enum)]
        workspace: Option<Workspace>,
    },
    /// Show or select the active day (YYYY-MM-DD or "today")
    Date { date: Option<String> },
    /// Show the month calendar with completion heat
    Cal {
        /// Month in YYYY-MM (defaults to the selected day's month)
        month: Option<String>,
        /// Months to shift by, e.g. -1 for the previous month
        #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i32,
    },
    /// Show the selected day's week
    Week,
    /// Manage weekly defaults
    Defaults {
        #[command(subcommand)]
        command: DefaultsCommands,
    },
    /// Report the result of startup sync with the server
    Sync,
    /// Inspect or overwrite the remote store
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },
    /// Authenticate against the server
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Reset local data (delete all tasks, defaults and preferences)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

#[derive(Subcommand)]
enum DefaultsCommands {
    /// Add a weekly default
    Add {
        /// Weekday: 0-6 (0 = Sunday) or a name like "mon"
        weekday: String,
        title: String,
        #[arg(short, long, value_enum)]
        workspace: Option<Workspace>,
    },
    /// List defaults
    List,
    /// Remove a default by id (or id prefix)
    Remove { id: String },
}

#[derive(Subcommand)]
enum RemoteCommands {
    /// List tasks on the server
    List {
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Replace the server's tasks with the local ones
    Push,
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Show token and server user status
    Status,
    /// Log in and store the token
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Register a new user and store the token
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Forget the stored token
    Logout,
}

fn main() {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let shell_enum = match shell.as_str() {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            "powershell" => Shell::PowerShell,
            "elvish" => Shell::Elvish,
            _ => {
                eprintln!("Unsupported shell: {}", shell);
                return;
            }
        };
        let mut cmd = Cli::command();
        generate(shell_enum, &mut cmd, "daymark", &mut io::stdout());
        return;
    }

    let db_path = default_db_path();
    let data_dir = db_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| ".".into());
    let mut settings = Settings::load(&data_dir.join("config.json")).unwrap_or_else(|e| {
        eprintln!("Ignoring config: {}", e);
        Settings::default()
    });
    if cli.server.is_some() {
        settings.server_url = cli.server.clone();
    }
    if cli.offline {
        settings.server_url = None;
    }

    let interactive = matches!(cli.command, None | Some(Commands::Ui));
    let _log_guard = if interactive {
        let _ = std::fs::create_dir_all(&data_dir);
        Some(logging::init_file(&data_dir, &settings.log_level))
    } else {
        logging::init_stderr(&settings.log_level);
        None
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return;
        }
    };

    let mut session = Session::new(LocalStore::open(db_path), settings.clone());
    if let Some(url) = &settings.server_url {
        match RemoteClient::new(url) {
            Ok(client) => session.attach_sync(SyncCoordinator::new(client, runtime.handle().clone())),
            Err(e) => eprintln!("Remote disabled: {}", e),
        }
    }
    let outcome = runtime.block_on(session.reconcile());
    if outcome != Reconciliation::Offline {
        tracing::info!(?outcome, "startup reconciliation");
    }
    session.finish_startup();

    match cli.command {
        Some(Commands::Add { title, date }) => cmd_add(&mut session, title, date),
        Some(Commands::List { date, filter }) => cmd_list(&mut session, date, filter),
        Some(Commands::Toggle { id }) => cmd_toggle(&mut session, id),
        Some(Commands::Edit { id, title }) => cmd_edit(&mut session, id, title),
        Some(Commands::Remove { id }) => cmd_remove(&mut session, id),
        Some(Commands::Clear) => cmd_clear(&mut session),
        Some(Commands::Workspace { workspace }) => cmd_workspace(&mut session, workspace),
        Some(Commands::Date { date }) => cmd_date(&mut session, date),
        Some(Commands::Cal { month, offset }) => cmd_cal(&mut session, month, offset),
        Some(Commands::Week) => cmd_week(&mut session),
        Some(Commands::Defaults { command }) => match command {
            DefaultsCommands::Add { weekday, title, workspace } => {
                cmd_defaults_add(&mut session, weekday, title, workspace)
            }
            DefaultsCommands::List => cmd_defaults_list(&session),
            DefaultsCommands::Remove { id } => cmd_defaults_remove(&mut session, id),
        },
        Some(Commands::Sync) => cmd_sync(&session, outcome),
        Some(Commands::Remote { command }) => match command {
            RemoteCommands::List { date } => runtime.block_on(cmd_remote_list(&session, date)),
            RemoteCommands::Push => runtime.block_on(cmd_remote_push(&session)),
        },
        Some(Commands::Auth { command }) => match command {
            AuthCommands::Status => runtime.block_on(cmd_auth_status(&session)),
            AuthCommands::Login { username, password } => {
                runtime.block_on(cmd_auth_login(&mut session, username, password, false))
            }
            AuthCommands::Register { username, password } => {
                runtime.block_on(cmd_auth_login(&mut session, username, password, true))
            }
            AuthCommands::Logout => cmd_auth_logout(&mut session),
        },
        Some(Commands::Reset { force }) => cmd_reset(&mut session, force),
        Some(Commands::Completions { .. }) => {}
        Some(Commands::Ui) | None => {
            if let Err(e) = run_tui(&mut session) {
                eprintln!("Error running TUI: {}", e);
            }
        }
    }

    // Let background pushes finish before the runtime shuts down.
    runtime.block_on(session.flush_sync());
}
