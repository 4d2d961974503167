//! Command-line surface: argument parsing and user-facing output.

mod hook;

use crate::config::Config;
use crate::extract;
use crate::frontmatter;
use crate::hook::import_conversation;
use crate::store::SessionStore;
use crate::types::{AiType, SessionStatus};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

/// Manage CLI sessions with conversation logs and task tracking
#[derive(Parser)]
#[command(name = "session-log")]
#[command(version, about = "Manage CLI sessions with conversation logs and task tracking")]
pub struct Cli {
    /// Sessions directory (overrides SESSION_LOG_DIR and the config file)
    #[arg(long, short = 'd', global = true)]
    pub dir: Option<PathBuf>,

    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new session
    New {
        /// Session title
        title: Option<String>,
    },

    /// List sessions
    List {
        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show session details
    Show {
        /// Session ID (partial match)
        id: String,
    },

    /// Add log entry
    Log {
        /// Session ID
        id: String,
        /// User message
        #[arg(short, long, conflicts_with = "ai", required_unless_present = "ai")]
        user: Option<String>,
        /// AI response
        #[arg(short, long)]
        ai: Option<String>,
    },

    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Change session status
    Status {
        /// Session ID
        id: String,
        /// New status (active/paused/completed/archived)
        status: String,
    },

    /// Close a session
    Close {
        /// Session ID
        id: String,
    },

    /// Display session statistics
    Stats,

    /// Import an assistant transcript into a session
    Import {
        /// Session ID
        id: String,
        /// Transcript source
        #[arg(long, value_enum, default_value_t = AiType::Claude)]
        ai: AiType,
        /// Project directory whose transcript to import (default: most recent)
        #[arg(long)]
        cwd: Option<String>,
        /// Forget previously imported messages first
        #[arg(long)]
        reset: bool,
    },

    /// Lifecycle hooks for AI coding tools
    Hook(hook::HookArgs),
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Append a task
    Add { id: String, text: String },
    /// Mark task NUM as done
    Done { id: String, num: usize },
    /// List tasks
    List { id: String },
}

pub fn run(cli: Cli, config: &Config) -> Result<ExitCode> {
    let store = SessionStore::new(&config.sessions_dir);

    match cli.command {
        Commands::New { title } => {
            let (id, path) = store.create(title.as_deref())?;
            println!("Created session: {id}");
            println!("File: {}", path.display());
        }
        Commands::List { status } => print_list(&store, status.as_deref()),
        Commands::Show { id } => {
            print!("{}", store.get_content(&id)?);
        }
        Commands::Log { id, user, ai } => {
            let (role, message) = match (user, ai) {
                (Some(msg), _) => ("User", msg),
                (None, Some(msg)) => ("AI", msg),
                (None, None) => anyhow::bail!("Specify -u/--user or -a/--ai with message"),
            };
            store.add_log(&id, &message, role, false)?;
            println!("Added {role} log entry to session {}", full_id(&store, &id)?);
        }
        Commands::Task { action } => run_task(&store, action)?,
        Commands::Status { id, status } => {
            let old = store.set_status(&id, &status)?;
            println!("Session {}: {old} -> {status}", full_id(&store, &id)?);
        }
        Commands::Close { id } => {
            let old = store.set_status(&id, SessionStatus::Completed.as_str())?;
            println!("Session {}: {old} -> completed", full_id(&store, &id)?);
        }
        Commands::Stats => print_stats(&store),
        Commands::Import {
            id,
            ai,
            cwd,
            reset,
        } => run_import(&store, config, &id, ai, cwd.as_deref(), reset)?,
        Commands::Hook(args) => return hook::run(args, config),
    }
    Ok(ExitCode::SUCCESS)
}

/// The stored `session_id` of the session matching `id`.
fn full_id(store: &SessionStore, id: &str) -> Result<String> {
    let (fields, _) = store.get(id)?;
    Ok(frontmatter::get_text(&fields, "session_id").unwrap_or_else(|| id.to_string()))
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ===================================================================
// Listing and stats
// ===================================================================

fn print_list(store: &SessionStore, status: Option<&str>) {
    let sessions = store.list(status);
    if sessions.is_empty() {
        println!("No sessions found.");
        return;
    }

    println!("{:<10} {:<12} {:<30} {:<20}", "ID", "Status", "Title", "Updated");
    println!("{}", "-".repeat(75));
    for s in sessions {
        let title = truncate_chars(&s.title, 30);
        let updated = truncate_chars(&s.updated_at, 19);
        println!("{:<10} {:<12} {:<30} {:<20}", s.id, s.status, title, updated);
    }
}

fn print_stats(store: &SessionStore) {
    let sessions = store.list(None);
    if sessions.is_empty() {
        println!("No sessions found.");
        return;
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for s in &sessions {
        *counts.entry(s.status.as_str()).or_default() += 1;
    }

    let rule = "=".repeat(40);
    println!("{rule}");
    println!("       SESSION STATISTICS");
    println!("{rule}");
    println!();
    println!("  Total Sessions:    {}", sessions.len());
    println!();
    println!("  By Status:");
    for status in SessionStatus::ALL {
        let label = format!("{}:", capitalize(status.as_str()));
        println!(
            "    {label:<17}{}",
            counts.get(status.as_str()).copied().unwrap_or(0)
        );
    }
    println!();
    println!("{rule}");
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ===================================================================
// Tasks and import
// ===================================================================

fn run_task(store: &SessionStore, action: TaskAction) -> Result<()> {
    match action {
        TaskAction::Add { id, text } => {
            store.add_task(&id, &text)?;
            println!("Added task: {text}");
        }
        TaskAction::Done { id, num } => {
            store.complete_task(&id, num)?;
            println!("Completed task {num}");
        }
        TaskAction::List { id } => {
            let tasks = store.list_tasks(&id)?;
            println!("Tasks for session {}:", full_id(store, &id)?);
            for task in tasks {
                let state = if task.done { "done" } else { "pending" };
                println!("  {}. [{state}] {}", task.num, task.text);
            }
        }
    }
    Ok(())
}

fn run_import(
    store: &SessionStore,
    config: &Config,
    id: &str,
    ai: AiType,
    cwd: Option<&str>,
    reset: bool,
) -> Result<()> {
    let id = full_id(store, id)?;
    if reset {
        store.clear_imported_hashes(&id)?;
    }
    let extractor = extract::for_ai(ai, config);
    println!("Importing conversation from {}...", ai.display_name());
    let summary = import_conversation(store, &id, extractor.as_ref(), cwd, config.message_limit)
        .with_context(|| format!("importing {} conversation", extractor.name()))?;
    hook::print_import(ai, &summary);
    if summary.failed > 0 {
        anyhow::bail!("{} messages could not be added to session {id}", summary.failed);
    }
    Ok(())
}
