//! `session-log hook ...`: the entry points wired into an assistant's
//! lifecycle hooks.
//!
//! Hooks report problems on stderr but exit successfully so they never
//! block the assistant, with the exception of `hook current`, whose exit
//! status tells scripts whether a session is active.

use crate::config::{self, Config};
use crate::hook::{ActiveSession, Hooks, ImportSummary, StartOutcome, StopReport, TaskExtraction};
use crate::types::AiType;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::process::ExitCode;

#[derive(Args)]
pub struct HookArgs {
    /// Project directory identifying the session (default: current directory)
    #[arg(long, global = true)]
    cwd: Option<String>,

    /// Terminal identifying the session
    #[arg(long, global = true, env = "CURSOR_TERMINAL_ID")]
    terminal_id: Option<String>,

    #[command(subcommand)]
    action: HookAction,
}

#[derive(Subcommand)]
enum HookAction {
    /// Start a session for this terminal or directory
    Start {
        /// Session title (default: "<Tool> Session - <time>")
        title: Option<String>,
        #[arg(long, value_enum)]
        ai: Option<AiType>,
    },
    /// Import the transcript, complete the session and run the task extractor
    Stop {
        /// Transcript source (default: the tool that started the session)
        #[arg(long, value_enum)]
        ai: Option<AiType>,
    },
    /// Append a message to the active session
    Log {
        /// Role label, usually User or AI
        role: String,
        message: String,
    },
    /// Print the active session
    Current,
    /// List every tracked session
    List,
    /// Remove tracked sessions older than HOURS
    Cleanup {
        /// Age limit in hours (default: from config, 24)
        hours: Option<u64>,
    },
}

pub fn run(args: HookArgs, config: &Config) -> Result<ExitCode> {
    let cwd = match args.cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir()
            .context("reading current directory")?
            .to_string_lossy()
            .into_owned(),
    };
    let terminal_id = args.terminal_id.filter(|t| !t.trim().is_empty());
    let terminal_id = terminal_id.as_deref();
    let hooks = Hooks::new(config);

    match args.action {
        HookAction::Start { title, ai } => {
            match hooks.start(title.as_deref(), ai, &cwd, terminal_id) {
                Ok(StartOutcome::Created(s)) => {
                    println!("Session started: {} ({})", s.session_id, s.ai_type)
                }
                Ok(StartOutcome::Existing(s)) => {
                    println!("Session already active: {} ({})", s.session_id, s.ai_type)
                }
                Err(e) => eprintln!("Error starting session: {e:#}"),
            }
        }
        HookAction::Stop { ai } => match hooks.stop(ai, &cwd, terminal_id) {
            Some(report) => print_stop(&report),
            None => eprintln!("No active session in {cwd}"),
        },
        HookAction::Log { role, message } => {
            match hooks.log(&role, &message, &cwd, terminal_id) {
                Ok(Some(_)) => println!("Added {role} log"),
                Ok(None) => eprintln!("No active session"),
                Err(e) => eprintln!("Error adding log: {e:#}"),
            }
        }
        HookAction::Current => match hooks.current(&cwd, terminal_id) {
            Some(session) => println!("{}", describe(&session)),
            None => {
                eprintln!(
                    "No active session (terminal={}, cwd={cwd})",
                    terminal_id.unwrap_or("None")
                );
                return Ok(ExitCode::FAILURE);
            }
        },
        HookAction::List => {
            let sessions = hooks.list_active();
            if sessions.is_empty() {
                println!("No active sessions");
            } else {
                println!("Active sessions ({}):", sessions.len());
                for s in sessions {
                    println!(
                        "  {} ({}){} - {}",
                        s.session_id,
                        s.ai_type,
                        terminal_tag(s.terminal_id.as_deref()),
                        s.cwd
                    );
                    if let Some(title) = &s.title {
                        println!("    Title: {title}");
                    }
                    println!("    Started: {}", s.start_timestamp);
                }
            }
        }
        HookAction::Cleanup { hours } => {
            let max_age = hours.map_or(config.stale_after, config::hours);
            match hooks.cleanup(max_age) {
                0 => println!("No stale sessions found"),
                n => println!("Removed {n} stale session(s)"),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn terminal_tag(terminal_id: Option<&str>) -> String {
    match terminal_id {
        Some(tid) => format!(" [terminal={}]", tid.chars().take(8).collect::<String>()),
        None => String::new(),
    }
}

fn describe(session: &ActiveSession) -> String {
    match session {
        ActiveSession::Tracked(s) => format!(
            "{} ({}){}",
            s.session_id,
            s.ai_type,
            terminal_tag(s.terminal_id.as_deref())
        ),
        ActiveSession::Legacy {
            session_id,
            ai_type,
        } => format!(
            "{session_id} ({}) [legacy]",
            ai_type.unwrap_or(AiType::Claude)
        ),
    }
}

// ===================================================================
// Stop output
// ===================================================================

pub(super) fn print_import(ai: AiType, summary: &ImportSummary) {
    let Some(source) = &summary.source else {
        eprintln!("No {} session found", ai.display_name());
        return;
    };
    let name = source.file_name().unwrap_or(source.as_os_str());
    println!("Importing conversation from: {}", name.to_string_lossy());

    if summary.imported + summary.skipped + summary.failed == 0 {
        println!("No messages found in session");
    } else if summary.skipped > 0 {
        println!(
            "Imported {} messages, skipped {} duplicates",
            summary.imported, summary.skipped
        );
    } else {
        println!("Imported {} messages", summary.imported);
    }
    if summary.failed > 0 {
        eprintln!("Error adding log: {} messages failed", summary.failed);
    }
}

fn print_stop(report: &StopReport) {
    let id = report.session.session_id();

    println!("Importing conversation from {}...", report.ai_type.display_name());
    match &report.import {
        Ok(summary) => print_import(report.ai_type, summary),
        Err(e) => eprintln!("Error extracting conversation: {e}"),
    }

    if let Err(e) = &report.completed {
        eprintln!("Error: {e}");
        if e.is_write_failure() {
            eprintln!("Run `session-log close {id}` to retry.");
        } else if e.is_not_found() {
            eprintln!("Stopped tracking {id}.");
        }
        return;
    }
    println!("Session completed: {id} ({})", report.ai_type);
    println!("Extracting tasks from session...");

    match &report.tasks {
        None | Some(TaskExtraction::NotConfigured) => {}
        Some(TaskExtraction::Missing(path)) => {
            eprintln!("Task extractor not found: {}", path.display())
        }
        Some(TaskExtraction::Ran { stdout, stderr, .. }) => {
            if !stdout.is_empty() {
                println!("{stdout}");
            }
            if !stderr.is_empty() {
                eprintln!("{stderr}");
            }
        }
        Some(TaskExtraction::Failed(e)) => eprintln!("Error extracting tasks: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionState;

    #[test]
    fn terminal_tag_shows_first_eight_chars() {
        assert_eq!(terminal_tag(Some("abcdef123456")), " [terminal=abcdef12]");
        assert_eq!(terminal_tag(None), "");
    }

    #[test]
    fn describe_tracked_and_legacy() {
        let state = SessionState::new(
            "a1b2c3d4".to_string(),
            AiType::Gemini,
            "/p",
            None,
            Some("term-0001-xyz".to_string()),
        );
        assert_eq!(
            describe(&ActiveSession::Tracked(state)),
            "a1b2c3d4 (gemini) [terminal=term-000]"
        );
        let legacy = ActiveSession::Legacy {
            session_id: "deadbeef".to_string(),
            ai_type: None,
        };
        assert_eq!(describe(&legacy), "deadbeef (claude) [legacy]");
    }
}
