//! Lifecycle-hook orchestration: start and stop sessions on behalf of an
//! assistant, import its transcript, and run the optional task extractor.
//!
//! Nothing here prints. Each operation returns a report and the CLI layer
//! decides what to show.

use crate::config::Config;
use crate::error::SessionError;
use crate::extract::{self, ExtractError, Extractor};
use crate::state::{self, LegacyState, SessionState, StateTracker};
use crate::store::SessionStore;
use crate::timestamp;
use crate::types::{AiType, SessionStatus};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::{debug, error, info, warn};

// ===================================================================
// Reports
// ===================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Created(SessionState),
    /// A session was already active for this identity; nothing was written.
    Existing(SessionState),
}

impl StartOutcome {
    pub fn state(&self) -> &SessionState {
        match self {
            StartOutcome::Created(s) | StartOutcome::Existing(s) => s,
        }
    }
}

/// The session a hook invocation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveSession {
    Tracked(SessionState),
    /// Found through `current_session.txt`.
    Legacy {
        session_id: String,
        ai_type: Option<AiType>,
    },
}

impl ActiveSession {
    pub fn session_id(&self) -> &str {
        match self {
            ActiveSession::Tracked(s) => &s.session_id,
            ActiveSession::Legacy { session_id, .. } => session_id,
        }
    }

    pub fn ai_type(&self) -> Option<AiType> {
        match self {
            ActiveSession::Tracked(s) => Some(s.ai_type),
            ActiveSession::Legacy { ai_type, .. } => *ai_type,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Transcript the messages came from, if one was found.
    pub source: Option<PathBuf>,
    pub imported: usize,
    pub skipped: usize,
    /// Messages that could not be appended.
    pub failed: usize,
}

#[derive(Debug)]
pub enum TaskExtraction {
    NotConfigured,
    Missing(PathBuf),
    Ran {
        success: bool,
        stdout: String,
        stderr: String,
    },
    Failed(String),
}

#[derive(Debug)]
pub struct StopReport {
    pub session: ActiveSession,
    pub ai_type: AiType,
    pub import: std::result::Result<ImportSummary, ExtractError>,
    /// Previous status on success.
    pub completed: std::result::Result<String, SessionError>,
    /// `None` when the session could not be completed.
    pub tasks: Option<TaskExtraction>,
}

// ===================================================================
// Free-standing steps
// ===================================================================

/// Append the latest transcript's messages to `session_id`, skipping any
/// already imported.
///
/// Per-message failures are counted, not returned; only a transcript that
/// cannot be read is an error.
pub fn import_conversation(
    store: &SessionStore,
    session_id: &str,
    extractor: &dyn Extractor,
    cwd: Option<&str>,
    limit: usize,
) -> std::result::Result<ImportSummary, ExtractError> {
    let Some(path) = extractor.find_latest_session(cwd) else {
        info!("no {} session found for cwd: {}", extractor.name(), cwd.unwrap_or("(any)"));
        return Ok(ImportSummary::default());
    };
    let messages = extractor.extract_messages(&path, limit)?;

    let mut summary = ImportSummary {
        source: Some(path),
        ..Default::default()
    };
    for msg in &messages {
        match store.add_log(session_id, &msg.content, &msg.role, true) {
            Ok(true) => summary.imported += 1,
            Ok(false) => summary.skipped += 1,
            Err(e) => {
                error!("error adding log to {session_id}: {e}");
                summary.failed += 1;
            }
        }
    }
    info!(
        "imported {} messages, skipped {} duplicates",
        summary.imported, summary.skipped
    );
    Ok(summary)
}

/// Run the configured extractor as `<program> --session <id>`.
///
/// Never fails: every problem is reported in the returned value.
pub fn run_task_extractor(program: Option<&Path>, session_id: &str) -> TaskExtraction {
    let Some(program) = program else {
        debug!("task extractor not configured, skipping");
        return TaskExtraction::NotConfigured;
    };
    if !program.exists() {
        warn!("task extractor not found: {}", program.display());
        return TaskExtraction::Missing(program.to_path_buf());
    }
    match Command::new(program)
        .arg("--session")
        .arg(session_id)
        .output()
    {
        Ok(out) => {
            if !out.status.success() {
                warn!("task extractor exited with {}", out.status);
            }
            TaskExtraction::Ran {
                success: out.status.success(),
                stdout: String::from_utf8_lossy(&out.stdout).trim().to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            }
        }
        Err(e) => {
            error!("error running task extractor {}: {e}", program.display());
            TaskExtraction::Failed(e.to_string())
        }
    }
}

fn default_title(ai: AiType) -> String {
    let name = match ai {
        AiType::Claude => "Claude",
        AiType::Gemini => "Gemini",
    };
    format!("{name} Session - {}", timestamp::now_display())
}

// ===================================================================
// Hooks
// ===================================================================

pub struct Hooks<'a> {
    config: &'a Config,
    store: SessionStore,
    tracker: StateTracker,
    legacy: LegacyState,
}

impl<'a> Hooks<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            store: SessionStore::new(&config.sessions_dir),
            tracker: StateTracker::new(&config.state_dir),
            legacy: LegacyState::new(&config.config_dir),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    /// Start a session for this identity, or return the one already active.
    ///
    /// The tool defaults from the title, then to Claude.
    pub fn start(
        &self,
        title: Option<&str>,
        ai: Option<AiType>,
        cwd: &str,
        terminal_id: Option<&str>,
    ) -> Result<StartOutcome> {
        let ai = ai
            .or_else(|| title.and_then(AiType::from_title))
            .unwrap_or(AiType::Claude);

        self.tracker.reap_stale(self.config.stale_after);

        let _lock = self
            .tracker
            .lock_identity(ai, cwd, terminal_id, state::IDENTITY_LOCK_TIMEOUT)
            .context("locking session identity")?;

        if let Some(existing) = self.tracker.get(ai, cwd, terminal_id) {
            info!(
                "session already active for {ai} (terminal={terminal_id:?}, cwd={cwd}): {}",
                existing.session_id
            );
            return Ok(StartOutcome::Existing(existing));
        }

        let title = title.map_or_else(|| default_title(ai), str::to_string);
        let (session_id, _) = self
            .store
            .create(Some(&title))
            .context("creating session")?;

        let state = SessionState::new(
            session_id,
            ai,
            cwd,
            Some(title),
            terminal_id.map(str::to_string),
        );
        self.tracker.set(&state)?;
        info!(
            "started session {} ({ai}) terminal={terminal_id:?} cwd={cwd}",
            state.session_id
        );
        Ok(StartOutcome::Created(state))
    }

    /// Active session for this terminal, directory, or legacy file.
    pub fn resolve(&self, cwd: &str, terminal_id: Option<&str>) -> Option<ActiveSession> {
        if let Some(state) = self.tracker.find_active(cwd, terminal_id) {
            debug!("resolved session {} for cwd={cwd}", state.session_id);
            return Some(ActiveSession::Tracked(state));
        }
        let session_id = self.legacy.session_id()?;
        debug!("using legacy session state: {session_id}");
        Some(ActiveSession::Legacy {
            session_id,
            ai_type: self.legacy.ai_type(),
        })
    }

    /// Import, complete, extract tasks, then clear the tracker entry.
    ///
    /// Returns `None` when no session is active. Failures of the middle
    /// steps are recorded in the report and never skip the cleanup.
    pub fn stop(
        &self,
        ai_override: Option<AiType>,
        cwd: &str,
        terminal_id: Option<&str>,
    ) -> Option<StopReport> {
        let Some(session) = self.resolve(cwd, terminal_id) else {
            warn!("no active session to stop (terminal={terminal_id:?}, cwd={cwd})");
            return None;
        };
        let session_id = session.session_id().to_string();
        let ai = ai_override
            .or(session.ai_type())
            .unwrap_or(AiType::Claude);
        let import_cwd = match &session {
            ActiveSession::Tracked(s) => s.cwd.as_str(),
            ActiveSession::Legacy { .. } => cwd,
        };
        info!("stopping session {session_id} ({ai}) cwd={import_cwd}");

        let extractor = extract::for_ai(ai, self.config);
        let import = import_conversation(
            &self.store,
            &session_id,
            extractor.as_ref(),
            Some(import_cwd),
            self.config.message_limit,
        );
        if let Err(e) = &import {
            error!("failed to extract {} conversation: {e}", extractor.name());
        }

        let completed = self
            .store
            .set_status(&session_id, SessionStatus::Completed.as_str());
        let tasks = match &completed {
            Ok(_) => {
                info!("session completed: {session_id}");
                Some(run_task_extractor(
                    self.config.task_extractor.as_deref(),
                    &session_id,
                ))
            }
            Err(e) => {
                error!("error completing session {session_id}: {e}");
                None
            }
        };

        if let Err(e) = self.release(&session) {
            error!("failed to clear session state: {e:#}");
        }

        Some(StopReport {
            session,
            ai_type: ai,
            import,
            completed,
            tasks,
        })
    }

    fn release(&self, session: &ActiveSession) -> Result<()> {
        match session {
            ActiveSession::Tracked(s) => {
                self.tracker
                    .clear(s.ai_type, &s.cwd, s.terminal_id.as_deref())?;
            }
            ActiveSession::Legacy { .. } => self.legacy.clear()?,
        }
        Ok(())
    }

    /// Append one message to the active session. Returns its ID, or `None`
    /// when nothing is active.
    pub fn log(
        &self,
        role: &str,
        message: &str,
        cwd: &str,
        terminal_id: Option<&str>,
    ) -> Result<Option<String>> {
        let Some(session) = self.resolve(cwd, terminal_id) else {
            warn!("no active session for log");
            return Ok(None);
        };
        let id = session.session_id();
        self.store
            .add_log(id, message, role, false)
            .with_context(|| format!("adding log to session {id}"))?;
        Ok(Some(id.to_string()))
    }

    pub fn current(&self, cwd: &str, terminal_id: Option<&str>) -> Option<ActiveSession> {
        self.resolve(cwd, terminal_id)
    }

    pub fn list_active(&self) -> Vec<SessionState> {
        self.tracker.list_all()
    }

    pub fn cleanup(&self, max_age: Duration) -> usize {
        self.tracker.reap_stale(max_age)
    }
}
