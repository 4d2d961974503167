//! Which session is active for a given tool and terminal or directory.
//!
//! One JSON descriptor per active hook-driven session, named after its
//! identity key:
//!
//! - `{terminal}_{ai}.json` when a terminal ID is known
//! - `{ai}_{cwd}.json` otherwise, with path separators flattened
//!
//! Descriptors are replaced atomically; a file that fails to parse is
//! treated as absent and removed by [`StateTracker::reap_stale`].

use crate::error::Result;
use crate::storage::{self, FileLock};
use crate::timestamp;
use crate::types::AiType;
use anyhow::Context;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long `hook start` waits for a concurrent start on the same identity.
pub const IDENTITY_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Default age after which a descriptor is presumed orphaned.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

const STATE_EXT: &str = "json";

// ===================================================================
// Descriptor
// ===================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub ai_type: AiType,
    pub cwd: String,
    pub start_timestamp: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub terminal_id: Option<String>,
}

impl SessionState {
    /// Descriptor for a session starting now.
    pub fn new(
        session_id: impl Into<String>,
        ai_type: AiType,
        cwd: impl Into<String>,
        title: Option<String>,
        terminal_id: Option<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            ai_type,
            cwd: cwd.into(),
            start_timestamp: timestamp::now_iso(),
            title,
            terminal_id: terminal_id.filter(|t| !t.is_empty()),
        }
    }

    /// Time since `start_timestamp`, or `None` if it does not parse.
    fn age(&self) -> Option<chrono::Duration> {
        let started = timestamp::parse_timestamp(&self.start_timestamp)?;
        Some(Local::now().naive_local() - started)
    }
}

// ===================================================================
// Identity keys
// ===================================================================

/// Flatten a working directory into a file-name-safe token.
pub fn sanitize_cwd(cwd: &str) -> String {
    let flat: String = cwd
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    let trimmed = flat.trim_matches('_');
    if trimmed.is_empty() {
        "default".to_string()
    } else {
        trimmed.to_string()
    }
}

fn sanitize_terminal(terminal_id: &str) -> String {
    terminal_id
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect()
}

/// State file name for an (ai, cwd, terminal) triple.
pub fn state_file_name(ai: AiType, cwd: &str, terminal_id: Option<&str>) -> String {
    match terminal_id.filter(|t| !t.is_empty()) {
        Some(tid) => format!("{}_{ai}.{STATE_EXT}", sanitize_terminal(tid)),
        None => format!("{ai}_{}.{STATE_EXT}", sanitize_cwd(cwd)),
    }
}

// ===================================================================
// Tracker
// ===================================================================

pub struct StateTracker {
    dir: PathBuf,
}

impl StateTracker {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, ai: AiType, cwd: &str, terminal_id: Option<&str>) -> PathBuf {
        self.dir.join(state_file_name(ai, cwd, terminal_id))
    }

    fn read(path: &Path) -> Option<SessionState> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("failed to read state file {}: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("ignoring malformed state file {}: {e}", path.display());
                None
            }
        }
    }

    pub fn get(&self, ai: AiType, cwd: &str, terminal_id: Option<&str>) -> Option<SessionState> {
        Self::read(&self.path_for(ai, cwd, terminal_id))
    }

    /// Persist `state` under its identity key, replacing any previous file.
    pub fn set(&self, state: &SessionState) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.path_for(state.ai_type, &state.cwd, state.terminal_id.as_deref());
        let json = serde_json::to_string_pretty(state).context("serializing session state")?;
        storage::write_atomic(&path, json.as_bytes())
            .with_context(|| format!("writing {}", path.display()))?;
        debug!("saved state {} -> session {}", path.display(), state.session_id);
        Ok(())
    }

    /// Remove the descriptor for an identity. Absent files are not an error.
    pub fn clear(&self, ai: AiType, cwd: &str, terminal_id: Option<&str>) -> anyhow::Result<bool> {
        let path = self.path_for(ai, cwd, terminal_id);
        let removed = storage::remove_if_exists(&path)
            .with_context(|| format!("removing {}", path.display()))?;
        if removed {
            debug!("cleared state {}", path.display());
        }
        Ok(removed)
    }

    /// Active descriptor for this terminal, else for this directory.
    pub fn find_active(&self, cwd: &str, terminal_id: Option<&str>) -> Option<SessionState> {
        if let Some(tid) = terminal_id.filter(|t| !t.is_empty()) {
            for ai in AiType::ALL {
                if let Some(state) = self.get(ai, cwd, Some(tid)) {
                    return Some(state);
                }
            }
        }
        AiType::ALL
            .into_iter()
            .find_map(|ai| self.get(ai, cwd, None))
    }

    /// Paths of every descriptor file, sorted by name.
    fn state_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension().is_some_and(|ext| ext == STATE_EXT)
                    && !p
                        .file_name()
                        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
            })
            .collect();
        files.sort();
        files
    }

    /// Every parseable descriptor, whichever naming pattern it uses.
    pub fn list_all(&self) -> Vec<SessionState> {
        self.state_files()
            .iter()
            .filter_map(|p| Self::read(p))
            .collect()
    }

    /// Delete descriptors older than `max_age` or that cannot be parsed.
    pub fn reap_stale(&self, max_age: Duration) -> usize {
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let mut removed = 0;
        for path in self.state_files() {
            let reason = match Self::read(&path) {
                None => Some("unreadable".to_string()),
                Some(state) => match state.age() {
                    None => Some(format!("bad start_timestamp '{}'", state.start_timestamp)),
                    Some(age) if age > max_age => {
                        Some(format!("started {}h ago", age.num_hours()))
                    }
                    Some(_) => None,
                },
            };
            let Some(reason) = reason else { continue };
            match fs::remove_file(&path) {
                Ok(()) => {
                    warn!("removed stale session state {} ({reason})", path.display());
                    removed += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("failed to remove stale state {}: {e}", path.display()),
            }
        }
        if removed > 0 {
            info!("reaped {removed} stale session state file(s)");
        }
        removed
    }

    /// Serialize start-protocol decisions for one identity key.
    pub fn lock_identity(
        &self,
        ai: AiType,
        cwd: &str,
        terminal_id: Option<&str>,
        timeout: Duration,
    ) -> Result<FileLock> {
        let path = self.path_for(ai, cwd, terminal_id);
        FileLock::acquire(&storage::lock_path_for(&path), timeout)
    }
}

// ===================================================================
// Legacy single-session files
// ===================================================================

const LEGACY_SESSION_FILE: &str = "current_session.txt";
const LEGACY_AI_FILE: &str = "current_ai_type.txt";

/// The one-session-per-user files written by older versions.
///
/// Only read and removed, never written.
pub struct LegacyState {
    dir: PathBuf,
}

impl LegacyState {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read_trimmed(&self, name: &str) -> Option<String> {
        let text = fs::read_to_string(self.dir.join(name)).ok()?;
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    pub fn session_id(&self) -> Option<String> {
        self.read_trimmed(LEGACY_SESSION_FILE)
    }

    /// Recorded tool, if the file exists and names a known one.
    pub fn ai_type(&self) -> Option<AiType> {
        let raw = self.read_trimmed(LEGACY_AI_FILE)?;
        match raw.parse() {
            Ok(ai) => Some(ai),
            Err(e) => {
                warn!("ignoring legacy AI type: {e}");
                None
            }
        }
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        for name in [LEGACY_SESSION_FILE, LEGACY_AI_FILE] {
            let path = self.dir.join(name);
            storage::remove_if_exists(&path)
                .with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }
}
