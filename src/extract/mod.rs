//! Conversation extractors for the assistants' own history files.
//!
//! Each tool keeps transcripts in its own format; an [`Extractor`] finds the
//! most recent one and turns it into a flat list of [`Message`]s that the
//! hook can append to a session.

mod claude;
mod gemini;

pub use claude::ClaudeExtractor;
pub use gemini::GeminiExtractor;

use crate::config::Config;
use crate::types::AiType;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info};

/// Maximum characters kept from one message.
pub const MESSAGE_TRUNCATE_LENGTH: usize = 1000;

pub const ROLE_USER: &str = "User";
pub const ROLE_AI: &str = "AI";

// ===================================================================
// Message
// ===================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// `User` or `AI`.
    pub role: String,
    pub content: String,
    pub timestamp: String,
}

impl Message {
    pub fn user(content: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            role: ROLE_USER.to_string(),
            content: content.into(),
            timestamp: timestamp.into(),
        }
    }

    pub fn ai(content: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            role: ROLE_AI.to_string(),
            content: content.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Keep at most `max_chars` characters of content.
    pub fn truncate(mut self, max_chars: usize) -> Self {
        if let Some((idx, _)) = self.content.char_indices().nth(max_chars) {
            self.content.truncate(idx);
        }
        self
    }
}

// ===================================================================
// Errors
// ===================================================================

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ===================================================================
// Extractor capability
// ===================================================================

pub trait Extractor {
    /// Name used in progress output, e.g. "Claude Code".
    fn name(&self) -> &'static str;

    /// Most recent transcript, optionally scoped to a working directory.
    fn find_latest_session(&self, cwd: Option<&str>) -> Option<PathBuf>;

    /// The last `limit` messages of a transcript, each truncated to
    /// [`MESSAGE_TRUNCATE_LENGTH`] characters.
    fn extract_messages(&self, path: &Path, limit: usize) -> Result<Vec<Message>, ExtractError>;

    /// Messages from the latest transcript, or none if there is no transcript.
    fn extract_latest(&self, limit: usize, cwd: Option<&str>) -> Result<Vec<Message>, ExtractError> {
        match self.find_latest_session(cwd) {
            Some(path) => {
                debug!("extracting from latest session: {}", path.display());
                self.extract_messages(&path, limit)
            }
            None => {
                info!("no {} session found for cwd: {}", self.name(), cwd.unwrap_or("(any)"));
                Ok(Vec::new())
            }
        }
    }
}

/// Extractor for `ai`, rooted at the directories named in `config`.
pub fn for_ai(ai: AiType, config: &Config) -> Box<dyn Extractor> {
    match ai {
        AiType::Claude => Box::new(ClaudeExtractor::new(&config.claude_projects_dir)),
        AiType::Gemini => Box::new(GeminiExtractor::new(&config.gemini_tmp_dir)),
    }
}

// ---------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------

fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Entry of `dir` accepted by `keep` with the newest modification time.
pub(crate) fn latest_by_mtime(dir: &Path, keep: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| keep(p))
        .filter_map(|p| mtime(&p).map(|t| (t, p)))
        .max_by_key(|(t, _)| *t)
        .map(|(_, p)| p)
}

/// Keep the last `limit` items.
fn tail<T>(mut items: Vec<T>, limit: usize) -> Vec<T> {
    if items.len() > limit {
        items.drain(..items.len() - limit);
    }
    items
}
