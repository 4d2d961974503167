use super::{latest_by_mtime, tail, ExtractError, Extractor, Message, MESSAGE_TRUNCATE_LENGTH};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ===================================================================
// Transcript schema (the subset we read)
// ===================================================================

/// One line of a Claude Code `.jsonl` transcript, discriminated by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum TranscriptEntry {
    #[serde(rename = "user")]
    User(ConversationEntry),
    #[serde(rename = "assistant")]
    Assistant(ConversationEntry),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ConversationEntry {
    #[serde(default)]
    timestamp: String,
    message: TranscriptMessage,
}

#[derive(Debug, Deserialize)]
struct TranscriptMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Option<MessageContent>,
}

/// Plain string for typed user prompts, block array for assistant replies
/// and tool results.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

impl TranscriptEntry {
    fn into_message(self) -> Option<Message> {
        match self {
            TranscriptEntry::User(entry) => {
                if entry.message.role != "user" {
                    return None;
                }
                match entry.message.content? {
                    MessageContent::Text(text) if !text.is_empty() => {
                        Some(Message::user(text, entry.timestamp))
                    }
                    _ => None,
                }
            }
            TranscriptEntry::Assistant(entry) => {
                let MessageContent::Blocks(blocks) = entry.message.content? else {
                    return None;
                };
                let parts: Vec<String> = blocks
                    .into_iter()
                    .filter_map(|b| match b {
                        ContentBlock::Text { text } => Some(text),
                        ContentBlock::Other => None,
                    })
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(Message::ai(parts.join(" "), entry.timestamp))
                }
            }
            TranscriptEntry::Other => None,
        }
    }
}

// ===================================================================
// Extractor
// ===================================================================

/// Reads `~/.claude/projects/<project>/<session>.jsonl`.
pub struct ClaudeExtractor {
    projects_dir: PathBuf,
}

impl ClaudeExtractor {
    pub fn new(projects_dir: impl Into<PathBuf>) -> Self {
        let projects_dir = projects_dir.into();
        debug!("claude extractor at {}", projects_dir.display());
        Self { projects_dir }
    }

    /// Project directory names Claude Code may have used for `cwd`.
    fn project_dir_candidates(cwd: &str) -> Vec<String> {
        let dashed = cwd.replace('/', "-");
        let mut names = vec![dashed.clone()];
        if let Some(stripped) = dashed.strip_prefix('-') {
            names.push(stripped.to_string());
        }
        names
    }

    fn project_dir(&self, cwd: Option<&str>) -> Option<PathBuf> {
        match cwd {
            Some(cwd) => {
                let found = Self::project_dir_candidates(cwd)
                    .into_iter()
                    .map(|name| self.projects_dir.join(name))
                    .find(|p| p.is_dir());
                if found.is_none() {
                    debug!("no Claude project directory for {cwd}");
                }
                found
            }
            None => latest_by_mtime(&self.projects_dir, Path::is_dir),
        }
    }
}

impl Extractor for ClaudeExtractor {
    fn name(&self) -> &'static str {
        "Claude Code"
    }

    fn find_latest_session(&self, cwd: Option<&str>) -> Option<PathBuf> {
        if !self.projects_dir.is_dir() {
            debug!("Claude projects dir does not exist: {}", self.projects_dir.display());
            return None;
        }
        let project = self.project_dir(cwd)?;
        let latest = latest_by_mtime(&project, |p| {
            p.is_file() && p.extension().is_some_and(|e| e == "jsonl")
        });
        match &latest {
            Some(p) => debug!("found latest Claude session: {}", p.display()),
            None => debug!("no JSONL files in {}", project.display()),
        }
        latest
    }

    fn extract_messages(&self, path: &Path, limit: usize) -> Result<Vec<Message>, ExtractError> {
        let contents = fs::read_to_string(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut messages = Vec::new();
        let mut errors = 0usize;
        for (i, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<TranscriptEntry>(line) {
                Ok(entry) => {
                    if let Some(msg) = entry.into_message() {
                        messages.push(msg.truncate(MESSAGE_TRUNCATE_LENGTH));
                    }
                }
                Err(e) => {
                    errors += 1;
                    if errors <= 3 {
                        debug!("skipping line {} of {}: {e}", i + 1, path.display());
                    }
                }
            }
        }

        if errors > 0 {
            warn!("skipped {errors} undecodable line(s) in {}", path.display());
        }
        info!("extracted {} messages from Claude session {}", messages.len(), path.display());
        Ok(tail(messages, limit))
    }
}
