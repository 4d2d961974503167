use super::{latest_by_mtime, tail, ExtractError, Extractor, Message, MESSAGE_TRUNCATE_LENGTH};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct SessionFile {
    #[serde(default)]
    messages: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GeminiMessage {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    content: serde_json::Value,
    #[serde(default)]
    timestamp: String,
}

impl GeminiMessage {
    fn into_message(self) -> Option<Message> {
        let content = match self.content {
            serde_json::Value::String(s) if !s.is_empty() => s,
            _ => return None,
        };
        match self.kind.as_str() {
            "user" => Some(Message::user(content, self.timestamp)),
            "model" => Some(Message::ai(content, self.timestamp)),
            _ => None,
        }
    }
}

/// Reads `~/.gemini/tmp/<project-hash>/chats/session-*.json`.
pub struct GeminiExtractor {
    tmp_dir: PathBuf,
}

fn is_session_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("session-") && n.ends_with(".json"))
}

impl GeminiExtractor {
    pub fn new(tmp_dir: impl Into<PathBuf>) -> Self {
        let tmp_dir = tmp_dir.into();
        debug!("gemini extractor at {}", tmp_dir.display());
        Self { tmp_dir }
    }

    /// Gemini names each project directory after the SHA-256 of its root path.
    pub fn project_hash(cwd: &str) -> String {
        hex::encode(Sha256::digest(cwd.as_bytes()))
    }

    fn latest_in_project(project: &Path) -> Option<PathBuf> {
        latest_by_mtime(&project.join("chats"), is_session_file)
    }

    fn latest_anywhere(&self) -> Option<PathBuf> {
        let entries = fs::read_dir(&self.tmp_dir).ok()?;
        entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.join("chats").is_dir())
            .filter_map(|p| Self::latest_in_project(&p))
            .filter_map(|p| {
                let t = fs::metadata(&p).and_then(|m| m.modified()).ok()?;
                Some((t, p))
            })
            .max_by_key(|(t, _): &(SystemTime, PathBuf)| *t)
            .map(|(_, p)| p)
    }
}

impl Extractor for GeminiExtractor {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    fn find_latest_session(&self, cwd: Option<&str>) -> Option<PathBuf> {
        if !self.tmp_dir.is_dir() {
            debug!("Gemini tmp dir does not exist: {}", self.tmp_dir.display());
            return None;
        }
        if let Some(cwd) = cwd {
            let project = self.tmp_dir.join(Self::project_hash(cwd));
            if let Some(found) = Self::latest_in_project(&project) {
                debug!("found Gemini session for {cwd}: {}", found.display());
                return Some(found);
            }
            debug!("no Gemini project for {cwd}, searching all projects");
        }
        self.latest_anywhere()
    }

    fn extract_messages(&self, path: &Path, limit: usize) -> Result<Vec<Message>, ExtractError> {
        let contents = fs::read_to_string(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: SessionFile =
            serde_json::from_str(&contents).map_err(|source| ExtractError::InvalidJson {
                path: path.to_path_buf(),
                source,
            })?;

        let serde_json::Value::Array(raw) = file.messages else {
            warn!("unexpected messages format in {}", path.display());
            return Ok(Vec::new());
        };

        let messages: Vec<Message> = raw
            .into_iter()
            .filter_map(|v| serde_json::from_value::<GeminiMessage>(v).ok())
            .filter_map(GeminiMessage::into_message)
            .map(|m| m.truncate(MESSAGE_TRUNCATE_LENGTH))
            .collect();

        info!("extracted {} messages from Gemini session {}", messages.len(), path.display());
        Ok(tail(messages, limit))
    }
}
