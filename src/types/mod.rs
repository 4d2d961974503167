use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ===================================================================
// Session status
// ===================================================================

/// Lifecycle status stored in a session's frontmatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
    Archived,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 4] = [
        SessionStatus::Active,
        SessionStatus::Paused,
        SessionStatus::Completed,
        SessionStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| SessionError::InvalidStatus(s.to_string()))
    }
}

// ===================================================================
// AI tool
// ===================================================================

/// The assistant a hook-driven session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AiType {
    Claude,
    Gemini,
}

impl AiType {
    /// Lookup order used when resolving descriptors across tools.
    pub const ALL: [AiType; 2] = [AiType::Claude, AiType::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Gemini => "gemini",
        }
    }

    /// Human-readable tool name used in progress output.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Claude => "Claude Code",
            Self::Gemini => "Gemini",
        }
    }

    /// Guess the tool from a free-text session title.
    pub fn from_title(title: &str) -> Option<Self> {
        let lower = title.to_lowercase();
        if lower.contains("gemini") {
            Some(Self::Gemini)
        } else if lower.contains("claude") {
            Some(Self::Claude)
        } else {
            None
        }
    }
}

impl fmt::Display for AiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ai| ai.as_str() == s.trim())
            .ok_or_else(|| format!("unknown AI type: {s}"))
    }
}

// ===================================================================
// Views returned by the store
// ===================================================================

/// One row of `SessionStore::list`.
///
/// Fields are copied verbatim from the frontmatter, so `status` may hold a
/// value outside [`SessionStatus`] if a file was edited by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub path: PathBuf,
}

/// A checkbox item from a session's task list, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub num: usize,
    pub done: bool,
    pub text: String,
}
