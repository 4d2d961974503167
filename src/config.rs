use crate::state::DEFAULT_STALE_AFTER;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const FILENAME: &str = "config.toml";

pub const ENV_SESSIONS_DIR: &str = "SESSION_LOG_DIR";
pub const ENV_CONFIG_DIR: &str = "SESSION_LOG_CONFIG_DIR";

const DEFAULT_MESSAGE_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine home directory")]
    NoHome,

    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("path '{}' is outside the home directory or contains '..'", path.display())]
    PathTraversal { path: PathBuf },
}

/// Optional settings read from `<config_dir>/config.toml`.
///
/// ```toml
/// sessions_dir = "~/notes/sessions"
/// task_extractor = "~/bin/extract-tasks"
/// stale_after_hours = 12
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    sessions_dir: Option<String>,
    #[serde(default)]
    claude_projects_dir: Option<String>,
    #[serde(default)]
    gemini_tmp_dir: Option<String>,
    #[serde(default)]
    task_extractor: Option<String>,
    #[serde(default)]
    stale_after_hours: Option<u64>,
    #[serde(default)]
    message_limit: Option<usize>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let file = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
                debug!("loaded config from {}", path.display());
                Ok(file)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no config file at {}", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Resolved settings, built once in `main` and passed down by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub home: PathBuf,
    pub config_dir: PathBuf,
    pub sessions_dir: PathBuf,
    /// Directory of per-identity state descriptors.
    pub state_dir: PathBuf,
    pub claude_projects_dir: PathBuf,
    pub gemini_tmp_dir: PathBuf,
    pub task_extractor: Option<PathBuf>,
    pub stale_after: Duration,
    pub message_limit: usize,
}

impl Config {
    /// Load from the real home directory and process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHome)?;
        Self::from_env(&home, |key| std::env::var(key).ok())
    }

    /// Resolve settings against `home`, reading variables through `env`.
    pub fn from_env(
        home: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let config_dir = match env(ENV_CONFIG_DIR) {
            Some(dir) => validate_path(&dir, home)?,
            None => home.join(".config").join("cli-session-log"),
        };
        let file = FileConfig::load(&config_dir.join(FILENAME))?;

        let sessions_dir = match env(ENV_SESSIONS_DIR).or(file.sessions_dir) {
            Some(dir) => validate_path(&dir, home)?,
            None => home
                .join(".local")
                .join("share")
                .join("cli-session-log")
                .join("sessions"),
        };
        let claude_projects_dir = match file.claude_projects_dir {
            Some(dir) => validate_path(&dir, home)?,
            None => home.join(".claude").join("projects"),
        };
        let gemini_tmp_dir = match file.gemini_tmp_dir {
            Some(dir) => validate_path(&dir, home)?,
            None => home.join(".gemini").join("tmp"),
        };
        let task_extractor = file
            .task_extractor
            .filter(|p| !p.trim().is_empty())
            .map(|p| expand_tilde(&p, home));

        Ok(Self {
            home: home.to_path_buf(),
            state_dir: config_dir.join("sessions"),
            config_dir,
            sessions_dir,
            claude_projects_dir,
            gemini_tmp_dir,
            task_extractor,
            stale_after: file
                .stale_after_hours
                .map_or(DEFAULT_STALE_AFTER, hours),
            message_limit: file.message_limit.unwrap_or(DEFAULT_MESSAGE_LIMIT),
        })
    }

    /// Override the sessions root, e.g. from `--dir`. Not validated.
    pub fn with_sessions_dir(mut self, dir: PathBuf) -> Self {
        self.sessions_dir = dir;
        self
    }
}

/// An age given in hours. Saturates instead of overflowing on huge input.
pub fn hours(h: u64) -> Duration {
    Duration::from_secs(h.saturating_mul(3600))
}

// ===================================================================
// Path validation
// ===================================================================

fn expand_tilde(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        home.to_path_buf()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(raw)
    }
}

/// Collapse `.` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Expand, absolutize and confine a configured directory to `home`.
pub fn validate_path(raw: &str, home: &Path) -> Result<PathBuf, ConfigError> {
    let expanded = expand_tilde(raw.trim(), home);
    if expanded
        .components()
        .any(|c| matches!(c, Component::ParentDir))
        || raw.contains("..")
    {
        return Err(ConfigError::PathTraversal { path: expanded });
    }
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
            path: expanded.clone(),
            source,
        })?;
        cwd.join(expanded)
    };
    let normalized = normalize(&absolute);
    if !normalized.starts_with(normalize(home)) {
        return Err(ConfigError::PathTraversal { path: normalized });
    }
    Ok(normalized)
}
