//! Session records on disk.
//!
//! Sessions live at `<root>/<YYYY-MM>/session-<id>.md`. Every mutation runs
//! the same cycle under a per-file lock: re-read the file, transform it,
//! stamp `updated_at`, and replace it atomically. Reads take no lock and
//! return a snapshot.

use crate::dedup;
use crate::error::{Result, SessionError};
use crate::frontmatter;
use crate::storage::{self, FileLock};
use crate::tasks;
use crate::timestamp;
use crate::types::{SessionStatus, SessionSummary, Task};
use rand::RngCore;
use rand::rngs::OsRng;
use serde_yaml::{Mapping, Value};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// How long a mutation waits for another process to release a session.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(10);
pub const SCHEMA_VERSION: &str = "1.0";

const FILE_PREFIX: &str = "session-";
const FILE_SUFFIX: &str = ".md";

/// Fresh 8-character lowercase hex ID from the OS random source.
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; 4];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn session_file_name(id: &str) -> String {
    format!("{FILE_PREFIX}{id}{FILE_SUFFIX}")
}

fn is_session_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(FILE_PREFIX) && n.ends_with(FILE_SUFFIX))
}

fn modified(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

fn initial_body(title: &str) -> String {
    format!("\n# Session: {title}\n\n## Tasks\n\n## Conversation Log\n\n")
}

pub struct SessionStore {
    root: PathBuf,
    lock_timeout: Duration,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!("session store at {}", root.display());
        Self {
            root,
            lock_timeout: LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    // ---------------------------------------------------------------
    // Directory scanning
    // ---------------------------------------------------------------

    /// Month partitions, sorted by name ascending.
    fn month_dirs(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("cannot read sessions directory {}: {e}", self.root.display());
                }
                return Vec::new();
            }
        };
        let mut dirs: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        dirs
    }

    /// Session files directly inside `dir`, sorted by name ascending.
    fn session_files(dir: &Path) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_session_file(p))
            .collect();
        files.sort();
        files
    }

    // ---------------------------------------------------------------
    // Lookup and listing
    // ---------------------------------------------------------------

    /// Locate a session by full or partial ID.
    ///
    /// When several file stems contain `fragment`, the most recently
    /// modified one wins and a warning is logged.
    pub fn find(&self, fragment: &str) -> Option<PathBuf> {
        let mut matches: Vec<PathBuf> = self
            .month_dirs()
            .iter()
            .flat_map(|dir| Self::session_files(dir))
            .filter(|p| {
                p.file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|stem| stem.contains(fragment))
            })
            .collect();

        if matches.len() > 1 {
            let stems: Vec<String> = matches
                .iter()
                .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .collect();
            warn!("multiple sessions match ID '{fragment}': {stems:?}");
        }

        matches.sort_by_key(|p| modified(p));
        matches.pop()
    }

    fn require(&self, id: &str) -> Result<PathBuf> {
        self.find(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Summaries of every session, newest partition and file name first.
    ///
    /// Files that cannot be read are skipped with a warning.
    pub fn list(&self, status_filter: Option<&str>) -> Vec<SessionSummary> {
        let mut sessions = Vec::new();
        for dir in self.month_dirs().iter().rev() {
            for path in Self::session_files(dir).into_iter().rev() {
                let content = match fs::read_to_string(&path) {
                    Ok(c) => c,
                    Err(e) => {
                        warn!("failed to read session file {}: {e}", path.display());
                        continue;
                    }
                };
                let (fields, _) = frontmatter::parse(&content);
                let status = frontmatter::get_text(&fields, "status")
                    .unwrap_or_else(|| "unknown".to_string());
                if status_filter.is_some_and(|want| want != status) {
                    continue;
                }
                sessions.push(SessionSummary {
                    id: frontmatter::get_text(&fields, "session_id")
                        .unwrap_or_else(|| "unknown".to_string()),
                    title: frontmatter::get_text(&fields, "title")
                        .unwrap_or_else(|| "Untitled".to_string()),
                    status,
                    created_at: frontmatter::get_text(&fields, "created_at").unwrap_or_default(),
                    updated_at: frontmatter::get_text(&fields, "updated_at").unwrap_or_default(),
                    path,
                });
            }
        }
        sessions
    }

    // ---------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------

    /// Create a session in the current month's directory.
    pub fn create(&self, title: Option<&str>) -> Result<(String, PathBuf)> {
        let mut id = generate_session_id();
        while self.find(&id).is_some() {
            id = generate_session_id();
        }
        let title = match title {
            Some(t) => t.to_string(),
            None => format!("Session {id}"),
        };
        let now = timestamp::now_iso();

        let mut fields = Mapping::new();
        frontmatter::set_str(&mut fields, "version", SCHEMA_VERSION);
        frontmatter::set_str(&mut fields, "session_id", &id);
        frontmatter::set_str(&mut fields, "title", &title);
        frontmatter::set_str(&mut fields, "created_at", &now);
        frontmatter::set_str(&mut fields, "updated_at", &now);
        frontmatter::set_str(&mut fields, "status", SessionStatus::Active.as_str());
        fields.insert(Value::from("tags"), Value::Sequence(Vec::new()));
        dedup::clear(&mut fields);

        let month_dir = self.root.join(timestamp::current_month_dir());
        fs::create_dir_all(&month_dir).map_err(|e| SessionError::write(&month_dir, e))?;
        let path = month_dir.join(session_file_name(&id));

        let content = frontmatter::serialize(&fields, &initial_body(&title))
            .map_err(|e| SessionError::write(&path, io::Error::new(io::ErrorKind::InvalidData, e)))?;
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .and_then(|mut f| f.write_all(content.as_bytes()))
            .map_err(|e| SessionError::write(&path, e))?;

        info!("created session {id} at {}", path.display());
        Ok((id, path))
    }

    // ---------------------------------------------------------------
    // Locked read-modify-write
    // ---------------------------------------------------------------

    /// Run `f` on the current frontmatter and body under the session lock.
    ///
    /// `f` returns `None` to leave the file untouched. Otherwise
    /// `updated_at` is refreshed and the file is replaced.
    fn mutate<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Mapping, &mut String) -> Result<Option<T>>,
    ) -> Result<Option<T>> {
        let path = self.require(id)?;
        let _lock = FileLock::acquire(&storage::lock_path_for(&path), self.lock_timeout)?;

        let content = fs::read_to_string(&path).map_err(|e| SessionError::write(&path, e))?;
        let (mut fields, mut body) = frontmatter::parse(&content);

        let Some(out) = f(&mut fields, &mut body)? else {
            return Ok(None);
        };

        frontmatter::set_str(&mut fields, "updated_at", &timestamp::now_iso());
        let content = frontmatter::serialize(&fields, &body)
            .map_err(|e| SessionError::write(&path, io::Error::new(io::ErrorKind::InvalidData, e)))?;
        storage::write_atomic(&path, content.as_bytes())
            .map_err(|e| SessionError::write(&path, e))?;
        Ok(Some(out))
    }

    /// Append a timestamped conversation entry.
    ///
    /// With `check_duplicate`, the message hash is tested and recorded in
    /// the same locked cycle; a known message returns `false` and nothing
    /// is written.
    pub fn add_log(&self, id: &str, message: &str, role: &str, check_duplicate: bool) -> Result<bool> {
        let written = self.mutate(id, |fields, body| {
            if check_duplicate {
                let hash = dedup::message_hash(role, message);
                if dedup::contains(fields, &hash) {
                    debug!("skipping duplicate message {hash}");
                    return Ok(None);
                }
                dedup::record(fields, hash);
            }
            let entry = format!("\n### {}\n**{role}**: {message}\n", timestamp::now_display());
            let trimmed_len = body.trim_end().len();
            body.truncate(trimmed_len);
            body.push_str(&entry);
            body.push('\n');
            Ok(Some(()))
        })?;
        if written.is_some() {
            debug!("added {role} log to session {id}");
        }
        Ok(written.is_some())
    }

    pub fn add_task(&self, id: &str, text: &str) -> Result<()> {
        self.mutate(id, |_, body| {
            *body = tasks::add(body, text);
            Ok(Some(()))
        })?;
        debug!("added task to session {id}: {text}");
        Ok(())
    }

    pub fn complete_task(&self, id: &str, task_num: usize) -> Result<()> {
        self.mutate(id, |_, body| {
            *body = tasks::complete(body, task_num)?;
            Ok(Some(()))
        })?;
        debug!("completed task {task_num} in session {id}");
        Ok(())
    }

    pub fn list_tasks(&self, id: &str) -> Result<Vec<Task>> {
        let (_, body) = self.get(id)?;
        Ok(tasks::list(&body))
    }

    /// Change the session status, returning the previous value.
    ///
    /// The new value is validated before the store is touched.
    pub fn set_status(&self, id: &str, status: &str) -> Result<String> {
        let status: SessionStatus = status.parse()?;
        let old = self
            .mutate(id, |fields, _| {
                let old = frontmatter::get_text(fields, "status")
                    .unwrap_or_else(|| "unknown".to_string());
                frontmatter::set_str(fields, "status", status.as_str());
                Ok(Some(old))
            })?
            .unwrap_or_default();
        info!("changed session {id} status: {old} -> {status}");
        Ok(old)
    }

    /// Forget every recorded message hash so a transcript can be re-imported.
    pub fn clear_imported_hashes(&self, id: &str) -> Result<()> {
        self.mutate(id, |fields, _| {
            dedup::clear(fields);
            Ok(Some(()))
        })?;
        info!("cleared imported hashes for session {id}");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Unlocked reads
    // ---------------------------------------------------------------

    pub fn get(&self, id: &str) -> Result<(Mapping, String)> {
        let content = self.get_content(id)?;
        Ok(frontmatter::parse(&content))
    }

    pub fn get_content(&self, id: &str) -> Result<String> {
        let path = self.require(id)?;
        fs::read_to_string(&path).map_err(|e| SessionError::write(&path, e))
    }
}
