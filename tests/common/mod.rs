#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Run the binary with `HOME` pointed at `home` and sessions under
/// `home/sessions`. Ambient configuration from the test runner is removed.
pub fn run_cli(home: &Path, args: &[&str], envs: &[(&str, &str)]) -> (i32, String, String) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_session-log"));
    cmd.args(args)
        .current_dir(home)
        .env("HOME", home)
        .env("SESSION_LOG_DIR", home.join("sessions"))
        .env_remove("SESSION_LOG_CONFIG_DIR")
        .env_remove("SESSION_LOG_LOG")
        .env_remove("CURSOR_TERMINAL_ID");
    for (key, value) in envs {
        cmd.env(key, value);
    }

    let output = cmd.output().expect("failed to spawn binary");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

/// An isolated home directory. Keep it alive for the whole test.
pub struct TestHome {
    dir: tempfile::TempDir,
}

impl TestHome {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn run(&self, args: &[&str]) -> (i32, String, String) {
        run_cli(self.path(), args, &[])
    }

    pub fn run_with(&self, args: &[&str], envs: &[(&str, &str)]) -> (i32, String, String) {
        run_cli(self.path(), args, envs)
    }

    pub fn config_dir(&self) -> PathBuf {
        self.path().join(".config").join("cli-session-log")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.config_dir().join("sessions")
    }

    /// Create a session and return its ID.
    pub fn new_session(&self, title: &str) -> String {
        let (code, stdout, stderr) = self.run(&["new", title]);
        assert_eq!(code, 0, "stderr: {stderr}");
        stdout
            .lines()
            .find_map(|l| l.strip_prefix("Created session: "))
            .expect("no session id in output")
            .trim()
            .to_string()
    }

    /// Write a Claude Code transcript for `cwd` with alternating user and
    /// assistant messages.
    pub fn write_claude_transcript(&self, cwd: &str, messages: &[&str]) -> PathBuf {
        let project = self
            .path()
            .join(".claude")
            .join("projects")
            .join(cwd.replace('/', "-"));
        fs::create_dir_all(&project).unwrap();
        let lines: Vec<String> = messages
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let value = if i % 2 == 0 {
                    serde_json::json!({
                        "type": "user",
                        "timestamp": "2025-01-01T00:00:00Z",
                        "message": { "role": "user", "content": text }
                    })
                } else {
                    serde_json::json!({
                        "type": "assistant",
                        "timestamp": "2025-01-01T00:00:01Z",
                        "message": { "role": "assistant", "content": [{ "type": "text", "text": text }] }
                    })
                };
                value.to_string()
            })
            .collect();
        let path = project.join("transcript.jsonl");
        fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    /// Read the single session file matching `id`.
    pub fn session_file(&self, id: &str) -> String {
        let sessions = self.path().join("sessions");
        for month in fs::read_dir(&sessions).unwrap().flatten() {
            let path = month.path().join(format!("session-{id}.md"));
            if path.exists() {
                return fs::read_to_string(path).unwrap();
            }
        }
        panic!("session {id} not found under {}", sessions.display());
    }
}
