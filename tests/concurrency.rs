//! Several processes acting on the same files at once.

mod common;

use common::TestHome;
use std::process::{Child, Command, Stdio};

fn spawn(home: &TestHome, args: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_session-log"))
        .args(args)
        .current_dir(home.path())
        .env("HOME", home.path())
        .env("SESSION_LOG_DIR", home.path().join("sessions"))
        .env_remove("SESSION_LOG_CONFIG_DIR")
        .env_remove("CURSOR_TERMINAL_ID")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn binary")
}

#[test]
fn parallel_log_commands_lose_nothing() {
    let home = TestHome::new();
    let id = home.new_session("Busy");

    let children: Vec<Child> = (0..8)
        .map(|i| spawn(&home, &["log", &id, "-u", &format!("message number {i}")]))
        .collect();
    for child in children {
        let out = child.wait_with_output().unwrap();
        assert!(
            out.status.success(),
            "{}",
            String::from_utf8_lossy(&out.stderr)
        );
    }

    let content = home.session_file(&id);
    for i in 0..8 {
        assert!(
            content.contains(&format!("**User**: message number {i}")),
            "missing {i} in:\n{content}"
        );
    }
}

#[test]
fn parallel_hook_starts_create_one_session() {
    let home = TestHome::new();

    let children: Vec<Child> = (0..4)
        .map(|_| spawn(&home, &["hook", "start", "--cwd", "/shared"]))
        .collect();
    let outputs: Vec<String> = children
        .into_iter()
        .map(|c| String::from_utf8_lossy(&c.wait_with_output().unwrap().stdout).to_string())
        .collect();

    let started = outputs
        .iter()
        .filter(|o| o.starts_with("Session started: "))
        .count();
    assert_eq!(started, 1, "{outputs:?}");

    let (_, stdout, _) = home.run(&["list"]);
    assert_eq!(stdout.lines().count(), 3, "{stdout}");
}
