//! Checkbox task list embedded in a session body.
//!
//! The body is free-form Markdown. Task lines are recognised purely by
//! their prefix (`- [ ] ` pending, `- [x] ` done) and numbered from 1 in
//! document order across the whole body, not only under `## Tasks`.

use crate::error::{Result, SessionError};
use crate::types::Task;

const TASKS_HEADER: &str = "## Tasks";
const PENDING: &str = "- [ ] ";
const DONE: &str = "- [x] ";

/// Classify one line (without its terminator).
fn checkbox(line: &str) -> Option<(bool, &str)> {
    if let Some(text) = line.strip_prefix(PENDING) {
        Some((false, text))
    } else {
        line.strip_prefix(DONE).map(|text| (true, text))
    }
}

fn content(line: &str) -> &str {
    line.strip_suffix('\n').unwrap_or(line)
}

/// Append an unchecked item to the `## Tasks` section.
///
/// The item goes right after the last checkbox line that directly follows
/// the header. Without a section, a new one is prepended to the body.
pub fn add(body: &str, text: &str) -> String {
    let item = format!("{PENDING}{text}\n");
    let lines: Vec<&str> = body.split_inclusive('\n').collect();

    let Some(header) = lines
        .iter()
        .position(|l| l.ends_with('\n') && content(l) == TASKS_HEADER)
    else {
        return format!("{TASKS_HEADER}\n{item}\n{body}");
    };

    let mut insert_at = header + 1;
    while let Some(line) = lines.get(insert_at) {
        if !line.ends_with('\n') || checkbox(content(line)).is_none() {
            break;
        }
        insert_at += 1;
    }

    let mut out = String::with_capacity(body.len() + item.len());
    for line in &lines[..insert_at] {
        out.push_str(line);
    }
    out.push_str(&item);
    for line in &lines[insert_at..] {
        out.push_str(line);
    }
    out
}

/// Mark task `task_num` (1-indexed over every checkbox line) as done.
///
/// Completing an already-done task leaves the body as it was. A number
/// past the last checkbox line is an error and nothing is modified.
pub fn complete(body: &str, task_num: usize) -> Result<String> {
    let mut seen = 0;
    let mut out = String::with_capacity(body.len());
    let mut found = false;

    for line in body.split_inclusive('\n') {
        if !found && checkbox(content(line)).is_some() {
            seen += 1;
            if seen == task_num {
                found = true;
                if let Some(rest) = line.strip_prefix(PENDING) {
                    out.push_str(DONE);
                    out.push_str(rest);
                    continue;
                }
            }
        }
        out.push_str(line);
    }

    if found {
        Ok(out)
    } else {
        Err(SessionError::TaskNotFound(task_num))
    }
}

/// Every checkbox line in the body, numbered from 1.
pub fn list(body: &str) -> Vec<Task> {
    body.lines()
        .filter_map(checkbox)
        .enumerate()
        .map(|(i, (done, text))| Task {
            num: i + 1,
            done,
            text: text.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests;
