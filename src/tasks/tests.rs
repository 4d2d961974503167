use super::*;

const SKELETON: &str = "\n# Session: Test\n\n## Tasks\n\n## Conversation Log\n\n";

// =================================================================
// add
// =================================================================

#[test]
fn add_to_empty_section() {
    let body = add(SKELETON, "write docs");
    assert_eq!(
        body,
        "\n# Session: Test\n\n## Tasks\n- [ ] write docs\n\n## Conversation Log\n\n"
    );
}

#[test]
fn add_appends_after_existing_items() {
    let body = add(SKELETON, "first");
    let body = add(&body, "second");
    let body = add(&body, "third");
    let texts: Vec<String> = list(&body).into_iter().map(|t| t.text).collect();
    assert_eq!(texts, ["first", "second", "third"]);
    assert!(body.contains("- [ ] third\n\n## Conversation Log"));
}

#[test]
fn add_counts_done_items_as_part_of_section() {
    let body = "## Tasks\n- [x] done\n- [ ] open\n\nnotes\n";
    let body = add(body, "new");
    assert_eq!(body, "## Tasks\n- [x] done\n- [ ] open\n- [ ] new\n\nnotes\n");
}

#[test]
fn add_without_section_prepends_one() {
    let body = add("# Notes\nsome text\n", "new task");
    assert_eq!(body, "## Tasks\n- [ ] new task\n\n# Notes\nsome text\n");
}

#[test]
fn add_ignores_header_without_newline() {
    let body = add("intro\n## Tasks", "x");
    assert!(body.starts_with("## Tasks\n- [ ] x\n\n"), "{body}");
}

// =================================================================
// complete
// =================================================================

#[test]
fn complete_flips_nth_item() {
    let body = "## Tasks\n- [ ] a\n- [ ] b\n- [ ] c\n";
    let body = complete(body, 2).unwrap();
    assert_eq!(body, "## Tasks\n- [ ] a\n- [x] b\n- [ ] c\n");
}

#[test]
fn complete_numbers_across_done_items() {
    let body = "- [x] a\n- [ ] b\n";
    let body = complete(body, 2).unwrap();
    assert_eq!(body, "- [x] a\n- [x] b\n");
}

#[test]
fn complete_counts_checkboxes_outside_tasks_section() {
    let body = "## Tasks\n- [ ] a\n\n## Conversation Log\n**User**: hi\n- [ ] stray\n";
    let body = complete(body, 2).unwrap();
    assert!(body.ends_with("- [x] stray\n"));
    assert!(body.contains("- [ ] a\n"));
}

#[test]
fn complete_already_done_is_noop() {
    let body = "- [x] a\n";
    assert_eq!(complete(body, 1).unwrap(), body);
}

#[test]
fn complete_out_of_range_is_not_found() {
    let body = "## Tasks\n- [ ] only\n";
    let err = complete(body, 5).unwrap_err();
    assert!(matches!(err, SessionError::TaskNotFound(5)));
    assert!(complete(body, 0).is_err());
}

#[test]
fn complete_only_touches_marker() {
    let body = "- [ ] keep - [ ] inner text\n";
    assert_eq!(complete(body, 1).unwrap(), "- [x] keep - [ ] inner text\n");
}

#[test]
fn complete_last_line_without_newline() {
    let body = "## Tasks\n- [ ] tail";
    assert_eq!(complete(body, 1).unwrap(), "## Tasks\n- [x] tail");
}

// =================================================================
// list
// =================================================================

#[test]
fn list_reports_done_and_text() {
    let tasks = list("## Tasks\n- [ ] write docs\n- [x] ship it\n");
    assert_eq!(
        tasks,
        vec![
            Task { num: 1, done: false, text: "write docs".into() },
            Task { num: 2, done: true, text: "ship it".into() },
        ]
    );
}

#[test]
fn list_ignores_near_misses() {
    let tasks = list("-[ ] no space\n- [X] capital\n  - [ ] indented\n- [ ]no trailing space\n");
    assert!(tasks.is_empty(), "{tasks:?}");
}

#[test]
fn list_empty_body() {
    assert!(list("").is_empty());
    assert!(list(SKELETON).is_empty());
}
