use super::*;

fn mapping(pairs: &[(&str, Value)]) -> Mapping {
    let mut map = Mapping::new();
    for (k, v) in pairs {
        map.insert(Value::from(*k), v.clone());
    }
    map
}

fn strings(items: &[&str]) -> Value {
    Value::Sequence(items.iter().map(|s| Value::from(*s)).collect())
}

// =================================================================
// parse
// =================================================================

#[test]
fn parse_splits_header_and_body() {
    let content = "---\ntitle: Test\nstatus: active\n---\n# Body\n";
    let (fields, body) = parse(content);
    assert_eq!(get_text(&fields, "title").as_deref(), Some("Test"));
    assert_eq!(get_text(&fields, "status").as_deref(), Some("active"));
    assert_eq!(body, "# Body\n");
}

#[test]
fn parse_without_opening_delimiter_is_all_body() {
    let content = "# Just markdown\n---\nnot: yaml\n---\n";
    let (fields, body) = parse(content);
    assert!(fields.is_empty());
    assert_eq!(body, content);
}

#[test]
fn parse_without_closing_delimiter_is_all_body() {
    let content = "---\ntitle: Test\nno closing line";
    let (fields, body) = parse(content);
    assert!(fields.is_empty());
    assert_eq!(body, content);
}

#[test]
fn parse_malformed_yaml_keeps_body() {
    let content = "---\ntitle: [unclosed\n---\nbody survives\n";
    let (fields, body) = parse(content);
    assert!(fields.is_empty());
    assert_eq!(body, "body survives\n");
}

#[test]
fn parse_non_mapping_yaml_is_empty() {
    let (fields, body) = parse("---\n- a\n- b\n---\nbody");
    assert!(fields.is_empty());
    assert_eq!(body, "body");
}

#[test]
fn parse_empty_body() {
    let (fields, body) = parse("---\nversion: '1.0'\n---\n");
    assert_eq!(get_text(&fields, "version").as_deref(), Some("1.0"));
    assert_eq!(body, "");
}

// =================================================================
// serialize
// =================================================================

#[test]
fn serialize_keeps_insertion_order() {
    let fields = mapping(&[
        ("version", Value::from("1.0")),
        ("session_id", Value::from("abcd1234")),
        ("title", Value::from("Zeta")),
        ("created_at", Value::from("2025-01-01T00:00:00")),
    ]);
    let out = serialize(&fields, "body\n").unwrap();
    let version = out.find("version").unwrap();
    let session = out.find("session_id").unwrap();
    let title = out.find("title").unwrap();
    let created = out.find("created_at").unwrap();
    assert!(version < session && session < title && title < created, "{out}");
    assert!(out.starts_with("---\n"));
    assert!(out.ends_with("---\nbody\n"));
}

#[test]
fn serialize_quotes_version_as_string() {
    let fields = mapping(&[("version", Value::from("1.0"))]);
    let out = serialize(&fields, "").unwrap();
    let (parsed, _) = parse(&out);
    assert_eq!(parsed.get("version"), Some(&Value::from("1.0")));
}

// =================================================================
// round trip
// =================================================================

#[test]
fn round_trip_session_shaped_frontmatter() {
    let fields = mapping(&[
        ("version", Value::from("1.0")),
        ("session_id", Value::from("0a1b2c3d")),
        ("title", Value::from("Session: with colon & \"quotes\"")),
        ("status", Value::from("active")),
        ("tags", strings(&["rust", "yes", "123"])),
        ("imported_hashes", strings(&["00ff00ff00ff00ff"])),
    ]);
    let body = "\n# Session\n\n## Tasks\n- [ ] one\n\n## Conversation Log\n\n### 2025-01-01 00:00:00\n**User**: ---\n";
    let (parsed_fields, parsed_body) = parse(&serialize(&fields, body).unwrap());
    assert_eq!(parsed_fields, fields);
    assert_eq!(parsed_body, body);
}

#[test]
fn round_trip_nested_and_multiline_values() {
    let mut nested = Mapping::new();
    nested.insert(Value::from("depth"), Value::from(2));
    nested.insert(Value::from("flag"), Value::from(true));
    let fields = mapping(&[
        ("notes", Value::from("line one\n---\nline three")),
        ("nested", Value::Mapping(nested)),
        ("empty_list", Value::Sequence(vec![])),
        ("unicode", Value::from("セッション")),
    ]);
    let body = "free text without trailing newline";
    let (parsed_fields, parsed_body) = parse(&serialize(&fields, body).unwrap());
    assert_eq!(parsed_fields, fields);
    assert_eq!(parsed_body, body);
}

#[test]
fn round_trip_trailing_newline_in_last_value() {
    let fields = mapping(&[
        ("k", Value::from("trail\n")),
        ("l", strings(&["trail\n"])),
    ]);
    let body = "\n---\nbody\n";
    let (parsed_fields, parsed_body) = parse(&serialize(&fields, body).unwrap());
    assert_eq!(parsed_fields, fields);
    assert_eq!(parsed_body, body);

    let last_scalar = mapping(&[("notes", Value::from("kept\n\n"))]);
    let (parsed_fields, _) = parse(&serialize(&last_scalar, "").unwrap());
    assert_eq!(parsed_fields, last_scalar);
}

#[test]
fn round_trip_empty_mapping() {
    let out = serialize(&Mapping::new(), "body").unwrap();
    let (fields, body) = parse(&out);
    assert!(fields.is_empty());
    assert_eq!(body, "body");
}

// =================================================================
// accessors
// =================================================================

#[test]
fn set_str_replaces_in_place() {
    let mut fields = mapping(&[
        ("a", Value::from("1")),
        ("updated_at", Value::from("old")),
        ("z", Value::from("2")),
    ]);
    set_str(&mut fields, "updated_at", "new");
    let keys: Vec<&str> = fields.keys().filter_map(Value::as_str).collect();
    assert_eq!(keys, ["a", "updated_at", "z"]);
    assert_eq!(get_text(&fields, "updated_at").as_deref(), Some("new"));
}

#[test]
fn get_text_renders_scalars() {
    let fields = mapping(&[("n", Value::from(42)), ("list", strings(&["x"]))]);
    assert_eq!(get_text(&fields, "n").as_deref(), Some("42"));
    assert_eq!(get_text(&fields, "list"), None);
    assert_eq!(get_text(&fields, "missing"), None);
}
