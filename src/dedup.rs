//! Content-hash ledger that keeps imported messages from being logged twice.
//!
//! The ledger is the `imported_hashes` list in a session's frontmatter.

use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};

pub const LEDGER_KEY: &str = "imported_hashes";
/// Hex characters kept from the digest.
const HASH_LEN: usize = 16;

/// Dedup token for a message: truncated lowercase SHA-256 of `role:content`.
pub fn message_hash(role: &str, content: &str) -> String {
    let digest = Sha256::digest(format!("{role}:{content}").as_bytes());
    hex::encode(&digest[..HASH_LEN / 2])
}

/// Whether `hash` is already recorded in the ledger.
pub fn contains(fields: &Mapping, hash: &str) -> bool {
    fields
        .get(LEDGER_KEY)
        .and_then(Value::as_sequence)
        .is_some_and(|seq| seq.iter().any(|v| v.as_str() == Some(hash)))
}

/// Append `hash` to the ledger, creating the list if needed.
pub fn record(fields: &mut Mapping, hash: String) {
    if let Some(Value::Sequence(seq)) = fields.get_mut(LEDGER_KEY) {
        seq.push(Value::String(hash));
        return;
    }
    fields.insert(
        Value::from(LEDGER_KEY),
        Value::Sequence(vec![Value::String(hash)]),
    );
}

/// Reset the ledger to an empty list.
pub fn clear(fields: &mut Mapping) {
    fields.insert(Value::from(LEDGER_KEY), Value::Sequence(Vec::new()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_short() {
        let a = message_hash("User", "hello");
        let b = message_hash("User", "hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn hash_matches_sha256_prefix() {
        // sha256("User:hello")
        let full = hex::encode(Sha256::digest(b"User:hello"));
        assert_eq!(message_hash("User", "hello"), full[..16]);
    }

    #[test]
    fn role_is_part_of_the_hash() {
        assert_ne!(message_hash("User", "same"), message_hash("AI", "same"));
    }

    #[test]
    fn record_then_contains() {
        let mut fields = Mapping::new();
        assert!(!contains(&fields, "abc"));
        record(&mut fields, "abc".into());
        record(&mut fields, "def".into());
        assert!(contains(&fields, "abc"));
        assert!(contains(&fields, "def"));
        let seq = fields.get(LEDGER_KEY).and_then(Value::as_sequence).unwrap();
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn record_replaces_non_list_ledger() {
        let mut fields = Mapping::new();
        fields.insert(Value::from(LEDGER_KEY), Value::from("corrupt"));
        record(&mut fields, "abc".into());
        assert!(contains(&fields, "abc"));
    }

    #[test]
    fn clear_empties_ledger() {
        let mut fields = Mapping::new();
        record(&mut fields, "abc".into());
        clear(&mut fields);
        assert!(!contains(&fields, "abc"));
        assert_eq!(
            fields.get(LEDGER_KEY),
            Some(&Value::Sequence(Vec::new()))
        );
    }
}
