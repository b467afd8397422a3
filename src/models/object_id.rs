use rand::{Rng, RngCore};
use regex::Regex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

/// Identifiers are 12 bytes rendered as 24 hex characters:
/// 4 bytes of unix seconds, 5 process-stable random bytes, 3 bytes of counter.
const COUNTER_MASK: u32 = 0x00FF_FFFF;

fn object_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{24}$").expect("object id pattern is a valid regex"))
}

fn process_unique() -> &'static [u8; 5] {
    static UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
    UNIQUE.get_or_init(|| {
        let mut bytes = [0u8; 5];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    })
}

fn counter() -> &'static AtomicU32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    COUNTER.get_or_init(|| AtomicU32::new(rand::thread_rng().gen::<u32>() & COUNTER_MASK))
}

/// Generates a fresh 24-character lowercase hex identifier.
pub fn generate_object_id() -> String {
    let seconds = chrono::Utc::now().timestamp() as u32;
    let count = counter().fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

    let mut bytes = [0u8; 12];
    bytes[0..4].copy_from_slice(&seconds.to_be_bytes());
    bytes[4..9].copy_from_slice(process_unique());
    bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..4]);
    hex::encode(bytes)
}

/// True when `id` has the document-database id shape (24 hex chars, any case).
pub fn is_valid_object_id(id: &str) -> bool {
    object_id_pattern().is_match(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_valid_and_unique() {
        let ids: HashSet<String> = (0..500).map(|_| generate_object_id()).collect();
        assert_eq!(ids.len(), 500);
        for id in &ids {
            assert_eq!(id.len(), 24);
            assert!(is_valid_object_id(id), "{} should be valid", id);
        }
    }

    #[test]
    fn rejects_malformed_ids() {
        for bad in ["", "123", "zzzzzzzzzzzzzzzzzzzzzzzz", "507f1f77bcf86cd79943901", "507f1f77bcf86cd7994390111", " 507f1f77bcf86cd799439011", "507f1f77-cf86cd799439011"] {
            assert!(!is_valid_object_id(bad), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn accepts_mixed_case_hex() {
        assert!(is_valid_object_id("507f1f77bcf86cd799439011"));
        assert!(is_valid_object_id("507F1F77BCF86CD799439011"));
    }
}
