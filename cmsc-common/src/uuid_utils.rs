//! Identifier utilities

use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new UUIDv4 rendered as a hyphenated string
///
/// Used for field identities sent to the backend.
pub fn generate_string() -> String {
    Uuid::new_v4().to_string()
}

/// Parse UUID from string
pub fn parse(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}

/// Whether a string looks like a backend-assigned record identifier
///
/// Backend identifiers are 24 hexadecimal characters.
pub fn looks_like_backend_id(s: &str) -> bool {
    s.len() == 24 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_string_parses_back() {
        let id = generate_string();
        assert!(parse(&id).is_ok());
    }

    #[test]
    fn test_backend_id_detection() {
        assert!(looks_like_backend_id("65a1f0c2b3d4e5f6a7b8c9d0"));
        assert!(!looks_like_backend_id("post-a"));
        assert!(!looks_like_backend_id("65a1f0c2b3d4e5f6a7b8c9d"));
        assert!(!looks_like_backend_id("zzzzzzzzzzzzzzzzzzzzzzzz"));
    }
}
