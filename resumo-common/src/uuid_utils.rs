//! UUID utilities

use uuid::Uuid;

/// Generate a new UUIDv4 as the string form stored in the database
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}

/// Parse UUID from string
pub fn parse(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}

/// True if `s` is a well-formed UUID
pub fn is_valid(s: &str) -> bool {
    parse(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_parse() {
        let id = generate();
        assert!(is_valid(&id));
        assert_ne!(id, generate());
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert!(!is_valid("not-a-uuid"));
        assert!(!is_valid("../etc/passwd"));
    }
}
