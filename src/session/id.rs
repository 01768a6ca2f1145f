//! Session identifiers.

/// Length of generated identifiers. 32 symbols of a 64 symbol alphabet carry 192 bits.
pub const SESSION_ID_LENGTH: usize = 32;

/// Generates a fresh, URL and cookie safe session identifier.
pub fn generate_session_id() -> String {
    nanoid::format(nanoid::rngs::default, &nanoid::alphabet::SAFE, SESSION_ID_LENGTH)
}

/// Checks that a client presented identifier could have been generated by us.
///
/// Anything else is ignored without asking the store.
pub fn is_valid_session_id(id: &str) -> bool {
    id.len() == SESSION_ID_LENGTH && id.chars().all(|c| nanoid::alphabet::SAFE.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_valid_identifiers() {
        let id = generate_session_id();

        assert_eq!(id.len(), SESSION_ID_LENGTH);
        assert!(is_valid_session_id(&id));
    }

    #[test]
    fn never_repeats_identifiers() {
        assert_ne!(generate_session_id(), generate_session_id());
    }

    #[test]
    fn rejects_foreign_identifiers() {
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id("short"));
        assert!(!is_valid_session_id(&"/".repeat(SESSION_ID_LENGTH)));
        assert!(!is_valid_session_id(&"a".repeat(SESSION_ID_LENGTH + 1)));
    }
}
