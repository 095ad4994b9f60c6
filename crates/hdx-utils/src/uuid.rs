use uuid::Uuid;

/// Checks whether a string is a canonical hyphenated UUID.
///
/// The string must parse as a UUID and be identical to the parsed value's
/// lowercase hyphenated form, so braced, urn or upper-case spellings are
/// rejected.
pub fn is_valid_uuid(value: &str) -> bool {
    match Uuid::parse_str(value) {
        Ok(uuid) => uuid.hyphenated().to_string() == value,
        Err(_) => false,
    }
}
