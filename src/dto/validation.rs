//! Validation helpers shared by DTOs and the integrity layer.

use std::collections::HashSet;

use validator::ValidationError;

/// Exact length of a catalog track identifier.
pub const CATALOG_ID_LEN: usize = 22;

/// Validates that a catalog id is exactly 22 ASCII alphanumeric characters.
///
/// # Examples
///
/// ```ignore
/// validate_catalog_id("4uLU6hMCjMI75M1A2tKUQC") // Ok
/// validate_catalog_id("4uLU6hMCjMI75M1A2tKUQ")  // Err - too short
/// validate_catalog_id("4uLU6hMCjMI75M1A2tKU-C") // Err - not alphanumeric
/// ```
pub fn validate_catalog_id(id: &str) -> Result<(), ValidationError> {
    if id.len() != CATALOG_ID_LEN {
        let mut err = ValidationError::new("catalog_id_length");
        err.message = Some(
            format!(
                "Song ID must be exactly {CATALOG_ID_LEN} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("catalog_id_format");
        err.message = Some("Song ID must contain only ASCII letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates every id of a song list and rejects ids listed twice.
pub fn validate_song_list(songs: &[String]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(songs.len());
    for id in songs {
        validate_catalog_id(id)?;
        if !seen.insert(id.as_str()) {
            let mut err = ValidationError::new("song_duplicate");
            err.message = Some(format!("Song `{id}` is listed more than once").into());
            return Err(err);
        }
    }
    Ok(())
}

/// Validates every id of a list without rejecting repeats.
pub fn validate_catalog_ids(ids: &[String]) -> Result<(), ValidationError> {
    ids.iter().try_for_each(|id| validate_catalog_id(id))
}

/// Validates a display label (game name or nickname): 1 to 50 characters once trimmed.
pub fn validate_label(value: &str) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if !(1..=50).contains(&len) {
        let mut err = ValidationError::new("label_length");
        err.message = Some(format!("Must be between 1 and 50 characters (got {len})").into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_catalog_id_valid() {
        assert!(validate_catalog_id("4uLU6hMCjMI75M1A2tKUQC").is_ok());
        assert!(validate_catalog_id("0000000000000000000000").is_ok());
        assert!(validate_catalog_id("abcdefghijABCDEFGHIJ12").is_ok());
    }

    #[test]
    fn test_validate_catalog_id_invalid_length() {
        assert!(validate_catalog_id("4uLU6hMCjMI75M1A2tKUQ").is_err()); // too short
        assert!(validate_catalog_id("4uLU6hMCjMI75M1A2tKUQCx").is_err()); // too long
        assert!(validate_catalog_id("").is_err());
    }

    #[test]
    fn test_validate_catalog_id_invalid_format() {
        assert!(validate_catalog_id("4uLU6hMCjMI75M1A2tKU-C").is_err());
        assert!(validate_catalog_id("4uLU6hMCjMI75M1A2tKU C").is_err());
        // Multi-byte characters must not sneak past the length check.
        assert!(validate_catalog_id("4uLU6hMCjMI75M1A2tKUé").is_err());
    }

    #[test]
    fn test_validate_song_list_rejects_duplicates() {
        let id = "4uLU6hMCjMI75M1A2tKUQC".to_string();
        assert!(validate_song_list(std::slice::from_ref(&id)).is_ok());
        assert!(validate_song_list(&[id.clone(), id]).is_err());
    }

    #[test]
    fn test_validate_label_bounds() {
        assert!(validate_label("Ace").is_ok());
        assert!(validate_label(&"x".repeat(50)).is_ok());
        assert!(validate_label("   ").is_err());
        assert!(validate_label(&"x".repeat(51)).is_err());
    }
}
