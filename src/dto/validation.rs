//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::scoring::HOLES_PER_ROUND;

const MAX_USERNAME_LENGTH: usize = 64;

/// Validates a player handle: 1 to 64 characters, no whitespace.
///
/// # Examples
///
/// ```ignore
/// validate_username("zoocat")    // Ok
/// validate_username("zoo cat")   // Err - whitespace
/// validate_username("")          // Err - empty
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LENGTH {
        let mut err = ValidationError::new("username_length");
        err.message = Some(
            format!("Username must be between 1 and {MAX_USERNAME_LENGTH} characters").into(),
        );
        return Err(err);
    }

    if username.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("username_format");
        err.message = Some("Username must not contain whitespace".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a score row has at most one cell per hole.
pub fn validate_score_row(row: &[String]) -> Result<(), ValidationError> {
    if row.len() > usize::from(HOLES_PER_ROUND) {
        let mut err = ValidationError::new("score_row_length");
        err.message = Some(
            format!(
                "A round has {HOLES_PER_ROUND} holes (got {} cells)",
                row.len()
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("zoocat").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("zoo cat").is_err());
        assert!(validate_username(&"a".repeat(65)).is_err());
    }

    #[test]
    fn score_rows_fit_in_a_round() {
        assert!(validate_score_row(&vec!["4".to_string(); 18]).is_ok());
        assert!(validate_score_row(&vec!["4".to_string(); 19]).is_err());
    }
}
