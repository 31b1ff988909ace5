//! Credential validation and display.

use crate::domain::error::CredentialError;

/// Normalises a token for storage.
///
/// # Errors
///
/// Returns [`CredentialError::EmptyToken`] for empty or whitespace-only input.
pub fn validate_token(token: &str) -> Result<String, CredentialError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(CredentialError::EmptyToken);
    }
    Ok(trimmed.to_string())
}

/// Renders a token for display: first and last four characters only.
///
/// Short tokens are fully hidden.
#[must_use]
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}
