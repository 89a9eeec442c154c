use crate::error::{DomainError, DomainResult};

/// Trim and require a non-empty value of at most `max_len` characters.
pub fn required_text(field: &str, value: &str, max_len: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_len {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Like [`required_text`] but blank input becomes `None`.
pub fn optional_text(field: &str, value: Option<&str>, max_len: usize) -> DomainResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required_text(field, v, max_len).map(Some),
    }
}

/// Uppercase business code: `[A-Z0-9_-]`, 1..=32 characters.
pub fn normalize_code(field: &str, value: &str) -> DomainResult<String> {
    let code = value.trim().to_ascii_uppercase();
    if code.is_empty() || code.len() > 32 {
        return Err(DomainError::validation(format!("{field} must be 1-32 characters")));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(DomainError::validation(format!(
            "{field} may only contain letters, digits, '-' and '_'"
        )));
    }
    Ok(code)
}

/// Case-insensitive substring match of `keyword` against any of `fields`.
/// A missing or blank keyword matches everything.
pub fn matches_keyword(keyword: Option<&str>, fields: &[&str]) -> bool {
    match keyword.map(str::trim) {
        None | Some("") => true,
        Some(k) => {
            let needle = k.to_lowercase();
            fields.iter().any(|f| f.to_lowercase().contains(&needle))
        }
    }
}
