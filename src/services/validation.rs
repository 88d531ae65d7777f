//! Form field checks shared by the services
//!
//! Lengths are counted in characters, after trimming.

/// Trim `value` and check that it holds `min..=max` characters.
///
/// Returns the trimmed value, or a message naming the field.
pub fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<String, String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();

    if len == 0 {
        return Err(format!("{} should not be blank.", field));
    }
    if len < min {
        return Err(format!(
            "{} is too short. It should have {} characters or more.",
            field, min
        ));
    }
    if len > max {
        return Err(format!(
            "{} is too long. It should have {} characters or less.",
            field, max
        ));
    }

    Ok(trimmed.to_string())
}

/// Like `check_length` for optional text: blank becomes `None`, anything
/// else may be at most `max` characters.
pub fn check_optional(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) if v.chars().count() > max => Err(format!(
            "{} is too long. It should have {} characters or less.",
            field, max
        )),
        Some(v) => Ok(Some(v.to_string())),
    }
}
