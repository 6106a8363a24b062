//! Field checks shared by request payload validation.

use crate::error::{KbError, Result};

/// `value` must be between `min` and `max` characters long.
pub(crate) fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        return Err(KbError::ValidationError(if min == 1 {
            format!("{} is required", field)
        } else {
            format!("{} must be at least {} characters", field, min)
        }));
    }
    if len > max {
        return Err(KbError::ValidationError(format!(
            "{} must not exceed {} characters",
            field, max
        )));
    }
    Ok(())
}

/// An optional `value`, when present, must be at most `max` characters long.
pub(crate) fn check_max(field: &str, value: Option<&str>, max: usize) -> Result<()> {
    match value {
        Some(value) => check_len(field, value, 0, max),
        None => Ok(()),
    }
}

/// An optional number, when present, must lie in `min..=max`.
pub(crate) fn check_range(field: &str, value: Option<f64>, min: f64, max: f64) -> Result<()> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(KbError::ValidationError(format!(
            "{} must be between {} and {}",
            field, min, max
        ))),
        _ => Ok(()),
    }
}

/// Normalize an optional text field: blank becomes `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_len() {
        assert!(check_len("name", "a", 1, 3).is_ok());
        assert!(check_len("name", "abc", 1, 3).is_ok());

        let err = check_len("name", "", 1, 3).unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: name is required");

        let err = check_len("name", "abcd", 1, 3).unwrap_err();
        assert!(err.to_string().contains("must not exceed 3"));
    }

    #[test]
    fn test_check_len_counts_characters() {
        assert!(check_len("name", "知识库", 1, 3).is_ok());
        assert!(check_len("name", "知识库名", 1, 3).is_err());
    }

    #[test]
    fn test_check_max() {
        assert!(check_max("cover", None, 5).is_ok());
        assert!(check_max("cover", Some(""), 5).is_ok());
        assert!(check_max("cover", Some("123456"), 5).is_err());
    }

    #[test]
    fn test_check_range() {
        assert!(check_range("top_p", None, 0.0, 1.0).is_ok());
        assert!(check_range("top_p", Some(1.0), 0.0, 1.0).is_ok());
        assert!(check_range("top_p", Some(-2.0), -2.0, 2.0).is_ok());

        let err = check_range("top_p", Some(1.5), 0.0, 1.0).unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: top_p must be between 0 and 1");
        assert!(check_range("top_p", Some(f64::NAN), 0.0, 1.0).is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(Some("x".to_string())), Some("x".to_string()));
    }
}
