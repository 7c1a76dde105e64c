//! IMO ship identification number checks.
//!
//! An IMO number is seven digits where the last digit is a check digit: the
//! first six digits are multiplied by 7, 6, 5, 4, 3, 2 and the sum's last
//! digit must equal the seventh.

use crate::error::{Error, Result};

/// Validate an IMO number and return its seven digits.
///
/// Accepts an optional `IMO` prefix (any case) and surrounding whitespace.
///
/// # Errors
///
/// Returns a validation error if the input is not seven digits or the check
/// digit does not match.
pub fn validate_imo(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let digits = match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("imo") => trimmed[3..].trim_start(),
        _ => trimmed,
    };

    if digits.len() != 7 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::validation(format!(
            "IMO number must be 7 digits, got '{input}'"
        )));
    }

    let values: Vec<u32> = digits.bytes().map(|b| u32::from(b - b'0')).collect();
    let sum: u32 = values[..6]
        .iter()
        .zip((2..=7).rev())
        .map(|(digit, weight)| digit * weight)
        .sum();

    if sum % 10 != values[6] {
        return Err(Error::validation(format!(
            "IMO number {digits} fails its check digit"
        )));
    }

    Ok(digits.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_numbers() {
        assert_eq!(validate_imo("9074729").unwrap(), "9074729");
        assert_eq!(validate_imo("IMO 9074729").unwrap(), "9074729");
        assert_eq!(validate_imo("  imo9176187 ").unwrap(), "9176187");
    }

    #[test]
    fn test_bad_check_digit() {
        let err = validate_imo("9074720").unwrap_err();
        assert!(err.to_string().contains("check digit"));
    }

    #[test]
    fn test_wrong_length() {
        assert!(validate_imo("907472").is_err());
        assert!(validate_imo("90747290").is_err());
        assert!(validate_imo("").is_err());
    }

    #[test]
    fn test_non_digits() {
        assert!(validate_imo("90747a9").is_err());
        assert!(validate_imo("IMO-9074729").is_err());
    }
}
