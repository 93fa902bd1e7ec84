//! Field-level input checks shared by the services.

use crate::error::{FieldOpsError, FieldOpsResult};

/// Ten-digit mobile number starting with 6-9. Embedded spaces are ignored.
pub fn phone(value: &str) -> FieldOpsResult<String> {
    let digits: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let valid = digits.len() == 10
        && digits.chars().all(|c| c.is_ascii_digit())
        && matches!(digits.as_bytes()[0], b'6'..=b'9');
    if valid {
        Ok(digits)
    } else {
        Err(FieldOpsError::validation("Invalid phone number format"))
    }
}

/// Trimmed display name of 2 to 100 characters.
pub fn name(value: &str) -> FieldOpsResult<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if (2..=100).contains(&len) {
        Ok(trimmed.to_string())
    } else {
        Err(FieldOpsError::validation("Invalid name format"))
    }
}

/// Tenant business code: 3 to 20 ASCII alphanumerics, stored uppercase.
pub fn tenant_code(value: &str) -> FieldOpsResult<String> {
    let code = value.trim().to_ascii_uppercase();
    if (3..=20).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(code)
    } else {
        Err(FieldOpsError::validation("Invalid tenant code format"))
    }
}

pub fn password(value: &str, min_len: usize) -> FieldOpsResult<()> {
    if value.chars().count() >= min_len {
        Ok(())
    } else {
        Err(FieldOpsError::validation(format!(
            "Password must be at least {min_len} characters"
        )))
    }
}

pub fn non_negative(field: &str, value: f64) -> FieldOpsResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(FieldOpsError::validation(format!(
            "{field} must be a non-negative number"
        )))
    }
}
