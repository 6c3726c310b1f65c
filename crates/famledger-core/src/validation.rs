//! # Validation Module
//!
//! Field-level checks applied before a record is stored or pushed.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Record::validate() (THIS MODULE's rules)                     │
//! │  ├── Required fields, lengths, formats                                 │
//! │  └── Rejected before anything is written                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: SQLite                                                       │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Primary keys                                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Remote service                                               │
//! │  └── Authoritative; a rejection is a per-record push failure           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use famledger_core::validation::{validate_color, validate_currency};
//!
//! assert!(validate_currency("USD").is_ok());
//! assert!(validate_currency("usd").is_err());
//! assert!(validate_color("#1E88E5").is_ok());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest allowed budget/category name.
pub const MAX_NAME_LEN: usize = 100;

/// Longest allowed ledger note.
pub const MAX_NOTES_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

/// Rejects empty or whitespace-only values.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a display name (budget or category).
///
/// ## Rules
/// - Must not be empty
/// - At most [`MAX_NAME_LEN`] characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    validate_required(field, name)?;
    if name.trim().chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

pub fn validate_notes(notes: &str) -> ValidationResult<()> {
    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        });
    }
    Ok(())
}

/// Validates an ISO-4217 currency code: exactly three uppercase ASCII letters.
pub fn validate_currency(code: &str) -> ValidationResult<()> {
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: format!("'{}' is not a three-letter ISO-4217 code", code),
        });
    }
    Ok(())
}

/// Validates a `#RRGGBB` hex color.
///
/// ```rust
/// use famledger_core::validation::validate_color;
///
/// assert!(validate_color("#ff9800").is_ok());
/// assert!(validate_color("#FFF").is_err());
/// assert!(validate_color("FF9800").is_err());
/// ```
pub fn validate_color(color: &str) -> ValidationResult<()> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].bytes().all(|b| b.is_ascii_hexdigit());

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "color".to_string(),
            reason: format!("'{}' is not a #RRGGBB color", color),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Amounts and limits are stored unsigned in practice: must be > 0.
pub fn validate_amount_minor(field: &str, amount_minor: i64) -> ValidationResult<()> {
    if amount_minor <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

pub fn validate_percentage(field: &str, pct: u32) -> ValidationResult<()> {
    if pct > 100 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}
