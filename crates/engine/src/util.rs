//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Trim a required text field, rejecting blank values.
pub(crate) fn normalize_required(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field; blank values become `None`.
pub(crate) fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Logins are compared after NFC normalization so visually identical
/// strings map to the same account.
pub(crate) fn normalize_login(value: &str) -> ResultEngine<String> {
    let login = normalize_required(value, "login")?;
    Ok(login.nfc().collect())
}

/// Longest accepted recurrence period, in days.
pub(crate) const MAX_RECURRING_PERIOD_DAYS: i32 = 36_500;

/// Validate the recurrence fields of a transaction.
///
/// A recurring transaction needs a period in `1..=MAX_RECURRING_PERIOD_DAYS`;
/// a non-recurring one ignores both fields.
pub(crate) fn validate_recurrence(is_recurring: bool, period_days: Option<i32>) -> ResultEngine<()> {
    if !is_recurring {
        return Ok(());
    }
    match period_days {
        Some(days) if (1..=MAX_RECURRING_PERIOD_DAYS).contains(&days) => Ok(()),
        Some(days) => Err(EngineError::InvalidRecurrence(format!(
            "recurring_period_days must be between 1 and {MAX_RECURRING_PERIOD_DAYS}, got {days}"
        ))),
        None => Err(EngineError::InvalidRecurrence(
            "recurring_period_days is required for recurring transactions".to_string(),
        )),
    }
}
