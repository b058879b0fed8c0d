//! Caller-facing input checks.
//!
//! These run before a data-model operation; the operations themselves assume
//! valid input. Nothing here blocks on advisory conditions (large or negative
//! amounts), see [`crate::core::warnings`] for those.

use super::entity::{ColumnKey, EntityId, EntryId, LineData};
use super::lines;
use rust_decimal::Decimal;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Entity name is required")]
    NameRequired,
    #[error("Entity name must be at least 2 characters")]
    NameTooShort,
    #[error("Entity identifier is required")]
    IdentifierRequired,
    #[error("Country name is required")]
    CountryRequired,
    #[error("{country} already exists on line {line_number}")]
    DuplicateCountry { country: String, line_number: u32 },
    #[error("Line {0} is not a Schedule K-2 Part II line")]
    UnknownLine(u32),
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),
    #[error("entry not found on line {line_number}: {entry_id}")]
    EntryNotFound { line_number: u32, entry_id: EntryId },
}

pub fn validate_entity_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::NameRequired);
    }
    if trimmed.chars().count() < 2 {
        return Err(ValidationError::NameTooShort);
    }
    Ok(())
}

pub fn validate_entity_identifier(identifier: &str) -> Result<(), ValidationError> {
    if identifier.trim().is_empty() {
        return Err(ValidationError::IdentifierRequired);
    }
    Ok(())
}

pub fn validate_line_number(line_number: u32) -> Result<(), ValidationError> {
    if lines::is_known_line(line_number) {
        Ok(())
    } else {
        Err(ValidationError::UnknownLine(line_number))
    }
}

/// A country may appear only once per entity per line (case-insensitive).
///
/// `exclude` skips the entry being renamed.
pub fn validate_country_uniqueness(
    line: Option<&LineData>,
    line_number: u32,
    country: &str,
    exclude: Option<EntryId>,
) -> Result<(), ValidationError> {
    if country.trim().is_empty() {
        return Err(ValidationError::CountryRequired);
    }
    let Some(line) = line else {
        return Ok(());
    };
    let wanted = country.to_lowercase();
    let duplicate = line
        .entries
        .iter()
        .filter(|entry| Some(entry.id) != exclude)
        .any(|entry| entry.country.to_lowercase() == wanted);
    if duplicate {
        Err(ValidationError::DuplicateCountry {
            country: country.to_string(),
            line_number,
        })
    } else {
        Ok(())
    }
}

/// Column g is never editable.
pub fn validate_column_editable(key: ColumnKey) -> bool {
    !key.is_derived()
}

pub fn is_value_unusually_large(value: Decimal, threshold: Decimal) -> bool {
    value.abs() > threshold
}

pub fn is_value_negative(value: Decimal) -> bool {
    value.is_sign_negative() && !value.is_zero()
}
