//! Monetary values: parsing, canonical formatting and input cleanup.
//!
//! Amounts are held as [`Decimal`] and stored at scale 4. Summation keeps the
//! full working precision of `Decimal`; rounding (half-up) happens only when a
//! value is normalized for storage or display.

use super::entity::ColumnData;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Number of fraction digits in the canonical stored form.
pub const SCALE: u32 = 4;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("invalid decimal value: {0:?}")]
    InvalidDecimal(String),
    #[error("decimal overflow while summing amounts")]
    Overflow,
}

/// Round half-up to [`SCALE`] places and pin the scale, so `1.5` becomes `1.5000`.
pub fn normalize(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded = Decimal::ZERO;
    }
    rounded.rescale(SCALE);
    rounded
}

/// [`normalize`], failing when the magnitude is too large to keep four places.
pub fn checked_normalize(value: Decimal) -> Result<Decimal, MoneyError> {
    let normalized = normalize(value);
    if normalized.scale() == SCALE {
        Ok(normalized)
    } else {
        Err(MoneyError::Overflow)
    }
}

/// Canonical string form: exactly four fraction digits.
pub fn format_amount(value: Decimal) -> String {
    normalize(value).to_string()
}

/// Parse a column value. Empty input and a lone `-` count as zero.
pub fn parse_amount(value: &str) -> Result<Decimal, MoneyError> {
    if value.is_empty() || value == "-" {
        return Ok(Decimal::ZERO);
    }
    parse_decimal(value).ok_or_else(|| MoneyError::InvalidDecimal(value.to_string()))
}

/// True for `""`, `"-"`, or anything [`parse_amount`] accepts.
pub fn is_valid_numeric(value: &str) -> bool {
    value.is_empty() || value == "-" || parse_decimal(value).is_some()
}

/// Sum with overflow checking at full precision.
pub fn checked_sum<I>(values: I) -> Result<Decimal, MoneyError>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or(MoneyError::Overflow)
}

/// Column g: the sum of a..f, in canonical form.
pub fn compute_derived_total(columns: &ColumnData) -> Result<String, MoneyError> {
    checked_sum(columns.amounts())
        .and_then(checked_normalize)
        .map(|v| v.to_string())
}

/// Foreign-source total: the sum of b..f (column a is U.S. source).
pub fn compute_foreign_source_total(columns: &ColumnData) -> Result<String, MoneyError> {
    checked_sum(columns.foreign_amounts())
        .and_then(checked_normalize)
        .map(|v| v.to_string())
}

/// Best-effort cleanup of typed input. Never fails.
///
/// Keeps only digits, `.` and `-`; extra dots are dropped (digits after them are
/// kept); when more than one `-` is present only a leading one survives.
pub fn sanitize_numeric_input(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let collapsed = match stripped.split_once('.') {
        Some((head, tail)) if tail.contains('.') => {
            format!("{}.{}", head, tail.replace('.', ""))
        }
        _ => stripped,
    };

    if collapsed.matches('-').count() > 1 {
        let digits = collapsed.replace('-', "");
        if collapsed.starts_with('-') {
            format!("-{}", digits)
        } else {
            digits
        }
    } else {
        collapsed
    }
}

/// Strict grammar: `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`
fn parse_decimal(value: &str) -> Option<Decimal> {
    let bytes = value.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;
    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }
    let mantissa_end = i;
    let mut has_exponent = false;
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
        has_exponent = true;
    }
    if i != bytes.len() {
        return None;
    }

    // rust_decimal rejects a bare trailing dot and an explicit '+'.
    let mantissa = value[..mantissa_end].trim_start_matches('+');
    let mantissa = mantissa.strip_suffix('.').unwrap_or(mantissa);
    let mantissa = match mantissa.strip_prefix("-.") {
        Some(rest) => format!("-0.{}", rest),
        None => match mantissa.strip_prefix('.') {
            Some(rest) => format!("0.{}", rest),
            None => mantissa.to_string(),
        },
    };

    let parsed = if has_exponent {
        let exponent = &value[mantissa_end + 1..];
        Decimal::from_scientific(&format!("{}e{}", mantissa, exponent)).ok()
    } else {
        Decimal::from_str(&mantissa).ok()
    };
    // out of range once it cannot be stored with four fraction digits
    parsed.filter(|d| checked_normalize(*d).is_ok())
}
