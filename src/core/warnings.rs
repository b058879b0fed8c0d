//! Advisory data checks over one entity's line data.
//!
//! Findings never block a save or a status change.

use super::entity::{ColumnKey, EntityData, EntityId};
use super::validate::{is_value_negative, is_value_unusually_large};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const DEFAULT_LARGE_VALUE_THRESHOLD: Decimal = dec!(1000000000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Line present with no country rows
    EmptyLine,
    /// Country row whose columns a..f are all zero
    MissingData,
    /// Column magnitude above the configured threshold
    LargeValue,
    /// Column below zero
    NegativeValue,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WarningKind::EmptyLine => "empty_line",
            WarningKind::MissingData => "missing_data",
            WarningKind::LargeValue => "large_value",
            WarningKind::NegativeValue => "negative_value",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataWarning {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub message: String,
    pub entity_id: EntityId,
    pub line_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<ColumnKey>,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub large_value_threshold: Decimal,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            large_value_threshold: DEFAULT_LARGE_VALUE_THRESHOLD,
        }
    }
}

/// Scan with the default threshold
pub fn check_data_warnings(data: &EntityData) -> Vec<DataWarning> {
    check_data_warnings_with(data, &ScanOptions::default())
}

pub fn check_data_warnings_with(data: &EntityData, options: &ScanOptions) -> Vec<DataWarning> {
    let mut warnings = Vec::new();
    let mut push = |kind, line_number, column, severity, message: String| {
        warnings.push(DataWarning {
            id: Uuid::new_v4(),
            kind,
            message,
            entity_id: data.entity_id,
            line_number,
            column,
            severity,
        })
    };

    for (&line_number, line) in &data.lines {
        // unreachable through the book, which prunes empty lines
        if line.entries.is_empty() {
            push(
                WarningKind::EmptyLine,
                line_number,
                None,
                Severity::Info,
                format!("Line {} has no country entries", line_number),
            );
        }

        for entry in &line.entries {
            let columns = &entry.columns;
            if columns.amounts().iter().all(|v| v.is_zero()) {
                push(
                    WarningKind::MissingData,
                    line_number,
                    None,
                    Severity::Warning,
                    format!("Line {}, {}: All values are zero", line_number, entry.country),
                );
            }

            for key in ColumnKey::AMOUNTS {
                let Some(value) = columns.amount(key) else {
                    continue;
                };
                if is_value_unusually_large(value, options.large_value_threshold) {
                    push(
                        WarningKind::LargeValue,
                        line_number,
                        Some(key),
                        Severity::Warning,
                        format!(
                            "Line {}, {}, Column ({}): Unusually large value",
                            line_number, entry.country, key
                        ),
                    );
                }
                if is_value_negative(value) {
                    push(
                        WarningKind::NegativeValue,
                        line_number,
                        Some(key),
                        Severity::Info,
                        format!(
                            "Line {}, {}, Column ({}): Negative value",
                            line_number, entry.country, key
                        ),
                    );
                }
            }
        }
    }

    log::debug!(
        "{} data warnings for entity {}",
        warnings.len(),
        data.entity_id
    );
    warnings
}
