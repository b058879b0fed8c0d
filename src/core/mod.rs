pub mod aggregation;
pub mod book;
pub mod entity;
pub mod lines;
pub mod money;
pub mod snapshots;
pub mod state;
pub mod validate;
pub mod warnings;

// Flat public surface for domain types and functions.
pub use aggregation::{
    generate_aggregation, included_names, top_countries, AggregationResult, AggregationSnapshot,
    CountryTotal, TopCountry,
};
pub use book::{Change, EntityBook};
pub use entity::{
    sub_row_label, ColumnData, ColumnKey, CountryEntry, Entity, EntityData, EntityId,
    EntityStatus, EntryId, LineData, UnknownColumn,
};
pub use lines::{line_description, IrsLine, PART_II_LINES};
pub use money::MoneyError;
pub use snapshots::{AggregationState, MAX_HISTORY};
pub use state::{AppState, EditOutcome, UiState};
pub use validate::ValidationError;
pub use warnings::{check_data_warnings, check_data_warnings_with, DataWarning, ScanOptions, Severity, WarningKind};
