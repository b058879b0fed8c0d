//! Application state: the entity book, the aggregation state and UI
//! preferences, mutated together.
//!
//! Every line-data mutation goes through [`AppState`], which invalidates the
//! current snapshot in the same call. This is also the shape persisted to
//! the key-value store.

use super::aggregation::{self, AggregationSnapshot};
use super::book::{Change, EntityBook};
use super::entity::{ColumnKey, EntityId, EntityStatus, EntryId};
use super::money::{self, MoneyError};
use super::snapshots::AggregationState;
use super::validate::{self, ValidationError};
use chrono::{Datelike, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Presentation preferences persisted alongside the data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    #[serde(default)]
    pub selected_entity_id: Option<EntityId>,
    #[serde(default)]
    pub selected_line_number: Option<u32>,
    #[serde(default)]
    pub is_generating_report: bool,
    pub tax_year: i32,
}

impl Default for UiState {
    fn default() -> Self {
        UiState {
            selected_entity_id: None,
            selected_line_number: None,
            is_generating_report: false,
            tax_year: Utc::now().year(),
        }
    }
}

/// Result of a guarded column edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    /// Input failed the numeric gate; the previous value is kept
    Dropped,
    /// Derived column, or the row does not exist
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AppState {
    #[serde(default)]
    entities: EntityBook,
    #[serde(default)]
    aggregation: AggregationState,
    #[serde(default)]
    ui: UiState,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from loaded parts, restoring invariants the store cannot enforce.
    pub fn from_parts(entities: EntityBook, aggregation: AggregationState, ui: UiState) -> Self {
        let mut state = AppState {
            entities,
            aggregation,
            ui,
        };
        state.reconcile();
        state
    }

    pub fn entities(&self) -> &EntityBook {
        &self.entities
    }

    pub fn aggregation(&self) -> &AggregationState {
        &self.aggregation
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    /// Wholesale replacement, as on initial load or a broadcast from another context.
    pub fn replace(&mut self, mut other: AppState) {
        other.reconcile();
        *self = other;
    }

    pub(crate) fn reconcile(&mut self) {
        self.entities.reconcile();
        self.aggregation.reconcile();
        if let Some(id) = self.ui.selected_entity_id {
            if self.entities.entity(id).is_none() {
                self.ui.selected_entity_id = None;
            }
        }
    }

    pub fn create_entity(&mut self, name: &str, identifier: &str) -> Result<EntityId, ValidationError> {
        validate::validate_entity_name(name)?;
        validate::validate_entity_identifier(identifier)?;
        Ok(self.entities.create_entity(name.trim(), identifier.trim()))
    }

    pub fn update_entity(
        &mut self,
        id: EntityId,
        name: &str,
        identifier: &str,
    ) -> Result<Change, ValidationError> {
        validate::validate_entity_name(name)?;
        validate::validate_entity_identifier(identifier)?;
        let change = self
            .entities
            .update_entity_metadata(id, name.trim(), identifier.trim());
        Ok(self.apply(change))
    }

    pub fn delete_entity(&mut self, id: EntityId) -> Change {
        let change = self.entities.delete_entity(id);
        if self.ui.selected_entity_id == Some(id) {
            self.ui.selected_entity_id = None;
            self.ui.selected_line_number = None;
        }
        self.apply(change)
    }

    pub fn set_entity_status(&mut self, id: EntityId, status: EntityStatus) -> Change {
        let change = self.entities.set_entity_status(id, status);
        self.apply(change)
    }

    /// Add a country row after checking the line number and the
    /// case-insensitive uniqueness of `country` on that line.
    pub fn add_country(
        &mut self,
        entity_id: EntityId,
        line_number: u32,
        country: &str,
    ) -> Result<EntryId, ValidationError> {
        if self.entities.entity(entity_id).is_none() {
            return Err(ValidationError::EntityNotFound(entity_id));
        }
        validate::validate_line_number(line_number)?;
        let country = country.trim();
        validate::validate_country_uniqueness(
            self.entities.line(entity_id, line_number),
            line_number,
            country,
            None,
        )?;
        let entry_id = self
            .entities
            .add_country_entry(entity_id, line_number, country)
            .ok_or(ValidationError::EntityNotFound(entity_id))?;
        self.apply(Change::LineData);
        Ok(entry_id)
    }

    pub fn rename_country(
        &mut self,
        entity_id: EntityId,
        line_number: u32,
        entry_id: EntryId,
        country: &str,
    ) -> Result<Change, ValidationError> {
        let line = self.entities.line(entity_id, line_number);
        if line.and_then(|l| l.entry(entry_id)).is_none() {
            return Err(ValidationError::EntryNotFound {
                line_number,
                entry_id,
            });
        }
        let country = country.trim();
        validate::validate_country_uniqueness(line, line_number, country, Some(entry_id))?;
        let change = self
            .entities
            .rename_country_entry(entity_id, line_number, entry_id, country);
        Ok(self.apply(change))
    }

    pub fn delete_country(&mut self, entity_id: EntityId, line_number: u32, entry_id: EntryId) -> Change {
        let change = self
            .entities
            .delete_country_entry(entity_id, line_number, entry_id);
        self.apply(change)
    }

    /// Edit one column from raw user input.
    ///
    /// Amount input is sanitized then gated by [`money::is_valid_numeric`];
    /// input that fails the gate is dropped and the prior value retained.
    /// The category code is stored as typed.
    pub fn edit_column(
        &mut self,
        entity_id: EntityId,
        line_number: u32,
        entry_id: EntryId,
        key: ColumnKey,
        raw: &str,
    ) -> Result<EditOutcome, MoneyError> {
        if !validate::validate_column_editable(key) {
            return Ok(EditOutcome::Ignored);
        }
        let value = if key == ColumnKey::ECategory {
            raw.to_string()
        } else {
            let sanitized = money::sanitize_numeric_input(raw);
            if !money::is_valid_numeric(&sanitized) {
                log::debug!("dropped invalid input {:?} for column {}", raw, key);
                return Ok(EditOutcome::Dropped);
            }
            sanitized
        };
        let change = self
            .entities
            .update_column_value(entity_id, line_number, entry_id, key, &value)?;
        Ok(match self.apply(change) {
            Change::Unchanged => EditOutcome::Ignored,
            _ => EditOutcome::Applied,
        })
    }

    pub fn clear_entity_data(&mut self, entity_id: EntityId) -> Change {
        let change = self.entities.clear_entity_data(entity_id);
        self.apply(change)
    }

    pub fn clear_line_data(&mut self, entity_id: EntityId, line_number: u32) -> Change {
        let change = self.entities.clear_line_data(entity_id, line_number);
        self.apply(change)
    }

    /// Aggregate the book for the selected tax year and make it current.
    pub fn generate_report(&mut self) -> Result<&AggregationSnapshot, MoneyError> {
        self.ui.is_generating_report = true;
        let generated = aggregation::generate_aggregation(
            self.entities.entities(),
            self.entities.all_entity_data(),
            self.ui.tax_year,
        );
        self.ui.is_generating_report = false;
        let snapshot = generated?;
        log::info!(
            "snapshot {} generated for tax year {}",
            snapshot.id,
            snapshot.tax_year
        );
        Ok(self.aggregation.set_aggregation(snapshot))
    }

    pub fn set_aggregation(&mut self, snapshot: AggregationSnapshot) {
        self.aggregation.set_aggregation(snapshot);
    }

    pub fn clear_aggregation(&mut self) {
        self.aggregation.clear_aggregation();
    }

    pub fn clear_history(&mut self) {
        self.aggregation.clear_history();
    }

    pub fn set_selected_entity(&mut self, id: Option<EntityId>) {
        self.ui.selected_entity_id = id;
    }

    pub fn set_selected_line(&mut self, line_number: Option<u32>) {
        self.ui.selected_line_number = line_number;
    }

    pub fn set_tax_year(&mut self, tax_year: i32) {
        self.ui.tax_year = tax_year;
    }

    fn apply(&mut self, change: Change) -> Change {
        if change.touches_line_data() {
            self.aggregation.invalidate();
        }
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn submitted_with_row(state: &mut AppState) -> (EntityId, EntryId) {
        let id = state.create_entity("Tech Solutions Inc.", "12-3456789").unwrap();
        state.set_entity_status(id, EntityStatus::Submitted);
        let entry = state.add_country(id, 1, "France").unwrap();
        state
            .edit_column(id, 1, entry, ColumnKey::B, "100")
            .unwrap();
        (id, entry)
    }

    fn is_valid(state: &AppState) -> bool {
        state.aggregation().current().unwrap().is_valid
    }

    #[test]
    fn create_validates_input() {
        let mut state = AppState::new();
        assert_eq!(
            state.create_entity(" ", "1"),
            Err(ValidationError::NameRequired)
        );
        assert_eq!(state.create_entity("A", "1"), Err(ValidationError::NameTooShort));
        assert_eq!(
            state.create_entity("Acme", ""),
            Err(ValidationError::IdentifierRequired)
        );
        let id = state.create_entity("  Acme  ", " 1 ").unwrap();
        assert_eq!(state.entities().entity(id).unwrap().name, "Acme");
    }

    #[test]
    fn duplicate_country_rejected_before_the_book() {
        let mut state = AppState::new();
        let id = state.create_entity("Acme", "1").unwrap();
        state.add_country(id, 1, "Canada").unwrap();
        assert_eq!(
            state.add_country(id, 1, "canada"),
            Err(ValidationError::DuplicateCountry {
                country: "canada".to_string(),
                line_number: 1
            })
        );
        assert_eq!(state.entities().line(id, 1).unwrap().entries.len(), 1);
        // other lines are independent
        assert!(state.add_country(id, 2, "Canada").is_ok());
    }

    #[test]
    fn unknown_line_and_entity_rejected() {
        let mut state = AppState::new();
        let id = state.create_entity("Acme", "1").unwrap();
        assert_eq!(
            state.add_country(id, 18, "Peru"),
            Err(ValidationError::UnknownLine(18))
        );
        let missing = uuid::Uuid::new_v4();
        assert_eq!(
            state.add_country(missing, 1, "Peru"),
            Err(ValidationError::EntityNotFound(missing))
        );
    }

    #[test]
    fn rename_checks_uniqueness() {
        let mut state = AppState::new();
        let id = state.create_entity("Acme", "1").unwrap();
        let canada = state.add_country(id, 1, "Canada").unwrap();
        state.add_country(id, 1, "Mexico").unwrap();
        assert!(state.rename_country(id, 1, canada, "MEXICO").is_err());
        assert_eq!(state.rename_country(id, 1, canada, "CANADA"), Ok(Change::LineData));
    }

    #[test]
    fn invalid_input_is_dropped() {
        let mut state = AppState::new();
        let (id, entry) = submitted_with_row(&mut state);
        assert_eq!(
            state.edit_column(id, 1, entry, ColumnKey::B, "12-5"),
            Ok(EditOutcome::Dropped)
        );
        let columns = &state.entities().line(id, 1).unwrap().entry(entry).unwrap().columns;
        assert_eq!(columns.amount(ColumnKey::B), Some(dec!(100)));
    }

    #[test]
    fn amount_too_large_to_store_is_dropped() {
        let mut state = AppState::new();
        let (id, entry) = submitted_with_row(&mut state);
        assert_eq!(
            state.edit_column(id, 1, entry, ColumnKey::B, "10000000000000000000000000"),
            Ok(EditOutcome::Dropped)
        );
        let columns = &state.entities().line(id, 1).unwrap().entry(entry).unwrap().columns;
        assert_eq!(columns.amount(ColumnKey::B), Some(dec!(100)));
        assert_eq!(columns.g().to_string(), "100.0000");
    }

    #[test]
    fn sanitized_input_is_applied() {
        let mut state = AppState::new();
        let (id, entry) = submitted_with_row(&mut state);
        assert_eq!(
            state.edit_column(id, 1, entry, ColumnKey::C, "$1,250.50"),
            Ok(EditOutcome::Applied)
        );
        let columns = &state.entities().line(id, 1).unwrap().entry(entry).unwrap().columns;
        assert_eq!(columns.g(), dec!(1350.5));
        assert_eq!(
            state.edit_column(id, 1, entry, ColumnKey::G, "5"),
            Ok(EditOutcome::Ignored)
        );
    }

    #[test]
    fn line_edits_invalidate_snapshot_without_touching_results() {
        let mut state = AppState::new();
        let (id, entry) = submitted_with_row(&mut state);
        let results = state.generate_report().unwrap().results.clone();
        assert!(is_valid(&state));

        state.edit_column(id, 1, entry, ColumnKey::D, "5").unwrap();
        assert!(!is_valid(&state));
        assert_eq!(state.aggregation().current().unwrap().results, results);
    }

    #[test]
    fn metadata_edits_keep_snapshot_valid() {
        let mut state = AppState::new();
        let (id, _) = submitted_with_row(&mut state);
        state.generate_report().unwrap();

        state.update_entity(id, "Renamed Co", "99").unwrap();
        state.set_entity_status(id, EntityStatus::Draft);
        assert!(is_valid(&state));
    }

    #[test]
    fn every_line_mutation_invalidates() {
        type Mutation = fn(&mut AppState, EntityId, EntryId);
        let mutations: [Mutation; 6] = [
            |s, id, _| {
                s.add_country(id, 2, "Spain").unwrap();
            },
            |s, id, e| {
                s.rename_country(id, 1, e, "Italy").unwrap();
            },
            |s, id, e| {
                s.delete_country(id, 1, e);
            },
            |s, id, _| {
                s.clear_line_data(id, 1);
            },
            |s, id, _| {
                s.clear_entity_data(id);
            },
            |s, id, _| {
                s.delete_entity(id);
            },
        ];
        for mutate in mutations {
            let mut state = AppState::new();
            let (id, entry) = submitted_with_row(&mut state);
            state.generate_report().unwrap();
            mutate(&mut state, id, entry);
            assert!(!is_valid(&state));
        }
    }

    #[test]
    fn generation_uses_selected_tax_year_and_archives() {
        let mut state = AppState::new();
        submitted_with_row(&mut state);
        state.set_tax_year(2023);
        let first = state.generate_report().unwrap().id;
        state.set_tax_year(2024);
        let second = state.generate_report().unwrap();
        assert_eq!(second.tax_year, 2024);
        assert_eq!(state.aggregation().history()[0].id, first);
        assert!(!state.ui().is_generating_report);
    }

    #[test]
    fn deleting_selected_entity_clears_selection() {
        let mut state = AppState::new();
        let id = state.create_entity("Acme", "1").unwrap();
        state.set_selected_entity(Some(id));
        state.set_selected_line(Some(3));
        state.delete_entity(id);
        assert_eq!(state.ui().selected_entity_id, None);
        assert_eq!(state.ui().selected_line_number, None);
    }

    #[test]
    fn persisted_shape_round_trips_and_tolerates_missing_slices() {
        let mut state = AppState::new();
        submitted_with_row(&mut state);
        state.generate_report().unwrap();
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("entities").is_some());
        assert!(json.get("aggregation").is_some());
        assert!(json["ui"].get("taxYear").is_some());

        let restored: AppState = serde_json::from_value(json).unwrap();
        assert_eq!(restored, state);

        let partial: AppState =
            serde_json::from_value(serde_json::json!({ "ui": { "taxYear": 2021 } })).unwrap();
        assert!(partial.entities().is_empty());
        assert_eq!(partial.ui().tax_year, 2021);
    }
}
