//! The entity book: every entity together with its line data.
//!
//! Each operation is atomic, refreshes the owning entity's `updated_at`, and
//! reports what kind of [`Change`] it made so the caller can invalidate the
//! current aggregation snapshot when line data moved.

use super::entity::{
    ColumnKey, CountryEntry, Entity, EntityData, EntityId, EntityStatus, EntryId, LineData,
};
use super::money::{self, MoneyError};
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// What an operation touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Target absent, or the write was not allowed
    Unchanged,
    /// Entity metadata only (name, identifier, status)
    Metadata,
    /// Country rows or their amounts
    LineData,
}

impl Change {
    pub fn touches_line_data(self) -> bool {
        self == Change::LineData
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityBook {
    #[serde(default)]
    by_id: BTreeMap<EntityId, Entity>,
    /// Creation order
    #[serde(default)]
    all_ids: Vec<EntityId>,
    #[serde(default)]
    entity_data: BTreeMap<EntityId, EntityData>,
}

impl EntityBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.all_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all_ids.is_empty()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.by_id.get(&id)
    }

    /// Entities in creation order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.all_ids.iter().filter_map(|id| self.by_id.get(id))
    }

    pub fn entity_data(&self, id: EntityId) -> Option<&EntityData> {
        self.entity_data.get(&id)
    }

    pub fn all_entity_data(&self) -> &BTreeMap<EntityId, EntityData> {
        &self.entity_data
    }

    pub fn line(&self, entity_id: EntityId, line_number: u32) -> Option<&LineData> {
        self.entity_data.get(&entity_id)?.line(line_number)
    }

    /// First entity whose name matches, ignoring case
    pub fn find_by_name(&self, name: &str) -> Option<&Entity> {
        let wanted = name.trim().to_lowercase();
        self.entities().find(|e| e.name.trim().to_lowercase() == wanted)
    }

    /// New `DRAFT` entity with empty line data. Input is assumed validated.
    pub fn create_entity(&mut self, name: &str, identifier: &str) -> EntityId {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.by_id.insert(
            id,
            Entity {
                id,
                name: name.to_string(),
                identifier: identifier.to_string(),
                status: EntityStatus::Draft,
                created_at: now,
                updated_at: now,
            },
        );
        self.all_ids.push(id);
        self.entity_data.insert(id, EntityData::new(id));
        log::debug!("created entity {} ({})", name, id);
        id
    }

    pub fn update_entity_metadata(&mut self, id: EntityId, name: &str, identifier: &str) -> Change {
        let Some(entity) = self.by_id.get_mut(&id) else {
            return Change::Unchanged;
        };
        entity.name = name.to_string();
        entity.identifier = identifier.to_string();
        entity.touch();
        Change::Metadata
    }

    /// Removes the entity and its line data.
    pub fn delete_entity(&mut self, id: EntityId) -> Change {
        if self.by_id.remove(&id).is_none() {
            return Change::Unchanged;
        }
        self.all_ids.retain(|other| *other != id);
        let had_lines = self
            .entity_data
            .remove(&id)
            .is_some_and(|data| data.has_data());
        log::debug!("deleted entity {}", id);
        if had_lines {
            Change::LineData
        } else {
            Change::Metadata
        }
    }

    pub fn set_entity_status(&mut self, id: EntityId, status: EntityStatus) -> Change {
        let Some(entity) = self.by_id.get_mut(&id) else {
            return Change::Unchanged;
        };
        entity.status = status;
        entity.touch();
        Change::Metadata
    }

    /// Appends a zeroed row for `country`, creating the line if needed.
    ///
    /// Uniqueness of `country` within the line is the caller's responsibility.
    pub fn add_country_entry(
        &mut self,
        entity_id: EntityId,
        line_number: u32,
        country: &str,
    ) -> Option<EntryId> {
        let data = self.entity_data.get_mut(&entity_id)?;
        let line = data.lines.entry(line_number).or_insert_with(|| LineData {
            line_number,
            entries: Vec::new(),
        });
        let entry = CountryEntry::new(country, line.entries.len());
        let entry_id = entry.id;
        line.entries.push(entry);
        self.touch(entity_id);
        Some(entry_id)
    }

    /// Uniqueness of the new name is the caller's responsibility.
    pub fn rename_country_entry(
        &mut self,
        entity_id: EntityId,
        line_number: u32,
        entry_id: EntryId,
        country: &str,
    ) -> Change {
        let Some(entry) = self.entry_mut(entity_id, line_number, entry_id) else {
            return Change::Unchanged;
        };
        entry.country = country.to_string();
        self.touch(entity_id);
        Change::LineData
    }

    /// Removes a row, relabels the rest and drops the line once it is empty.
    pub fn delete_country_entry(
        &mut self,
        entity_id: EntityId,
        line_number: u32,
        entry_id: EntryId,
    ) -> Change {
        let Some(data) = self.entity_data.get_mut(&entity_id) else {
            return Change::Unchanged;
        };
        let Some(line) = data.lines.get_mut(&line_number) else {
            return Change::Unchanged;
        };
        let before = line.entries.len();
        line.entries.retain(|entry| entry.id != entry_id);
        if line.entries.len() == before {
            return Change::Unchanged;
        }
        line.relabel();
        if line.entries.is_empty() {
            data.lines.remove(&line_number);
        }
        self.touch(entity_id);
        Change::LineData
    }

    /// Writes one column of a row.
    ///
    /// Writes to `g` are ignored. `eCategory` stores the raw text; any other
    /// column is parsed, normalized to four places, and `g` is recomputed.
    /// `value` is expected to have passed [`money::is_valid_numeric`].
    pub fn update_column_value(
        &mut self,
        entity_id: EntityId,
        line_number: u32,
        entry_id: EntryId,
        key: ColumnKey,
        value: &str,
    ) -> Result<Change, MoneyError> {
        if key.is_derived() {
            log::debug!("ignored write to derived column g");
            return Ok(Change::Unchanged);
        }
        let Some(entry) = self.entry_mut(entity_id, line_number, entry_id) else {
            return Ok(Change::Unchanged);
        };
        if key == ColumnKey::ECategory {
            entry.columns.set_e_category(value);
        } else {
            let amount = money::parse_amount(value)?;
            entry.columns.set_amount(key, amount)?;
        }
        self.touch(entity_id);
        Ok(Change::LineData)
    }

    pub fn clear_entity_data(&mut self, entity_id: EntityId) -> Change {
        let Some(data) = self.entity_data.get_mut(&entity_id) else {
            return Change::Unchanged;
        };
        let had_lines = data.has_data();
        *data = EntityData::new(entity_id);
        self.touch(entity_id);
        if had_lines {
            Change::LineData
        } else {
            Change::Metadata
        }
    }

    pub fn clear_line_data(&mut self, entity_id: EntityId, line_number: u32) -> Change {
        let removed = self
            .entity_data
            .get_mut(&entity_id)
            .and_then(|data| data.lines.remove(&line_number));
        if removed.is_none() {
            return Change::Unchanged;
        }
        self.touch(entity_id);
        Change::LineData
    }

    /// Restores the book's invariants after loading it from outside.
    ///
    /// Dangling ids are dropped, missing line data is created empty, empty lines
    /// are pruned and sub-row labels are recomputed.
    pub fn reconcile(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.all_ids
            .retain(|id| self.by_id.contains_key(id) && seen.insert(*id));
        for id in self.by_id.keys() {
            if !seen.contains(id) {
                self.all_ids.push(*id);
            }
        }
        let by_id = &self.by_id;
        self.entity_data.retain(|id, _| by_id.contains_key(id));
        for id in &self.all_ids {
            let data = self
                .entity_data
                .entry(*id)
                .or_insert_with(|| EntityData::new(*id));
            data.entity_id = *id;
            data.lines.retain(|_, line| !line.entries.is_empty());
            for (number, line) in data.lines.iter_mut() {
                line.line_number = *number;
                line.relabel();
            }
        }
    }

    fn entry_mut(
        &mut self,
        entity_id: EntityId,
        line_number: u32,
        entry_id: EntryId,
    ) -> Option<&mut CountryEntry> {
        self.entity_data
            .get_mut(&entity_id)?
            .lines
            .get_mut(&line_number)?
            .entries
            .iter_mut()
            .find(|entry| entry.id == entry_id)
    }

    fn touch(&mut self, entity_id: EntityId) {
        if let Some(entity) = self.by_id.get_mut(&entity_id) {
            entity.touch();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn labels(book: &EntityBook, id: EntityId, line: u32) -> Vec<String> {
        book.line(id, line)
            .map(|l| l.entries.iter().map(|e| e.sub_row_label.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn create_starts_in_draft_with_empty_data() {
        let mut book = EntityBook::new();
        let id = book.create_entity("Tech Solutions Inc.", "12-3456789");
        let entity = book.entity(id).unwrap();
        assert_eq!(entity.status, EntityStatus::Draft);
        assert_eq!(entity.created_at, entity.updated_at);
        assert!(!book.entity_data(id).unwrap().has_data());
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn entities_keep_creation_order() {
        let mut book = EntityBook::new();
        let ids: Vec<_> = ["Zeta", "Alpha", "Mid"]
            .iter()
            .map(|n| book.create_entity(n, "id"))
            .collect();
        let listed: Vec<_> = book.entities().map(|e| e.id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn metadata_updates_and_absent_targets() {
        let mut book = EntityBook::new();
        let id = book.create_entity("Old", "1");
        assert_eq!(book.update_entity_metadata(id, "New", "2"), Change::Metadata);
        assert_eq!(book.entity(id).unwrap().name, "New");
        assert_eq!(
            book.update_entity_metadata(Uuid::new_v4(), "x", "y"),
            Change::Unchanged
        );
        assert_eq!(
            book.set_entity_status(id, EntityStatus::Submitted),
            Change::Metadata
        );
        assert!(book.entity(id).unwrap().is_submitted());
        assert_eq!(book.set_entity_status(id, EntityStatus::Draft), Change::Metadata);
        assert!(!book.entity(id).unwrap().is_submitted());
    }

    #[test]
    fn delete_cascades_to_data() {
        let mut book = EntityBook::new();
        let id = book.create_entity("Gone", "1");
        book.add_country_entry(id, 1, "France").unwrap();
        assert_eq!(book.delete_entity(id), Change::LineData);
        assert!(book.entity(id).is_none());
        assert!(book.entity_data(id).is_none());
        assert!(book.is_empty());
        assert_eq!(book.delete_entity(id), Change::Unchanged);

        let empty = book.create_entity("Empty", "2");
        assert_eq!(book.delete_entity(empty), Change::Metadata);
    }

    #[test]
    fn add_entry_creates_line_with_zeroed_columns() {
        let mut book = EntityBook::new();
        let id = book.create_entity("Co", "1");
        let entry_id = book.add_country_entry(id, 3, "Japan").unwrap();
        let line = book.line(id, 3).unwrap();
        let entry = line.entry(entry_id).unwrap();
        assert_eq!(entry.sub_row_label, "A");
        assert_eq!(entry.columns.g().to_string(), "0.0000");
        assert!(book.add_country_entry(Uuid::new_v4(), 3, "Japan").is_none());
    }

    #[test]
    fn deleting_relabels_remaining_entries() {
        let mut book = EntityBook::new();
        let id = book.create_entity("Co", "1");
        let _a = book.add_country_entry(id, 1, "Canada").unwrap();
        let b = book.add_country_entry(id, 1, "France").unwrap();
        let _c = book.add_country_entry(id, 1, "Spain").unwrap();
        assert_eq!(labels(&book, id, 1), ["A", "B", "C"]);

        assert_eq!(book.delete_country_entry(id, 1, b), Change::LineData);
        assert_eq!(labels(&book, id, 1), ["A", "B"]);
        let countries: Vec<_> = book
            .line(id, 1)
            .unwrap()
            .entries
            .iter()
            .map(|e| e.country.as_str())
            .collect();
        assert_eq!(countries, ["Canada", "Spain"]);
    }

    #[test]
    fn deleting_last_entry_removes_line() {
        let mut book = EntityBook::new();
        let id = book.create_entity("Co", "1");
        let only = book.add_country_entry(id, 8, "Ireland").unwrap();
        assert_eq!(book.delete_country_entry(id, 8, only), Change::LineData);
        assert!(book.line(id, 8).is_none());
        assert!(!book.entity_data(id).unwrap().has_data());
        assert_eq!(book.delete_country_entry(id, 8, only), Change::Unchanged);
    }

    #[test]
    fn column_updates_keep_g_in_sync() {
        let mut book = EntityBook::new();
        let id = book.create_entity("Co", "1");
        let entry = book.add_country_entry(id, 1, "France").unwrap();

        let steps = [
            (ColumnKey::A, "100"),
            (ColumnKey::B, "25.5"),
            (ColumnKey::F, "-5.25"),
            (ColumnKey::A, ""),
            (ColumnKey::D, "-"),
        ];
        for (key, value) in steps {
            assert_eq!(
                book.update_column_value(id, 1, entry, key, value),
                Ok(Change::LineData)
            );
            let columns = &book.line(id, 1).unwrap().entry(entry).unwrap().columns;
            let sum: rust_decimal::Decimal = columns.amounts().iter().sum();
            assert_eq!(columns.g(), sum);
        }
        let columns = &book.line(id, 1).unwrap().entry(entry).unwrap().columns;
        assert_eq!(columns.g(), dec!(20.25));
    }

    #[test]
    fn writing_g_is_a_no_op() {
        let mut book = EntityBook::new();
        let id = book.create_entity("Co", "1");
        let entry = book.add_country_entry(id, 1, "France").unwrap();
        book.update_column_value(id, 1, entry, ColumnKey::C, "7").unwrap();
        assert_eq!(
            book.update_column_value(id, 1, entry, ColumnKey::G, "1000"),
            Ok(Change::Unchanged)
        );
        let columns = &book.line(id, 1).unwrap().entry(entry).unwrap().columns;
        assert_eq!(columns.g(), dec!(7));
    }

    #[test]
    fn category_code_stored_raw() {
        let mut book = EntityBook::new();
        let id = book.create_entity("Co", "1");
        let entry = book.add_country_entry(id, 1, "France").unwrap();
        book.update_column_value(id, 1, entry, ColumnKey::ECategory, "901j")
            .unwrap();
        let columns = &book.line(id, 1).unwrap().entry(entry).unwrap().columns;
        assert_eq!(columns.e_category(), Some("901j"));
        assert_eq!(columns.g(), dec!(0));
    }

    #[test]
    fn invalid_amount_is_caller_misuse() {
        let mut book = EntityBook::new();
        let id = book.create_entity("Co", "1");
        let entry = book.add_country_entry(id, 1, "France").unwrap();
        assert_eq!(
            book.update_column_value(id, 1, entry, ColumnKey::B, "12abc"),
            Err(MoneyError::InvalidDecimal("12abc".to_string()))
        );
    }

    #[test]
    fn clearing_data() {
        let mut book = EntityBook::new();
        let id = book.create_entity("Co", "1");
        book.add_country_entry(id, 1, "France").unwrap();
        book.add_country_entry(id, 2, "France").unwrap();

        assert_eq!(book.clear_line_data(id, 1), Change::LineData);
        assert!(book.line(id, 1).is_none());
        assert!(book.line(id, 2).is_some());
        assert_eq!(book.clear_line_data(id, 1), Change::Unchanged);

        assert_eq!(book.clear_entity_data(id), Change::LineData);
        assert!(!book.entity_data(id).unwrap().has_data());
        assert_eq!(book.clear_entity_data(id), Change::Metadata);
    }

    #[test]
    fn rename_entry() {
        let mut book = EntityBook::new();
        let id = book.create_entity("Co", "1");
        let entry = book.add_country_entry(id, 1, "Frnace").unwrap();
        assert_eq!(book.rename_country_entry(id, 1, entry, "France"), Change::LineData);
        assert_eq!(book.line(id, 1).unwrap().entries[0].country, "France");
        assert_eq!(
            book.rename_country_entry(id, 2, entry, "France"),
            Change::Unchanged
        );
    }

    #[test]
    fn reconcile_repairs_loaded_book() {
        let mut book = EntityBook::new();
        let id = book.create_entity("Co", "1");
        let a = book.add_country_entry(id, 1, "France").unwrap();
        book.add_country_entry(id, 1, "Spain").unwrap();

        let mut json = serde_json::to_value(&book).unwrap();
        let key = id.to_string();
        json["entityData"][&key]["lines"]["1"]["countries"][1]["subRowLabel"] = "Q".into();
        json["entityData"][&key]["lines"]["4"] =
            serde_json::json!({ "lineNumber": 4, "countries": [] });
        json["allIds"]
            .as_array_mut()
            .unwrap()
            .push(Uuid::new_v4().to_string().into());

        let mut loaded: EntityBook = serde_json::from_value(json).unwrap();
        loaded.reconcile();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.line(id, 4).is_none());
        assert_eq!(labels(&loaded, id, 1), ["A", "B"]);
        assert!(loaded.line(id, 1).unwrap().entry(a).is_some());
    }
}
