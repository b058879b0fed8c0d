pub mod aggregate;
pub mod countries;
pub mod demo;
pub mod entity;
pub mod entry;
pub mod history;
pub mod html_report;
pub mod lines;
pub mod report;
pub mod reset;
pub mod schema;
pub mod validate;

use k2agg::core::{AppState, EntityId, EntryId};

/// Find an entity by id, or by name ignoring case
pub fn resolve_entity(state: &AppState, key: &str) -> anyhow::Result<EntityId> {
    let book = state.entities();
    if let Ok(id) = key.parse::<EntityId>() {
        if book.entity(id).is_some() {
            return Ok(id);
        }
    }
    match book.find_by_name(key) {
        Some(entity) => Ok(entity.id),
        None => anyhow::bail!("No entity matching '{}'", key),
    }
}

/// Find a row on a line by sub-row label, or by country name ignoring case
pub fn resolve_entry(
    state: &AppState,
    entity_id: EntityId,
    line_number: u32,
    key: &str,
) -> anyhow::Result<EntryId> {
    let Some(line) = state.entities().line(entity_id, line_number) else {
        anyhow::bail!("Line {} has no entries", line_number);
    };
    line.entries
        .iter()
        .find(|e| e.sub_row_label == key)
        .or_else(|| {
            line.entries
                .iter()
                .find(|e| e.country.eq_ignore_ascii_case(key.trim()))
        })
        .map(|e| e.id)
        .ok_or_else(|| anyhow::anyhow!("No entry '{}' on line {}", key, line_number))
}
