//! Cross-entity rollup of foreign-source totals by line and country.
//!
//! Rules:
//! 1. Only `SUBMITTED` entities are included
//! 2. Only foreign-source columns (b..f) are summed; column a is U.S. source
//! 3. Totals are grouped by line, then by country, and summed across entities
//! 4. An included entity without line data contributes nothing
//! 5. The snapshot is immutable apart from its validity flag

use super::entity::{Entity, EntityData, EntityId};
use super::lines;
use super::money::{self, MoneyError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Point-in-time aggregation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregationSnapshot {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub tax_year: i32,
    /// Entities that were `SUBMITTED` when the snapshot was generated
    pub included_entity_ids: Vec<EntityId>,
    /// One per line present in the included data, ascending by line number
    pub results: Vec<AggregationResult>,
    /// Cleared when any entity's line data changes after generation
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub line_number: u32,
    pub line_description: String,
    /// Ascending by country name (ordinal, case-sensitive)
    pub country_totals: Vec<CountryTotal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountryTotal {
    pub country: String,
    /// Sum of columns b..f across included entities
    #[schemars(with = "String")]
    pub foreign_total: Decimal,
}

/// Country total across every line of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopCountry {
    pub country: String,
    pub total: Decimal,
}

impl AggregationSnapshot {
    /// Total across all lines and countries
    pub fn grand_total(&self) -> Result<Decimal, MoneyError> {
        let total = money::checked_sum(
            self.results
                .iter()
                .flat_map(|r| r.country_totals.iter().map(|ct| ct.foreign_total)),
        )?;
        money::checked_normalize(total)
    }

    /// Number of distinct countries across all lines
    pub fn country_count(&self) -> usize {
        let mut countries: Vec<_> = self
            .results
            .iter()
            .flat_map(|r| r.country_totals.iter().map(|ct| ct.country.as_str()))
            .collect();
        countries.sort_unstable();
        countries.dedup();
        countries.len()
    }

    pub fn result(&self, line_number: u32) -> Option<&AggregationResult> {
        self.results.iter().find(|r| r.line_number == line_number)
    }

    /// SHA-256 over the numeric content (tax year, included ids, results).
    ///
    /// Independent of id, timestamp, validity and entity ordering, so two
    /// snapshots built from the same data have the same digest.
    pub fn content_digest(&self) -> String {
        let mut ids = self.included_entity_ids.clone();
        ids.sort();

        let mut hasher = Sha256::new();
        hasher.update(self.tax_year.to_be_bytes());
        for id in &ids {
            hasher.update(id.as_bytes());
        }
        for result in &self.results {
            hasher.update(result.line_number.to_be_bytes());
            for ct in &result.country_totals {
                hasher.update(ct.country.as_bytes());
                hasher.update([0]);
                hasher.update(money::format_amount(ct.foreign_total).as_bytes());
                hasher.update([0]);
            }
        }
        hex::encode(hasher.finalize())
    }
}

/// Build a snapshot of foreign-source totals for every `SUBMITTED` entity.
///
/// Pure apart from the fresh id and timestamp; the numeric content depends
/// only on the inputs.
pub fn generate_aggregation<'a, I>(
    entities: I,
    entity_data: &BTreeMap<EntityId, EntityData>,
    tax_year: i32,
) -> Result<AggregationSnapshot, MoneyError>
where
    I: IntoIterator<Item = &'a Entity>,
{
    let included_entity_ids: Vec<EntityId> = entities
        .into_iter()
        .filter(|e| e.is_submitted())
        .map(|e| e.id)
        .collect();

    // line -> country -> running total; BTreeMap keeps both levels sorted
    let mut totals: BTreeMap<u32, BTreeMap<String, Decimal>> = BTreeMap::new();

    for entity_id in &included_entity_ids {
        let Some(data) = entity_data.get(entity_id) else {
            log::debug!("entity {} has no line data, contributes zero", entity_id);
            continue;
        };
        for (line_number, line) in &data.lines {
            let by_country = totals.entry(*line_number).or_default();
            for entry in &line.entries {
                let foreign = entry.columns.foreign_source_total()?;
                let running = by_country.entry(entry.country.clone()).or_default();
                *running = running.checked_add(foreign).ok_or(MoneyError::Overflow)?;
            }
        }
    }

    let results = totals
        .into_iter()
        .filter(|(_, by_country)| !by_country.is_empty())
        .map(|(line_number, by_country)| {
            let country_totals = by_country
                .into_iter()
                .map(|(country, total)| {
                    Ok(CountryTotal {
                        country,
                        foreign_total: money::checked_normalize(total)?,
                    })
                })
                .collect::<Result<Vec<_>, MoneyError>>()?;
            Ok(AggregationResult {
                line_number,
                line_description: lines::line_description(line_number),
                country_totals,
            })
        })
        .collect::<Result<Vec<_>, MoneyError>>()?;

    log::info!(
        "aggregated {} entities into {} lines for tax year {}",
        included_entity_ids.len(),
        results.len(),
        tax_year
    );

    Ok(AggregationSnapshot {
        id: Uuid::new_v4(),
        generated_at: Utc::now(),
        tax_year,
        included_entity_ids,
        results,
        is_valid: true,
    })
}

/// Countries ranked by their total across all lines, largest first.
pub fn top_countries(
    snapshot: &AggregationSnapshot,
    limit: usize,
) -> Result<Vec<TopCountry>, MoneyError> {
    let mut by_country: BTreeMap<&str, Decimal> = BTreeMap::new();
    for result in &snapshot.results {
        for ct in &result.country_totals {
            let running = by_country.entry(ct.country.as_str()).or_default();
            *running = running.checked_add(ct.foreign_total).ok_or(MoneyError::Overflow)?;
        }
    }

    let mut ranked = by_country
        .into_iter()
        .map(|(country, total)| {
            Ok(TopCountry {
                country: country.to_string(),
                total: money::checked_normalize(total)?,
            })
        })
        .collect::<Result<Vec<_>, MoneyError>>()?;
    // stable sort: equal totals stay in name order
    ranked.sort_by(|a, b| b.total.cmp(&a.total));
    ranked.truncate(limit);
    Ok(ranked)
}

/// Names of the included entities, for report headers
pub fn included_names<'a>(
    snapshot: &AggregationSnapshot,
    entities: impl IntoIterator<Item = &'a Entity>,
) -> Vec<String> {
    let names: HashMap<EntityId, &str> = entities
        .into_iter()
        .map(|e| (e.id, e.name.as_str()))
        .collect();
    snapshot
        .included_entity_ids
        .iter()
        .map(|id| {
            names
                .get(id)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("(deleted {})", id))
        })
        .collect()
}
