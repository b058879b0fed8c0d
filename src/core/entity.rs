use super::money::{self, MoneyError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type EntityId = Uuid;
pub type EntryId = Uuid;

/// Lifecycle of a reporting entity. Only `Submitted` entities are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    #[default]
    Draft,
    Submitted,
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityStatus::Draft => write!(f, "DRAFT"),
            EntityStatus::Submitted => write!(f, "SUBMITTED"),
        }
    }
}

/// A taxpayer / reporting unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    /// External tax identifier (free text, e.g. an EIN)
    pub identifier: String,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    pub fn is_submitted(&self) -> bool {
        self.status == EntityStatus::Submitted
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Column selector for a country row.
///
/// `A` is U.S. source, `B`..`F` are foreign-source categories, `G` is derived.
/// `ECategory` addresses the free-text category code attached to column e.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ColumnKey {
    #[serde(rename = "a")]
    A,
    #[serde(rename = "b")]
    B,
    #[serde(rename = "c")]
    C,
    #[serde(rename = "d")]
    D,
    #[serde(rename = "e")]
    E,
    #[serde(rename = "f")]
    F,
    #[serde(rename = "g")]
    G,
    #[serde(rename = "eCategory")]
    ECategory,
}

impl ColumnKey {
    /// The editable monetary columns, in order.
    pub const AMOUNTS: [ColumnKey; 6] = [
        ColumnKey::A,
        ColumnKey::B,
        ColumnKey::C,
        ColumnKey::D,
        ColumnKey::E,
        ColumnKey::F,
    ];

    pub fn is_derived(self) -> bool {
        self == ColumnKey::G
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKey::A => "a",
            ColumnKey::B => "b",
            ColumnKey::C => "c",
            ColumnKey::D => "d",
            ColumnKey::E => "e",
            ColumnKey::F => "f",
            ColumnKey::G => "g",
            ColumnKey::ECategory => "eCategory",
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown column '{0}' (expected a-g or eCategory)")]
pub struct UnknownColumn(String);

impl FromStr for ColumnKey {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a" => Ok(ColumnKey::A),
            "b" => Ok(ColumnKey::B),
            "c" => Ok(ColumnKey::C),
            "d" => Ok(ColumnKey::D),
            "e" => Ok(ColumnKey::E),
            "f" => Ok(ColumnKey::F),
            "g" => Ok(ColumnKey::G),
            "ecategory" | "e-category" | "e_category" => Ok(ColumnKey::ECategory),
            _ => Err(UnknownColumn(s.to_string())),
        }
    }
}

/// The seven monetary columns of one country row.
///
/// Column `g` has no setter: it is recomputed from `a..f` on every write and
/// on every deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnData {
    #[schemars(with = "String")]
    a: Decimal,
    #[schemars(with = "String")]
    b: Decimal,
    #[schemars(with = "String")]
    c: Decimal,
    #[schemars(with = "String")]
    d: Decimal,
    #[schemars(with = "String")]
    e: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    e_category: Option<String>,
    #[schemars(with = "String")]
    f: Decimal,
    #[schemars(with = "String")]
    g: Decimal,
}

impl Default for ColumnData {
    fn default() -> Self {
        let zero = money::normalize(Decimal::ZERO);
        ColumnData {
            a: zero,
            b: zero,
            c: zero,
            d: zero,
            e: zero,
            e_category: None,
            f: zero,
            g: zero,
        }
    }
}

impl ColumnData {
    /// Value of a monetary column (including `g`). `None` for the category code.
    pub fn amount(&self, key: ColumnKey) -> Option<Decimal> {
        match key {
            ColumnKey::A => Some(self.a),
            ColumnKey::B => Some(self.b),
            ColumnKey::C => Some(self.c),
            ColumnKey::D => Some(self.d),
            ColumnKey::E => Some(self.e),
            ColumnKey::F => Some(self.f),
            ColumnKey::G => Some(self.g),
            ColumnKey::ECategory => None,
        }
    }

    pub fn e_category(&self) -> Option<&str> {
        self.e_category.as_deref()
    }

    /// Derived total (column g).
    pub fn g(&self) -> Decimal {
        self.g
    }

    /// Columns a..f
    pub fn amounts(&self) -> [Decimal; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Columns b..f
    pub fn foreign_amounts(&self) -> [Decimal; 5] {
        [self.b, self.c, self.d, self.e, self.f]
    }

    pub fn foreign_source_total(&self) -> Result<Decimal, MoneyError> {
        money::checked_sum(self.foreign_amounts())
    }

    /// Store a normalized amount and recompute `g`.
    ///
    /// Returns `Ok(false)` without touching anything when `key` is `G` or
    /// `ECategory`. On overflow the row is left unchanged.
    pub(crate) fn set_amount(&mut self, key: ColumnKey, value: Decimal) -> Result<bool, MoneyError> {
        let value = money::checked_normalize(value)?;
        let mut next = self.clone();
        match key {
            ColumnKey::A => next.a = value,
            ColumnKey::B => next.b = value,
            ColumnKey::C => next.c = value,
            ColumnKey::D => next.d = value,
            ColumnKey::E => next.e = value,
            ColumnKey::F => next.f = value,
            ColumnKey::G | ColumnKey::ECategory => return Ok(false),
        }
        next.g = money::checked_normalize(money::checked_sum(next.amounts())?)?;
        *self = next;
        Ok(true)
    }

    pub(crate) fn set_e_category(&mut self, code: &str) {
        self.e_category = Some(code.to_string());
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredColumns {
    #[serde(default)]
    a: Decimal,
    #[serde(default)]
    b: Decimal,
    #[serde(default)]
    c: Decimal,
    #[serde(default)]
    d: Decimal,
    #[serde(default)]
    e: Decimal,
    #[serde(default)]
    e_category: Option<String>,
    #[serde(default)]
    f: Decimal,
}

impl<'de> Deserialize<'de> for ColumnData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = StoredColumns::deserialize(deserializer)?;
        let mut columns = ColumnData {
            a: money::normalize(stored.a),
            b: money::normalize(stored.b),
            c: money::normalize(stored.c),
            d: money::normalize(stored.d),
            e: money::normalize(stored.e),
            e_category: stored.e_category,
            f: money::normalize(stored.f),
            g: Decimal::ZERO,
        };
        columns.g = money::checked_sum(columns.amounts())
            .and_then(money::checked_normalize)
            .map_err(serde::de::Error::custom)?;
        Ok(columns)
    }
}

/// One country row within a line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountryEntry {
    pub id: EntryId,
    pub country: String,
    /// Cosmetic position marker (`A`, `B`, ...), recomputed on structural changes
    pub sub_row_label: String,
    pub columns: ColumnData,
}

impl CountryEntry {
    pub(crate) fn new(country: &str, index: usize) -> Self {
        CountryEntry {
            id: Uuid::new_v4(),
            country: country.to_string(),
            sub_row_label: sub_row_label(index),
            columns: ColumnData::default(),
        }
    }
}

/// All country rows reported on one line for one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineData {
    pub line_number: u32,
    #[serde(rename = "countries")]
    pub entries: Vec<CountryEntry>,
}

impl LineData {
    pub fn entry(&self, entry_id: EntryId) -> Option<&CountryEntry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    pub(crate) fn relabel(&mut self) {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            entry.sub_row_label = sub_row_label(index);
        }
    }
}

/// Line data of a single entity, keyed by IRS line number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityData {
    pub entity_id: EntityId,
    #[serde(default)]
    pub lines: BTreeMap<u32, LineData>,
}

impl EntityData {
    pub fn new(entity_id: EntityId) -> Self {
        EntityData {
            entity_id,
            lines: BTreeMap::new(),
        }
    }

    pub fn line(&self, line_number: u32) -> Option<&LineData> {
        self.lines.get(&line_number)
    }

    /// Whether any line has been filled in
    pub fn has_data(&self) -> bool {
        !self.lines.is_empty()
    }

    /// Total country rows across all lines
    pub fn country_count(&self) -> usize {
        self.lines.values().map(|line| line.entries.len()).sum()
    }
}

/// `A`..`Z` for the first 26 rows, then the 1-based position as a number.
pub fn sub_row_label(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => char::from(b'A' + i).to_string(),
        _ => (index + 1).to_string(),
    }
}
