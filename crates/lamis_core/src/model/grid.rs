//! Row, column and grid state types.
//!
//! # Responsibility
//! - Validate raw row numbers and column symbols at the boundary.
//! - Provide the persisted/exchanged JSON shape (`row_<N>` → `{L,A,M,I,S}`).
//! - Convert arbitrary JSON mappings into a grid without rejecting them.
//!
//! # Invariants
//! - `RowKey` can only be constructed for values in `1..=ROW_COUNT`.
//! - `GridState` never holds duplicate rows (map uniqueness).
//! - Lenient conversion drops unknown keys instead of failing.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Fixed number of rows in the tracker universe.
pub const ROW_COUNT: u32 = 60;

const ROW_KEY_PREFIX: &str = "row_";

/// Rejected row number or column symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidArgument {
    RowOutOfRange(i64),
    UnknownColumn(String),
}

impl Display for InvalidArgument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RowOutOfRange(value) => {
                write!(f, "row {value} is outside the range 1..={ROW_COUNT}")
            }
            Self::UnknownColumn(value) => {
                write!(f, "unknown column `{value}`; expected one of L|A|M|I|S")
            }
        }
    }
}

impl Error for InvalidArgument {}

/// Identifier of one tracker row, always within `1..=ROW_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey(u8);

impl RowKey {
    /// Validates a raw row number.
    pub fn new(value: i64) -> Result<Self, InvalidArgument> {
        if (1..=i64::from(ROW_COUNT)).contains(&value) {
            // Range check above keeps the value within u8.
            Ok(Self(value as u8))
        } else {
            Err(InvalidArgument::RowOutOfRange(value))
        }
    }

    pub fn get(self) -> u32 {
        u32::from(self.0)
    }

    /// Storage/exchange key for this row, e.g. `row_7`.
    pub fn storage_key(self) -> String {
        format!("{ROW_KEY_PREFIX}{}", self.0)
    }

    /// Parses a `row_<N>` key. Returns `None` for anything else, including
    /// numbers outside the universe and zero-padded forms like `row_07`.
    pub fn from_storage_key(key: &str) -> Option<Self> {
        let digits = key.strip_prefix(ROW_KEY_PREFIX)?;
        if digits.is_empty()
            || digits.starts_with('0')
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        let value = digits.parse::<i64>().ok()?;
        Self::new(value).ok()
    }

    /// Iterates the full row universe in ascending order.
    pub fn all() -> impl Iterator<Item = RowKey> {
        (1..=ROW_COUNT as u8).map(RowKey)
    }
}

impl Display for RowKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the five named boolean columns.
///
/// Declaration order is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    L,
    A,
    M,
    I,
    S,
}

impl Column {
    pub const ALL: [Column; 5] = [Column::L, Column::A, Column::M, Column::I, Column::S];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::L => "L",
            Self::A => "A",
            Self::M => "M",
            Self::I => "I",
            Self::S => "S",
        }
    }
}

impl FromStr for Column {
    type Err = InvalidArgument;

    /// Accepts the symbol in either case, surrounding whitespace ignored.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(Self::L),
            "A" => Ok(Self::A),
            "M" => Ok(Self::M),
            "I" => Ok(Self::I),
            "S" => Ok(Self::S),
            _ => Err(InvalidArgument::UnknownColumn(value.to_string())),
        }
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flags of one materialized row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowFlags {
    #[serde(rename = "L")]
    pub l: bool,
    #[serde(rename = "A")]
    pub a: bool,
    #[serde(rename = "M")]
    pub m: bool,
    #[serde(rename = "I")]
    pub i: bool,
    #[serde(rename = "S")]
    pub s: bool,
}

impl RowFlags {
    pub fn get(&self, column: Column) -> bool {
        match column {
            Column::L => self.l,
            Column::A => self.a,
            Column::M => self.m,
            Column::I => self.i,
            Column::S => self.s,
        }
    }

    pub fn set(&mut self, column: Column, value: bool) {
        let slot = match column {
            Column::L => &mut self.l,
            Column::A => &mut self.a,
            Column::M => &mut self.m,
            Column::I => &mut self.i,
            Column::S => &mut self.s,
        };
        *slot = value;
    }

    /// Flips one column and returns its new value.
    pub fn toggle(&mut self, column: Column) -> bool {
        let next = !self.get(column);
        self.set(column, next);
        next
    }

    pub fn is_blank(&self) -> bool {
        Column::ALL.iter().all(|column| !self.get(*column))
    }

    /// Reads a row object leniently: missing or non-boolean columns are
    /// `false`, unknown members are ignored.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let mut flags = Self::default();
        for column in Column::ALL {
            let value = object
                .get(column.as_str())
                .and_then(Value::as_bool)
                .unwrap_or(false);
            flags.set(column, value);
        }
        flags
    }
}

/// Sparse mapping of rows to flags.
///
/// Serialized as a JSON object keyed by `row_<N>` in ascending row order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridState {
    rows: BTreeMap<RowKey, RowFlags>,
}

impl GridState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags for `row`; absent rows read as all-false.
    pub fn flags(&self, row: RowKey) -> RowFlags {
        self.rows.get(&row).copied().unwrap_or_default()
    }

    /// Returns the stored flags, materializing an all-false row first.
    pub fn flags_mut(&mut self, row: RowKey) -> &mut RowFlags {
        self.rows.entry(row).or_default()
    }

    pub fn insert(&mut self, row: RowKey, flags: RowFlags) {
        self.rows.insert(row, flags);
    }

    pub fn contains(&self, row: RowKey) -> bool {
        self.rows.contains_key(&row)
    }

    /// Number of materialized rows (not the universe size).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RowKey, &RowFlags)> {
        self.rows.iter().map(|(row, flags)| (*row, flags))
    }

    /// Builds a grid from an arbitrary JSON mapping without rejecting it.
    ///
    /// Keys that are not `row_<N>` within the universe are skipped, as are
    /// entries whose value is not an object. Such rows read as all-false.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let mut rows = BTreeMap::new();
        for (key, value) in object {
            let Some(row) = RowKey::from_storage_key(key) else {
                continue;
            };
            let Value::Object(entry) = value else {
                continue;
            };
            rows.insert(row, RowFlags::from_json_object(entry));
        }
        Self { rows }
    }
}

impl FromIterator<(RowKey, RowFlags)> for GridState {
    fn from_iter<T: IntoIterator<Item = (RowKey, RowFlags)>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl Serialize for GridState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for (row, flags) in &self.rows {
            map.serialize_entry(&row.storage_key(), flags)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for GridState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Object(object) => Ok(Self::from_json_object(&object)),
            other => Err(de::Error::custom(format!(
                "grid state must be a mapping, got {}",
                json_kind(&other)
            ))),
        }
    }
}

/// Short name of a JSON value kind, used in diagnostics.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{Column, GridState, InvalidArgument, RowFlags, RowKey, ROW_COUNT};
    use serde_json::json;

    #[test]
    fn row_key_accepts_only_the_fixed_universe() {
        assert_eq!(RowKey::new(1).unwrap().get(), 1);
        assert_eq!(RowKey::new(60).unwrap().get(), 60);
        assert_eq!(RowKey::new(0), Err(InvalidArgument::RowOutOfRange(0)));
        assert_eq!(RowKey::new(61), Err(InvalidArgument::RowOutOfRange(61)));
        assert_eq!(RowKey::all().count(), ROW_COUNT as usize);
    }

    #[test]
    fn storage_key_parsing_rejects_foreign_keys() {
        assert_eq!(RowKey::from_storage_key("row_12"), RowKey::new(12).ok());
        assert_eq!(RowKey::from_storage_key("row_0"), None);
        assert_eq!(RowKey::from_storage_key("row_01"), None);
        assert_eq!(RowKey::from_storage_key("row_007"), None);
        assert_eq!(RowKey::from_storage_key("row_61"), None);
        assert_eq!(RowKey::from_storage_key("row_+3"), None);
        assert_eq!(RowKey::from_storage_key("row_"), None);
        assert_eq!(RowKey::from_storage_key("col_3"), None);
    }

    #[test]
    fn column_parsing_is_case_insensitive() {
        assert_eq!(" m ".parse::<Column>().unwrap(), Column::M);
        let err = "X".parse::<Column>().unwrap_err();
        assert_eq!(err, InvalidArgument::UnknownColumn("X".to_string()));
    }

    #[test]
    fn absent_rows_read_as_all_false() {
        let grid = GridState::new();
        let flags = grid.flags(RowKey::new(42).unwrap());
        assert_eq!(flags, RowFlags::default());
        assert!(flags.is_blank());
    }

    #[test]
    fn serializes_rows_in_numeric_order_with_all_columns() {
        let mut grid = GridState::new();
        grid.flags_mut(RowKey::new(10).unwrap()).set(Column::S, true);
        grid.flags_mut(RowKey::new(2).unwrap()).set(Column::L, true);

        let text = serde_json::to_string(&grid).unwrap();
        assert_eq!(
            text,
            r#"{"row_2":{"L":true,"A":false,"M":false,"I":false,"S":false},"row_10":{"L":false,"A":false,"M":false,"I":false,"S":true}}"#
        );
    }

    #[test]
    fn lenient_conversion_keeps_valid_rows_and_defaults_bad_columns() {
        let value = json!({
            "row_1": {"L": true, "A": "yes", "Z": true},
            "row_2": 7,
            "row_99": {"L": true},
            "notes": {"L": true}
        });
        let grid: GridState = serde_json::from_value(value).unwrap();

        assert_eq!(grid.len(), 1);
        let flags = grid.flags(RowKey::new(1).unwrap());
        assert!(flags.l);
        assert!(!flags.a);
        assert!(!grid.contains(RowKey::new(2).unwrap()));
    }

    #[test]
    fn deserializing_a_non_mapping_fails() {
        let err = serde_json::from_value::<GridState>(json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("array"));
    }
}
