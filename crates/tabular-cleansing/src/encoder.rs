//! Ordinal encoding of categorical columns.
//!
//! Distinct strings get codes in first-seen order. Each mapping remembers a
//! fingerprint of the column it was built from; re-applying it to a column
//! with a different fingerprint leaves that column's text untouched.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use tracing::{debug, warn};

use crate::types::{Cell, ColumnKind, Table};

/// Code written for a Missing cell in a categorical column.
pub const MISSING_CODE: f64 = -1.0;

/// Distinct values of one column in first-seen order; position is the code.
///
/// Serializes as a JSON object `{value: code}` in code order. The fingerprint
/// is not part of the wire form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoricalMapping {
    values: Vec<String>,
    index: HashMap<String, usize>,
    fingerprint: String,
}

impl CategoricalMapping {
    /// Build a mapping by one in-order scan over the given cells.
    pub fn from_cells<'a>(column: &str, cells: impl Iterator<Item = &'a Cell>) -> Self {
        let cells: Vec<&Cell> = cells.collect();
        let mut mapping = Self {
            fingerprint: fingerprint(column, cells.iter().copied()),
            ..Default::default()
        };
        for cell in cells {
            if let Cell::Text(value) = cell {
                mapping.insert(value);
            }
        }
        mapping
    }

    fn insert(&mut self, value: &str) -> usize {
        if let Some(&code) = self.index.get(value) {
            return code;
        }
        let code = self.values.len();
        self.values.push(value.to_string());
        self.index.insert(value.to_string(), code);
        code
    }

    pub fn code_of(&self, value: &str) -> Option<usize> {
        self.index.get(value).copied()
    }

    pub fn decode(&self, code: usize) -> Option<&str> {
        self.values.get(code).map(String::as_str)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Iterate `(value, code)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.values.iter().enumerate().map(|(code, v)| (v.as_str(), code))
    }
}

impl Serialize for CategoricalMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (value, code) in self.iter() {
            map.serialize_entry(value, &code)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CategoricalMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = CategoricalMapping;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of value -> code")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, usize)> = Vec::new();
                while let Some((value, code)) = access.next_entry::<String, usize>()? {
                    entries.push((value, code));
                }
                entries.sort_by_key(|(_, code)| *code);

                let mut mapping = CategoricalMapping::default();
                for (expected, (value, code)) in entries.into_iter().enumerate() {
                    if code != expected {
                        return Err(serde::de::Error::custom(format!(
                            "codes must be contiguous from 0, found {} at position {}",
                            code, expected
                        )));
                    }
                    mapping.insert(&value);
                }
                Ok(mapping)
            }
        }

        deserializer.deserialize_map(MappingVisitor)
    }
}

/// 64-bit hash of a column's name and cells, as lowercase hex.
pub fn fingerprint<'a>(column: &str, cells: impl Iterator<Item = &'a Cell>) -> String {
    let mut hasher = DefaultHasher::new();
    column.hash(&mut hasher);
    for cell in cells {
        match cell {
            Cell::Missing => 0u8.hash(&mut hasher),
            Cell::Number(v) => {
                1u8.hash(&mut hasher);
                v.to_bits().hash(&mut hasher);
            }
            Cell::Text(s) => {
                2u8.hash(&mut hasher);
                s.hash(&mut hasher);
            }
        }
    }
    format!("{:016x}", hasher.finish())
}

/// Encodes categorical (and text label) columns to integer codes.
pub struct CategoricalEncoder;

impl CategoricalEncoder {
    /// Build a mapping for every categorical column, plus the label if it
    /// holds text, and encode the table in place.
    ///
    /// Missing categorical cells become [`MISSING_CODE`]; missing labels stay
    /// Missing.
    pub fn encode(table: &mut Table) -> BTreeMap<String, CategoricalMapping> {
        let mappings = Self::build_mappings(table);
        Self::encode_with(table, &mappings);
        mappings
    }

    /// Build mappings without touching the table.
    ///
    /// Each fingerprint covers the table as given, so build from the full
    /// classified table when rows may be removed before encoding.
    pub fn build_mappings(table: &Table) -> BTreeMap<String, CategoricalMapping> {
        let mut targets = table.categorical_indices();
        if let Some(label) = table.label_index()
            && table.column_cells(label).any(|c| c.as_text().is_some())
        {
            targets.push(label);
        }

        targets
            .into_iter()
            .map(|idx| {
                let name = table.columns()[idx].name.clone();
                let mapping = CategoricalMapping::from_cells(&name, table.column_cells(idx));
                (name, mapping)
            })
            .collect()
    }

    /// Encode every mapped column present in `table`, without a fingerprint
    /// check.
    pub fn encode_with(table: &mut Table, mappings: &BTreeMap<String, CategoricalMapping>) {
        for (name, mapping) in mappings {
            if let Some(idx) = table.index_of(name) {
                Self::encode_column(table, idx, mapping);
                debug!("Encoded '{}' with {} categories", name, mapping.len());
            }
        }
    }

    /// Re-apply existing mappings to a table.
    ///
    /// Columns whose fingerprint does not match their mapping are passed
    /// through unchanged. Returns the names of those columns.
    pub fn apply(table: &mut Table, mappings: &BTreeMap<String, CategoricalMapping>) -> Vec<String> {
        let mut passed_through = Vec::new();

        for (name, mapping) in mappings {
            let Some(idx) = table.index_of(name) else {
                continue;
            };
            let current = fingerprint(name, table.column_cells(idx));
            if current != mapping.fingerprint() {
                warn!(
                    "Mapping for '{}' was built from a different dataset, leaving values as text",
                    name
                );
                passed_through.push(name.clone());
                continue;
            }
            Self::encode_column(table, idx, mapping);
        }

        passed_through
    }

    fn encode_column(table: &mut Table, idx: usize, mapping: &CategoricalMapping) {
        let is_label = table.kind(idx) == ColumnKind::Label;
        table.map_column(idx, |cell| match cell {
            Cell::Text(value) => match mapping.code_of(value) {
                Some(code) => Cell::Number(code as f64),
                None => cell.clone(),
            },
            Cell::Missing if !is_label => Cell::Number(MISSING_CODE),
            other => other.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnSpec;
    use pretty_assertions::assert_eq;

    fn colors(values: &[Option<&str>]) -> Table {
        Table::new(
            vec![
                ColumnSpec::new("color", ColumnKind::Categorical),
                ColumnSpec::new("y", ColumnKind::Label),
            ],
            values
                .iter()
                .map(|v| {
                    vec![
                        v.map(|s| Cell::Text(s.to_string())).unwrap_or(Cell::Missing),
                        Cell::Number(0.0),
                    ]
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_first_seen_codes() {
        let mut table = colors(&[Some("red"), Some("blue"), Some("red"), Some("green")]);
        let mappings = CategoricalEncoder::encode(&mut table);

        let mapping = &mappings["color"];
        assert_eq!(mapping.code_of("red"), Some(0));
        assert_eq!(mapping.code_of("blue"), Some(1));
        assert_eq!(mapping.code_of("green"), Some(2));
        assert_eq!(table.numeric_values(0), vec![0.0, 1.0, 0.0, 2.0]);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let values = [Some("b"), Some("a"), None, Some("b")];
        let mut first = colors(&values);
        let mut second = colors(&values);
        let m1 = CategoricalEncoder::encode(&mut first);
        let m2 = CategoricalEncoder::encode(&mut second);
        assert_eq!(m1, m2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_uses_sentinel() {
        let mut table = colors(&[Some("a"), None]);
        CategoricalEncoder::encode(&mut table);
        assert_eq!(table.cell(1, 0), &Cell::Number(MISSING_CODE));
    }

    #[test]
    fn test_text_label_keeps_missing() {
        let mut table = Table::new(
            vec![
                ColumnSpec::new("x", ColumnKind::Numeric),
                ColumnSpec::new("species", ColumnKind::Label),
            ],
            vec![
                vec![Cell::Number(1.0), Cell::Text("cat".into())],
                vec![Cell::Number(2.0), Cell::Missing],
                vec![Cell::Number(3.0), Cell::Text("dog".into())],
            ],
        )
        .unwrap();
        let mappings = CategoricalEncoder::encode(&mut table);
        assert_eq!(mappings["species"].values(), &["cat".to_string(), "dog".to_string()]);
        assert_eq!(table.cell(1, 1), &Cell::Missing);
        assert_eq!(table.cell(2, 1), &Cell::Number(1.0));
    }

    #[test]
    fn test_apply_matching_fingerprint() {
        let original = colors(&[Some("red"), Some("blue")]);
        let mut encoded = original.clone();
        let mappings = CategoricalEncoder::encode(&mut encoded);

        let mut again = original.clone();
        let passed = CategoricalEncoder::apply(&mut again, &mappings);
        assert!(passed.is_empty());
        assert_eq!(again, encoded);
    }

    #[test]
    fn test_mappings_built_before_rows_removed_still_apply() {
        let original = colors(&[Some("red"), Some("blue"), Some("green")]);
        let mappings = CategoricalEncoder::build_mappings(&original);

        let mut shrunk = original.clone();
        shrunk.retain_rows(|row| row[0] != Cell::Text("blue".into()));
        CategoricalEncoder::encode_with(&mut shrunk, &mappings);
        assert_eq!(shrunk.numeric_values(0), vec![0.0, 2.0]);

        let mut again = original.clone();
        assert!(CategoricalEncoder::apply(&mut again, &mappings).is_empty());
    }

    #[test]
    fn test_apply_mismatch_passes_through() {
        let mut source = colors(&[Some("red"), Some("blue")]);
        let mappings = CategoricalEncoder::encode(&mut source);

        let other = colors(&[Some("blue"), Some("purple")]);
        let mut target = other.clone();
        let passed = CategoricalEncoder::apply(&mut target, &mappings);
        assert_eq!(passed, vec!["color".to_string()]);
        assert_eq!(target, other);
    }

    #[test]
    fn test_mapping_json_preserves_code_order() {
        let mut table = colors(&[Some("red"), Some("blue"), Some("green")]);
        let mappings = CategoricalEncoder::encode(&mut table);
        let json = serde_json::to_string(&mappings["color"]).unwrap();
        assert_eq!(json, r#"{"red":0,"blue":1,"green":2}"#);

        let back: CategoricalMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(back.values(), mappings["color"].values());
        assert_eq!(back.fingerprint(), "");
    }

    #[test]
    fn test_mapping_json_rejects_gaps() {
        let result: Result<CategoricalMapping, _> = serde_json::from_str(r#"{"a":0,"b":2}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_fingerprint_depends_on_name_and_values() {
        let cells = vec![Cell::Text("a".into()), Cell::Missing];
        assert_eq!(fingerprint("c", cells.iter()), fingerprint("c", cells.iter()));
        assert_ne!(fingerprint("c", cells.iter()), fingerprint("d", cells.iter()));
        assert_ne!(
            fingerprint("c", cells.iter()),
            fingerprint("c", cells.iter().take(1))
        );
    }
}
