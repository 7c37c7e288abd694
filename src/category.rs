// Category id -> display name lookup shared by every pipeline.

use crate::error::{ConvertError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Name used for ids the table does not know.
pub const FALLBACK_CATEGORY: &str = "Разное";

const BUILTIN: [(i64, &str); 13] = [
    (1, "Хлебобулочные"),
    (2, "Молочные"),
    (3, "Мясо и птица"),
    (4, "Колбасные изделия"),
    (5, "Рыба"),
    (6, "Яйца"),
    (7, "Масла и жиры"),
    (8, "Овощи и зелень"),
    (9, "Фрукты и ягоды"),
    (10, "Орехи и семена"),
    (11, "Сладкое"),
    (12, "Напитки"),
    (13, "Алкоголь"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTable {
    names: BTreeMap<i64, String>,
}

impl CategoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The thirteen categories of the nutrition dump.
    pub fn builtin() -> Self {
        let names = BUILTIN
            .iter()
            .map(|(id, name)| (*id, name.to_string()))
            .collect();
        Self { names }
    }

    /// Load a table from a JSON object such as `{"1": "Хлебобулочные"}`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        Self::from_json_str(&text).map_err(|reason| ConvertError::CategoryConfig {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn from_json_str(text: &str) -> std::result::Result<Self, String> {
        let raw: BTreeMap<String, String> =
            serde_json::from_str(text).map_err(|e| format!("invalid category map: {}", e))?;
        let mut table = Self::new();
        for (key, name) in raw {
            let id = key
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("category id {:?} is not an integer", key))?;
            table.insert(id, name);
        }
        Ok(table)
    }

    pub fn insert(&mut self, id: i64, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    pub fn get(&self, id: i64) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Display name for `id`, or [`FALLBACK_CATEGORY`].
    pub fn resolve(&self, id: i64) -> &str {
        self.get(id).unwrap_or(FALLBACK_CATEGORY)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.names.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Next id a SERIAL column would hand out after the current entries.
    pub fn next_id(&self) -> i64 {
        self.names.keys().next_back().map_or(1, |id| id + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_ids_resolve_to_fixed_names() {
        let table = CategoryTable::builtin();
        assert_eq!(table.len(), 13);
        for (id, name) in BUILTIN {
            assert_eq!(table.resolve(id), name);
        }
        assert_eq!(table.resolve(1), "Хлебобулочные");
        assert_eq!(table.resolve(13), "Алкоголь");
    }

    #[test]
    fn unknown_ids_fall_back() {
        let table = CategoryTable::builtin();
        assert_eq!(table.resolve(0), FALLBACK_CATEGORY);
        assert_eq!(table.resolve(14), FALLBACK_CATEGORY);
        assert_eq!(table.resolve(-3), FALLBACK_CATEGORY);
    }

    #[test]
    fn next_id_follows_highest_key() {
        assert_eq!(CategoryTable::new().next_id(), 1);
        assert_eq!(CategoryTable::builtin().next_id(), 14);
    }

    #[test]
    fn loads_table_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"1": "Bakery", " 2 ": "Dairy"}}"#).unwrap();
        let table = CategoryTable::from_json_file(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve(1), "Bakery");
        assert_eq!(table.resolve(2), "Dairy");
        assert_eq!(table.resolve(3), FALLBACK_CATEGORY);
    }

    #[test]
    fn rejects_non_integer_keys() {
        let err = CategoryTable::from_json_str(r#"{"bread": "Bakery"}"#).unwrap_err();
        assert!(err.contains("not an integer"));
        assert!(CategoryTable::from_json_str("[1, 2]").is_err());
    }

    #[test]
    fn missing_json_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CategoryTable::from_json_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConvertError::Io { .. }));
    }
}
