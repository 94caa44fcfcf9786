//! Category name lookup table, fetched once per ingestion call.
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    by_name: HashMap<String, i64>,
    by_folded_name: HashMap<String, i64>,
}

impl CategoryTable {
    pub fn new(entries: impl IntoIterator<Item = (String, i64)>) -> Self {
        let mut by_name = HashMap::new();
        let mut by_folded_name = HashMap::new();
        for (name, id) in entries {
            by_folded_name.entry(name.to_lowercase()).or_insert(id);
            by_name.insert(name, id);
        }
        Self {
            by_name,
            by_folded_name,
        }
    }

    /// Exact name match first, then a case-insensitive one.
    pub fn resolve(&self, name: &str) -> Option<i64> {
        let name = name.trim();
        self.by_name
            .get(name)
            .or_else(|| self.by_folded_name.get(&name.to_lowercase()))
            .copied()
    }

    /// All known category names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
