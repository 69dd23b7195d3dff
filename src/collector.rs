//! Thin in-memory holder for per-file coverage records.
//!
//! Merging hit counts across instrumentation runs is out of scope here;
//! the collector only keys records by path (last write wins) and hands
//! them to reports in sorted order.

use crate::model::{CoverageMap, FileCoverage};

#[derive(Default)]
pub struct Collector {
    map: CoverageMap,
}

impl Collector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single file record, keyed by its path.
    pub fn add_file(&mut self, fc: FileCoverage) {
        self.map.insert(fc.path.clone(), fc);
    }

    /// Add a parsed `coverage-final.json` object. Entries whose `path`
    /// field is empty inherit their top-level key.
    pub fn add_map(&mut self, map: CoverageMap) {
        for (path, mut fc) in map {
            if fc.path.is_empty() {
                fc.path = path.clone();
            }
            self.map.insert(path, fc);
        }
    }

    /// All file paths, sorted.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    #[must_use]
    pub fn file_coverage_for(&self, path: &str) -> Option<&FileCoverage> {
        self.map.get(path)
    }

    #[must_use]
    pub fn coverage_map(&self) -> &CoverageMap {
        &self.map
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_map_fills_path_from_key() {
        let mut collector = Collector::new();
        let map: CoverageMap =
            serde_json::from_str(r#"{ "/src/a.js": { "l": { "1": 2 } } }"#).unwrap();
        collector.add_map(map);
        let fc = collector.file_coverage_for("/src/a.js").unwrap();
        assert_eq!(fc.path, "/src/a.js");
        assert_eq!(fc.l[&1], 2);
    }

    #[test]
    fn test_last_write_wins() {
        let mut collector = Collector::new();
        let mut a = FileCoverage::new("/src/a.js".to_string());
        a.l.insert(1, 1);
        collector.add_file(a);
        let mut b = FileCoverage::new("/src/a.js".to_string());
        b.l.insert(1, 9);
        collector.add_file(b);
        assert_eq!(collector.files().count(), 1);
        assert_eq!(collector.file_coverage_for("/src/a.js").unwrap().l[&1], 9);
    }
}
