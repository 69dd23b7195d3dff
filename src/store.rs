//! Source text retrieval for annotation.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{CovrepError, Result};

/// Resolves a coverage path to its source text. Lookup failure is a hard
/// error; the annotator cannot proceed without source for a file it must
/// annotate.
pub trait Store {
    fn get(&self, path: &str) -> Result<String>;

    fn has_key(&self, path: &str) -> bool;
}

/// Looks paths up directly on the filesystem; keys are absolute file
/// paths and nothing is ever stored.
#[derive(Default)]
pub struct FsStore;

impl Store for FsStore {
    fn get(&self, path: &str) -> Result<String> {
        std::fs::read_to_string(path).map_err(|_| CovrepError::SourceNotFound(path.to_string()))
    }

    fn has_key(&self, path: &str) -> bool {
        Path::new(path).is_file()
    }
}

/// Map-backed store for tests and pre-loaded sources.
#[derive(Default)]
pub struct MemoryStore {
    sources: HashMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: &str, contents: &str) {
        self.sources.insert(path.to_string(), contents.to_string());
    }
}

impl Store for MemoryStore {
    fn get(&self, path: &str) -> Result<String> {
        self.sources
            .get(path)
            .cloned()
            .ok_or_else(|| CovrepError::SourceNotFound(path.to_string()))
    }

    fn has_key(&self, path: &str) -> bool {
        self.sources.contains_key(path)
    }
}
