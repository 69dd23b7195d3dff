//! Persists generated report content to disk.

use std::path::Path;

use crate::error::Result;

/// Writes whole files, creating parent directories as needed.
pub struct FileWriter {
    verbose: bool,
}

impl FileWriter {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if self.verbose {
            eprintln!("Writing {}", path.display());
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}
