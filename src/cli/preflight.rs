//! Pre-flight checks before expensive operations.
//!
//! Validates that the embedding provider is reachable before starting work
//! that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{KikkError, Result};
use std::path::{Path, PathBuf};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Indexing calls the provider for every video.
    Index,
    /// Search calls the provider once for the query.
    Search,
    /// Listing only reads the store.
    List,
    /// Removal only rewrites the store.
    Remove,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Index | Operation::Search => {
            settings.validate()?;
            let program = &settings.embedding.command[0];
            if find_executable(program).is_none() {
                return Err(KikkError::Config(format!(
                    "Embedding provider '{}' not found. Set embedding.command in the config file.",
                    program
                )));
            }
        }
        Operation::List | Operation::Remove => {
            // Store-only; the provider is never called
        }
    }
    Ok(())
}

/// Resolve an executable the way the shell would.
pub fn find_executable(program: &str) -> Option<PathBuf> {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }

    let search_path = std::env::var_os("PATH")?;
    std::env::split_paths(&search_path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_list_no_requirements() {
        let mut settings = Settings::default();
        settings.embedding.command = vec!["kikk-no-such-embedder-binary".to_string()];
        assert!(check(Operation::List, &settings).is_ok());
        assert!(check(Operation::Search, &settings).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_find_executable() {
        assert!(find_executable("sh").is_some());
        assert!(find_executable("/bin/sh").is_some());
        assert!(find_executable("kikk-no-such-embedder-binary").is_none());
    }
}
