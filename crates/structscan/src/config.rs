//! Scanner configuration.
//!
//! There is one knob: whether a result column that maps to no record field
//! aborts scanning (the default) or is read and dropped. It can be set
//! process-wide with [`ignore_nonexistent_fields`], passed explicitly to a
//! scanner through [`StructScanner::with_config`](crate::StructScanner::with_config),
//! or loaded from TOML:
//!
//! ```toml
//! ignore_unmapped_columns = true
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;

static IGNORE_UNMAPPED_COLUMNS: AtomicBool = AtomicBool::new(false);

/// Set whether columns with no mapped field are silently ignored by every
/// scanner that was not given an explicit [`Config`].
///
/// Takes effect for scanners that resolve their columns after the call.
pub fn ignore_nonexistent_fields(ignore: bool) {
    IGNORE_UNMAPPED_COLUMNS.store(ignore, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Drop unmapped columns instead of panicking on them.
    pub ignore_unmapped_columns: bool,
}

impl Config {
    /// Strict configuration: unmapped columns are fatal.
    pub fn strict() -> Self {
        Config {
            ignore_unmapped_columns: false,
        }
    }

    pub fn ignoring_unmapped() -> Self {
        Config {
            ignore_unmapped_columns: true,
        }
    }

    /// Snapshot of the process-wide setting.
    pub fn global() -> Self {
        Config {
            ignore_unmapped_columns: IGNORE_UNMAPPED_COLUMNS.load(Ordering::Relaxed),
        }
    }

    /// Read and parse a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Config, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_toml(&content)
    }

    /// Parse a TOML configuration string.
    pub fn from_toml(content: &str) -> Result<Config, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config() {
        let config = Config::from_toml("ignore_unmapped_columns = true\n").unwrap();
        assert_eq!(config, Config::ignoring_unmapped());
    }

    #[test]
    fn empty_config_is_strict() {
        assert_eq!(Config::from_toml("").unwrap(), Config::strict());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = Config::from_toml("ignore_unmapped_columns = \"yes\"").unwrap_err();
        assert!(err.starts_with("Failed to parse config"));
    }

    #[test]
    fn config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("structscan.toml");
        std::fs::write(&path, "ignore_unmapped_columns = false\n").unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), Config::strict());

        let missing = Config::from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(missing.starts_with("Failed to read"));
    }
}
