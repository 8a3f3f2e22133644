//! Checker configuration: options file and safe-library database.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::kinds::{NamePolicy, Policy};

/// File name looked up by [`Whitelist::find_in_ancestors`].
pub const LIBRARY_DB_FILE: &str = "safe_library.json";

/// Library types and functions that are trusted without inspection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Whitelist {
    pub safe_types: BTreeSet<String>,
    pub safe_functions: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LibraryEntry {
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    functions: Vec<String>,
}

impl Whitelist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<LibraryEntry> = serde_json::from_str(text)?;
        let mut wl = Self::new();
        for entry in entries {
            wl.safe_types.extend(entry.types);
            wl.safe_functions.extend(entry.functions);
        }
        Ok(wl)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let wl = Self::from_json_str(&text).map_err(|source| ConfigError::LibraryDb {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(
            path = %path.display(),
            types = wl.safe_types.len(),
            functions = wl.safe_functions.len(),
            "loaded safe library database"
        );
        Ok(wl)
    }

    /// Looks for `safe_library.json` in `dir` and then in each parent directory.
    pub fn find_in_ancestors(dir: &Path) -> Option<PathBuf> {
        dir.ancestors()
            .map(|d| d.join(LIBRARY_DB_FILE))
            .find(|candidate| candidate.is_file())
    }

    pub fn detect(dir: &Path) -> Result<Self, ConfigError> {
        match Self::find_in_ancestors(dir) {
            Some(path) => Self::load(&path),
            None => Err(ConfigError::LibraryDbNotFound {
                dir: dir.to_path_buf(),
            }),
        }
    }

    pub fn with_types<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.safe_types.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.safe_functions.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn is_safe_type(&self, name: &str) -> bool {
        self.safe_types.contains(name)
    }

    pub fn is_safe_function(&self, name: &str) -> bool {
        self.safe_functions.contains(name)
    }
}

/// Contents of `safecheck.toml`. Every key is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckerOptions {
    pub policy: Policy,
    /// Reject every raw pointer variable declaration.
    pub disable_raw_pointers: bool,
    /// Run the determinism rule.
    pub determinism: bool,
    /// Extra namespaces whose members are trusted like memory-unsafe ones.
    pub unsafe_namespaces: Vec<String>,
    /// Safe library database; auto-detected next to the input when absent.
    pub library_db: Option<PathBuf>,
}

impl CheckerOptions {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Options {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Everything the checker needs to know besides the program itself.
/// Built once per run and shared by reference.
#[derive(Clone, Debug, Default)]
pub struct CheckerConfig {
    pub names: NamePolicy,
    pub whitelist: Whitelist,
    pub options: CheckerOptions,
}

impl CheckerConfig {
    pub fn new(options: CheckerOptions, whitelist: Whitelist) -> Self {
        Self {
            names: NamePolicy::for_policy(options.policy),
            whitelist,
            options,
        }
    }

    pub fn with_whitelist(whitelist: Whitelist) -> Self {
        Self::new(CheckerOptions::default(), whitelist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_db_merges_entries() {
        let wl = Whitelist::from_json_str(
            r#"[
                {"types": ["std::string"], "functions": ["std::strlen"]},
                {"types": ["std::vector"]},
                {}
            ]"#,
        )
        .unwrap();
        assert!(wl.is_safe_type("std::string"));
        assert!(wl.is_safe_type("std::vector"));
        assert!(wl.is_safe_function("std::strlen"));
        assert!(!wl.is_safe_function("std::string"));
    }

    #[test]
    fn library_db_rejects_unknown_keys_and_non_arrays() {
        assert!(Whitelist::from_json_str(r#"[{"classes": []}]"#).is_err());
        assert!(Whitelist::from_json_str(r#"{"types": []}"#).is_err());
        assert!(Whitelist::from_json_str(r#"[{"types": [1]}]"#).is_err());
    }

    #[test]
    fn options_default_when_empty() {
        let opts = CheckerOptions::from_toml_str("").unwrap();
        assert_eq!(opts, CheckerOptions::default());
        assert_eq!(opts.policy, Policy::Safememory);
    }

    #[test]
    fn options_parse_every_key() {
        let opts = CheckerOptions::from_toml_str(
            r#"
policy = "nodecpp"
disable_raw_pointers = true
determinism = true
unsafe_namespaces = ["legacy", "vendor::raw"]
library_db = "db/safe_library.json"
"#,
        )
        .unwrap();
        assert_eq!(opts.policy, Policy::Nodecpp);
        assert!(opts.disable_raw_pointers);
        assert!(opts.determinism);
        assert_eq!(opts.unsafe_namespaces, vec!["legacy", "vendor::raw"]);
        assert_eq!(opts.library_db, Some(PathBuf::from("db/safe_library.json")));

        let cfg = CheckerConfig::new(opts, Whitelist::new());
        assert!(!cfg.names.hashmap_rules);
    }

    #[test]
    fn options_reject_unknown_policy_and_keys() {
        assert!(CheckerOptions::from_toml_str(r#"policy = "boost""#).is_err());
        assert!(CheckerOptions::from_toml_str("verbose = true").is_err());
    }

    #[test]
    fn database_is_found_in_a_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("src").join("net");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(LIBRARY_DB_FILE), r#"[{"types": ["std::string"]}]"#).unwrap();

        let found = Whitelist::find_in_ancestors(&nested).unwrap();
        assert_eq!(found, dir.path().join(LIBRARY_DB_FILE));
        let wl = Whitelist::detect(&nested).unwrap();
        assert!(wl.is_safe_type("std::string"));
    }

    #[test]
    fn missing_database_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = Whitelist::load(&dir.path().join(LIBRARY_DB_FILE)).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
