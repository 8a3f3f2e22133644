use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use safecheck_ast::{TranslationUnit, UnitError};
use safecheck_core::{CheckerConfig, CheckerOptions, ConfigError, Whitelist};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("could not read `{path}`")]
    #[diagnostic(code(safecheck::load::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed translation unit `{path}`")]
    #[diagnostic(
        code(safecheck::load::unit),
        help("the input must be a translation unit serialized as JSON by the frontend")
    )]
    Unit {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("inconsistent translation unit `{path}`")]
    #[diagnostic(
        code(safecheck::load::invalid),
        help("the frontend produced ids that do not match the unit's tables")
    )]
    Invalid {
        path: PathBuf,
        #[source]
        source: UnitError,
    },

    #[error("{errors} safety error(s) found")]
    #[diagnostic(code(safecheck::check::failed))]
    Violations { errors: usize },
}

pub fn load_unit(path: &Path) -> Result<TranslationUnit, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut unit: TranslationUnit =
        serde_json::from_str(&text).map_err(|source| LoadError::Unit {
            path: path.to_path_buf(),
            source,
        })?;
    unit.validate().map_err(|source| LoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    unit.link_parents();
    tracing::debug!(
        path = %path.display(),
        records = unit.records.len(),
        functions = unit.functions.len(),
        vars = unit.vars.len(),
        "loaded translation unit"
    );
    Ok(unit)
}

/// Options from `config` (defaults when absent) and the safe library
/// database from, in order: `library_db`, the options file, or the nearest
/// `safe_library.json` above the unit.
pub fn load_config(
    unit: &Path,
    config: Option<&Path>,
    library_db: Option<&Path>,
) -> Result<CheckerConfig, ConfigError> {
    let options = match config {
        Some(path) => CheckerOptions::load(path)?,
        None => CheckerOptions::default(),
    };

    // relative database paths in the options file are relative to that file
    let from_options = options.library_db.as_ref().map(|db| match config.and_then(Path::parent) {
        Some(dir) if db.is_relative() => dir.join(db),
        _ => db.clone(),
    });

    let whitelist = match library_db.map(Path::to_path_buf).or(from_options) {
        Some(path) => Whitelist::load(&path)?,
        None => {
            let dir = unit.parent().unwrap_or(Path::new("."));
            match Whitelist::find_in_ancestors(dir) {
                Some(path) => Whitelist::load(&path)?,
                None => {
                    tracing::warn!(
                        dir = %dir.display(),
                        "no safe library database found, only built-in names are trusted"
                    );
                    Whitelist::new()
                }
            }
        }
    };

    Ok(CheckerConfig::new(options, whitelist))
}
