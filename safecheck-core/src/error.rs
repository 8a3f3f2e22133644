use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Failure to load the checker configuration or the safe-library database.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("could not read `{path}`")]
    #[diagnostic(code(safecheck::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed safe library database `{path}`")]
    #[diagnostic(
        code(safecheck::config::library_db),
        help("expected a JSON array of objects with optional \"types\" and \"functions\" string arrays")
    )]
    LibraryDb {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed checker options `{path}`")]
    #[diagnostic(
        code(safecheck::config::options),
        help("known keys: policy, disable_raw_pointers, determinism, unsafe_namespaces, library_db")
    )]
    Options {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no safe_library.json found in `{dir}` or any parent directory")]
    #[diagnostic(code(safecheck::config::library_db_not_found))]
    LibraryDbNotFound { dir: PathBuf },
}
