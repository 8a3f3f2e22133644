#![forbid(unsafe_code)]

//! Safe-code analysis core.
//!
//! Classifies the types of a [`safecheck_ast::TranslationUnit`] as heap safe,
//! deterministic, deep-const or stack-only, validates the shape of naked
//! structs and unions, and checks that non-owning values never flow into a
//! destination that outlives them. The [`rules`] layer drives all of it over
//! user code and collects [`Diagnostic`]s.

pub mod checker_data;
pub mod config;
pub mod context;
pub mod diag;
pub mod error;
pub mod kinds;
pub mod qualified_name;
pub mod rules;
pub mod scope;
pub mod structural;
pub mod type_checker;

pub use checker_data::CheckerData;
pub use config::{CheckerConfig, CheckerOptions, LIBRARY_DB_FILE, Whitelist};
pub use context::{CheckContext, UnsafeNamespaceSet};
pub use diag::{DiagHelper, Diagnostic, DiagnosticSink, Diagnostics, INTERNAL_ERROR, Severity};
pub use error::ConfigError;
pub use kinds::{NamePolicy, Policy};
pub use qualified_name::{qualified_name, type_name, type_spelling};
pub use rules::{Checker, Rule, UnknownRule};
pub use scope::{NakedPtrScopeChecker, OutputScope};
pub use type_checker::{SafetyVerdict, TypeChecker};
