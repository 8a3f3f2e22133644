use miette::SourceSpan;
use serde::{Deserialize, Serialize};

/// Byte range inside one source file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl From<Span> for SourceSpan {
    fn from(s: Span) -> Self {
        SourceSpan::new(s.start.into(), s.len)
    }
}

pub fn span(start: usize, len: usize) -> Span {
    Span { start, len }
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    /// File belongs to a system include directory (library code, not user code).
    #[serde(default)]
    pub is_system: bool,
}

/// A location in the translation unit. A location without a file is invalid
/// and is treated like a system location by the checker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub file: Option<FileId>,
    #[serde(default)]
    pub span: Span,
}

impl Location {
    pub fn new(file: FileId, span: Span) -> Self {
        Self {
            file: Some(file),
            span,
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.file.is_some()
    }
}
