#![forbid(unsafe_code)]

//! Read-only program model consumed by the safe-code checker.
//!
//! A frontend lowers one C++ translation unit into a [`TranslationUnit`]:
//! interned types, declaration contexts, records, functions, variables,
//! statements and expressions. The checker never mutates it.

pub mod builder;
pub mod decl;
pub mod expr;
pub mod span;
pub mod stmt;
pub mod types;
pub mod unit;
pub mod validate;

pub use builder::UnitBuilder;
pub use decl::{
    Attr, AttrSet, BaseSpecifier, ContextId, ContextKind, DeclContext, FieldDecl, FunctionDecl,
    FunctionId, FunctionKind, OverloadedOperator, RecordDecl, RecordDefinition, RecordId,
    RecordTag, TemplateArg, VarDecl, VarId, VarKind,
};
pub use expr::{
    BinaryOp, CallExpr, CallKind, Capture, CaptureKind, CastKind, DeclRef, Expr, ExprKind,
    LambdaExpr, UnaryOp,
};
pub use span::{FileId, Location, SourceFile, Span, span, span_between};
pub use stmt::{Stmt, StmtId, StmtKind};
pub use types::{BuiltinKind, QualType, TypeId, TypeKind, TypeTable};
pub use unit::TranslationUnit;
pub use validate::UnitError;
