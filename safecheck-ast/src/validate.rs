//! Structural checks for units that did not come from the builder.
//!
//! Every id must address an existing arena slot, and the links the checker
//! follows upward (context parents, statement parents, typedef targets) must
//! be acyclic. Arena order makes the latter cheap: a referenced type, a
//! parent context and a child statement always precede their user.

use thiserror::Error;

use crate::decl::{ContextKind, TemplateArg};
use crate::expr::{CaptureKind, DeclRef, Expr, ExprKind};
use crate::stmt::StmtKind;
use crate::types::{QualType, TypeKind};
use crate::unit::TranslationUnit;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("the unit has no translation-unit context")]
    NoRoot,

    #[error("{owner} refers to {kind} #{index}, but the unit has {len}")]
    OutOfRange {
        owner: String,
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("{owner} refers to {kind} #{index}, which does not precede it")]
    Order {
        owner: String,
        kind: &'static str,
        index: usize,
    },
}

#[derive(Clone, Copy)]
enum Arena {
    Type,
    Context,
    Record,
    Function,
    Variable,
    Statement,
}

impl Arena {
    fn name(self) -> &'static str {
        match self {
            Arena::Type => "type",
            Arena::Context => "context",
            Arena::Record => "record",
            Arena::Function => "function",
            Arena::Variable => "variable",
            Arena::Statement => "statement",
        }
    }
}

struct Bounds<'u> {
    unit: &'u TranslationUnit,
}

impl Bounds<'_> {
    fn len(&self, arena: Arena) -> usize {
        match arena {
            Arena::Type => self.unit.types.len(),
            Arena::Context => self.unit.contexts.len(),
            Arena::Record => self.unit.records.len(),
            Arena::Function => self.unit.functions.len(),
            Arena::Variable => self.unit.vars.len(),
            Arena::Statement => self.unit.stmts.len(),
        }
    }

    fn id(&self, owner: &str, arena: Arena, index: usize) -> Result<(), UnitError> {
        let len = self.len(arena);
        if index >= len {
            return Err(UnitError::OutOfRange {
                owner: owner.to_string(),
                kind: arena.name(),
                index,
                len,
            });
        }
        Ok(())
    }

    /// Like `id`, and the target must also precede slot `own` of the same arena.
    fn before(&self, owner: &str, arena: Arena, index: usize, own: usize) -> Result<(), UnitError> {
        self.id(owner, arena, index)?;
        if index >= own {
            return Err(UnitError::Order {
                owner: owner.to_string(),
                kind: arena.name(),
                index,
            });
        }
        Ok(())
    }

    fn ty(&self, owner: &str, qt: QualType) -> Result<(), UnitError> {
        self.id(owner, Arena::Type, qt.ty.index())
    }

    fn type_kind(&self, own: usize, kind: &TypeKind) -> Result<(), UnitError> {
        let owner = format!("type #{own}");
        match kind {
            TypeKind::Pointer(q) | TypeKind::LValueReference(q) | TypeKind::RValueReference(q) => {
                self.before(&owner, Arena::Type, q.ty.index(), own)
            }
            TypeKind::Array { element, .. } => self.before(&owner, Arena::Type, element.ty.index(), own),
            TypeKind::Typedef { target, .. } => self.before(&owner, Arena::Type, target.ty.index(), own),
            TypeKind::Function { ret, params } => {
                for q in std::iter::once(ret).chain(params) {
                    self.before(&owner, Arena::Type, q.ty.index(), own)?;
                }
                Ok(())
            }
            TypeKind::Record(r) => self.id(&owner, Arena::Record, r.index()),
            TypeKind::Builtin(_)
            | TypeKind::Enum(_)
            | TypeKind::TemplateParam { .. }
            | TypeKind::Dependent(_) => Ok(()),
        }
    }

    fn expr(&self, owner: &str, root: &Expr) -> Result<(), UnitError> {
        let mut nodes = Vec::new();
        root.walk(&mut |e| nodes.push(e));
        for e in nodes {
            self.ty(owner, e.ty)?;
            match &e.kind {
                ExprKind::DeclRef(DeclRef::Var(v)) => self.id(owner, Arena::Variable, v.index())?,
                ExprKind::DeclRef(DeclRef::Function(f)) => self.id(owner, Arena::Function, f.index())?,
                ExprKind::DeclRef(DeclRef::Field(r, _)) => self.id(owner, Arena::Record, r.index())?,
                ExprKind::Call(call) => {
                    if let Some(f) = call.callee {
                        self.id(owner, Arena::Function, f.index())?;
                    }
                }
                ExprKind::Construct { ctor: Some(f), .. } => self.id(owner, Arena::Function, f.index())?,
                ExprKind::Lambda(lambda) => {
                    if let Some(r) = lambda.record {
                        self.id(owner, Arena::Record, r.index())?;
                    }
                    for c in &lambda.captures {
                        if let CaptureKind::ByCopy(v) | CaptureKind::ByRef(v) = c.kind {
                            self.id(owner, Arena::Variable, v.index())?;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl TranslationUnit {
    /// Checks that the unit is well formed enough to be linked and checked.
    /// Units assembled through [`crate::UnitBuilder`] always pass.
    pub fn validate(&self) -> Result<(), UnitError> {
        if self
            .contexts
            .first()
            .is_none_or(|c| c.kind != ContextKind::TranslationUnit)
        {
            return Err(UnitError::NoRoot);
        }
        let b = Bounds { unit: self };

        for (i, kind) in self.types.kinds().iter().enumerate() {
            b.type_kind(i, kind)?;
        }

        for (i, c) in self.contexts.iter().enumerate() {
            let owner = format!("context #{i}");
            if let Some(p) = c.parent {
                b.before(&owner, Arena::Context, p.index(), i)?;
            }
            match c.kind {
                ContextKind::Record(r) => b.id(&owner, Arena::Record, r.index())?,
                ContextKind::Function(f) => b.id(&owner, Arena::Function, f.index())?,
                _ => {}
            }
        }

        for (i, r) in self.records.iter().enumerate() {
            let owner = format!("record '{}' (#{i})", r.name);
            b.id(&owner, Arena::Context, r.context.index())?;
            if let Some(p) = r.pattern {
                b.id(&owner, Arena::Record, p.index())?;
            }
            for arg in &r.template_args {
                if let TemplateArg::Type(q) = arg {
                    b.ty(&owner, *q)?;
                }
            }
            for field in r.fields() {
                b.ty(&owner, field.ty)?;
            }
            for base in r.bases() {
                b.ty(&owner, base.ty)?;
            }
            for m in r.methods() {
                b.id(&owner, Arena::Function, m.index())?;
            }
        }

        for (i, f) in self.functions.iter().enumerate() {
            let owner = format!("function '{}' (#{i})", f.name);
            b.id(&owner, Arena::Context, f.context.index())?;
            b.ty(&owner, f.ret)?;
            for p in &f.params {
                b.id(&owner, Arena::Variable, p.index())?;
            }
            if let Some(r) = f.parent {
                b.id(&owner, Arena::Record, r.index())?;
            }
            if let Some(s) = f.body {
                b.id(&owner, Arena::Statement, s.index())?;
            }
            if let Some(p) = f.pattern {
                b.id(&owner, Arena::Function, p.index())?;
            }
        }

        for (i, v) in self.vars.iter().enumerate() {
            let owner = format!("variable '{}' (#{i})", v.name);
            b.ty(&owner, v.ty)?;
            if let Some(s) = v.decl_stmt {
                b.id(&owner, Arena::Statement, s.index())?;
            }
            if let Some(f) = v.function {
                b.id(&owner, Arena::Function, f.index())?;
            }
            if let Some(init) = &v.init {
                b.expr(&owner, init)?;
            }
        }

        for (i, s) in self.stmts.iter().enumerate() {
            let owner = format!("statement #{i}");
            if let Some(p) = s.parent {
                b.id(&owner, Arena::Statement, p.index())?;
            }
            for child in s.children() {
                b.before(&owner, Arena::Statement, child.index(), i)?;
            }
            if let StmtKind::Decl(vars) = &s.kind {
                for v in vars {
                    b.id(&owner, Arena::Variable, v.index())?;
                }
            }
            for e in s.exprs() {
                b.expr(&owner, e)?;
            }
        }
        Ok(())
    }
}
