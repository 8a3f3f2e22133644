use serde::{Deserialize, Serialize};

use crate::decl::{FunctionId, RecordId, VarId};
use crate::span::Location;
use crate::types::QualType;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub location: Location,
    /// Type of the expression as written (may be sugared).
    pub ty: QualType,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DeclRef {
    Var(VarId),
    Function(FunctionId),
    /// Field named through an implicit `this` (record, field index).
    Field(RecordId, usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    AddrOf,
    Deref,
    Plus,
    Minus,
    Not,
    LNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Assign,
    CompoundAssign,
    Comma,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    LAnd,
    LOr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    PtrMem,
}

impl BinaryOp {
    pub fn is_assignment(self) -> bool {
        matches!(self, BinaryOp::Assign | BinaryOp::CompoundAssign)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastKind {
    Implicit,
    CStyle,
    Functional,
    Static,
    Dynamic,
    Reinterpret,
    Const,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CallKind {
    Free,
    /// `base.method(...)` or `base->method(...)`.
    Member { base: Box<Expr>, is_arrow: bool },
    /// Overloaded operator call. For instance-method operators the first
    /// argument is the object the operator is invoked on.
    Operator,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    /// Directly called function, if known.
    pub callee: Option<FunctionId>,
    pub kind: CallKind,
    pub args: Vec<Expr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureKind {
    This,
    StarThis,
    ByCopy(VarId),
    ByRef(VarId),
    Vla,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    pub kind: CaptureKind,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaExpr {
    /// Closure type.
    pub record: Option<RecordId>,
    #[serde(default)]
    pub captures: Vec<Capture>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    NullPtrLiteral,
    IntegerLiteral(i64),
    This,
    DeclRef(DeclRef),
    Call(CallExpr),
    Member {
        base: Box<Expr>,
        name: String,
        is_arrow: bool,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Cast {
        kind: CastKind,
        operand: Box<Expr>,
    },
    Paren(Box<Expr>),
    Construct {
        ctor: Option<FunctionId>,
        args: Vec<Expr>,
    },
    DefaultArg(Box<Expr>),
    MaterializeTemporary(Box<Expr>),
    BindTemporary(Box<Expr>),
    ExprWithCleanups(Box<Expr>),
    Lambda(LambdaExpr),
    /// Any node kind the model does not enumerate, by its frontend name.
    Unsupported(String),
}

impl Expr {
    pub fn new(location: Location, ty: QualType, kind: ExprKind) -> Self {
        Self { location, ty, kind }
    }

    /// Skips parentheses, implicit casts and full-expression / temporary wrappers.
    pub fn ignore_paren_imp_casts(&self) -> &Expr {
        let mut e = self;
        loop {
            e = match &e.kind {
                ExprKind::Paren(inner)
                | ExprKind::ExprWithCleanups(inner)
                | ExprKind::MaterializeTemporary(inner) => inner,
                ExprKind::Cast {
                    kind: CastKind::Implicit,
                    operand,
                } => operand,
                _ => return e,
            };
        }
    }

    /// Skips temporaries, implicit casts and single-argument constructions.
    pub fn ignore_temporaries(&self) -> &Expr {
        let mut e = self;
        loop {
            e = match &e.kind {
                ExprKind::BindTemporary(inner)
                | ExprKind::MaterializeTemporary(inner)
                | ExprKind::ExprWithCleanups(inner) => inner,
                ExprKind::Cast {
                    kind: CastKind::Implicit,
                    operand,
                } => operand,
                ExprKind::Construct { args, .. } if !args.is_empty() => &args[0],
                _ => return e,
            };
        }
    }

    /// Short node-kind name, used when reporting unsupported shapes.
    pub fn kind_name(&self) -> &str {
        match &self.kind {
            ExprKind::NullPtrLiteral => "NullPtrLiteral",
            ExprKind::IntegerLiteral(_) => "IntegerLiteral",
            ExprKind::This => "This",
            ExprKind::DeclRef(_) => "DeclRef",
            ExprKind::Call(_) => "Call",
            ExprKind::Member { .. } => "Member",
            ExprKind::Unary { .. } => "Unary",
            ExprKind::Binary { .. } => "Binary",
            ExprKind::Conditional { .. } => "Conditional",
            ExprKind::Cast { .. } => "Cast",
            ExprKind::Paren(_) => "Paren",
            ExprKind::Construct { .. } => "Construct",
            ExprKind::DefaultArg(_) => "DefaultArg",
            ExprKind::MaterializeTemporary(_) => "MaterializeTemporary",
            ExprKind::BindTemporary(_) => "BindTemporary",
            ExprKind::ExprWithCleanups(_) => "ExprWithCleanups",
            ExprKind::Lambda(_) => "Lambda",
            ExprKind::Unsupported(name) => name,
        }
    }

    /// Visits this expression and every sub-expression, parents first.
    pub fn walk<'e>(&'e self, f: &mut impl FnMut(&'e Expr)) {
        f(self);
        match &self.kind {
            ExprKind::NullPtrLiteral
            | ExprKind::IntegerLiteral(_)
            | ExprKind::This
            | ExprKind::DeclRef(_)
            | ExprKind::Lambda(_)
            | ExprKind::Unsupported(_) => {}
            ExprKind::Call(call) => {
                if let CallKind::Member { base, .. } = &call.kind {
                    base.walk(f);
                }
                for a in &call.args {
                    a.walk(f);
                }
            }
            ExprKind::Member { base, .. } => base.walk(f),
            ExprKind::Unary { operand, .. } | ExprKind::Cast { operand, .. } => operand.walk(f),
            ExprKind::Binary { lhs, rhs, .. } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                cond.walk(f);
                then_expr.walk(f);
                else_expr.walk(f);
            }
            ExprKind::Construct { args, .. } => {
                for a in args {
                    a.walk(f);
                }
            }
            ExprKind::Paren(inner)
            | ExprKind::DefaultArg(inner)
            | ExprKind::MaterializeTemporary(inner)
            | ExprKind::BindTemporary(inner)
            | ExprKind::ExprWithCleanups(inner) => inner.walk(f),
        }
    }
}
