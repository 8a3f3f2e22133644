use serde::{Deserialize, Serialize};

use crate::decl::VarId;
use crate::expr::Expr;
use crate::span::Location;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StmtId(pub u32);

impl StmtId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    Compound(Vec<StmtId>),
    /// Declares one or more variables; each `VarDecl::decl_stmt` points back here.
    Decl(Vec<VarId>),
    Expr(Expr),
    Return(Option<Expr>),
    If {
        cond: Expr,
        then_branch: StmtId,
        #[serde(default)]
        else_branch: Option<StmtId>,
    },
    While {
        cond: Expr,
        body: StmtId,
    },
    For {
        #[serde(default)]
        init: Option<StmtId>,
        #[serde(default)]
        cond: Option<Expr>,
        #[serde(default)]
        inc: Option<Expr>,
        body: StmtId,
    },
    Null,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// Enclosing statement; `None` for a function body root.
    #[serde(default)]
    pub parent: Option<StmtId>,
    pub location: Location,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(location: Location, kind: StmtKind) -> Self {
        Self {
            parent: None,
            location,
            kind,
        }
    }

    /// Direct child statements, in source order.
    pub fn children(&self) -> Vec<StmtId> {
        match &self.kind {
            StmtKind::Compound(items) => items.clone(),
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => std::iter::once(*then_branch).chain(*else_branch).collect(),
            StmtKind::While { body, .. } => vec![*body],
            StmtKind::For { init, body, .. } => init.iter().copied().chain([*body]).collect(),
            StmtKind::Decl(_) | StmtKind::Expr(_) | StmtKind::Return(_) | StmtKind::Null => {
                Vec::new()
            }
        }
    }

    /// Expressions owned directly by this statement (not by its children).
    pub fn exprs(&self) -> Vec<&Expr> {
        match &self.kind {
            StmtKind::Expr(e) => vec![e],
            StmtKind::Return(e) => e.iter().collect(),
            StmtKind::If { cond, .. } | StmtKind::While { cond, .. } => vec![cond],
            StmtKind::For { cond, inc, .. } => cond.iter().chain(inc.iter()).collect(),
            StmtKind::Compound(_) | StmtKind::Decl(_) | StmtKind::Null => Vec::new(),
        }
    }
}
