//! Syntax-directed lifetime check for values flowing into a destination.
//!
//! A checker is bound to one destination scope. [`NakedPtrScopeChecker::check_expr`]
//! accepts a source expression only when every value it may evaluate to
//! outlives that scope.

use safecheck_ast::{
    Attr, CallExpr, CallKind, DeclRef, Expr, ExprKind, Location, QualType, VarId, VarKind,
};

use crate::context::CheckContext;
use crate::diag::DiagHelper;

/// Lifetime class of a destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputScope {
    /// Not understood; every check against it fails.
    Unknown,
    /// A local variable, remembered for the stack to stack walk.
    StackLocal(VarId),
    Parameter,
    /// `this`, globals and `may_extend_to_this` variables.
    ThisLifetime,
}

pub struct NakedPtrScopeChecker<'c, 's> {
    cx: &'c CheckContext<'c>,
    out_scope: OutputScope,
    dh: DiagHelper<'s>,
}

impl<'c, 's> NakedPtrScopeChecker<'c, 's> {
    pub fn new(cx: &'c CheckContext<'c>, out_scope: OutputScope, dh: DiagHelper<'s>) -> Self {
        Self { cx, out_scope, dh }
    }

    /// Checker bound to the scope of `to`, typically an assignment target.
    pub fn make_checker(cx: &'c CheckContext<'c>, to: &Expr, mut dh: DiagHelper<'s>) -> Self {
        let out_scope = Self::calculate_scope(cx, to, &mut dh);
        Self::new(cx, out_scope, dh)
    }

    pub fn make_this_scope_checker(cx: &'c CheckContext<'c>, dh: DiagHelper<'s>) -> Self {
        Self::new(cx, OutputScope::ThisLifetime, dh)
    }

    pub fn make_param_scope_checker(cx: &'c CheckContext<'c>, dh: DiagHelper<'s>) -> Self {
        Self::new(cx, OutputScope::Parameter, dh)
    }

    pub fn out_scope(&self) -> OutputScope {
        self.out_scope
    }

    pub fn calculate_scope(cx: &CheckContext<'_>, to: &Expr, dh: &mut DiagHelper<'_>) -> OutputScope {
        let to = to.ignore_paren_imp_casts();
        let scope = match &to.kind {
            ExprKind::DeclRef(DeclRef::Var(id)) => {
                let var = cx.unit.var(*id);
                let may_extend = var.has_attr(Attr::MayExtendToThis);
                if var.is_param() {
                    if may_extend {
                        OutputScope::ThisLifetime
                    } else {
                        OutputScope::Parameter
                    }
                } else if var.has_global_storage() || may_extend {
                    OutputScope::ThisLifetime
                } else {
                    OutputScope::StackLocal(*id)
                }
            }
            ExprKind::DeclRef(DeclRef::Field(..)) => {
                dh.internal_error(to.location);
                OutputScope::Unknown
            }
            ExprKind::Member { base, .. } => return Self::calculate_scope(cx, base, dh),
            ExprKind::This => OutputScope::ThisLifetime,
            _ => OutputScope::Unknown,
        };
        tracing::debug!(?scope, node = to.kind_name(), "destination scope");
        scope
    }

    /// Every argument is assumed to be able to alias the result.
    fn can_argument_generate_output(&self, _ret: QualType, _arg: QualType) -> bool {
        true
    }

    /// `from` is declared in a block that encloses the declaration of the
    /// destination, so it lives at least as long.
    fn check_stack_to_stack(&self, from: VarId, to: VarId) -> bool {
        let unit = self.cx.unit;
        let (Some(from_stmt), Some(to_stmt)) = (unit.var(from).decl_stmt, unit.var(to).decl_stmt)
        else {
            return false;
        };
        let Some(from_parent) = unit.parent_stmt(from_stmt) else {
            return false;
        };
        let mut current = unit.parent_stmt(to_stmt);
        while let Some(stmt) = current {
            if stmt == from_parent {
                return true;
            }
            current = unit.parent_stmt(stmt);
        }
        false
    }

    fn check_decl_ref(&mut self, decl: &DeclRef, location: Location) -> bool {
        let id = match decl {
            DeclRef::Var(id) => *id,
            DeclRef::Field(..) => {
                self.dh.internal_error(location);
                return false;
            }
            DeclRef::Function(_) => return false,
        };
        let var = self.cx.unit.var(id);
        if var.kind == VarKind::Param {
            return match self.out_scope {
                OutputScope::StackLocal(_) | OutputScope::Parameter => true,
                OutputScope::ThisLifetime => var.has_attr(Attr::MayExtendToThis),
                OutputScope::Unknown => false,
            };
        }
        if var.has_global_storage() || var.has_attr(Attr::MayExtendToThis) {
            return true;
        }
        match self.out_scope {
            OutputScope::StackLocal(to) => self.check_stack_to_stack(id, to),
            _ => false,
        }
    }

    fn check_call(&mut self, call: &CallExpr, location: Location) -> bool {
        let cx = self.cx;
        let Some(callee) = call.callee else {
            return false;
        };
        let function = cx.unit.function(callee);
        let mut args = call.args.iter();

        match &call.kind {
            CallKind::Member { base, .. } => {
                if cx.is_safe_ptr_type(base.ty) {
                    return true;
                }
                if !self.check_expr(base) {
                    return false;
                }
            }
            CallKind::Operator if function.is_instance_method() => {
                let Some(receiver) = args.next() else {
                    self.dh.internal_error(location);
                    return false;
                };
                if cx.is_safe_ptr_type(receiver.ty) {
                    return true;
                }
                if !self.check_expr(receiver) {
                    return false;
                }
            }
            _ => {}
        }

        let mut params = function.params.iter();
        loop {
            match (args.next(), params.next()) {
                (Some(arg), Some(param)) => {
                    let param_ty = cx.unit.var(*param).ty;
                    if self.can_argument_generate_output(function.ret, param_ty)
                        && !self.check_expr(arg)
                    {
                        return false;
                    }
                }
                (None, None) => return true,
                // variadic or defaulted beyond what the model describes
                _ => return false,
            }
        }
    }

    pub fn check_expr(&mut self, from: &Expr) -> bool {
        if self.out_scope == OutputScope::Unknown {
            return false;
        }
        let from = from.ignore_paren_imp_casts();
        match &from.kind {
            ExprKind::This | ExprKind::NullPtrLiteral | ExprKind::IntegerLiteral(_) => true,
            ExprKind::DeclRef(decl) => self.check_decl_ref(decl, from.location),
            ExprKind::Call(call) => self.check_call(call, from.location),
            ExprKind::Member { base, .. } => self.check_expr(base),
            ExprKind::Unary { operand, .. } | ExprKind::Cast { operand, .. } => {
                self.check_expr(operand)
            }
            ExprKind::Paren(inner)
            | ExprKind::DefaultArg(inner)
            | ExprKind::MaterializeTemporary(inner)
            | ExprKind::BindTemporary(inner)
            | ExprKind::ExprWithCleanups(inner) => self.check_expr(inner),
            ExprKind::Binary { lhs, rhs, .. } => self.check_expr(lhs) && self.check_expr(rhs),
            ExprKind::Conditional {
                then_expr,
                else_expr,
                ..
            } => self.check_expr(then_expr) && self.check_expr(else_expr),
            ExprKind::Construct { args, .. } => args.iter().all(|a| self.check_expr(a)),
            ExprKind::Lambda(_) => {
                tracing::debug!(location = ?from.location, "lambda as a scoped value, rejecting");
                false
            }
            ExprKind::Unsupported(node) => {
                tracing::debug!(%node, "expression shape not modeled by the scope checker");
                self.dh.internal_error(from.location);
                false
            }
        }
    }
}
