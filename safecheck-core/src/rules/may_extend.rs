//! Arguments bound to `may_extend_to_this` parameters live as long as the
//! object the method is called on.

use safecheck_ast::{
    Attr, CallExpr, CallKind, CaptureKind, DeclRef, Expr, ExprKind, LambdaExpr, RecordId, UnaryOp,
};

use crate::diag::DiagHelper;
use crate::scope::NakedPtrScopeChecker;

use super::{RuleRun, function_exprs};

pub(super) fn run(run: &mut RuleRun<'_>) {
    let cx = run.cx;
    for f in run.user_functions() {
        let enclosing = cx.unit.function(f).parent;
        for e in function_exprs(cx.unit, f) {
            if let ExprKind::Call(call) = &e.kind {
                check_call(run, call, enclosing);
            }
        }
    }
}

fn check_call(run: &mut RuleRun<'_>, call: &CallExpr, enclosing: Option<RecordId>) {
    let cx = run.cx;
    let (CallKind::Member { base, is_arrow }, Some(callee)) = (&call.kind, call.callee) else {
        return;
    };
    let composite = is_composite_of_this(base, *is_arrow);

    for (param, arg) in cx.unit.function(callee).params.iter().zip(&call.args) {
        if !cx.unit.var(*param).has_attr(Attr::MayExtendToThis) {
            continue;
        }
        if is_function_ref(arg) || try_check_as_lambda(run, arg, composite, enclosing) {
            continue;
        }
        if composite {
            let ok = NakedPtrScopeChecker::make_this_scope_checker(cx, DiagHelper::notes(&mut run.sink))
                .check_expr(arg);
            if ok {
                continue;
            }
        }
        run.error(arg.location, "(S5.7) argument not safe to extend scope to 'this'");
    }
}

/// The object a method is called on is `this` or reached from it through
/// members held by value.
fn is_composite_of_this(base: &Expr, is_arrow: bool) -> bool {
    let base = base.ignore_paren_imp_casts();
    if matches!(base.kind, ExprKind::This) {
        return true;
    }
    if is_arrow {
        return false;
    }
    match &base.kind {
        ExprKind::Member { base, is_arrow, .. } => is_composite_of_this(base, *is_arrow),
        _ => false,
    }
}

fn is_function_ref(e: &Expr) -> bool {
    match &e.ignore_paren_imp_casts().kind {
        ExprKind::DeclRef(DeclRef::Function(_)) => true,
        ExprKind::Unary {
            op: UnaryOp::AddrOf,
            operand,
        } => matches!(
            operand.ignore_paren_imp_casts().kind,
            ExprKind::DeclRef(DeclRef::Function(_))
        ),
        _ => false,
    }
}

/// Checks `arg` when it is a lambda, directly or through a variable
/// initialized with one. Returns `false` when it is neither.
fn try_check_as_lambda(
    run: &mut RuleRun<'_>,
    arg: &Expr,
    composite: bool,
    enclosing: Option<RecordId>,
) -> bool {
    let cx = run.cx;
    match &arg.ignore_temporaries().kind {
        ExprKind::Lambda(lambda) => {
            check_lambda(run, lambda, composite, enclosing);
            true
        }
        ExprKind::DeclRef(DeclRef::Var(var)) => {
            let Some(init) = &cx.unit.var(*var).init else {
                return false;
            };
            let ExprKind::Lambda(lambda) = &init.ignore_temporaries().kind else {
                return false;
            };
            if !check_lambda(run, lambda, composite, enclosing) {
                run.note(arg.location, "referenced from here");
            }
            true
        }
        _ => false,
    }
}

fn check_lambda(
    run: &mut RuleRun<'_>,
    lambda: &LambdaExpr,
    composite: bool,
    enclosing: Option<RecordId>,
) -> bool {
    let cx = run.cx;
    for capture in &lambda.captures {
        let message = match capture.kind {
            CaptureKind::This => {
                if composite || enclosing.is_some_and(|r| cx.is_record_derived_from_node_base(r)) {
                    continue;
                }
                "(S5.7) capture of 'this' unsafe to extend scope"
            }
            CaptureKind::StarThis => continue,
            CaptureKind::ByCopy(var) => {
                let var = cx.unit.var(var);
                if run.data.is_heap_safe(cx, var.ty) || var.has_global_storage() {
                    continue;
                }
                "(S5.7) unsafe capture to extend scope"
            }
            CaptureKind::ByRef(_) => "(S5.7) unsafe capture to extend scope",
            CaptureKind::Vla => "(S5.7) capture by array not allowed",
        };
        run.error(capture.location, message);
        return false;
    }
    true
}
