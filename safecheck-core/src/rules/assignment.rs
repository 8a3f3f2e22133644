use safecheck_ast::{BinaryOp, CallKind, Expr, ExprKind, OverloadedOperator};

use crate::diag::DiagHelper;
use crate::scope::NakedPtrScopeChecker;

use super::{RuleRun, function_exprs};

pub(super) fn run(run: &mut RuleRun<'_>) {
    let cx = run.cx;
    for f in run.user_functions() {
        for e in function_exprs(cx.unit, f) {
            match &e.kind {
                ExprKind::Binary {
                    op: BinaryOp::Assign,
                    lhs,
                    rhs,
                } if cx.is_raw_pointer_type(e.ty) => {
                    if !flows_into(run, lhs, rhs) {
                        run.error(e.location, "(S5.1) assignment of raw pointer may extend scope");
                    }
                }
                ExprKind::Call(call)
                    if matches!(call.kind, CallKind::Operator)
                        && call.args.len() == 2
                        && call.callee.is_some_and(|c| {
                            cx.unit.function(c).operator == Some(OverloadedOperator::Assign)
                        }) =>
                {
                    let (lhs, rhs) = (&call.args[0], &call.args[1]);
                    if run.data.is_stack_only(cx, lhs.ty) && !flows_into(run, lhs, rhs) {
                        run.error(e.location, "(S5.1) assignment may extend scope");
                    }
                }
                _ => {}
            }
        }
    }
}

/// Whether `rhs` outlives the destination named by `lhs`.
fn flows_into(run: &mut RuleRun<'_>, lhs: &Expr, rhs: &Expr) -> bool {
    let mut checker =
        NakedPtrScopeChecker::make_checker(run.cx, lhs, DiagHelper::notes(&mut run.sink));
    checker.check_expr(rhs)
}

#[cfg(test)]
mod tests {
    use crate::config::CheckerConfig;
    use crate::diag::Diagnostics;
    use crate::rules::{Checker, Rule};
    use safecheck_ast::{
        CallExpr, CallKind, ExprKind, FunctionKind, OverloadedOperator, TypeKind, UnitBuilder,
    };

    fn check(b: UnitBuilder) -> Diagnostics {
        let unit = b.finish();
        let config = CheckerConfig::default();
        Checker::new(&config)
            .with_rules([Rule::RawPointerAssignment])
            .check_unit(&unit)
    }

    #[test]
    fn local_address_into_parameter_is_rejected() {
        let mut b = UnitBuilder::new();
        let int = b.int();
        let void = b.void();
        let p = b.pointer(int);
        let f = b.function("f", &[("out", p)], void);
        let local = b.local(f, "local", p);
        let param = b.param(f, 0);
        let lhs = b.var_ref(param);
        let rhs = b.var_ref(local);
        let assign = b.assign(lhs, rhs);
        let stmt = b.expr_stmt(assign);
        let decl = b.decl_stmt(&[local]);
        let body = b.compound(&[decl, stmt]);
        b.set_body(f, body);

        let diags = check(b);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.items()[0].message, "(S5.1) assignment of raw pointer may extend scope");
        assert_eq!(diags.items()[0].rule, "raw-pointer-assignment");
    }

    #[test]
    fn parameter_into_local_is_fine() {
        let mut b = UnitBuilder::new();
        let int = b.int();
        let void = b.void();
        let p = b.pointer(int);
        let f = b.function("f", &[("in", p)], void);
        let local = b.local(f, "local", p);
        let param = b.param(f, 0);
        let lhs = b.var_ref(local);
        let rhs = b.var_ref(param);
        let assign = b.assign(lhs, rhs);
        let decl = b.decl_stmt(&[local]);
        let stmt = b.expr_stmt(assign);
        let body = b.compound(&[decl, stmt]);
        b.set_body(f, body);

        assert!(check(b).is_empty());
    }

    #[test]
    fn overloaded_assignment_of_nullable_pointer() {
        let mut b = UnitBuilder::new();
        let int = b.int();
        let void = b.void();
        let nullable = b.instance("safememory::nullable_ptr", &[int]);
        let TypeKind::Record(np) = *b.unit.types.kind(nullable.ty) else {
            panic!("nullable_ptr is a record");
        };
        let op = b.method(np, "operator=", FunctionKind::CopyAssign);
        b.function_mut(op).operator = Some(OverloadedOperator::Assign);
        let f = b.function("f", &[("out", nullable)], void);
        let local = b.local(f, "local", nullable);
        let param = b.param(f, 0);
        let lhs = b.var_ref(param);
        let rhs = b.var_ref(local);
        let call = b.expr(
            nullable,
            ExprKind::Call(CallExpr {
                callee: Some(op),
                kind: CallKind::Operator,
                args: vec![lhs, rhs],
            }),
        );
        let decl = b.decl_stmt(&[local]);
        let stmt = b.expr_stmt(call);
        let body = b.compound(&[decl, stmt]);
        b.set_body(f, body);

        let diags = check(b);
        assert!(diags.contains("(S5.1) assignment may extend scope"));
    }
}
