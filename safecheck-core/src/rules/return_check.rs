use safecheck_ast::StmtKind;

use crate::diag::DiagHelper;
use crate::scope::NakedPtrScopeChecker;

use super::RuleRun;

/// A stack-only value returned from a function must come from the caller,
/// that is, outlive every parameter.
pub(super) fn run(run: &mut RuleRun<'_>) {
    let cx = run.cx;
    for f in run.user_functions() {
        let ret = cx.unit.function(f).ret;
        if !run.data.is_stack_only(cx, ret) {
            continue;
        }
        for id in cx.unit.body_stmts(f) {
            let StmtKind::Return(Some(value)) = &cx.unit.stmt(id).kind else {
                continue;
            };
            let ok = NakedPtrScopeChecker::make_param_scope_checker(cx, DiagHelper::notes(&mut run.sink))
                .check_expr(value);
            if !ok {
                run.error(value.location, "(S5.1) return value may extend scope");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CheckerConfig;
    use crate::diag::Diagnostics;
    use crate::rules::{Checker, Rule};
    use safecheck_ast::{ExprKind, UnaryOp, UnitBuilder};

    fn check(b: UnitBuilder) -> Diagnostics {
        let unit = b.finish();
        let config = CheckerConfig::default();
        Checker::new(&config).with_rules([Rule::Return]).check_unit(&unit)
    }

    #[test]
    fn returning_a_parameter_is_fine() {
        let mut b = UnitBuilder::new();
        let int = b.int();
        let p = b.pointer(int);
        let f = b.function("id", &[("p", p)], p);
        let param = b.param(f, 0);
        let value = b.var_ref(param);
        let ret = b.return_stmt(Some(value));
        let body = b.compound(&[ret]);
        b.set_body(f, body);

        assert!(check(b).is_empty());
    }

    #[test]
    fn returning_address_of_local_is_rejected() {
        let mut b = UnitBuilder::new();
        let int = b.int();
        let p = b.pointer(int);
        let f = b.function("leak", &[], p);
        let local = b.local(f, "x", int);
        let decl = b.decl_stmt(&[local]);
        let x = b.var_ref(local);
        let addr = b.expr(
            p,
            ExprKind::Unary {
                op: UnaryOp::AddrOf,
                operand: Box::new(x),
            },
        );
        let ret = b.return_stmt(Some(addr));
        let body = b.compound(&[decl, ret]);
        b.set_body(f, body);

        let diags = check(b);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.items()[0].message, "(S5.1) return value may extend scope");
    }

    #[test]
    fn non_stack_only_returns_are_not_checked() {
        let mut b = UnitBuilder::new();
        let int = b.int();
        let f = b.function("answer", &[], int);
        let local = b.local(f, "x", int);
        let decl = b.decl_stmt(&[local]);
        let x = b.var_ref(local);
        let ret = b.return_stmt(Some(x));
        let body = b.compound(&[decl, ret]);
        b.set_body(f, body);

        assert!(check(b).is_empty());
    }
}
