use safecheck_ast::{Attr, ExprKind, FunctionKind, TypeKind, VarId};

use crate::diag::{DiagHelper, Severity};
use crate::type_checker::TypeChecker;

use super::RuleRun;

pub(super) fn run(run: &mut RuleRun<'_>) {
    for var in run.user_vars() {
        check_var(run, var);
    }
}

fn check_var(run: &mut RuleRun<'_>, id: VarId) {
    let cx = run.cx;
    let var = cx.unit.var(id);

    // constructor and assignment parameters mirror the class members
    if let Some(f) = var.function {
        let f = cx.unit.function(f);
        if matches!(f.kind, FunctionKind::Constructor { .. }) || f.is_copy_or_move_assign() {
            return;
        }
    }

    let is_param = var.is_param_or_catch();
    let mut qt = cx.canonical(var.ty);

    if cx.is_reference_type(qt) && !is_param {
        match &var.init {
            None => {
                run.error(var.location, "(S5.3) reference without initializer is prohibited");
                return;
            }
            Some(init) if matches!(init.kind, ExprKind::ExprWithCleanups(_)) => {
                run.error(init.location, "(S5.3) reference with temporary initializer is prohibited");
                return;
            }
            Some(_) => {}
        }
    }

    if let TypeKind::LValueReference(inner) | TypeKind::RValueReference(inner) = cx.kind(qt) {
        let inner = cx.canonical(*inner);
        if inner.is_const {
            qt = inner.without_const();
        }
    }

    if let Some(union) = cx.union_record(qt) {
        if !TypeChecker::quiet(cx).check_union(union) {
            let mut dh = DiagHelper::new(&mut run.sink, Severity::Error);
            dh.diag(var.location, "unsafe union at variable declaration");
            TypeChecker::new(cx, dh).check_union(union);
        }
        return;
    }

    let deep_const = run.data.check_deep_const(cx, qt);
    if deep_const.is_kind && !deep_const.is_ok {
        run.error(var.location, "unsafe deep_const attribute at variable declaration");
        run.data.report_deep_const_detail(cx, qt, &mut run.sink);
        return;
    }

    if run.data.is_heap_safe(cx, qt) {
        return;
    }

    if let TypeKind::LValueReference(inner) | TypeKind::RValueReference(inner) = cx.kind(qt) {
        if !run.data.is_heap_safe(cx, *inner) {
            run.error(var.location, "(S5.3) non-const reference of unsafe type is prohibited");
        }
        return;
    }

    if cx.is_std_function_type(qt) || cx.is_awaitable_type(qt) {
        return;
    }

    if let TypeKind::Pointer(inner) = cx.kind(qt) {
        if cx.config.options.disable_raw_pointers {
            run.error(var.location, "(S1.3) raw pointer declaration is prohibited");
            return;
        }
        if !run.data.is_heap_safe(cx, *inner) {
            run.error(var.location, "(S5.3) raw pointer of unsafe type is prohibited");
            return;
        }
        if !is_param && var.init.is_none() {
            run.error(var.location, "(S1.3) raw pointer variable type must have initializer");
        }
        return;
    }

    let may_extend = var.has_attr(Attr::MayExtendToThis);

    let nullable = run.data.check_nullable_ptr(cx, qt);
    if nullable.is_kind {
        if !nullable.is_ok {
            run.error(var.location, "unsafe nullable_ptr at variable declaration");
            run.data.report_nullable_ptr_detail(cx, qt, &mut run.sink);
        }
        return;
    }

    let naked = run.data.check_naked_struct(cx, qt);
    if naked.is_kind {
        if !naked.is_ok {
            run.error(var.location, "unsafe naked_struct at variable declaration");
            run.data.report_naked_struct_detail(cx, qt, &mut run.sink);
        } else if may_extend {
            run.error(var.location, "may_extend not implemented for naked struct variables yet");
        }
        return;
    }

    if cx.is_lambda_type(qt) {
        if may_extend {
            run.error(var.location, "may_extend not implemented for lambda");
        }
        return;
    }

    run.error(var.location, "unsafe type at variable declaration");
    run.data.report_non_safe_detail(cx, qt, &mut run.sink);
}
