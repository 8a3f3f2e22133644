use safecheck_ast::{Attr, TypeKind, VarKind};

use super::RuleRun;

pub(super) fn run(run: &mut RuleRun<'_>) {
    let cx = run.cx;
    for id in run.user_vars() {
        let var = cx.unit.var(id);
        if !matches!(var.kind, VarKind::Local | VarKind::StaticLocal) {
            continue;
        }
        if var
            .function
            .is_some_and(|f| cx.unit.function(f).has_attr(Attr::NonDeterministic))
        {
            continue;
        }
        let qt = cx.canonical(var.ty);
        if run.data.is_deterministic(cx, qt) {
            continue;
        }
        if matches!(cx.kind(qt), TypeKind::Record(_)) {
            run.error(var.location, "(D2.1) variable type is not deterministic");
            run.data.report_deterministic_detail(cx, qt, &mut run.sink);
        } else if var.init.is_none() {
            run.error(var.location, "(D2) variable type must have initializer");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CheckerConfig;
    use crate::diag::Diagnostics;
    use crate::rules::{Checker, Rule};
    use safecheck_ast::{Attr, UnitBuilder};

    fn check(b: UnitBuilder) -> Diagnostics {
        let unit = b.finish();
        let config = CheckerConfig::default();
        Checker::new(&config)
            .with_rules([Rule::Determinism])
            .check_unit(&unit)
    }

    #[test]
    fn scalars_need_an_initializer() {
        let mut b = UnitBuilder::new();
        let int = b.int();
        let void = b.void();
        let f = b.function("f", &[("arg", int)], void);
        b.local(f, "bare", int);
        let set = b.local(f, "set", int);
        let zero = b.integer(0);
        b.init(set, zero);

        let diags = check(b);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.items()[0].message, "(D2) variable type must have initializer");
    }

    #[test]
    fn record_without_member_initializer() {
        let mut b = UnitBuilder::new();
        let root = b.namespace("");
        let int = b.int();
        let void = b.void();
        let point = b.struct_decl(root, "Point");
        b.field(point, "x", int);
        let point_t = b.record_type(point);
        let f = b.function("f", &[], void);
        let local = b.local(f, "p", point_t);
        let zero = b.integer(0);
        b.init(local, zero);

        let diags = check(b);
        assert_eq!(diags.items()[0].message, "(D2.1) variable type is not deterministic");
        assert!(diags.contains("member 'x' is not deterministic"));
    }

    #[test]
    fn non_deterministic_functions_are_exempt() {
        let mut b = UnitBuilder::new();
        let int = b.int();
        let void = b.void();
        let f = b.function("f", &[], void);
        b.function_mut(f).attrs.insert(Attr::NonDeterministic);
        b.local(f, "bare", int);

        assert!(check(b).is_empty());
    }
}
