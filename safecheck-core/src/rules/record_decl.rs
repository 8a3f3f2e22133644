use safecheck_ast::{Attr, RecordId};

use crate::diag::{DiagHelper, Severity};
use crate::type_checker::TypeChecker;

use super::RuleRun;

pub(super) fn run(run: &mut RuleRun<'_>) {
    for record in run.user_records() {
        let r = run.cx.unit.record(record);
        if r.is_lambda || r.is_template || r.is_implicit_instantiation {
            continue;
        }
        check_record(run, record);
    }
}

fn check_record(run: &mut RuleRun<'_>, record: RecordId) {
    let cx = run.cx;
    let rec = cx.unit.record(record);

    if rec.has_attr(Attr::NakedStruct) {
        if !TypeChecker::quiet(cx).check_naked_struct_record(record) {
            let mut dh = DiagHelper::new(&mut run.sink, Severity::Error);
            dh.diag(rec.location, "unsafe naked_struct declaration");
            TypeChecker::new(cx, dh).check_naked_struct_record(record);
        }
        return;
    }

    if rec.has_attr(Attr::DeepConst) && !TypeChecker::quiet(cx).is_deep_const_record(record).is_ok {
        let mut dh = DiagHelper::new(&mut run.sink, Severity::Error);
        dh.diag(rec.location, "unsafe deep_const declaration");
        TypeChecker::new(cx, dh).is_deep_const_record(record);
    }

    if !TypeChecker::quiet(cx).is_safe_record(record) {
        let mut dh = DiagHelper::new(&mut run.sink, Severity::Error);
        dh.diag(rec.location, "unsafe type declaration");
        TypeChecker::new(cx, dh).is_safe_record(record);
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CheckerConfig;
    use crate::diag::Severity;
    use crate::rules::{Checker, Rule};
    use safecheck_ast::{Attr, FunctionKind, UnitBuilder};

    fn check(b: UnitBuilder) -> crate::diag::Diagnostics {
        let unit = b.finish();
        let config = CheckerConfig::default();
        Checker::new(&config)
            .with_rules([Rule::RecordDecl])
            .check_unit(&unit)
    }

    #[test]
    fn raw_pointer_member_makes_the_record_unsafe() {
        let mut b = UnitBuilder::new();
        let root = b.namespace("");
        let int = b.int();
        let p = b.pointer(int);
        let r = b.struct_decl(root, "Holder");
        b.field(r, "p", p);

        let diags = check(b);
        let items = diags.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].message, "unsafe type declaration");
        assert_eq!(items[0].severity, Severity::Error);
        assert_eq!(items[0].rule, "record-decl");
        assert_eq!(items[1].message, "member 'p' is not safe");
        assert_eq!(items[1].severity, Severity::Note);
    }

    #[test]
    fn smart_pointer_members_are_fine() {
        let mut b = UnitBuilder::new();
        let root = b.namespace("");
        let int = b.int();
        let owning = b.instance("safememory::owning_ptr", &[int]);
        let r = b.struct_decl(root, "Node");
        b.field(r, "next", owning);
        b.field(r, "value", int);

        assert!(check(b).is_empty());
    }

    #[test]
    fn broken_naked_struct_reports_once() {
        let mut b = UnitBuilder::new();
        let root = b.namespace("");
        let r = b.struct_decl(root, "View");
        b.attr(r, Attr::NakedStruct);
        b.method(r, "reset", FunctionKind::Method);

        let diags = check(b);
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.items()[0].message, "unsafe naked_struct declaration");
        assert!(diags.contains("method not allowed at naked struct"));
    }

    #[test]
    fn deep_const_with_mutable_pointer_member() {
        let mut b = UnitBuilder::new();
        let root = b.namespace("");
        let int = b.int();
        let soft = b.instance("safememory::soft_ptr", &[int]);
        let r = b.struct_decl(root, "Key");
        b.attr(r, Attr::DeepConst);
        b.field(r, "p", soft);

        let diags = check(b);
        assert_eq!(diags.items()[0].message, "unsafe deep_const declaration");
        assert!(diags.contains("member 'p' is not deep const"));
    }

    #[test]
    fn lambdas_and_system_records_are_skipped() {
        let mut b = UnitBuilder::new();
        let sm = b.namespace("vendor");
        let int = b.int();
        let p = b.pointer(int);
        let sys = b.system_struct(sm, "raw_buffer");
        b.field(sys, "data", p);
        let _closure = b.lambda(&[]);

        assert!(check(b).is_empty());
    }
}
