//! End-to-end checks over hand-built translation units.

use safecheck_ast::{Attr, FunctionKind, TranslationUnit, UnitBuilder};
use safecheck_core::{
    CheckContext, CheckerConfig, CheckerData, Checker, DiagHelper, Diagnostics, Rule,
    SafetyVerdict, Severity, TypeChecker,
};

fn run_rules(unit: &TranslationUnit, rules: &[Rule]) -> Diagnostics {
    let config = CheckerConfig::default();
    Checker::new(&config)
        .with_rules(rules.iter().copied())
        .check_unit(unit)
}

#[test]
fn owning_ptr_to_int_is_safe() {
    let mut b = UnitBuilder::new();
    let int = b.int();
    let owning = b.instance("safememory::owning_ptr", &[int]);
    let unit = b.finish();
    let config = CheckerConfig::default();
    let cx = CheckContext::new(&unit, &config);

    assert!(CheckerData::new().is_heap_safe(&cx, owning));
}

#[test]
fn owning_ptr_to_raw_struct_names_the_field_once() {
    let mut b = UnitBuilder::new();
    let root = b.namespace("");
    let int = b.int();
    let p = b.pointer(int);
    let raw = b.struct_decl(root, "RawStruct");
    b.field(raw, "p", p);
    let raw_t = b.record_type(raw);
    let owning = b.instance("safememory::owning_ptr", &[raw_t]);
    let unit = b.finish();
    let config = CheckerConfig::default();
    let cx = CheckContext::new(&unit, &config);

    let mut data = CheckerData::new();
    let mut sink = Diagnostics::new();
    assert!(!data.is_heap_safe(&cx, owning));
    data.report_non_safe_detail(&cx, owning, &mut sink);
    data.report_non_safe_detail(&cx, owning, &mut sink);

    assert_eq!(sink.len(), 1, "{:?}", sink.items());
    assert!(sink.items()[0].message.contains("'p'"));
}

/// `void f() { int *y; { int *x; x = y; y = x; } }`
#[test]
fn assignment_from_enclosing_block_only() {
    let mut b = UnitBuilder::new();
    let int = b.int();
    let void = b.void();
    let p = b.pointer(int);
    let f = b.function("f", &[], void);
    let y = b.local(f, "y", p);
    let x = b.local(f, "x", p);

    let (x_ref, y_ref) = (b.var_ref(x), b.var_ref(y));
    let inward = b.assign(x_ref, y_ref);
    let inward = b.expr_stmt(inward);
    let inner_decl = b.decl_stmt(&[x]);
    let block = b.compound(&[inner_decl, inward]);
    let outer_decl = b.decl_stmt(&[y]);
    let body = b.compound(&[outer_decl, block]);
    b.set_body(f, body);
    let unit = b.finish();
    assert!(run_rules(&unit, &[Rule::RawPointerAssignment]).is_empty());

    let mut b = UnitBuilder::new();
    let int = b.int();
    let void = b.void();
    let p = b.pointer(int);
    let f = b.function("f", &[], void);
    let y = b.local(f, "y", p);
    let x = b.local(f, "x", p);

    let (x_ref, y_ref) = (b.var_ref(x), b.var_ref(y));
    let outward = b.assign(y_ref, x_ref);
    let outward = b.expr_stmt(outward);
    let inner_decl = b.decl_stmt(&[x]);
    let block = b.compound(&[inner_decl, outward]);
    let outer_decl = b.decl_stmt(&[y]);
    let body = b.compound(&[outer_decl, block]);
    b.set_body(f, body);
    let unit = b.finish();
    let diags = run_rules(&unit, &[Rule::RawPointerAssignment]);
    assert_eq!(diags.error_count(), 1);
    assert_eq!(
        diags.items()[0].message,
        "(S5.1) assignment of raw pointer may extend scope"
    );
}

/// `struct Owner { void on_event(int *cb [[may_extend_to_this]]); void run(int *p) { this->on_event(p); } }`
#[test]
fn plain_parameter_cannot_extend_to_this() {
    let mut b = UnitBuilder::new();
    let root = b.namespace("");
    let int = b.int();
    let p = b.pointer(int);
    let owner = b.struct_decl(root, "Owner");
    let on_event = b.method(owner, "on_event", FunctionKind::Method);
    let cb = b.params(on_event, &[("cb", p)]);
    b.var_attr(cb[0], Attr::MayExtendToThis);
    let run = b.method(owner, "run", FunctionKind::Method);
    let param = b.params(run, &[("p", p)]);

    let owner_t = b.record_type(owner);
    let this_t = b.pointer(owner_t);
    let this = b.this(this_t);
    let arg = b.var_ref(param[0]);
    let call = b.member_call(this, on_event, vec![arg], true);
    let stmt = b.expr_stmt(call);
    let body = b.compound(&[stmt]);
    b.set_body(run, body);
    let mut unit = b.finish();

    let diags = run_rules(&unit, &[Rule::MayExtend]);
    assert_eq!(diags.error_count(), 1);
    assert!(diags.contains("(S5.7) argument not safe to extend scope to 'this'"));

    unit.var_mut(param[0]).attrs.insert(Attr::MayExtendToThis);
    assert!(run_rules(&unit, &[Rule::MayExtend]).is_empty());
}

#[test]
fn naked_struct_with_base_is_rejected() {
    let mut b = UnitBuilder::new();
    let root = b.namespace("");
    let base = b.struct_decl(root, "Base");
    let base_t = b.record_type(base);
    let r = b.struct_decl(root, "R");
    b.attr(r, Attr::NakedStruct);
    b.base(r, base_t);
    let unit = b.finish();
    let config = CheckerConfig::default();
    let cx = CheckContext::new(&unit, &config);

    let mut sink = Diagnostics::new();
    let ok = TypeChecker::new(&cx, DiagHelper::new(&mut sink, Severity::Error))
        .check_naked_struct_record(r);
    assert!(!ok);
    assert!(sink.contains("inheritance not allowed at naked struct"));

    let diags = run_rules(&unit, &[Rule::RecordDecl]);
    assert_eq!(diags.items()[0].message, "unsafe naked_struct declaration");
}

#[test]
fn deep_const_with_user_copy_constructor_is_kind_but_not_ok() {
    let mut b = UnitBuilder::new();
    let root = b.namespace("");
    let int = b.int();
    let r = b.struct_decl(root, "R");
    b.attr(r, Attr::DeepConst);
    b.field(r, "x", int.with_const());
    b.method(r, "R", FunctionKind::Constructor { copy_or_move: true });
    let t = b.record_type(r);
    let unit = b.finish();
    let config = CheckerConfig::default();
    let cx = CheckContext::new(&unit, &config);

    let mut data = CheckerData::new();
    assert_eq!(data.check_deep_const(&cx, t), SafetyVerdict::new(true, false));
    let mut sink = Diagnostics::new();
    data.report_deep_const_detail(&cx, t, &mut sink);
    assert!(sink.contains("copy/move constructor must be 'default' for deep const"));
}

#[test]
fn union_with_raw_pointer_at_variable() {
    let mut b = UnitBuilder::new();
    let root = b.namespace("");
    let int = b.int();
    let void = b.void();
    let p = b.pointer(int);
    let u = b.union_decl(root, "U");
    b.field(u, "i", int);
    b.field(u, "p", p);
    let u_t = b.record_type(u);
    let f = b.function("f", &[], void);
    b.local(f, "u", u_t);
    let unit = b.finish();

    let diags = run_rules(&unit, &[Rule::VarDecl]);
    assert_eq!(diags.items()[0].message, "unsafe union at variable declaration");
    assert!(diags.contains("(S1.4) raw pointers inside unions are prohibited"));
}

#[test]
fn independent_violations_are_all_reported() {
    let mut b = UnitBuilder::new();
    let root = b.namespace("");
    let int = b.int();
    let p = b.pointer(int);
    for name in ["A", "B", "C"] {
        let r = b.struct_decl(root, name);
        b.field(r, "p", p);
    }
    let unit = b.finish();

    let diags = run_rules(&unit, &[Rule::RecordDecl]);
    assert_eq!(diags.error_count(), 3);
}
