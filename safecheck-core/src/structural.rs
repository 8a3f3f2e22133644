//! Shape rules for restricted aggregates: naked structs and unions.

use safecheck_ast::{Attr, FunctionKind, RecordId, TypeKind};

use crate::type_checker::TypeChecker;

impl TypeChecker<'_, '_> {
    /// A naked struct has no bases, fields that are safe or themselves
    /// well-formed naked kinds, and only constructors, the destructor,
    /// `const` methods and deleted or defaulted assignments.
    pub fn check_naked_struct_record(&mut self, record: RecordId) -> bool {
        let cx = self.cx;
        let Some(record) = cx.record_with_definition(record) else {
            return false;
        };
        let rec = cx.unit.record(record);

        if let Some(base) = rec.bases().first() {
            self.dh.diag(base.location, "inheritance not allowed at naked struct");
            return false;
        }

        for field in rec.fields() {
            let ty = cx.canonical(field.ty);
            if self.quietly(|tc| tc.is_safe_type(ty)) {
                continue;
            }

            let nullable = self.quietly(|tc| tc.nullable_ptr_verdict(ty));
            if nullable.is_kind {
                if nullable.is_ok {
                    continue;
                }
                self.nullable_ptr_verdict(ty);
                let label = cx.config.names.nullable_label;
                self.dh.diag(field.location, &format!("unsafe type at {label} declaration"));
                return false;
            }

            let naked = self.quietly(|tc| tc.naked_struct_verdict(ty));
            if naked.is_kind {
                if naked.is_ok {
                    continue;
                }
                self.naked_struct_verdict(ty);
                self.dh.diag(field.location, "unsafe type at naked_struct declaration");
                return false;
            }

            self.is_safe_type(ty);
            self.dh.diag(field.location, "member not allowed at naked struct");
            return false;
        }

        for method in rec.methods() {
            let f = cx.unit.function(*method);
            let allowed = match f.kind {
                FunctionKind::Destructor | FunctionKind::Constructor { .. } => true,
                _ if f.is_const => true,
                FunctionKind::CopyAssign | FunctionKind::MoveAssign => {
                    f.is_deleted || (f.is_defaulted && rec.has_attr(Attr::NakedStruct))
                }
                _ => false,
            };
            if !allowed {
                self.dh.diag(f.location, "method not allowed at naked struct");
                return false;
            }
        }
        true
    }

    /// Union members must be builtins (or template parameters). The active
    /// member is not tracked, so nothing that owns or points is allowed.
    pub fn check_union(&mut self, record: RecordId) -> bool {
        let cx = self.cx;
        let Some(record) = cx.record_with_definition(record) else {
            return false;
        };
        for field in cx.unit.record(record).fields() {
            match cx.kind(field.ty) {
                TypeKind::Pointer(_) => {
                    self.dh.diag(
                        field.location,
                        "(S1.4) raw pointers inside unions are prohibited",
                    );
                    return false;
                }
                TypeKind::Builtin(_) | TypeKind::TemplateParam { .. } => {}
                _ => {
                    self.dh.diag(
                        field.location,
                        "(S1.4) non-primitives inside unions are prohibited",
                    );
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CheckerConfig;
    use crate::context::CheckContext;
    use crate::diag::{DiagHelper, Diagnostics, Severity};
    use crate::type_checker::TypeChecker;
    use safecheck_ast::{Attr, FunctionKind, RecordId, TranslationUnit, UnitBuilder};

    fn run(unit: &TranslationUnit, f: impl FnOnce(&mut TypeChecker<'_, '_>) -> bool) -> (bool, Diagnostics) {
        let config = CheckerConfig::default();
        let cx = CheckContext::new(unit, &config);
        let mut sink = Diagnostics::new();
        let ok = {
            let mut tc = TypeChecker::new(&cx, DiagHelper::new(&mut sink, Severity::Error));
            f(&mut tc)
        };
        (ok, sink)
    }

    fn naked(b: &mut UnitBuilder, name: &str) -> RecordId {
        let root = b.namespace("");
        let r = b.struct_decl(root, name);
        b.attr(r, Attr::NakedStruct);
        r
    }

    #[test]
    fn raw_and_nullable_members_are_fine() {
        let mut b = UnitBuilder::new();
        let int = b.int();
        let view = naked(&mut b, "View");
        let nullable = b.instance("safememory::nullable_ptr", &[int]);
        b.field(view, "ptr", nullable);
        b.field(view, "len", int);
        b.method(view, "View", FunctionKind::Constructor { copy_or_move: false });
        let size = b.method(view, "size", FunctionKind::Method);
        b.function_mut(size).is_const = true;
        let assign = b.method(view, "operator=", FunctionKind::CopyAssign);
        b.function_mut(assign).is_deleted = true;
        let unit = b.finish();

        let (ok, diags) = run(&unit, |tc| tc.check_naked_struct_record(view));
        assert!(ok, "{:?}", diags.items());
    }

    #[test]
    fn inheritance_is_rejected() {
        let mut b = UnitBuilder::new();
        let root = b.namespace("");
        let base = b.struct_decl(root, "Base");
        let base_t = b.record_type(base);
        let r = naked(&mut b, "R");
        b.base(r, base_t);
        let unit = b.finish();

        let (ok, diags) = run(&unit, |tc| tc.check_naked_struct_record(r));
        assert!(!ok);
        assert_eq!(diags.items()[0].message, "inheritance not allowed at naked struct");
    }

    #[test]
    fn mutating_method_is_rejected() {
        let mut b = UnitBuilder::new();
        let r = naked(&mut b, "R");
        b.method(r, "reset", FunctionKind::Method);
        let unit = b.finish();

        let (ok, diags) = run(&unit, |tc| tc.check_naked_struct_record(r));
        assert!(!ok);
        assert!(diags.contains("method not allowed at naked struct"));
    }

    #[test]
    fn nullable_to_unsafe_pointee_is_reported_on_the_field() {
        let mut b = UnitBuilder::new();
        let int = b.int();
        let p = b.pointer(int);
        let nullable = b.instance("safememory::nullable_ptr", &[p]);
        let r = naked(&mut b, "R");
        b.field(r, "ptr", nullable);
        let unit = b.finish();

        let (ok, diags) = run(&unit, |tc| tc.check_naked_struct_record(r));
        assert!(!ok);
        assert!(diags.contains("unsafe type at nullable_ptr declaration"));
    }

    #[test]
    fn unions_hold_builtins_only() {
        let mut b = UnitBuilder::new();
        let root = b.namespace("");
        let int = b.int();
        let p = b.pointer(int);
        let owning = b.instance("safememory::owning_ptr", &[int]);
        let good = b.union_decl(root, "Good");
        b.field(good, "i", int);
        b.field(good, "u", int);
        let raw = b.union_decl(root, "Raw");
        b.field(raw, "i", int);
        b.field(raw, "p", p);
        let smart = b.union_decl(root, "Smart");
        b.field(smart, "o", owning);
        let unit = b.finish();

        assert!(run(&unit, |tc| tc.check_union(good)).0);
        let (ok, diags) = run(&unit, |tc| tc.check_union(raw));
        assert!(!ok);
        assert_eq!(diags.items()[0].message, "(S1.4) raw pointers inside unions are prohibited");
        let (ok, diags) = run(&unit, |tc| tc.check_union(smart));
        assert!(!ok);
        assert!(diags.contains("(S1.4) non-primitives inside unions are prohibited"));
    }
}
