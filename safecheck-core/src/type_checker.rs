//! The type safety classifier.
//!
//! Every query canonicalizes its argument first, then runs a first-match
//! case analysis over the type's kind, recursing into pointees, template
//! arguments, fields and bases. Records currently under inspection are
//! provisionally accepted, which is what makes self-referential types
//! terminate.

use std::collections::HashSet;
use std::mem;

use safecheck_ast::{Attr, FunctionKind, Location, QualType, RecordId, TemplateArg, TypeKind};

use crate::context::CheckContext;
use crate::diag::DiagHelper;
use crate::qualified_name::type_spelling;

/// Two-axis answer of a kind query: is the type of the kind under test, and
/// if so is it well formed. Callers must look at both; `is_kind` alone is
/// not a safety verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SafetyVerdict {
    pub is_kind: bool,
    pub is_ok: bool,
}

impl SafetyVerdict {
    pub const NOT_KIND: SafetyVerdict = SafetyVerdict {
        is_kind: false,
        is_ok: false,
    };

    pub fn new(is_kind: bool, is_ok: bool) -> Self {
        Self { is_kind, is_ok }
    }

    pub fn ok() -> Self {
        Self::new(true, true)
    }

    pub fn malformed() -> Self {
        Self::new(true, false)
    }

    pub fn is_kind_and_ok(self) -> bool {
        self.is_kind && self.is_ok
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Query {
    Safe,
    Deterministic,
    DeepConst,
}

pub struct TypeChecker<'c, 's> {
    pub(crate) cx: &'c CheckContext<'c>,
    pub(crate) dh: DiagHelper<'s>,
    in_progress: HashSet<(Query, RecordId)>,
    /// Set while inspecting the inside of a system record; only the record
    /// that crossed the boundary reports.
    system_loc: bool,
    /// Inspect system records structurally instead of by name only.
    user_code_mode: bool,
}

impl<'c, 's> TypeChecker<'c, 's> {
    pub fn new(cx: &'c CheckContext<'c>, dh: DiagHelper<'s>) -> Self {
        Self {
            cx,
            dh,
            in_progress: HashSet::new(),
            system_loc: false,
            user_code_mode: false,
        }
    }

    /// A checker that reports nothing.
    pub fn quiet(cx: &'c CheckContext<'c>) -> Self {
        Self::new(cx, DiagHelper::null())
    }

    pub fn with_user_code_mode(mut self, enabled: bool) -> Self {
        self.user_code_mode = enabled;
        self
    }

    /// Runs `f` with diagnostics switched off.
    pub(crate) fn quietly<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = mem::replace(&mut self.dh, DiagHelper::null());
        let result = f(self);
        self.dh = saved;
        result
    }

    fn enter_system(&mut self, system: bool) -> bool {
        if system && !self.system_loc {
            self.system_loc = true;
            true
        } else {
            false
        }
    }

    fn leave_system(&mut self, entered: bool) {
        if entered {
            self.system_loc = false;
        }
    }

    fn may_report(&self, entered: bool) -> bool {
        !self.system_loc || entered
    }

    pub fn is_stack_only_type(&self, qt: QualType) -> bool {
        let cx = self.cx;
        match cx.kind(qt) {
            TypeKind::Pointer(_) | TypeKind::LValueReference(_) | TypeKind::RValueReference(_) => {
                return true;
            }
            TypeKind::Record(_) => {}
            _ => return false,
        }
        if cx.is_nullable_ptr_type(qt) {
            return true;
        }
        match cx.defined_record_of(qt) {
            Some(r) => {
                cx.unit.record(r).has_attr(Attr::NakedStruct)
                    || cx.config.names.is_stack_only_iterator_name(&cx.record_name(r))
            }
            None => false,
        }
    }

    pub fn is_safe_type(&mut self, qt: QualType) -> bool {
        let cx = self.cx;
        let qt = cx.canonical(qt);
        tracing::trace!(ty = %type_spelling(cx.unit, qt), "is_safe_type");

        if self.is_stack_only_type(qt) {
            return false;
        }
        if matches!(cx.kind(qt), TypeKind::Builtin(_) | TypeKind::Enum(_)) {
            return true;
        }
        if cx.is_awaitable_type(qt) {
            return false;
        }
        let vector = self.vector_verdict(qt);
        if vector.is_kind {
            return vector.is_ok;
        }
        let hashmap = self.hashmap_verdict(qt);
        if hashmap.is_kind {
            return hashmap.is_ok;
        }
        if cx.is_safe_ptr_type(qt) {
            return match cx.pointee(qt) {
                Some(pointee) => self.is_safe_type(pointee),
                None => false,
            };
        }
        match cx.kind(qt) {
            TypeKind::Record(r) => self.is_safe_record(*r),
            TypeKind::TemplateParam { .. } => true,
            _ => false,
        }
    }

    pub fn is_safe_record(&mut self, record: RecordId) -> bool {
        let Some(record) = self.cx.record_with_definition(record) else {
            return false;
        };
        if !self.in_progress.insert((Query::Safe, record)) {
            return true;
        }
        let safe = self.safe_record(record);
        self.in_progress.remove(&(Query::Safe, record));
        safe
    }

    fn safe_record(&mut self, record: RecordId) -> bool {
        let cx = self.cx;
        let name = cx.record_name(record);
        if cx.is_system_safe_type_name(&name) {
            return true;
        }
        let rec = cx.unit.record(record);
        let system = cx.is_system_record(record);
        if system && !self.user_code_mode {
            if !self.system_loc {
                self.dh.diag(rec.location, &format!("system library type '{name}' is not safe"));
            }
            return false;
        }

        let entered = self.enter_system(system);
        let safe = self.safe_record_members(record, entered);
        self.leave_system(entered);
        safe
    }

    fn safe_record_members(&mut self, record: RecordId, entered: bool) -> bool {
        let cx = self.cx;
        let rec = cx.unit.record(record);
        if rec.is_union() {
            return self.check_union(record);
        }
        for field in rec.fields() {
            if !self.is_safe_type(field.ty) {
                if self.may_report(entered) {
                    self.dh.diag(field.location, &format!("member '{}' is not safe", field.name));
                }
                return false;
            }
        }
        for base in rec.bases() {
            if !self.is_safe_type(base.ty) {
                if self.may_report(entered) {
                    self.dh.diag(base.location, "base class is not safe");
                }
                return false;
            }
        }
        true
    }

    pub fn is_deterministic_type(&mut self, qt: QualType) -> bool {
        let cx = self.cx;
        let qt = cx.canonical(qt);
        match cx.kind(qt) {
            TypeKind::LValueReference(_) | TypeKind::RValueReference(_) => return true,
            // scalars are deterministic only when initialized, which is the
            // caller's business
            TypeKind::Pointer(_) | TypeKind::Builtin(_) | TypeKind::Enum(_) => return false,
            _ => {}
        }
        if cx.is_awaitable_type(qt)
            || cx.is_lambda_type(qt)
            || cx.is_safe_ptr_type(qt)
            || cx.is_nullable_ptr_type(qt)
        {
            return true;
        }
        match cx.kind(qt) {
            TypeKind::Record(r) => self.is_deterministic_record(*r),
            TypeKind::TemplateParam { .. } => true,
            _ => false,
        }
    }

    pub fn is_deterministic_record(&mut self, record: RecordId) -> bool {
        let Some(record) = self.cx.record_with_definition(record) else {
            return false;
        };
        if !self.in_progress.insert((Query::Deterministic, record)) {
            return true;
        }
        let deterministic = self.deterministic_record(record);
        self.in_progress.remove(&(Query::Deterministic, record));
        deterministic
    }

    fn deterministic_record(&mut self, record: RecordId) -> bool {
        let cx = self.cx;
        if cx.is_system_safe_type_name(&cx.record_name(record)) {
            return true;
        }
        let rec = cx.unit.record(record);
        let entered = self.enter_system(cx.is_system_record(record));

        let deterministic = 'members: {
            if rec.is_union() {
                // one initialized member is enough, the rest is zero filled
                break 'members rec.fields().iter().any(|f| f.has_in_class_init);
            }
            for field in rec.fields() {
                if !field.has_in_class_init && !self.is_deterministic_type(field.ty) {
                    if self.may_report(entered) {
                        self.dh.diag(
                            field.location,
                            &format!("member '{}' is not deterministic", field.name),
                        );
                    }
                    break 'members false;
                }
            }
            for base in rec.bases() {
                if !self.is_deterministic_type(base.ty) {
                    if self.may_report(entered) {
                        self.dh.diag(base.location, "base class is not deterministic");
                    }
                    break 'members false;
                }
            }
            true
        };

        self.leave_system(entered);
        deterministic
    }

    pub fn is_deep_const_type(&mut self, qt: QualType) -> SafetyVerdict {
        let cx = self.cx;
        let qt = cx.canonical(qt);
        match cx.kind(qt) {
            TypeKind::LValueReference(_) | TypeKind::RValueReference(_) | TypeKind::Pointer(_) => {
                return SafetyVerdict::NOT_KIND;
            }
            TypeKind::Builtin(_) | TypeKind::Enum(_) => return SafetyVerdict::ok(),
            _ => {}
        }
        if self.is_deep_const_owning_ptr(qt) {
            return SafetyVerdict::ok();
        }
        if cx.is_safe_ptr_type(qt) || cx.is_nullable_ptr_type(qt) {
            return SafetyVerdict::NOT_KIND;
        }
        match cx.kind(qt) {
            TypeKind::Record(r) => self.is_deep_const_record(*r),
            TypeKind::TemplateParam { .. } => SafetyVerdict::ok(),
            _ => SafetyVerdict::NOT_KIND,
        }
    }

    /// `owning_ptr<const T>` with a deep-const `T`.
    fn is_deep_const_owning_ptr(&mut self, qt: QualType) -> bool {
        let cx = self.cx;
        if !cx.is_owning_ptr_type(qt) {
            return false;
        }
        let Some(arg) = cx.template_arg_type(qt, 0) else {
            return false;
        };
        self.is_deep_const_type(arg).is_kind_and_ok() && arg.is_const
    }

    pub fn is_deep_const_record(&mut self, record: RecordId) -> SafetyVerdict {
        let Some(defined) = self.cx.record_with_definition(record) else {
            return SafetyVerdict::NOT_KIND;
        };
        if !self.in_progress.insert((Query::DeepConst, defined)) {
            return SafetyVerdict::ok();
        }
        let verdict = self.deep_const_record(record, defined);
        self.in_progress.remove(&(Query::DeepConst, defined));
        verdict
    }

    /// `record` is the specialization as used (it carries the template
    /// arguments), `defined` the declaration holding the definition.
    fn deep_const_record(&mut self, record: RecordId, defined: RecordId) -> SafetyVerdict {
        let cx = self.cx;
        let rec = cx.unit.record(defined);
        let attr = rec.has_attr(Attr::DeepConst);
        let when_params = rec.has_attr(Attr::DeepConstWhenParams);
        let entered = self.enter_system(cx.is_system_record(defined));

        let verdict = if self.system_loc {
            if attr {
                SafetyVerdict::ok()
            } else if when_params {
                let params = self.all_template_args_are_deep_const(record);
                SafetyVerdict::new(params, params)
            } else {
                SafetyVerdict::NOT_KIND
            }
        } else if !attr {
            SafetyVerdict::NOT_KIND
        } else {
            self.deep_const_members(defined, entered)
        };

        self.leave_system(entered);
        verdict
    }

    fn deep_const_members(&mut self, record: RecordId, entered: bool) -> SafetyVerdict {
        let cx = self.cx;
        let rec = cx.unit.record(record);
        if rec.is_union() {
            self.dh.diag(rec.location, "Union not supported yet");
            return SafetyVerdict::malformed();
        }
        for field in rec.fields() {
            if !self.is_deep_const_type(field.ty).is_kind_and_ok() {
                if self.may_report(entered) {
                    self.dh.diag(
                        field.location,
                        &format!("member '{}' is not deep const", field.name),
                    );
                }
                return SafetyVerdict::malformed();
            }
        }
        for method in rec.methods() {
            let f = cx.unit.function(*method);
            if f.is_defaulted {
                continue;
            }
            let message = match f.kind {
                FunctionKind::Destructor => "destructor must be 'default' for deep const",
                FunctionKind::Constructor { copy_or_move: true } => {
                    "copy/move constructor must be 'default' for deep const"
                }
                FunctionKind::CopyAssign | FunctionKind::MoveAssign => {
                    "copy/move assignment operator must be 'default' for deep const"
                }
                _ => continue,
            };
            self.dh.diag(f.location, message);
            return SafetyVerdict::malformed();
        }
        for base in rec.bases() {
            if !self.is_deep_const_type(base.ty).is_kind_and_ok() {
                if self.may_report(entered) {
                    self.dh.diag(base.location, "base class is not deep const");
                }
                return SafetyVerdict::malformed();
            }
        }
        SafetyVerdict::ok()
    }

    /// Every type argument is safe and deep-const. A record without
    /// template arguments does not qualify.
    fn all_template_args_are_deep_const(&mut self, record: RecordId) -> bool {
        let cx = self.cx;
        let rec = cx.unit.record(record);
        if rec.template_args.is_empty() {
            return false;
        }
        for (i, arg) in rec.template_args.iter().enumerate() {
            let TemplateArg::Type(t) = arg else {
                continue;
            };
            let t = cx.canonical(*t);
            if !self.is_safe_type(t) {
                self.dh.diag(
                    rec.location,
                    &format!("template parameter {i}, '{}' is not safe", type_spelling(cx.unit, t)),
                );
                return false;
            }
            if !self.is_deep_const_type(t).is_kind_and_ok() {
                self.dh.diag(
                    rec.location,
                    &format!(
                        "template parameter {i}, '{}' is not [[deep_const]]",
                        type_spelling(cx.unit, t)
                    ),
                );
                return false;
            }
        }
        true
    }

    pub fn vector_verdict(&mut self, qt: QualType) -> SafetyVerdict {
        let cx = self.cx;
        if !cx.config.names.is_vector_name(&cx.type_name(qt)) {
            return SafetyVerdict::NOT_KIND;
        }
        SafetyVerdict::new(true, self.template_arg_is_safe(qt, 0))
    }

    /// Key must be safe and deep-const, value safe, hasher and equality
    /// deep-const with a `[[no_side_effect]]` call operator.
    pub fn hashmap_verdict(&mut self, qt: QualType) -> SafetyVerdict {
        let cx = self.cx;
        let names = &cx.config.names;
        if !names.hashmap_rules || !names.is_hashmap_name(&cx.type_name(qt)) {
            return SafetyVerdict::NOT_KIND;
        }
        let ok = self.template_arg_is_safe_and_deep_const(qt, 0)
            && self.template_arg_is_safe(qt, 1)
            && self.template_arg_is_pure_function_object(qt, 2)
            && self.template_arg_is_pure_function_object(qt, 3);
        SafetyVerdict::new(true, ok)
    }

    pub fn nullable_ptr_verdict(&mut self, qt: QualType) -> SafetyVerdict {
        let cx = self.cx;
        let qt = cx.canonical(qt);
        if !cx.is_nullable_ptr_type(qt) {
            return SafetyVerdict::NOT_KIND;
        }
        let ok = match cx.pointee(qt) {
            Some(pointee) => self.is_safe_type(pointee),
            None => false,
        };
        SafetyVerdict::new(true, ok)
    }

    pub fn naked_struct_verdict(&mut self, qt: QualType) -> SafetyVerdict {
        let cx = self.cx;
        match cx.defined_record_of(qt) {
            Some(r) if cx.unit.record(r).has_attr(Attr::NakedStruct) => {
                SafetyVerdict::new(true, self.check_naked_struct_record(r))
            }
            _ => SafetyVerdict::NOT_KIND,
        }
    }

    fn container_location(&self, qt: QualType) -> Location {
        self.cx
            .record_of(qt)
            .map_or(Location::unknown(), |r| self.cx.unit.record(r).location)
    }

    fn required_template_arg(&mut self, qt: QualType, i: usize) -> Option<QualType> {
        let arg = self.cx.template_arg_type(qt, i);
        if arg.is_none() {
            let loc = self.container_location(qt);
            self.dh.diag(loc, &format!("template parameter {i} is not safe"));
        }
        arg
    }

    fn arg_is_safe(&mut self, qt: QualType, i: usize, arg: QualType) -> bool {
        if self.is_safe_type(arg) {
            return true;
        }
        let loc = self.container_location(qt);
        let spelling = type_spelling(self.cx.unit, arg);
        self.dh.diag(loc, &format!("template parameter {i}, '{spelling}' is not safe"));
        false
    }

    fn arg_is_deep_const(&mut self, qt: QualType, i: usize, arg: QualType) -> bool {
        if self.is_deep_const_type(arg).is_kind_and_ok() {
            return true;
        }
        let loc = self.container_location(qt);
        let spelling = type_spelling(self.cx.unit, arg);
        self.dh.diag(loc, &format!("template parameter {i}, '{spelling}' is not [[deep_const]]"));
        false
    }

    fn template_arg_is_safe(&mut self, qt: QualType, i: usize) -> bool {
        match self.required_template_arg(qt, i) {
            Some(arg) => self.arg_is_safe(qt, i, arg),
            None => false,
        }
    }

    fn template_arg_is_safe_and_deep_const(&mut self, qt: QualType, i: usize) -> bool {
        match self.required_template_arg(qt, i) {
            Some(arg) => self.arg_is_safe(qt, i, arg) && self.arg_is_deep_const(qt, i, arg),
            None => false,
        }
    }

    /// Hasher or equality: safe, deep-const, and every `operator()` is
    /// `[[no_side_effect]]` (there must be at least one).
    fn template_arg_is_pure_function_object(&mut self, qt: QualType, i: usize) -> bool {
        let Some(arg) = self.required_template_arg(qt, i) else {
            return false;
        };
        if !self.arg_is_safe(qt, i, arg) || !self.arg_is_deep_const(qt, i, arg) {
            return false;
        }

        let cx = self.cx;
        let message = format!(
            "template parameter {i}, '{}' must have a [[no_side_effect]] operator()",
            type_spelling(cx.unit, arg)
        );
        let Some(record) = cx.defined_record_of(arg) else {
            let loc = self.container_location(qt);
            self.dh.diag(loc, &message);
            return false;
        };
        let operators: Vec<_> = cx.call_operators(record).collect();
        for op in &operators {
            if !cx.is_no_side_effect(*op) {
                self.dh.diag(cx.unit.function(*op).location, &message);
                return false;
            }
        }
        if operators.is_empty() {
            let loc = self.container_location(qt);
            self.dh.diag(loc, &message);
            return false;
        }
        true
    }
}
