//! Per-run read-only context: the program, the configuration and the set of
//! memory-unsafe namespaces, plus the type-level kind predicates built on them.

use std::collections::BTreeSet;

use safecheck_ast::{
    Attr, ContextId, ContextKind, FunctionId, Location, OverloadedOperator, QualType, RecordId,
    TemplateArg, TranslationUnit, TypeKind,
};

use crate::config::CheckerConfig;
use crate::qualified_name::{context_name, function_name, record_name, type_name};

/// Namespace prefixes (`"name::"`) whose members are trusted wholesale.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnsafeNamespaceSet {
    prefixes: BTreeSet<String>,
}

impl UnsafeNamespaceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, namespace: &str) {
        self.prefixes.insert(format!("{namespace}::"));
    }

    /// Every namespace tagged `memory_unsafe` in the unit, plus the configured ones.
    pub fn collect(unit: &TranslationUnit, config: &CheckerConfig) -> Self {
        let mut set = Self::new();
        for id in unit.context_ids() {
            let ctx = unit.context(id);
            if ctx.kind == ContextKind::Namespace && ctx.attrs.contains(&Attr::MemoryUnsafe) {
                let name = context_name(unit, id);
                tracing::debug!(namespace = %name, "memory unsafe namespace");
                set.add(&name);
            }
        }
        for name in &config.options.unsafe_namespaces {
            set.add(name);
        }
        set
    }

    pub fn is_from_unsafe_namespace(&self, name: &str) -> bool {
        self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

pub struct CheckContext<'a> {
    pub unit: &'a TranslationUnit,
    pub config: &'a CheckerConfig,
    pub unsafe_namespaces: UnsafeNamespaceSet,
}

impl<'a> CheckContext<'a> {
    pub fn new(unit: &'a TranslationUnit, config: &'a CheckerConfig) -> Self {
        Self {
            unit,
            config,
            unsafe_namespaces: UnsafeNamespaceSet::collect(unit, config),
        }
    }

    pub fn canonical(&self, qt: QualType) -> QualType {
        self.unit.types.canonical(qt)
    }

    pub fn kind(&self, qt: QualType) -> &'a TypeKind {
        self.unit.types.kind(self.canonical(qt).ty)
    }

    pub fn is_system_location(&self, loc: Location) -> bool {
        self.unit.is_system_location(loc)
    }

    /// Whether `ctx` or one of its enclosing namespaces is `check_as_user_code`.
    pub fn in_user_code_namespace(&self, ctx: ContextId) -> bool {
        let mut current = Some(ctx);
        while let Some(id) = current {
            let c = self.unit.context(id);
            if c.attrs.contains(&Attr::CheckAsUserCode) {
                return true;
            }
            current = c.parent;
        }
        false
    }

    /// User code: not in a system file, or explicitly opted back in.
    pub fn is_user_code(&self, loc: Location, ctx: ContextId) -> bool {
        !self.is_system_location(loc) || self.in_user_code_namespace(ctx)
    }

    pub fn is_system_record(&self, record: RecordId) -> bool {
        let r = self.unit.record(record);
        !self.is_user_code(r.location, r.context)
    }

    pub fn record_of(&self, qt: QualType) -> Option<RecordId> {
        match self.kind(qt) {
            TypeKind::Record(r) => Some(*r),
            _ => None,
        }
    }

    /// The record itself when defined, otherwise its template pattern when
    /// that one is. Instantiations that add nothing may lack a definition.
    pub fn record_with_definition(&self, record: RecordId) -> Option<RecordId> {
        let r = self.unit.record(record);
        if r.has_definition() {
            return Some(record);
        }
        r.pattern
            .filter(|p| self.unit.record(*p).has_definition())
    }

    pub fn defined_record_of(&self, qt: QualType) -> Option<RecordId> {
        self.record_of(qt).and_then(|r| self.record_with_definition(r))
    }

    pub fn type_name(&self, qt: QualType) -> String {
        type_name(self.unit, qt)
    }

    pub fn record_name(&self, record: RecordId) -> String {
        record_name(self.unit, record)
    }

    pub fn function_name(&self, function: FunctionId) -> String {
        function_name(self.unit, function)
    }

    /// Canonical type of the `i`-th template argument, when it is a type.
    pub fn template_arg_type(&self, qt: QualType, i: usize) -> Option<QualType> {
        let r = self.record_of(qt)?;
        match self.unit.record(r).template_args.get(i)? {
            TemplateArg::Type(t) => Some(self.canonical(*t)),
            _ => None,
        }
    }

    /// Pointee of a raw pointer, or first template argument of a wrapper.
    pub fn pointee(&self, qt: QualType) -> Option<QualType> {
        match self.kind(qt) {
            TypeKind::Pointer(p) => Some(self.canonical(*p)),
            _ => self.template_arg_type(qt, 0),
        }
    }

    pub fn is_raw_pointer_type(&self, qt: QualType) -> bool {
        matches!(self.kind(qt), TypeKind::Pointer(_))
    }

    pub fn is_reference_type(&self, qt: QualType) -> bool {
        matches!(
            self.kind(qt),
            TypeKind::LValueReference(_) | TypeKind::RValueReference(_)
        )
    }

    pub fn is_safe_ptr_type(&self, qt: QualType) -> bool {
        self.config.names.is_safe_ptr_name(&self.type_name(qt))
    }

    pub fn is_owning_ptr_type(&self, qt: QualType) -> bool {
        self.config.names.is_owning_ptr_name(&self.type_name(qt))
    }

    pub fn is_nullable_ptr_type(&self, qt: QualType) -> bool {
        self.config.names.is_nullable_ptr_name(&self.type_name(qt))
    }

    pub fn is_awaitable_type(&self, qt: QualType) -> bool {
        match self.record_of(qt) {
            Some(r) => {
                self.config.names.is_awaitable_name(&self.record_name(r))
                    || self.unit.record(r).has_attr(Attr::Awaitable)
            }
            None => false,
        }
    }

    pub fn is_lambda_type(&self, qt: QualType) -> bool {
        self.record_of(qt)
            .is_some_and(|r| self.unit.record(r).is_lambda)
    }

    pub fn is_std_function_type(&self, qt: QualType) -> bool {
        self.config.names.is_std_function_name(&self.type_name(qt))
    }

    pub fn is_string_literal_type(&self, qt: QualType) -> bool {
        self.config.names.is_string_literal_name(&self.type_name(qt))
    }

    pub fn is_basic_string_type(&self, qt: QualType) -> bool {
        self.config.names.is_basic_string_name(&self.type_name(qt))
    }

    pub fn is_char_pointer_or_array_type(&self, qt: QualType) -> bool {
        let element = match self.kind(qt) {
            TypeKind::Pointer(e) | TypeKind::Array { element: e, .. } => *e,
            _ => return false,
        };
        matches!(self.kind(element), TypeKind::Builtin(b) if b.is_character())
    }

    pub fn union_record(&self, qt: QualType) -> Option<RecordId> {
        self.defined_record_of(qt)
            .filter(|r| self.unit.record(*r).is_union())
    }

    /// Defined, with neither fields nor bases.
    pub fn is_empty_class(&self, qt: QualType) -> bool {
        self.defined_record_of(qt)
            .is_some_and(|r| self.unit.record(r).is_empty())
    }

    pub fn is_derived_from_node_base(&self, qt: QualType) -> bool {
        self.record_of(qt)
            .is_some_and(|r| self.is_record_derived_from_node_base(r))
    }

    pub fn is_record_derived_from_node_base(&self, record: RecordId) -> bool {
        if self.config.names.is_node_base_name(&self.record_name(record)) {
            return true;
        }
        self.unit
            .record(record)
            .bases()
            .iter()
            .any(|b| self.is_derived_from_node_base(b.ty))
    }

    /// Whitelisted library type. Smart pointer, nullable and awaitable names
    /// are never whitelisted, they always get their dedicated rules.
    pub fn is_system_safe_type_name(&self, name: &str) -> bool {
        if name.is_empty() || self.config.names.is_privileged_name(name) {
            return false;
        }
        self.unsafe_namespaces.is_from_unsafe_namespace(name)
            || self.config.whitelist.is_safe_type(name)
    }

    pub fn is_system_safe_function_name(&self, name: &str) -> bool {
        self.config.names.is_builtin_safe_function(name)
            || self.unsafe_namespaces.is_from_unsafe_namespace(name)
            || self.config.whitelist.is_safe_function(name)
    }

    pub fn is_system_safe_function(&self, function: FunctionId) -> bool {
        let f = self.unit.function(function);
        if let Some(parent) = f.parent {
            let class = self.record_name(parent);
            let names = &self.config.names;
            if (names.is_safe_ptr_name(&class) || names.is_nullable_ptr_name(&class))
                && names.is_safe_ptr_method_name(&f.name)
            {
                return true;
            }
        }
        self.is_system_safe_function_name(&self.function_name(function))
    }

    /// `[[no_side_effect]]` functions, directly or through their template
    /// pattern, `std::move`/`std::forward`, and const methods of a
    /// `no_side_effect_when_const` class.
    pub fn is_no_side_effect(&self, function: FunctionId) -> bool {
        let f = match self.unit.function(function).pattern {
            Some(p) => p,
            None => function,
        };
        if self
            .config
            .names
            .is_std_move_or_forward(&self.function_name(f))
        {
            return true;
        }
        let decl = self.unit.function(f);
        if decl.has_attr(Attr::NoSideEffect) || self.unit.function(function).has_attr(Attr::NoSideEffect) {
            return true;
        }
        match decl.parent {
            Some(parent) if decl.is_const => {
                self.unit.record(parent).has_attr(Attr::NoSideEffectWhenConst)
            }
            _ => false,
        }
    }

    /// The `operator()` methods of a record.
    pub fn call_operators(&self, record: RecordId) -> impl Iterator<Item = FunctionId> + '_ {
        self.unit
            .record(record)
            .methods()
            .iter()
            .copied()
            .filter(|m| self.unit.function(*m).operator == Some(OverloadedOperator::Call))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CheckerOptions, Whitelist};
    use safecheck_ast::{FunctionDecl, FunctionKind, RecordDecl, BuiltinKind};

    #[test]
    fn unsafe_namespaces_come_from_attributes_and_options() {
        let mut unit = TranslationUnit::new();
        let legacy = unit.add_namespace("legacy", unit.root());
        unit.contexts[legacy.index()].attrs.insert(Attr::MemoryUnsafe);
        let opts = CheckerOptions {
            unsafe_namespaces: vec!["vendor".into()],
            ..CheckerOptions::default()
        };
        let config = CheckerConfig::new(opts, Whitelist::new());
        let cx = CheckContext::new(&unit, &config);

        assert_eq!(cx.unsafe_namespaces.len(), 2);
        assert!(cx.unsafe_namespaces.is_from_unsafe_namespace("legacy::Buffer"));
        assert!(cx.unsafe_namespaces.is_from_unsafe_namespace("vendor::x::y"));
        assert!(!cx.unsafe_namespaces.is_from_unsafe_namespace("legacyx::Buffer"));
        assert!(cx.is_system_safe_type_name("legacy::Buffer"));
    }

    #[test]
    fn privileged_names_are_never_whitelisted() {
        let unit = TranslationUnit::new();
        let config = CheckerConfig::with_whitelist(
            Whitelist::new().with_types(["safememory::owning_ptr", "std::string"]),
        );
        let cx = CheckContext::new(&unit, &config);
        assert!(!cx.is_system_safe_type_name("safememory::owning_ptr"));
        assert!(cx.is_system_safe_type_name("std::string"));
        assert!(!cx.is_system_safe_type_name(""));
    }

    #[test]
    fn smart_pointer_accessors_are_safe_functions() {
        let mut unit = TranslationUnit::new();
        let sm = unit.add_namespace("safememory", unit.root());
        let ptr = unit.add_record(RecordDecl::new("soft_ptr", sm, Location::unknown()));
        let scope = unit.add_record_scope(ptr);
        let void = unit.types.builtin(BuiltinKind::Void);
        let mut get = FunctionDecl::new("get", scope, Location::unknown(), FunctionKind::Method, void);
        get.parent = Some(ptr);
        let get = unit.add_function(get);
        let mut reset = FunctionDecl::new("reset", scope, Location::unknown(), FunctionKind::Method, void);
        reset.parent = Some(ptr);
        let reset = unit.add_function(reset);
        let coro = unit.add_function(FunctionDecl::new(
            "__builtin_coro_frame",
            unit.root(),
            Location::unknown(),
            FunctionKind::Free,
            void,
        ));

        let config = CheckerConfig::default();
        let cx = CheckContext::new(&unit, &config);
        assert!(cx.is_system_safe_function(get));
        assert!(!cx.is_system_safe_function(reset));
        assert!(cx.is_system_safe_function(coro));
    }

    #[test]
    fn const_methods_of_no_side_effect_when_const_classes() {
        let mut unit = TranslationUnit::new();
        let mut hasher = RecordDecl::new("Hasher", unit.root(), Location::unknown());
        hasher.attrs.insert(Attr::NoSideEffectWhenConst);
        let hasher = unit.add_record(hasher);
        let size = unit.types.builtin(BuiltinKind::ULong);
        let mut call = FunctionDecl::new("operator()", unit.root(), Location::unknown(), FunctionKind::Method, size);
        call.parent = Some(hasher);
        call.is_const = true;
        let call = unit.add_function(call);
        let mut mutating = FunctionDecl::new("reseed", unit.root(), Location::unknown(), FunctionKind::Method, size);
        mutating.parent = Some(hasher);
        let mutating = unit.add_function(mutating);

        let std_ns = unit.add_namespace("std", unit.root());
        let mv = unit.add_function(FunctionDecl::new("move", std_ns, Location::unknown(), FunctionKind::Free, size));

        let config = CheckerConfig::default();
        let cx = CheckContext::new(&unit, &config);
        assert!(cx.is_no_side_effect(call));
        assert!(!cx.is_no_side_effect(mutating));
        assert!(cx.is_no_side_effect(mv));
    }
}
