//! Fully qualified names, the key of every whitelist and kind lookup.

use safecheck_ast::{
    ContextId, FunctionId, QualType, RecordId, TemplateArg, TranslationUnit, TypeKind,
};

/// `a::b::` for a declaration living in context `b` inside namespace `a`.
///
/// Unnamed contexts (the translation unit, `extern "C"` blocks) are skipped;
/// anonymous named contexts contribute an empty segment.
pub fn context_prefix(unit: &TranslationUnit, ctx: ContextId) -> String {
    let mut segments = Vec::new();
    let mut current = Some(ctx);
    while let Some(id) = current {
        let c = unit.context(id);
        if c.kind.is_named() {
            segments.push(c.name.as_deref().unwrap_or(""));
        }
        current = c.parent;
    }
    let mut out = String::new();
    for seg in segments.iter().rev() {
        out.push_str(seg);
        out.push_str("::");
    }
    out
}

/// Qualified name of a declaration named `name` inside `ctx`.
/// Anonymous declarations have no name, `""` never matches any list.
pub fn qualified_name(unit: &TranslationUnit, ctx: ContextId, name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let mut out = context_prefix(unit, ctx);
    out.push_str(name);
    out
}

/// Qualified name of a named context itself, `"a::b"`.
pub fn context_name(unit: &TranslationUnit, ctx: ContextId) -> String {
    let c = unit.context(ctx);
    match (c.parent, c.name.as_deref()) {
        (Some(parent), Some(name)) => qualified_name(unit, parent, name),
        _ => String::new(),
    }
}

/// Record name without template arguments: every specialization of
/// `safememory::owning_ptr<T>` is `safememory::owning_ptr`.
pub fn record_name(unit: &TranslationUnit, record: RecordId) -> String {
    let r = unit.record(record);
    qualified_name(unit, r.context, &r.name)
}

pub fn function_name(unit: &TranslationUnit, function: FunctionId) -> String {
    let f = unit.function(function);
    qualified_name(unit, f.context, &f.name)
}

/// Qualified name of the record behind a type, or `""` for anything else.
pub fn type_name(unit: &TranslationUnit, qt: QualType) -> String {
    let c = unit.types.canonical(qt);
    match unit.types.kind(c.ty) {
        TypeKind::Record(r) => record_name(unit, *r),
        _ => String::new(),
    }
}

/// Human readable spelling of a type, for diagnostics.
pub fn type_spelling(unit: &TranslationUnit, qt: QualType) -> String {
    let base = match unit.types.kind(qt.ty) {
        TypeKind::Builtin(b) => b.spelling().to_string(),
        TypeKind::Enum(name) | TypeKind::Dependent(name) => name.clone(),
        TypeKind::Typedef { name, .. } | TypeKind::TemplateParam { name, .. } => name.clone(),
        TypeKind::Pointer(p) => format!("{} *", type_spelling(unit, *p)),
        TypeKind::LValueReference(p) => format!("{} &", type_spelling(unit, *p)),
        TypeKind::RValueReference(p) => format!("{} &&", type_spelling(unit, *p)),
        TypeKind::Array { element, size } => match size {
            Some(n) => format!("{}[{n}]", type_spelling(unit, *element)),
            None => format!("{}[]", type_spelling(unit, *element)),
        },
        TypeKind::Record(r) => {
            let rec = unit.record(*r);
            let name = record_name(unit, *r);
            let name = if name.is_empty() {
                "(anonymous)".to_string()
            } else {
                name
            };
            if rec.template_args.is_empty() {
                name
            } else {
                let args: Vec<String> = rec
                    .template_args
                    .iter()
                    .map(|a| match a {
                        TemplateArg::Type(t) => type_spelling(unit, *t),
                        TemplateArg::Integral(v) => v.to_string(),
                        TemplateArg::Other(s) => s.clone(),
                    })
                    .collect();
                format!("{name}<{}>", args.join(", "))
            }
        }
        TypeKind::Function { ret, params } => {
            let params: Vec<String> = params.iter().map(|p| type_spelling(unit, *p)).collect();
            format!("{} ({})", type_spelling(unit, *ret), params.join(", "))
        }
    };
    if qt.is_const {
        format!("const {base}")
    } else {
        base
    }
}
