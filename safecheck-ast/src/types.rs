use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::decl::RecordId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A type reference plus its top-level `const` qualifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualType {
    pub ty: TypeId,
    #[serde(default)]
    pub is_const: bool,
}

impl QualType {
    pub fn new(ty: TypeId) -> Self {
        Self { ty, is_const: false }
    }

    pub fn with_const(self) -> Self {
        Self {
            is_const: true,
            ..self
        }
    }

    pub fn without_const(self) -> Self {
        Self {
            is_const: false,
            ..self
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinKind {
    Void,
    Bool,
    Char,
    WChar,
    Char16,
    Char32,
    Short,
    Int,
    Long,
    LongLong,
    UChar,
    UShort,
    UInt,
    ULong,
    ULongLong,
    Float,
    Double,
    LongDouble,
    NullPtr,
}

impl BuiltinKind {
    pub fn spelling(self) -> &'static str {
        match self {
            BuiltinKind::Void => "void",
            BuiltinKind::Bool => "bool",
            BuiltinKind::Char => "char",
            BuiltinKind::WChar => "wchar_t",
            BuiltinKind::Char16 => "char16_t",
            BuiltinKind::Char32 => "char32_t",
            BuiltinKind::Short => "short",
            BuiltinKind::Int => "int",
            BuiltinKind::Long => "long",
            BuiltinKind::LongLong => "long long",
            BuiltinKind::UChar => "unsigned char",
            BuiltinKind::UShort => "unsigned short",
            BuiltinKind::UInt => "unsigned int",
            BuiltinKind::ULong => "unsigned long",
            BuiltinKind::ULongLong => "unsigned long long",
            BuiltinKind::Float => "float",
            BuiltinKind::Double => "double",
            BuiltinKind::LongDouble => "long double",
            BuiltinKind::NullPtr => "std::nullptr_t",
        }
    }

    pub fn is_character(self) -> bool {
        matches!(
            self,
            BuiltinKind::Char
                | BuiltinKind::WChar
                | BuiltinKind::Char16
                | BuiltinKind::Char32
                | BuiltinKind::UChar
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Builtin(BuiltinKind),
    /// Enumeration, by qualified name.
    Enum(String),
    Pointer(QualType),
    LValueReference(QualType),
    RValueReference(QualType),
    Array {
        element: QualType,
        size: Option<u64>,
    },
    Record(RecordId),
    /// Uninstantiated template type parameter.
    TemplateParam {
        name: String,
        depth: u32,
        index: u32,
    },
    /// Sugar: a named alias of another type. Never canonical.
    Typedef {
        name: String,
        target: QualType,
    },
    Function {
        ret: QualType,
        params: Vec<QualType>,
    },
    /// Dependent or otherwise unresolved type.
    Dependent(String),
}

/// Interning table for types. Identical canonical kinds share one `TypeId`,
/// which makes the canonical id a stable identity for caches.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Vec<TypeKind>", into = "Vec<TypeKind>")]
pub struct TypeTable {
    kinds: Vec<TypeKind>,
    index: HashMap<TypeKind, TypeId>,
}

impl From<Vec<TypeKind>> for TypeTable {
    fn from(kinds: Vec<TypeKind>) -> Self {
        let index = kinds
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), TypeId(i as u32)))
            .collect();
        Self { kinds, index }
    }
}

impl From<TypeTable> for Vec<TypeKind> {
    fn from(table: TypeTable) -> Self {
        table.kinds
    }
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn kinds(&self) -> &[TypeKind] {
        &self.kinds
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.kinds[id.index()]
    }

    pub fn intern(&mut self, kind: TypeKind) -> TypeId {
        let kind = self.canonicalize_components(kind);
        if let Some(id) = self.index.get(&kind) {
            return *id;
        }
        let id = TypeId(self.kinds.len() as u32);
        self.kinds.push(kind.clone());
        self.index.insert(kind, id);
        id
    }

    // Pointee and element types are stored canonical; only the top level may carry sugar.
    fn canonicalize_components(&self, kind: TypeKind) -> TypeKind {
        match kind {
            TypeKind::Pointer(q) => TypeKind::Pointer(self.canonical(q)),
            TypeKind::LValueReference(q) => TypeKind::LValueReference(self.canonical(q)),
            TypeKind::RValueReference(q) => TypeKind::RValueReference(self.canonical(q)),
            TypeKind::Array { element, size } => TypeKind::Array {
                element: self.canonical(element),
                size,
            },
            other => other,
        }
    }

    /// Strips typedef sugar, folding every `const` met on the way into the result.
    pub fn canonical(&self, qt: QualType) -> QualType {
        let mut current = qt;
        let mut is_const = qt.is_const;
        while let TypeKind::Typedef { target, .. } = self.kind(current.ty) {
            is_const |= target.is_const;
            current = *target;
        }
        QualType {
            ty: current.ty,
            is_const,
        }
    }

    pub fn is_canonical(&self, qt: QualType) -> bool {
        !matches!(self.kind(qt.ty), TypeKind::Typedef { .. })
    }

    pub fn builtin(&mut self, kind: BuiltinKind) -> QualType {
        QualType::new(self.intern(TypeKind::Builtin(kind)))
    }

    pub fn enumeration(&mut self, name: impl Into<String>) -> QualType {
        QualType::new(self.intern(TypeKind::Enum(name.into())))
    }

    pub fn pointer_to(&mut self, pointee: QualType) -> QualType {
        QualType::new(self.intern(TypeKind::Pointer(pointee)))
    }

    pub fn lvalue_ref_to(&mut self, pointee: QualType) -> QualType {
        QualType::new(self.intern(TypeKind::LValueReference(pointee)))
    }

    pub fn rvalue_ref_to(&mut self, pointee: QualType) -> QualType {
        QualType::new(self.intern(TypeKind::RValueReference(pointee)))
    }

    pub fn array_of(&mut self, element: QualType, size: Option<u64>) -> QualType {
        QualType::new(self.intern(TypeKind::Array { element, size }))
    }

    pub fn record(&mut self, record: RecordId) -> QualType {
        QualType::new(self.intern(TypeKind::Record(record)))
    }

    pub fn template_param(&mut self, name: impl Into<String>, depth: u32, index: u32) -> QualType {
        QualType::new(self.intern(TypeKind::TemplateParam {
            name: name.into(),
            depth,
            index,
        }))
    }

    pub fn typedef(&mut self, name: impl Into<String>, target: QualType) -> QualType {
        QualType::new(self.intern(TypeKind::Typedef {
            name: name.into(),
            target,
        }))
    }

    pub fn dependent(&mut self, spelling: impl Into<String>) -> QualType {
        QualType::new(self.intern(TypeKind::Dependent(spelling.into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_shares_identical_kinds() {
        let mut t = TypeTable::new();
        let a = t.builtin(BuiltinKind::Int);
        let b = t.builtin(BuiltinKind::Int);
        assert_eq!(a, b);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn canonical_strips_typedef_and_folds_const() {
        let mut t = TypeTable::new();
        let int = t.builtin(BuiltinKind::Int);
        let alias = t.typedef("my_int", int.with_const());
        let alias2 = t.typedef("my_int2", alias);
        let c = t.canonical(alias2);
        assert_eq!(c.ty, int.ty);
        assert!(c.is_const);
        assert!(!t.is_canonical(alias2));
        assert!(t.is_canonical(c));
    }

    #[test]
    fn pointer_to_alias_is_the_canonical_pointer() {
        let mut t = TypeTable::new();
        let int = t.builtin(BuiltinKind::Int);
        let alias = t.typedef("my_int", int);
        assert_eq!(t.pointer_to(alias), t.pointer_to(int));
    }

    #[test]
    fn table_survives_serde() {
        let mut t = TypeTable::new();
        let int = t.builtin(BuiltinKind::Int);
        let p = t.pointer_to(int);
        let json = serde_json::to_string(&t).unwrap();
        let mut back: TypeTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pointer_to(int), p);
        assert_eq!(back.len(), 2);
    }
}
