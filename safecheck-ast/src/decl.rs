use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::span::Location;
use crate::stmt::StmtId;
use crate::types::QualType;

macro_rules! arena_id {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            pub struct $name(pub u32);

            impl $name {
                pub fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

arena_id!(ContextId, RecordId, FunctionId, VarId);

/// Source-level attributes the checker understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attr {
    NakedStruct,
    DeepConst,
    /// Deep-const only when all template arguments are deep-const.
    DeepConstWhenParams,
    MemoryUnsafe,
    CheckAsUserCode,
    NonDeterministic,
    NoSideEffect,
    NoSideEffectWhenConst,
    MayExtendToThis,
    Awaitable,
}

pub type AttrSet = BTreeSet<Attr>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextKind {
    TranslationUnit,
    Namespace,
    LinkageSpec,
    Record(RecordId),
    Function(FunctionId),
    Enum,
}

impl ContextKind {
    /// Whether the context is a named declaration (contributes to qualified names).
    pub fn is_named(self) -> bool {
        !matches!(self, ContextKind::TranslationUnit | ContextKind::LinkageSpec)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclContext {
    /// `None` for unnamed contexts; anonymous namespaces use an empty name.
    pub name: Option<String>,
    pub kind: ContextKind,
    pub parent: Option<ContextId>,
    #[serde(default)]
    pub attrs: AttrSet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordTag {
    Struct,
    Class,
    Union,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateArg {
    Type(QualType),
    Integral(i64),
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: QualType,
    pub location: Location,
    #[serde(default)]
    pub has_in_class_init: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseSpecifier {
    pub ty: QualType,
    pub location: Location,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDefinition {
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub bases: Vec<BaseSpecifier>,
    #[serde(default)]
    pub methods: Vec<FunctionId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDecl {
    pub name: String,
    /// Enclosing context.
    pub context: ContextId,
    pub location: Location,
    pub tag: RecordTag,
    #[serde(default)]
    pub definition: Option<RecordDefinition>,
    #[serde(default)]
    pub template_args: Vec<TemplateArg>,
    /// Template pattern this specialization was instantiated from.
    #[serde(default)]
    pub pattern: Option<RecordId>,
    /// Uninstantiated class template (the pattern itself).
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub is_implicit_instantiation: bool,
    #[serde(default)]
    pub is_lambda: bool,
    #[serde(default)]
    pub attrs: AttrSet,
}

impl RecordDecl {
    pub fn new(name: impl Into<String>, context: ContextId, location: Location) -> Self {
        Self {
            name: name.into(),
            context,
            location,
            tag: RecordTag::Struct,
            definition: None,
            template_args: Vec::new(),
            pattern: None,
            is_template: false,
            is_implicit_instantiation: false,
            is_lambda: false,
            attrs: AttrSet::new(),
        }
    }

    pub fn is_union(&self) -> bool {
        self.tag == RecordTag::Union
    }

    pub fn has_definition(&self) -> bool {
        self.definition.is_some()
    }

    pub fn has_attr(&self, attr: Attr) -> bool {
        self.attrs.contains(&attr)
    }

    pub fn fields(&self) -> &[FieldDecl] {
        self.definition.as_ref().map_or(&[], |d| d.fields.as_slice())
    }

    pub fn bases(&self) -> &[BaseSpecifier] {
        self.definition.as_ref().map_or(&[], |d| d.bases.as_slice())
    }

    pub fn methods(&self) -> &[FunctionId] {
        self.definition.as_ref().map_or(&[], |d| d.methods.as_slice())
    }

    /// An empty class: defined, without fields and without bases.
    pub fn is_empty(&self) -> bool {
        self.has_definition() && self.fields().is_empty() && self.bases().is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionKind {
    Free,
    Method,
    Constructor { copy_or_move: bool },
    Destructor,
    CopyAssign,
    MoveAssign,
    Conversion,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverloadedOperator {
    Call,
    Star,
    Arrow,
    Assign,
    Subscript,
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub context: ContextId,
    pub location: Location,
    pub kind: FunctionKind,
    #[serde(default)]
    pub operator: Option<OverloadedOperator>,
    /// Record this method belongs to.
    #[serde(default)]
    pub parent: Option<RecordId>,
    #[serde(default)]
    pub is_const: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub is_defaulted: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub params: Vec<VarId>,
    pub ret: QualType,
    #[serde(default)]
    pub body: Option<StmtId>,
    /// Template this function was instantiated from.
    #[serde(default)]
    pub pattern: Option<FunctionId>,
    #[serde(default)]
    pub attrs: AttrSet,
}

impl FunctionDecl {
    pub fn new(
        name: impl Into<String>,
        context: ContextId,
        location: Location,
        kind: FunctionKind,
        ret: QualType,
    ) -> Self {
        Self {
            name: name.into(),
            context,
            location,
            kind,
            operator: None,
            parent: None,
            is_const: false,
            is_static: false,
            is_virtual: false,
            is_defaulted: false,
            is_deleted: false,
            params: Vec::new(),
            ret,
            body: None,
            pattern: None,
            attrs: AttrSet::new(),
        }
    }

    pub fn is_instance_method(&self) -> bool {
        self.parent.is_some() && !self.is_static
    }

    pub fn is_copy_or_move_assign(&self) -> bool {
        matches!(self.kind, FunctionKind::CopyAssign | FunctionKind::MoveAssign)
    }

    pub fn has_attr(&self, attr: Attr) -> bool {
        self.attrs.contains(&attr)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    Local,
    Param,
    CatchParam,
    Global,
    StaticLocal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub ty: QualType,
    pub location: Location,
    pub kind: VarKind,
    #[serde(default)]
    pub attrs: AttrSet,
    /// Declaration statement that introduces a local.
    #[serde(default)]
    pub decl_stmt: Option<StmtId>,
    #[serde(default)]
    pub init: Option<Expr>,
    /// Function owning a parameter or local.
    #[serde(default)]
    pub function: Option<FunctionId>,
}

impl VarDecl {
    pub fn new(name: impl Into<String>, ty: QualType, location: Location, kind: VarKind) -> Self {
        Self {
            name: name.into(),
            ty,
            location,
            kind,
            attrs: AttrSet::new(),
            decl_stmt: None,
            init: None,
            function: None,
        }
    }

    pub fn has_global_storage(&self) -> bool {
        matches!(self.kind, VarKind::Global | VarKind::StaticLocal)
    }

    pub fn is_param(&self) -> bool {
        self.kind == VarKind::Param
    }

    pub fn is_param_or_catch(&self) -> bool {
        matches!(self.kind, VarKind::Param | VarKind::CatchParam)
    }

    pub fn has_attr(&self, attr: Attr) -> bool {
        self.attrs.contains(&attr)
    }
}
