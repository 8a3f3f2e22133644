//! Convenience layer for assembling a [`TranslationUnit`] by hand.
//!
//! Frontend bindings and tests use it; every declaration gets a distinct
//! location in either the user file or the system file.

use crate::decl::{
    Attr, BaseSpecifier, ContextId, ContextKind, FieldDecl, FunctionDecl, FunctionId,
    FunctionKind, OverloadedOperator, RecordDecl, RecordDefinition, RecordId, RecordTag,
    TemplateArg, VarDecl, VarId, VarKind,
};
use crate::expr::{
    BinaryOp, CallExpr, CallKind, Capture, CaptureKind, DeclRef, Expr, ExprKind, LambdaExpr,
};
use crate::span::{FileId, Location, span};
use crate::stmt::{Stmt, StmtId, StmtKind};
use crate::types::{BuiltinKind, QualType};
use crate::unit::TranslationUnit;

pub struct UnitBuilder {
    pub unit: TranslationUnit,
    user_file: FileId,
    system_file: FileId,
    next_offset: usize,
}

impl Default for UnitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitBuilder {
    pub fn new() -> Self {
        let mut unit = TranslationUnit::new();
        let user_file = unit.add_file("main.cpp", false);
        let system_file = unit.add_file("/usr/include/safe_library.h", true);
        Self {
            unit,
            user_file,
            system_file,
            next_offset: 0,
        }
    }

    pub fn finish(self) -> TranslationUnit {
        self.unit
    }

    fn next_span(&mut self) -> crate::span::Span {
        let s = span(self.next_offset, 1);
        self.next_offset += 1;
        s
    }

    pub fn user_loc(&mut self) -> Location {
        let s = self.next_span();
        Location::new(self.user_file, s)
    }

    pub fn system_loc(&mut self) -> Location {
        let s = self.next_span();
        Location::new(self.system_file, s)
    }

    fn loc(&mut self, system: bool) -> Location {
        if system {
            self.system_loc()
        } else {
            self.user_loc()
        }
    }

    /// Namespace for a `a::b::c` path, reusing namespaces that already exist.
    /// An empty path is the translation unit.
    pub fn namespace(&mut self, path: &str) -> ContextId {
        let mut ctx = self.unit.root();
        for seg in path.split("::").filter(|s| !s.is_empty()) {
            let existing = self.unit.context_ids().find(|id| {
                let c = self.unit.context(*id);
                c.kind == ContextKind::Namespace
                    && c.parent == Some(ctx)
                    && c.name.as_deref() == Some(seg)
            });
            ctx = match existing {
                Some(id) => id,
                None => self.unit.add_namespace(seg, ctx),
            };
        }
        ctx
    }

    pub fn namespace_attr(&mut self, ctx: ContextId, attr: Attr) {
        self.unit.contexts[ctx.index()].attrs.insert(attr);
    }

    pub fn builtin(&mut self, kind: BuiltinKind) -> QualType {
        self.unit.types.builtin(kind)
    }

    pub fn int(&mut self) -> QualType {
        self.builtin(BuiltinKind::Int)
    }

    pub fn void(&mut self) -> QualType {
        self.builtin(BuiltinKind::Void)
    }

    pub fn pointer(&mut self, pointee: QualType) -> QualType {
        self.unit.types.pointer_to(pointee)
    }

    pub fn lref(&mut self, pointee: QualType) -> QualType {
        self.unit.types.lvalue_ref_to(pointee)
    }

    pub fn record_type(&mut self, record: RecordId) -> QualType {
        self.unit.types.record(record)
    }

    fn new_record(&mut self, ctx: ContextId, name: &str, system: bool, tag: RecordTag) -> RecordId {
        let loc = self.loc(system);
        let mut rec = RecordDecl::new(name, ctx, loc);
        rec.tag = tag;
        rec.definition = Some(RecordDefinition::default());
        self.unit.add_record(rec)
    }

    /// A defined struct in user code.
    pub fn struct_decl(&mut self, ctx: ContextId, name: &str) -> RecordId {
        self.new_record(ctx, name, false, RecordTag::Struct)
    }

    pub fn union_decl(&mut self, ctx: ContextId, name: &str) -> RecordId {
        self.new_record(ctx, name, false, RecordTag::Union)
    }

    /// A defined struct in a system header.
    pub fn system_struct(&mut self, ctx: ContextId, name: &str) -> RecordId {
        self.new_record(ctx, name, true, RecordTag::Struct)
    }

    /// A template specialization such as `safememory::owning_ptr<int>` living
    /// in a system header, as a type.
    pub fn instance(&mut self, qualified: &str, args: &[QualType]) -> QualType {
        let (ns, name) = match qualified.rsplit_once("::") {
            Some((ns, name)) => (ns, name),
            None => ("", qualified),
        };
        let ctx = self.namespace(ns);
        let r = self.new_record(ctx, name, true, RecordTag::Struct);
        let rec = self.unit.record_mut(r);
        rec.template_args = args.iter().copied().map(TemplateArg::Type).collect();
        rec.is_implicit_instantiation = true;
        self.record_type(r)
    }

    pub fn attr(&mut self, record: RecordId, attr: Attr) {
        self.unit.record_mut(record).attrs.insert(attr);
    }

    fn definition(&mut self, record: RecordId) -> &mut RecordDefinition {
        self.unit
            .record_mut(record)
            .definition
            .get_or_insert_with(RecordDefinition::default)
    }

    pub fn field(&mut self, record: RecordId, name: &str, ty: QualType) -> usize {
        let location = self.user_loc();
        let def = self.definition(record);
        def.fields.push(FieldDecl {
            name: name.to_string(),
            ty,
            location,
            has_in_class_init: false,
        });
        def.fields.len() - 1
    }

    pub fn field_with_init(&mut self, record: RecordId, name: &str, ty: QualType) -> usize {
        let idx = self.field(record, name, ty);
        self.definition(record).fields[idx].has_in_class_init = true;
        idx
    }

    pub fn base(&mut self, record: RecordId, ty: QualType) {
        let location = self.user_loc();
        self.definition(record)
            .bases
            .push(BaseSpecifier { ty, location });
    }

    /// The context nested declarations of `record` live in.
    pub fn record_scope(&mut self, record: RecordId) -> ContextId {
        let existing = self
            .unit
            .context_ids()
            .find(|id| self.unit.context(*id).kind == ContextKind::Record(record));
        match existing {
            Some(id) => id,
            None => self.unit.add_record_scope(record),
        }
    }

    /// A method declared inside `record`.
    pub fn method(&mut self, record: RecordId, name: &str, kind: FunctionKind) -> FunctionId {
        let location = self.user_loc();
        let ret = self.void();
        let ctx = self.record_scope(record);
        let mut f = FunctionDecl::new(name, ctx, location, kind, ret);
        f.parent = Some(record);
        if name == "operator()" {
            f.operator = Some(OverloadedOperator::Call);
        }
        let id = self.unit.add_function(f);
        self.definition(record).methods.push(id);
        id
    }

    pub fn function_mut(&mut self, f: FunctionId) -> &mut FunctionDecl {
        self.unit.function_mut(f)
    }

    /// A free function in user code with the given parameters.
    pub fn function(&mut self, name: &str, params: &[(&str, QualType)], ret: QualType) -> FunctionId {
        let location = self.user_loc();
        let root = self.unit.root();
        let mut f = FunctionDecl::new(name, root, location, FunctionKind::Free, ret);
        for (pname, ty) in params {
            let ploc = self.user_loc();
            f.params
                .push(self.unit.add_var(VarDecl::new(*pname, *ty, ploc, VarKind::Param)));
        }
        self.unit.add_function(f)
    }

    /// Adds parameters to an existing function (e.g. a method).
    pub fn params(&mut self, f: FunctionId, params: &[(&str, QualType)]) -> Vec<VarId> {
        let mut ids = Vec::new();
        for (pname, ty) in params {
            let ploc = self.user_loc();
            let mut v = VarDecl::new(*pname, *ty, ploc, VarKind::Param);
            v.function = Some(f);
            let id = self.unit.add_var(v);
            self.unit.function_mut(f).params.push(id);
            ids.push(id);
        }
        ids
    }

    pub fn param(&self, f: FunctionId, i: usize) -> VarId {
        self.unit.function(f).params[i]
    }

    pub fn var(&mut self, function: Option<FunctionId>, name: &str, ty: QualType, kind: VarKind) -> VarId {
        let location = self.user_loc();
        let mut v = VarDecl::new(name, ty, location, kind);
        v.function = function;
        self.unit.add_var(v)
    }

    pub fn local(&mut self, function: FunctionId, name: &str, ty: QualType) -> VarId {
        self.var(Some(function), name, ty, VarKind::Local)
    }

    pub fn global(&mut self, name: &str, ty: QualType) -> VarId {
        self.var(None, name, ty, VarKind::Global)
    }

    pub fn var_attr(&mut self, var: VarId, attr: Attr) {
        self.unit.var_mut(var).attrs.insert(attr);
    }

    pub fn init(&mut self, var: VarId, expr: Expr) {
        self.unit.var_mut(var).init = Some(expr);
    }

    // expressions

    pub fn expr(&mut self, ty: QualType, kind: ExprKind) -> Expr {
        let location = self.user_loc();
        Expr::new(location, ty, kind)
    }

    pub fn var_ref(&mut self, var: VarId) -> Expr {
        let ty = self.unit.var(var).ty;
        self.expr(ty, ExprKind::DeclRef(DeclRef::Var(var)))
    }

    pub fn function_ref(&mut self, f: FunctionId) -> Expr {
        let ty = self.void();
        self.expr(ty, ExprKind::DeclRef(DeclRef::Function(f)))
    }

    pub fn this(&mut self, ty: QualType) -> Expr {
        self.expr(ty, ExprKind::This)
    }

    pub fn null(&mut self) -> Expr {
        let ty = self.builtin(BuiltinKind::NullPtr);
        self.expr(ty, ExprKind::NullPtrLiteral)
    }

    pub fn integer(&mut self, v: i64) -> Expr {
        let ty = self.int();
        self.expr(ty, ExprKind::IntegerLiteral(v))
    }

    pub fn member(&mut self, base: Expr, name: &str, ty: QualType, is_arrow: bool) -> Expr {
        self.expr(
            ty,
            ExprKind::Member {
                base: Box::new(base),
                name: name.to_string(),
                is_arrow,
            },
        )
    }

    pub fn assign(&mut self, lhs: Expr, rhs: Expr) -> Expr {
        let ty = lhs.ty;
        self.expr(
            ty,
            ExprKind::Binary {
                op: BinaryOp::Assign,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        )
    }

    pub fn call(&mut self, callee: FunctionId, args: Vec<Expr>) -> Expr {
        let ty = self.unit.function(callee).ret;
        self.expr(
            ty,
            ExprKind::Call(CallExpr {
                callee: Some(callee),
                kind: CallKind::Free,
                args,
            }),
        )
    }

    pub fn member_call(&mut self, base: Expr, callee: FunctionId, args: Vec<Expr>, is_arrow: bool) -> Expr {
        let ty = self.unit.function(callee).ret;
        self.expr(
            ty,
            ExprKind::Call(CallExpr {
                callee: Some(callee),
                kind: CallKind::Member {
                    base: Box::new(base),
                    is_arrow,
                },
                args,
            }),
        )
    }

    /// A lambda expression with a fresh closure record in user code.
    pub fn lambda(&mut self, captures: &[CaptureKind]) -> Expr {
        let root = self.unit.root();
        let closure = self.struct_decl(root, "");
        self.unit.record_mut(closure).is_lambda = true;
        let ty = self.record_type(closure);
        let captures = captures
            .iter()
            .map(|kind| Capture {
                kind: *kind,
                location: self.user_loc(),
            })
            .collect();
        self.expr(
            ty,
            ExprKind::Lambda(LambdaExpr {
                record: Some(closure),
                captures,
            }),
        )
    }

    // statements

    pub fn stmt(&mut self, kind: StmtKind) -> StmtId {
        let location = self.user_loc();
        self.unit.add_stmt(Stmt::new(location, kind))
    }

    pub fn decl_stmt(&mut self, vars: &[VarId]) -> StmtId {
        self.stmt(StmtKind::Decl(vars.to_vec()))
    }

    pub fn expr_stmt(&mut self, expr: Expr) -> StmtId {
        self.stmt(StmtKind::Expr(expr))
    }

    pub fn return_stmt(&mut self, expr: Option<Expr>) -> StmtId {
        self.stmt(StmtKind::Return(expr))
    }

    pub fn compound(&mut self, items: &[StmtId]) -> StmtId {
        self.stmt(StmtKind::Compound(items.to_vec()))
    }

    pub fn set_body(&mut self, f: FunctionId, body: StmtId) {
        self.unit.function_mut(f).body = Some(body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_are_reused() {
        let mut b = UnitBuilder::new();
        let a = b.namespace("safememory::detail");
        let again = b.namespace("safememory::detail");
        assert_eq!(a, again);
        assert_eq!(b.namespace(""), b.unit.root());
    }

    #[test]
    fn instances_live_in_system_headers() {
        let mut b = UnitBuilder::new();
        let int = b.int();
        let t = b.instance("safememory::owning_ptr", &[int]);
        let unit = b.finish();
        let crate::types::TypeKind::Record(r) = unit.types.kind(t.ty) else {
            panic!("expected a record type");
        };
        assert!(unit.is_system_location(unit.record(*r).location));
        assert_eq!(unit.record(*r).template_args.len(), 1);
    }
}
