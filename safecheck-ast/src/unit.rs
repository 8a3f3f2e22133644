use serde::{Deserialize, Serialize};

use crate::decl::{
    AttrSet, ContextId, ContextKind, DeclContext, FunctionDecl, FunctionId, RecordDecl, RecordId,
    VarDecl, VarId,
};
use crate::span::{FileId, Location, SourceFile};
use crate::stmt::{Stmt, StmtId, StmtKind};
use crate::types::TypeTable;

/// One translation unit as handed over by the frontend.
///
/// Everything is stored in flat arenas addressed by the typed ids of this
/// crate. Context `0` is always the translation unit itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranslationUnit {
    #[serde(default)]
    pub files: Vec<SourceFile>,
    #[serde(default)]
    pub types: TypeTable,
    pub contexts: Vec<DeclContext>,
    #[serde(default)]
    pub records: Vec<RecordDecl>,
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
    #[serde(default)]
    pub vars: Vec<VarDecl>,
    #[serde(default)]
    pub stmts: Vec<Stmt>,
}

impl Default for TranslationUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslationUnit {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            types: TypeTable::new(),
            contexts: vec![DeclContext {
                name: None,
                kind: ContextKind::TranslationUnit,
                parent: None,
                attrs: AttrSet::new(),
            }],
            records: Vec::new(),
            functions: Vec::new(),
            vars: Vec::new(),
            stmts: Vec::new(),
        }
    }

    pub fn root(&self) -> ContextId {
        ContextId(0)
    }

    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.index())
    }

    pub fn context(&self, id: ContextId) -> &DeclContext {
        &self.contexts[id.index()]
    }

    pub fn record(&self, id: RecordId) -> &RecordDecl {
        &self.records[id.index()]
    }

    pub fn record_mut(&mut self, id: RecordId) -> &mut RecordDecl {
        &mut self.records[id.index()]
    }

    pub fn function(&self, id: FunctionId) -> &FunctionDecl {
        &self.functions[id.index()]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut FunctionDecl {
        &mut self.functions[id.index()]
    }

    pub fn var(&self, id: VarId) -> &VarDecl {
        &self.vars[id.index()]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut VarDecl {
        &mut self.vars[id.index()]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    pub fn parent_stmt(&self, id: StmtId) -> Option<StmtId> {
        self.stmt(id).parent
    }

    /// Locations without a file, and locations in system files, are system
    /// (library) locations.
    pub fn is_system_location(&self, loc: Location) -> bool {
        match loc.file {
            None => true,
            Some(f) => self.file(f).is_none_or(|file| file.is_system),
        }
    }

    pub fn record_ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        (0..self.records.len()).map(|i| RecordId(i as u32))
    }

    pub fn function_ids(&self) -> impl Iterator<Item = FunctionId> + '_ {
        (0..self.functions.len()).map(|i| FunctionId(i as u32))
    }

    pub fn var_ids(&self) -> impl Iterator<Item = VarId> + '_ {
        (0..self.vars.len()).map(|i| VarId(i as u32))
    }

    pub fn context_ids(&self) -> impl Iterator<Item = ContextId> + '_ {
        (0..self.contexts.len()).map(|i| ContextId(i as u32))
    }

    pub fn add_file(&mut self, path: impl Into<String>, is_system: bool) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile {
            path: path.into(),
            is_system,
        });
        id
    }

    pub fn add_context(&mut self, ctx: DeclContext) -> ContextId {
        let id = ContextId(self.contexts.len() as u32);
        self.contexts.push(ctx);
        id
    }

    pub fn add_namespace(&mut self, name: impl Into<String>, parent: ContextId) -> ContextId {
        self.add_context(DeclContext {
            name: Some(name.into()),
            kind: ContextKind::Namespace,
            parent: Some(parent),
            attrs: AttrSet::new(),
        })
    }

    /// Opens the scope of a record so nested declarations can live inside it.
    pub fn add_record_scope(&mut self, record: RecordId) -> ContextId {
        let r = self.record(record);
        let ctx = DeclContext {
            name: Some(r.name.clone()),
            kind: ContextKind::Record(record),
            parent: Some(r.context),
            attrs: AttrSet::new(),
        };
        self.add_context(ctx)
    }

    pub fn add_record(&mut self, record: RecordDecl) -> RecordId {
        let id = RecordId(self.records.len() as u32);
        self.records.push(record);
        id
    }

    /// Adds a function and links its parameters back to it.
    pub fn add_function(&mut self, function: FunctionDecl) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        for p in &function.params {
            self.vars[p.index()].function = Some(id);
        }
        self.functions.push(function);
        id
    }

    pub fn add_var(&mut self, var: VarDecl) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(var);
        id
    }

    /// Adds a statement and adopts its already existing children.
    pub fn add_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(stmt);
        self.adopt(id);
        id
    }

    /// Recomputes statement parents and declaring statements for the whole
    /// unit. Needed after deserializing a unit whose producer left them out.
    pub fn link_parents(&mut self) {
        for i in 0..self.stmts.len() {
            self.adopt(StmtId(i as u32));
        }
        for f in 0..self.functions.len() {
            let fid = FunctionId(f as u32);
            for p in self.functions[f].params.clone() {
                self.vars[p.index()].function = Some(fid);
            }
        }
    }

    fn adopt(&mut self, id: StmtId) {
        let stmt = &self.stmts[id.index()];
        let children = stmt.children();
        let declared = match &stmt.kind {
            StmtKind::Decl(vars) => vars.clone(),
            _ => Vec::new(),
        };
        for c in children {
            self.stmts[c.index()].parent = Some(id);
        }
        for v in declared {
            self.vars[v.index()].decl_stmt = Some(id);
        }
    }

    /// Statements of a function body, depth first, the body root first.
    pub fn body_stmts(&self, function: FunctionId) -> Vec<StmtId> {
        let mut out = Vec::new();
        let mut stack: Vec<StmtId> = self.function(function).body.into_iter().collect();
        while let Some(s) = stack.pop() {
            out.push(s);
            let mut children = self.stmt(s).children();
            children.reverse();
            stack.extend(children);
        }
        out
    }
}
