//! Deterministic scripted front-end for exercising the mapper, the
//! orchestrator, and the search stack without a real C/C++ parser. Lives in
//! `src/` so integration tests under `tests/` can use it.

use crate::indexer::frontend::{
    Access, ContainerHandle, DeclInfo, EntityKind, IndexCallbacks, IndexingOptions,
    SemanticFrontend, SourceLocation, TemplateKind, TypeInfo, TypeKind,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex};

/// One scripted declaration. `parent` points at an earlier declaration in
/// the same file whose issued container handle becomes this declaration's
/// semantic and lexical parent.
#[derive(Debug, Clone)]
pub struct ScriptedDecl {
    pub name: String,
    pub kind: EntityKind,
    pub line: u32,
    pub column: u32,
    pub parent: Option<usize>,
    pub is_container: bool,
    pub is_redeclaration: bool,
    pub is_implicit: bool,
    pub is_virtual: bool,
    pub access: Option<Access>,
    pub template_kind: TemplateKind,
    pub type_info: Option<TypeInfo>,
    pub bases: Vec<String>,
    pub enum_value: Option<i64>,
    pub bit_width: Option<u32>,
}

impl ScriptedDecl {
    pub fn new(name: impl Into<String>, kind: EntityKind, line: u32, column: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            line,
            column,
            parent: None,
            is_container: false,
            is_redeclaration: false,
            is_implicit: false,
            is_virtual: false,
            access: None,
            template_kind: TemplateKind::None,
            type_info: None,
            bases: Vec::new(),
            enum_value: None,
            bit_width: None,
        }
    }

    pub fn container(mut self) -> Self {
        self.is_container = true;
        self
    }

    pub fn parent(mut self, index: usize) -> Self {
        self.parent = Some(index);
        self
    }

    pub fn sized(mut self, size: u64, align: u64) -> Self {
        let ti = self.type_info.get_or_insert_with(TypeInfo::default);
        ti.kind = TypeKind::Concrete;
        ti.size = Some(size);
        ti.align = Some(align);
        self
    }

    pub fn typed(mut self, spelling: impl Into<String>) -> Self {
        let ti = self.type_info.get_or_insert_with(TypeInfo::default);
        ti.kind = TypeKind::Concrete;
        ti.spelling = spelling.into();
        self
    }

    pub fn pod(mut self) -> Self {
        let ti = self.type_info.get_or_insert_with(TypeInfo::default);
        ti.kind = TypeKind::Concrete;
        ti.is_pod = true;
        self
    }

    pub fn arity(mut self, n: u32) -> Self {
        let ti = self.type_info.get_or_insert_with(TypeInfo::default);
        ti.kind = TypeKind::Concrete;
        ti.arity = Some(n);
        self
    }

    pub fn bases(mut self, bases: &[&str]) -> Self {
        self.bases = bases.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn access(mut self, access: Access) -> Self {
        self.access = Some(access);
        self
    }

    pub fn redeclaration(mut self) -> Self {
        self.is_redeclaration = true;
        self
    }
}

/// Replays declaration scripts keyed by file name. Files without a script
/// fail their pass, which exercises the per-file error channel.
#[derive(Default)]
pub struct ScriptedFrontend {
    files: HashMap<String, Vec<ScriptedDecl>>,
}

impl ScriptedFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, file_name: impl Into<String>, decls: Vec<ScriptedDecl>) {
        self.files.insert(file_name.into(), decls);
    }
}

impl SemanticFrontend for ScriptedFrontend {
    fn index_file(
        &self,
        _compiler_args: &[String],
        _options: IndexingOptions,
        file: &Path,
        callbacks: &mut dyn IndexCallbacks,
    ) -> Result<(), String> {
        let key = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let decls = self
            .files
            .get(&key)
            .ok_or_else(|| format!("no declarations scripted for {}", file.display()))?;

        callbacks.entered_main_file(file);
        let root = callbacks.started_translation_unit();
        let mut handles: Vec<Option<ContainerHandle>> = Vec::with_capacity(decls.len());
        for d in decls {
            if callbacks.should_abort() {
                return Ok(());
            }
            let parent = d.parent.and_then(|i| handles.get(i).copied().flatten());
            let mut info = DeclInfo::new(
                d.name.clone(),
                d.kind,
                SourceLocation {
                    file: file.to_path_buf(),
                    line: d.line,
                    column: d.column,
                },
            );
            info.semantic_container = parent.or(Some(root));
            info.lexical_container = parent.or(Some(root));
            info.is_container = d.is_container;
            info.is_redeclaration = d.is_redeclaration;
            info.is_implicit = d.is_implicit;
            info.is_virtual = d.is_virtual;
            info.access = d.access;
            info.template_kind = d.template_kind;
            info.type_info = d.type_info.clone();
            info.bases = d.bases.clone();
            info.enum_value = d.enum_value;
            info.bit_width = d.bit_width;
            handles.push(callbacks.declaration(&info));
        }
        Ok(())
    }
}

/// Wraps another front-end and blocks every pass on a shared gate. Lets a
/// test request a stop while the first file is provably still in flight.
pub struct GatedFrontend<F> {
    inner: F,
    gate: Arc<(Mutex<bool>, Condvar)>,
}

impl<F> GatedFrontend<F> {
    pub fn new(inner: F) -> (Self, GateHandle) {
        let gate = Arc::new((Mutex::new(false), Condvar::new()));
        (
            Self {
                inner,
                gate: Arc::clone(&gate),
            },
            GateHandle { gate },
        )
    }
}

#[derive(Clone)]
pub struct GateHandle {
    gate: Arc<(Mutex<bool>, Condvar)>,
}

impl GateHandle {
    pub fn open(&self) {
        let (lock, cvar) = &*self.gate;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }
}

impl<F: SemanticFrontend> SemanticFrontend for GatedFrontend<F> {
    fn index_file(
        &self,
        compiler_args: &[String],
        options: IndexingOptions,
        file: &Path,
        callbacks: &mut dyn IndexCallbacks,
    ) -> Result<(), String> {
        let (lock, cvar) = &*self.gate;
        let mut opened = lock.lock().unwrap();
        while !*opened {
            opened = cvar.wait(opened).unwrap();
        }
        drop(opened);
        self.inner.index_file(compiler_args, options, file, callbacks)
    }
}
