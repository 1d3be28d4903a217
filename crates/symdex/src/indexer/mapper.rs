// Copyright 2025 Symdex Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The declaration-to-document mapper: consumes one file's callback stream
//! from the semantic front-end and appends finished documents to the
//! write-capable store.

use crate::indexer::arena::{ContainerArena, ContainerInfo};
use crate::indexer::frontend::{
    ContainerHandle, DeclInfo, EntityKind, FileHandle, IncludeInfo, IndexCallbacks, RefInfo,
    TemplateKind, TypeKind,
};
use crate::refs::DocRef;
use crate::store::{Document, StoreWriter, SymbolFlags, SymbolKind, TermField, ValueSlot};
use fnv::FnvHashMap;
use log::trace;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Where a declaration was reported, with the file resolved through the
/// header cache. Totally ordered by (file, line, column); key of the
/// per-run seen-declarations map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclLocation {
    pub file_id: u32,
    pub line: u32,
    pub column: u32,
}

/// Declarations already visited in the current run, with the document each
/// one produced.
pub type SeenDeclarations = FnvHashMap<DeclLocation, DocRef>;

/// Drives one file's indexing pass. The seen-declarations map outlives the
/// mapper (it spans the whole run, so re-reports from other translation
/// units are skipped); the container arena does not (handles are scoped to
/// this file's pass).
pub struct DeclMapper<'a> {
    store: &'a mut StoreWriter,
    seen: &'a mut SeenDeclarations,
    cancel: &'a AtomicBool,
    arena: ContainerArena,
    root: Option<ContainerHandle>,
    main_file: Option<PathBuf>,
    next_file_handle: u32,
    stored: usize,
}

impl<'a> DeclMapper<'a> {
    pub fn new(
        store: &'a mut StoreWriter,
        seen: &'a mut SeenDeclarations,
        cancel: &'a AtomicBool,
    ) -> Self {
        Self {
            store,
            seen,
            cancel,
            arena: ContainerArena::new(),
            root: None,
            main_file: None,
            next_file_handle: 1,
            stored: 0,
        }
    }

    /// Documents appended during this file's pass.
    pub fn documents_stored(&self) -> usize {
        self.stored
    }

    pub fn main_file(&self) -> Option<&Path> {
        self.main_file.as_deref()
    }

    fn issue_file_handle(&mut self) -> FileHandle {
        let h = FileHandle(self.next_file_handle);
        self.next_file_handle += 1;
        h
    }

    /// Resolve an opaque container handle (or the root for `None`). The
    /// front-end guarantees containers are declared before they are used as
    /// parents; a handle we never issued is a protocol violation.
    fn resolve_container(&self, handle: Option<ContainerHandle>) -> (DocRef, String, String) {
        let handle = handle.or(self.root);
        let handle = handle.expect("declaration reported before translation-unit start");
        let info = self
            .arena
            .get(handle)
            .expect("container handle does not belong to this file's pass");
        (info.doc_ref, info.name.clone(), info.qualified_name.clone())
    }
}

/// Names of overloadable function-like entities can carry a template
/// argument suffix (`name<...>`); strip it for exact-match search, but only
/// when the name actually ends with `>` so names like `operator<` survive.
fn strip_template_suffix(name: &str) -> &str {
    if name.ends_with('>') {
        if let Some(i) = name.find('<') {
            return &name[..i];
        }
    }
    name
}

fn kind_strips_template_suffix(kind: EntityKind) -> bool {
    matches!(
        kind,
        EntityKind::Constructor
            | EntityKind::Destructor
            | EntityKind::InstanceMethod
            | EntityKind::ConversionFunction
            | EntityKind::Function
    )
}

fn kind_supports_size(kind: EntityKind) -> bool {
    !matches!(
        kind,
        EntityKind::Unexposed
            | EntityKind::Namespace
            | EntityKind::NamespaceAlias
            | EntityKind::Parameter
    )
}

/// Per-entity-kind dispatch: stored kind code, kind term, and the
/// kind-specific extras. Static members are handled as an explicit
/// two-step: set the static flag and term, then apply the shared
/// method/field logic.
fn map_kind(decl: &DeclInfo, name: &str, doc: &mut Document, flags: &mut SymbolFlags) {
    use EntityKind::*;
    let kind = match decl.kind {
        Unexposed => return,
        Namespace => SymbolKind::Namespace,
        NamespaceAlias => SymbolKind::NamespaceAlias,
        Typedef => SymbolKind::Typedef,
        TypeAlias => SymbolKind::TypeAlias,
        Struct => SymbolKind::Struct,
        Class => SymbolKind::Class,
        Union => SymbolKind::Union,
        Enum => SymbolKind::Enum,
        EnumConstant => {
            if let Some(v) = decl.enum_value {
                doc.set_int(ValueSlot::Value, v as u64);
            }
            SymbolKind::EnumConstant
        }
        Function => SymbolKind::Function,
        StaticMethod => {
            flags.set(SymbolFlags::STATIC);
            doc.add_term(TermField::Static, name);
            SymbolKind::Method
        }
        InstanceMethod => SymbolKind::Method,
        Constructor => SymbolKind::Constructor,
        Destructor => SymbolKind::Destructor,
        ConversionFunction => SymbolKind::ConversionFunction,
        StaticField => {
            flags.set(SymbolFlags::STATIC);
            doc.add_term(TermField::Static, name);
            SymbolKind::Field
        }
        Field => SymbolKind::Field,
        Variable => SymbolKind::Variable,
        Parameter => SymbolKind::Parameter,
        Bitfield => {
            flags.set(SymbolFlags::BITFIELD);
            if let Some(w) = decl.bit_width {
                doc.set_int(ValueSlot::Value, w as u64);
            }
            SymbolKind::Bitfield
        }
    };
    doc.set_int(ValueSlot::Kind, kind.code() as u64);
    doc.add_term(TermField::Kind, kind.as_str());
}

impl IndexCallbacks for DeclMapper<'_> {
    fn entered_main_file(&mut self, path: &Path) -> FileHandle {
        self.main_file = Some(path.to_path_buf());
        self.issue_file_handle()
    }

    fn included_file(&mut self, _include: &IncludeInfo) -> FileHandle {
        self.issue_file_handle()
    }

    fn included_ast_file(&mut self, _path: &Path) -> FileHandle {
        self.issue_file_handle()
    }

    fn started_translation_unit(&mut self) -> ContainerHandle {
        let root = self.arena.push(ContainerInfo {
            doc_ref: DocRef::INVALID,
            name: String::new(),
            qualified_name: String::new(),
        });
        self.root = Some(root);
        root
    }

    fn declaration(&mut self, decl: &DeclInfo) -> Option<ContainerHandle> {
        let file_id = self
            .store
            .headers_map_mut()
            .insert(&decl.location.file.to_string_lossy());
        let loc = DeclLocation {
            file_id,
            line: decl.location.line,
            column: decl.location.column,
        };
        // Front-ends re-report the same declaration from multiple
        // translation units; the first report wins.
        if self.seen.contains_key(&loc) {
            trace!("skipping already-seen declaration at {:?}", loc);
            return None;
        }

        let name = if kind_strips_template_suffix(decl.kind) {
            strip_template_suffix(&decl.name).to_string()
        } else {
            decl.name.clone()
        };

        let mut doc = Document::new();
        doc.set_int(ValueSlot::Line, decl.location.line as u64);
        doc.set_int(ValueSlot::Column, decl.location.column as u64);
        doc.set_int(ValueSlot::File, file_id as u64);
        doc.set_int(ValueSlot::DbId, self.store.id() as u64);
        let position = decl.location.line * 1000 + decl.location.column;
        if !name.is_empty() {
            doc.set_str(ValueSlot::Name, &name);
            doc.add_posting(name.to_lowercase(), position);
        }

        let (sem_ref, sem_name, sem_qualified) = self.resolve_container(decl.semantic_container);
        let (lex_ref, _, _) = self.resolve_container(decl.lexical_container);
        if sem_ref.is_valid() {
            doc.set_ref(ValueSlot::SemanticContainer, sem_ref);
        }
        if lex_ref.is_valid() {
            doc.set_ref(ValueSlot::LexicalContainer, lex_ref);
        }
        if !sem_name.is_empty() {
            doc.add_term(TermField::Scope, &sem_name);
        }
        if !sem_qualified.is_empty() {
            if sem_qualified != sem_name {
                doc.add_term(TermField::Scope, &sem_qualified);
            }
            doc.set_str(ValueSlot::Scope, &sem_qualified);
        }

        let mut flags = SymbolFlags::default();
        map_kind(decl, &name, &mut doc, &mut flags);
        if name.is_empty() {
            doc.add_term(TermField::Anon, kind_name_for_anon(decl.kind));
        } else {
            doc.add_term(TermField::Decl, &name);
        }
        if decl.template_kind != TemplateKind::None {
            doc.set_int(ValueSlot::TemplateKind, decl.template_kind.code() as u64);
            doc.add_term(TermField::Template, &name);
        }

        if let Some(ti) = &decl.type_info {
            if ti.kind == TypeKind::Concrete {
                if kind_supports_size(decl.kind) {
                    if let Some(size) = ti.size {
                        doc.set_int(ValueSlot::Sizeof, size);
                    }
                    if let Some(align) = ti.align {
                        doc.set_int(ValueSlot::Alignof, align);
                    }
                }
                if !ti.spelling.is_empty() {
                    doc.set_str(ValueSlot::Type, &ti.spelling);
                }
                if ti.is_const {
                    flags.set(SymbolFlags::CONST);
                }
                if ti.is_volatile {
                    flags.set(SymbolFlags::VOLATILE);
                }
                if ti.is_pod {
                    flags.set(SymbolFlags::POD);
                    doc.add_term(TermField::Pod, &name);
                }
                if let Some(arity) = ti.arity {
                    doc.set_int(ValueSlot::Arity, arity as u64);
                }
            }
        }

        if matches!(decl.kind, EntityKind::Struct | EntityKind::Class) && !decl.bases.is_empty() {
            for base in &decl.bases {
                doc.add_term(TermField::Base, base);
            }
            doc.set_str(ValueSlot::Bases, decl.bases.join(";"));
        }

        if decl.is_redeclaration {
            doc.add_term(TermField::Def, &name);
        }
        if decl.is_implicit {
            doc.add_term(TermField::Implicit, &name);
        }
        if decl.is_virtual {
            doc.add_term(TermField::Virtual, &name);
        }
        if let Some(access) = decl.access {
            doc.add_term(TermField::Access, access.as_str());
        }
        doc.set_int(ValueSlot::Flags, flags.bits());

        let doc_id = self.store.add_document(doc);
        self.stored += 1;
        let doc_ref = DocRef::new(self.store.id(), doc_id);
        self.seen.insert(loc, doc_ref);

        if decl.is_container {
            let qualified_name = if sem_qualified.is_empty() {
                name.clone()
            } else if name.is_empty() {
                sem_qualified
            } else {
                format!("{}::{}", sem_qualified, name)
            };
            Some(self.arena.push(ContainerInfo {
                doc_ref,
                name,
                qualified_name,
            }))
        } else {
            None
        }
    }

    fn reference(&mut self, _reference: &RefInfo) {
        // Kept for future extension; must not error.
    }

    fn should_abort(&mut self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

fn kind_name_for_anon(kind: EntityKind) -> &'static str {
    use EntityKind::*;
    match kind {
        Namespace => "namespace",
        Struct => "struct",
        Class => "class",
        Union => "union",
        Enum => "enum",
        Parameter => "parameter",
        Field | StaticField | Bitfield => "field",
        _ => "entity",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_suffix_stripping() {
        assert_eq!(strip_template_suffix("foo<int>"), "foo");
        assert_eq!(strip_template_suffix("foo<bar<baz>>"), "foo");
        assert_eq!(strip_template_suffix("foo"), "foo");
        // Only names that end with '>' are touched.
        assert_eq!(strip_template_suffix("operator<"), "operator<");
        assert_eq!(strip_template_suffix("operator<="), "operator<=");
        assert_eq!(strip_template_suffix("operator>"), "operator>");
    }

    #[test]
    fn decl_location_total_order() {
        let a = DeclLocation { file_id: 1, line: 2, column: 3 };
        let b = DeclLocation { file_id: 1, line: 2, column: 4 };
        let c = DeclLocation { file_id: 1, line: 3, column: 1 };
        let d = DeclLocation { file_id: 2, line: 1, column: 1 };
        assert!(a < b && b < c && c < d);
    }
}
