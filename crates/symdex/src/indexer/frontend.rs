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

//! The semantic front-end boundary: the callback protocol a C/C++ parser
//! drives while indexing one file, and the data it reports per declaration.
//! The front-end itself is an external collaborator; only the contract
//! lives here.

use std::path::{Path, PathBuf};

/// Opaque per-file handle returned from the file callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHandle(pub u32);

/// Opaque handle for "the container currently being indexed into". Issued
/// by the callback consumer, retained and re-delivered by the front-end
/// across many callback invocations within the same file, and invalid once
/// that file's pass completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHandle(pub(crate) u32);

/// Entity kinds a front-end can report. Static members are distinct input
/// kinds; the mapper folds them onto the shared method/field handling after
/// setting the static flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Unexposed,
    Namespace,
    NamespaceAlias,
    Typedef,
    TypeAlias,
    Struct,
    Class,
    Union,
    Enum,
    EnumConstant,
    Function,
    InstanceMethod,
    StaticMethod,
    Constructor,
    Destructor,
    ConversionFunction,
    Field,
    StaticField,
    Variable,
    Parameter,
    Bitfield,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateKind {
    #[default]
    None,
    Template,
    PartialSpecialization,
    Specialization,
}

impl TemplateKind {
    pub fn code(self) -> u8 {
        match self {
            TemplateKind::None => 0,
            TemplateKind::Template => 1,
            TemplateKind::PartialSpecialization => 2,
            TemplateKind::Specialization => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
    Private,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::Private => "private",
        }
    }
}

/// How much the front-end knows about an entity's type. Size and alignment
/// are only trusted for `Concrete` kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeKind {
    #[default]
    Invalid,
    Unexposed,
    Concrete,
}

#[derive(Debug, Clone, Default)]
pub struct TypeInfo {
    pub kind: TypeKind,
    pub spelling: String,
    pub size: Option<u64>,
    pub align: Option<u64>,
    /// Argument count for function-like types.
    pub arity: Option<u32>,
    pub is_const: bool,
    pub is_volatile: bool,
    pub is_pod: bool,
}

#[derive(Debug, Clone)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

/// One reported declaration.
#[derive(Debug, Clone)]
pub struct DeclInfo {
    /// May be empty for anonymous entities.
    pub name: String,
    pub kind: EntityKind,
    pub template_kind: TemplateKind,
    pub location: SourceLocation,
    /// Container handles previously issued by the consumer; `None` means
    /// the translation-unit root.
    pub semantic_container: Option<ContainerHandle>,
    pub lexical_container: Option<ContainerHandle>,
    /// Whether further declarations will name this one as their container.
    pub is_container: bool,
    pub is_redeclaration: bool,
    pub is_implicit: bool,
    pub is_virtual: bool,
    pub access: Option<Access>,
    pub type_info: Option<TypeInfo>,
    /// Direct base classes, for struct/class entities.
    pub bases: Vec<String>,
    /// Enum-constant value.
    pub enum_value: Option<i64>,
    /// Bitfield width.
    pub bit_width: Option<u32>,
}

impl DeclInfo {
    /// A minimally-filled declaration; callers set what they know.
    pub fn new(name: impl Into<String>, kind: EntityKind, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            kind,
            template_kind: TemplateKind::None,
            location,
            semantic_container: None,
            lexical_container: None,
            is_container: false,
            is_redeclaration: false,
            is_implicit: false,
            is_virtual: false,
            access: None,
            type_info: None,
            bases: Vec::new(),
            enum_value: None,
            bit_width: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IncludeInfo {
    pub path: PathBuf,
    pub is_angled: bool,
}

/// A reported reference to a previously-declared entity. Currently a
/// no-op hook kept for future extension.
#[derive(Debug, Clone)]
pub struct RefInfo {
    pub location: SourceLocation,
    pub container: Option<ContainerHandle>,
}

/// Bitmask of indexing options handed through to the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexingOptions(pub u32);

impl IndexingOptions {
    pub const NONE: IndexingOptions = IndexingOptions(0);
    pub const SUPPRESS_WARNINGS: u32 = 1 << 0;
    pub const SKIP_PARSED_BODIES: u32 = 1 << 1;

    pub fn contains(&self, bit: u32) -> bool {
        self.0 & bit != 0
    }
}

/// The callback protocol, one instance per file pass.
pub trait IndexCallbacks {
    fn entered_main_file(&mut self, path: &Path) -> FileHandle;
    fn included_file(&mut self, include: &IncludeInfo) -> FileHandle;
    fn included_ast_file(&mut self, path: &Path) -> FileHandle;
    /// Establishes the root container used as the semantic parent of
    /// top-level declarations.
    fn started_translation_unit(&mut self) -> ContainerHandle;
    /// Returns the new client-container handle when the declaration itself
    /// introduces a scope, `None` otherwise.
    fn declaration(&mut self, decl: &DeclInfo) -> Option<ContainerHandle>;
    fn reference(&mut self, reference: &RefInfo);
    /// Polled by the front-end; `true` requests an abort of the current
    /// pass.
    fn should_abort(&mut self) -> bool;
}

/// A semantic front-end: owns whatever process-wide parser state it needs
/// (acquired when constructed, disposed when dropped) and drives the
/// callback stream for one file per call.
pub trait SemanticFrontend: Send + Sync + 'static {
    fn index_file(
        &self,
        compiler_args: &[String],
        options: IndexingOptions,
        file: &Path,
        callbacks: &mut dyn IndexCallbacks,
    ) -> Result<(), String>;
}
