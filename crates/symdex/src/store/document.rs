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

//! The document model: one indexed declaration, made of sortable value
//! slots, exact-match boolean terms, and ranked free-text name postings.

use crate::refs::DocRef;
use std::collections::BTreeMap;

/// Document ids are assigned by the owning store, starting at 1 so that a
/// zero half always marks an invalid [`DocRef`].
pub type DocId = u32;

/// Fixed enumeration of single-valued, sortable document fields.
/// Codes are part of the on-disk format; append only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ValueSlot {
    Name = 0,
    Line = 1,
    Column = 2,
    File = 3,
    Kind = 4,
    TemplateKind = 5,
    Flags = 6,
    Sizeof = 7,
    Alignof = 8,
    Value = 9,
    Type = 10,
    Arity = 11,
    Bases = 12,
    Scope = 13,
    SemanticContainer = 14,
    LexicalContainer = 15,
    DbId = 16,
}

impl ValueSlot {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(c: u8) -> Option<Self> {
        use ValueSlot::*;
        Some(match c {
            0 => Name,
            1 => Line,
            2 => Column,
            3 => File,
            4 => Kind,
            5 => TemplateKind,
            6 => Flags,
            7 => Sizeof,
            8 => Alignof,
            9 => Value,
            10 => Type,
            11 => Arity,
            12 => Bases,
            13 => Scope,
            14 => SemanticContainer,
            15 => LexicalContainer,
            16 => DbId,
            _ => return None,
        })
    }
}

/// A slot value. `Int` carries the sortable encoding used by range queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValue {
    Int(u64),
    Str(String),
    Ref(DocRef),
}

/// Boolean-term fields. Codes are part of the on-disk format; append only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum TermField {
    Decl = 0,
    Ref = 1,
    Kind = 2,
    Access = 3,
    Base = 4,
    Anon = 5,
    Pod = 6,
    Def = 7,
    Scope = 8,
    Static = 9,
    Template = 10,
    Virtual = 11,
    Implicit = 12,
}

impl TermField {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(c: u8) -> Option<Self> {
        use TermField::*;
        Some(match c {
            0 => Decl,
            1 => Ref,
            2 => Kind,
            3 => Access,
            4 => Base,
            5 => Anon,
            6 => Pod,
            7 => Def,
            8 => Scope,
            9 => Static,
            10 => Template,
            11 => Virtual,
            12 => Implicit,
            _ => return None,
        })
    }

    /// Resolve a query prefix (the part before `:`) to a term field.
    /// `inh:` aliases the base-class field, `anonymous:` aliases `anon:`.
    pub fn from_prefix(p: &str) -> Option<Self> {
        use TermField::*;
        Some(match p {
            "decl" => Decl,
            "ref" => Ref,
            "kind" => Kind,
            "access" => Access,
            "base" | "inh" => Base,
            "anon" | "anonymous" => Anon,
            "pod" => Pod,
            "def" => Def,
            "scope" => Scope,
            "static" => Static,
            "template" => Template,
            "virtual" => Virtual,
            _ => return None,
        })
    }
}

/// An exact-match search token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub field: TermField,
    pub text: String,
}

/// A ranked free-text token; position is `line * 1000 + column` so earlier
/// occurrences in a file sort first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub text: String,
    pub position: u32,
}

/// Single-bit symbol properties packed into the `Flags` value slot.
/// Pack for storage, unpack for logic; bit positions are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SymbolFlags(u64);

impl SymbolFlags {
    pub const STATIC: u64 = 1 << 0;
    pub const CONST: u64 = 1 << 1;
    pub const VOLATILE: u64 = 1 << 2;
    pub const POD: u64 = 1 << 3;
    pub const BITFIELD: u64 = 1 << 4;

    pub fn set(&mut self, bit: u64) {
        self.0 |= bit;
    }

    pub fn contains(&self, bit: u64) -> bool {
        self.0 & bit != 0
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}

/// Stored symbol kind codes. Static methods and static fields share the
/// `Method`/`Field` codes; staticness lives in the flags word and term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SymbolKind {
    Namespace = 1,
    NamespaceAlias = 2,
    Typedef = 3,
    TypeAlias = 4,
    Struct = 5,
    Class = 6,
    Union = 7,
    Enum = 8,
    EnumConstant = 9,
    Function = 10,
    Method = 11,
    Constructor = 12,
    Destructor = 13,
    ConversionFunction = 14,
    Field = 15,
    Variable = 16,
    Parameter = 17,
    Bitfield = 18,
}

impl SymbolKind {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn as_str(&self) -> &'static str {
        use SymbolKind::*;
        match self {
            Namespace => "namespace",
            NamespaceAlias => "namespace-alias",
            Typedef => "typedef",
            TypeAlias => "type-alias",
            Struct => "struct",
            Class => "class",
            Union => "union",
            Enum => "enum",
            EnumConstant => "enum-constant",
            Function => "function",
            Method => "method",
            Constructor => "constructor",
            Destructor => "destructor",
            ConversionFunction => "conversion-function",
            Field => "field",
            Variable => "variable",
            Parameter => "parameter",
            Bitfield => "bitfield",
        }
    }

    pub fn from_code(c: u8) -> Option<Self> {
        use SymbolKind::*;
        Some(match c {
            1 => Namespace,
            2 => NamespaceAlias,
            3 => Typedef,
            4 => TypeAlias,
            5 => Struct,
            6 => Class,
            7 => Union,
            8 => Enum,
            9 => EnumConstant,
            10 => Function,
            11 => Method,
            12 => Constructor,
            13 => Destructor,
            14 => ConversionFunction,
            15 => Field,
            16 => Variable,
            17 => Parameter,
            18 => Bitfield,
            _ => return None,
        })
    }
}

/// One indexed declaration. Immutable once appended to a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub(crate) values: BTreeMap<ValueSlot, SlotValue>,
    pub(crate) terms: Vec<Term>,
    pub(crate) postings: Vec<Posting>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_int(&mut self, slot: ValueSlot, v: u64) {
        self.values.insert(slot, SlotValue::Int(v));
    }

    pub fn set_str(&mut self, slot: ValueSlot, v: impl Into<String>) {
        self.values.insert(slot, SlotValue::Str(v.into()));
    }

    pub fn set_ref(&mut self, slot: ValueSlot, v: DocRef) {
        self.values.insert(slot, SlotValue::Ref(v));
    }

    pub fn value(&self, slot: ValueSlot) -> Option<&SlotValue> {
        self.values.get(&slot)
    }

    pub fn int_value(&self, slot: ValueSlot) -> Option<u64> {
        match self.values.get(&slot) {
            Some(SlotValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn str_value(&self, slot: ValueSlot) -> Option<&str> {
        match self.values.get(&slot) {
            Some(SlotValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn ref_value(&self, slot: ValueSlot) -> Option<DocRef> {
        match self.values.get(&slot) {
            Some(SlotValue::Ref(r)) => Some(*r),
            _ => None,
        }
    }

    pub fn add_term(&mut self, field: TermField, text: impl Into<String>) {
        self.terms.push(Term {
            field,
            text: text.into(),
        });
    }

    pub fn has_term(&self, field: TermField, text: &str) -> bool {
        self.terms.iter().any(|t| t.field == field && t.text == text)
    }

    pub fn add_posting(&mut self, text: impl Into<String>, position: u32) {
        self.postings.push(Posting {
            text: text.into(),
            position,
        });
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }
}
