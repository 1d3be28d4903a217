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

use std::path::Path;
use std::sync::atomic::AtomicBool;
use symdex::indexer::{
    DeclMapper, EntityKind, IndexingOptions, SeenDeclarations, SemanticFrontend,
};
use symdex::store::{StoreWriter, SymbolFlags, TermField, ValueSlot};
use symdex::test_helpers::{ScriptedDecl, ScriptedFrontend};
use tempfile::tempdir;

/// Run one scripted file through the mapper into a fresh store. The
/// tempdir guard rides along so the store directory outlives the writer.
fn index_scripted(decls: Vec<ScriptedDecl>) -> (StoreWriter, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let mut store = StoreWriter::open_or_create(1, dir.path().join("store")).unwrap();
    let mut frontend = ScriptedFrontend::new();
    frontend.add_file("main.cpp", decls);
    let mut seen = SeenDeclarations::default();
    let cancel = AtomicBool::new(false);
    let mut mapper = DeclMapper::new(&mut store, &mut seen, &cancel);
    frontend
        .index_file(&[], IndexingOptions::NONE, Path::new("main.cpp"), &mut mapper)
        .unwrap();
    (store, dir)
}

#[test]
fn duplicate_location_is_stored_once() {
    let (store, _dir) = index_scripted(vec![
        ScriptedDecl::new("twice", EntityKind::Function, 4, 2),
        ScriptedDecl::new("twice", EntityKind::Function, 4, 2),
        ScriptedDecl::new("once", EntityKind::Function, 9, 2),
    ]);
    assert_eq!(store.doc_count(), 2);
}

#[test]
fn static_members_keep_kind_term_and_gain_static_term() {
    let (store, _dir) = index_scripted(vec![
        ScriptedDecl::new("Box", EntityKind::Class, 1, 1).container(),
        ScriptedDecl::new("make", EntityKind::StaticMethod, 2, 5).parent(0),
        ScriptedDecl::new("count", EntityKind::StaticField, 3, 5).parent(0),
        ScriptedDecl::new("get", EntityKind::InstanceMethod, 4, 5).parent(0),
    ]);
    let method = store.document(2).unwrap();
    assert!(method.has_term(TermField::Kind, "method"));
    assert!(method.has_term(TermField::Static, "make"));
    assert!(SymbolFlags::from_bits(method.int_value(ValueSlot::Flags).unwrap())
        .contains(SymbolFlags::STATIC));

    let field = store.document(3).unwrap();
    assert!(field.has_term(TermField::Kind, "field"));
    assert!(field.has_term(TermField::Static, "count"));
    assert!(SymbolFlags::from_bits(field.int_value(ValueSlot::Flags).unwrap())
        .contains(SymbolFlags::STATIC));

    let plain = store.document(4).unwrap();
    assert!(plain.has_term(TermField::Kind, "method"));
    assert!(!plain.has_term(TermField::Static, "get"));
}

#[test]
fn containers_resolve_to_docrefs_and_scope_terms() {
    let (store, _dir) = index_scripted(vec![
        ScriptedDecl::new("ui", EntityKind::Namespace, 1, 1).container(),
        ScriptedDecl::new("Widget", EntityKind::Class, 2, 1).container().parent(0),
        ScriptedDecl::new("paint", EntityKind::InstanceMethod, 3, 5).parent(1),
    ]);
    let class = store.document(2).unwrap();
    assert_eq!(
        class.ref_value(ValueSlot::SemanticContainer).map(|r| r.doc_id),
        Some(1)
    );
    assert!(class.has_term(TermField::Scope, "ui"));
    assert_eq!(class.str_value(ValueSlot::Scope), Some("ui"));

    let method = store.document(3).unwrap();
    let sem = method.ref_value(ValueSlot::SemanticContainer).unwrap();
    assert_eq!((sem.db_id, sem.doc_id), (1, 2));
    assert!(method.has_term(TermField::Scope, "Widget"));
    assert!(method.has_term(TermField::Scope, "ui::Widget"));
    assert_eq!(method.str_value(ValueSlot::Scope), Some("ui::Widget"));
    // top-level namespace has no container slots: the root is a sentinel
    let ns = store.document(1).unwrap();
    assert_eq!(ns.ref_value(ValueSlot::SemanticContainer), None);
}

#[test]
fn template_suffix_is_stripped_from_function_names() {
    let (store, _dir) = index_scripted(vec![
        ScriptedDecl::new("find<int>", EntityKind::Function, 1, 1),
        ScriptedDecl::new("operator<", EntityKind::Function, 2, 1),
        ScriptedDecl::new("List<int>", EntityKind::Class, 3, 1).container(),
    ]);
    let f = store.document(1).unwrap();
    assert_eq!(f.str_value(ValueSlot::Name), Some("find"));
    assert!(f.has_term(TermField::Decl, "find"));

    let op = store.document(2).unwrap();
    assert_eq!(op.str_value(ValueSlot::Name), Some("operator<"));

    // class names are not function-like; the suffix stays
    let class = store.document(3).unwrap();
    assert_eq!(class.str_value(ValueSlot::Name), Some("List<int>"));
}

#[test]
fn enum_constants_and_bitfields_record_values() {
    let (store, _dir) = index_scripted(vec![
        ScriptedDecl::new("Mode", EntityKind::Enum, 1, 1).container(),
        {
            let mut d = ScriptedDecl::new("Fast", EntityKind::EnumConstant, 2, 3).parent(0);
            d.enum_value = Some(4);
            d
        },
        {
            let mut d = ScriptedDecl::new("bits", EntityKind::Bitfield, 8, 3);
            d.bit_width = Some(3);
            d
        },
    ]);
    let constant = store.document(2).unwrap();
    assert_eq!(constant.int_value(ValueSlot::Value), Some(4));
    assert!(constant.has_term(TermField::Kind, "enum-constant"));

    let bitfield = store.document(3).unwrap();
    assert_eq!(bitfield.int_value(ValueSlot::Value), Some(3));
    assert!(SymbolFlags::from_bits(bitfield.int_value(ValueSlot::Flags).unwrap())
        .contains(SymbolFlags::BITFIELD));
}

#[test]
fn type_details_flow_into_slots_and_flags() {
    let (store, _dir) = index_scripted(vec![
        ScriptedDecl::new("Point", EntityKind::Struct, 1, 1)
            .container()
            .sized(8, 4)
            .pod()
            .typed("Point"),
        ScriptedDecl::new("length", EntityKind::Function, 5, 1)
            .typed("double (const Point &)")
            .arity(1),
    ]);
    let s = store.document(1).unwrap();
    assert_eq!(s.int_value(ValueSlot::Sizeof), Some(8));
    assert_eq!(s.int_value(ValueSlot::Alignof), Some(4));
    assert!(s.has_term(TermField::Pod, "Point"));
    assert!(SymbolFlags::from_bits(s.int_value(ValueSlot::Flags).unwrap())
        .contains(SymbolFlags::POD));

    let f = store.document(2).unwrap();
    assert_eq!(f.str_value(ValueSlot::Type), Some("double (const Point &)"));
    assert_eq!(f.int_value(ValueSlot::Arity), Some(1));
}

#[test]
fn base_classes_become_terms_and_a_serialized_list() {
    let (store, _dir) = index_scripted(vec![ScriptedDecl::new("Button", EntityKind::Class, 1, 1)
        .container()
        .bases(&["Widget", "Clickable"])]);
    let doc = store.document(1).unwrap();
    assert!(doc.has_term(TermField::Base, "Widget"));
    assert!(doc.has_term(TermField::Base, "Clickable"));
    assert_eq!(doc.str_value(ValueSlot::Bases), Some("Widget;Clickable"));
}

#[test]
fn anonymous_entities_get_anon_term_instead_of_name() {
    let (store, _dir) = index_scripted(vec![ScriptedDecl::new("", EntityKind::Union, 3, 1).container()]);
    let doc = store.document(1).unwrap();
    assert_eq!(doc.str_value(ValueSlot::Name), None);
    assert!(doc.has_term(TermField::Anon, "union"));
    assert!(doc.postings().is_empty());
}

#[test]
fn header_cache_assigns_one_id_per_file_and_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");
    {
        let mut store = StoreWriter::open_or_create(2, &path).unwrap();
        let mut frontend = ScriptedFrontend::new();
        frontend.add_file(
            "widget.cpp",
            vec![
                ScriptedDecl::new("a", EntityKind::Function, 1, 1),
                ScriptedDecl::new("b", EntityKind::Function, 2, 1),
            ],
        );
        let mut seen = SeenDeclarations::default();
        let cancel = AtomicBool::new(false);
        let mut mapper = DeclMapper::new(&mut store, &mut seen, &cancel);
        frontend
            .index_file(&[], IndexingOptions::NONE, Path::new("widget.cpp"), &mut mapper)
            .unwrap();
        assert_eq!(store.headers_map().len(), 1);
        let fid = store.headers_map().id_of("widget.cpp").unwrap();
        assert_eq!(store.document(1).unwrap().int_value(ValueSlot::File), Some(fid as u64));
        assert_eq!(store.document(2).unwrap().int_value(ValueSlot::File), Some(fid as u64));
    }
    let reader = symdex::store::StoreReader::open(&path).unwrap();
    assert_eq!(reader.headers_map().len(), 1);
    assert_eq!(reader.headers_map().name_of(1), Some("widget.cpp"));
}

#[test]
fn redeclaration_and_access_terms() {
    let (store, _dir) = index_scripted(vec![
        ScriptedDecl::new("Impl", EntityKind::Class, 1, 1).container(),
        ScriptedDecl::new("run", EntityKind::InstanceMethod, 2, 3)
            .parent(0)
            .access(symdex::indexer::Access::Private)
            .redeclaration(),
    ]);
    let doc = store.document(2).unwrap();
    assert!(doc.has_term(TermField::Def, "run"));
    assert!(doc.has_term(TermField::Access, "private"));
}
