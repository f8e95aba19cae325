use super::*;
use crate::catalog::raw::{RawColumn, RawFunction, RawRelation, RawType};
use crate::error::{CatalogError, RefField};

fn sample() -> RawSnapshot {
    let types = vec![
        RawType::new(23, "pg_catalog", "int4").with_array(1007),
        RawType::new(1007, "pg_catalog", "_int4").with_element(23),
        RawType::new(25, "pg_catalog", "text").with_array(1009),
        RawType::new(1009, "pg_catalog", "_text").with_element(25),
        RawType::new(16500, "public", "email").with_base_type(25),
        RawType::new(16402, "public", "users").with_relation(16400).with_array(16401),
        RawType::new(16401, "public", "_users").with_element(16402),
        RawType::new(16412, "public", "active_users").with_relation(16410),
    ];
    let functions = vec![
        RawFunction::new("public", "add", 23)
            .with_argument(Some("a"), ArgMode::In, 23)
            .with_argument(Some("b"), ArgMode::In, 23),
        RawFunction::new("public", "all_users", 16402).returning_set(),
    ];
    let mut users = RawRelation::new(16400, "public", "users")
        .with_column(RawColumn { default_expression: Some("nextval('users_id_seq'::regclass)".into()), is_nullable: false, ..RawColumn::new("id", 1, 23) })
        .with_column(RawColumn { domain_identifier: Some(SqlIdentifier::new("public", "email")), ..RawColumn::new("email", 2, 16500) })
        .with_column(RawColumn::new("tags", 3, 1009));
    users.primary_key = vec!["id".into()];
    let mut view = RawRelation::new(16410, "public", "active_users").with_column(RawColumn::new("id", 1, 23));
    view.is_view = true;
    RawSnapshot { types, functions, relations: vec![users, view] }
}

#[test]
fn scenario_array_and_element() {
    let snap = RawSnapshot {
        types: vec![RawType::new(23, "pg_catalog", "int4"), RawType::new(1007, "pg_catalog", "_int4").with_element(23)],
        ..Default::default()
    };
    // int4 carries no array oid here: only the element side is declared
    let catalog = Catalog::build(snap).unwrap();
    let arr = catalog.get_type(1007).unwrap();
    assert_eq!(catalog.element_type(arr).unwrap().identifier.name, "int4");

    let catalog = Catalog::build(sample()).unwrap();
    let int4 = catalog.get_type(23).unwrap();
    assert_eq!(catalog.array_type(int4).unwrap().identifier.name, "_int4");
    assert_eq!(catalog.element_type(catalog.get_type(1007).unwrap()).unwrap().identifier.name, "int4");
}

#[test]
fn scenario_scalar_function_types() {
    let catalog = Catalog::build(sample()).unwrap();
    let add = catalog.get_functions(&SqlIdentifier::new("public", "add")).next().unwrap();
    assert_eq!(add.arguments.len(), 2);
    assert!(add.returns_single_row());
    assert!(catalog.get_relation_by_type(23).is_none());
    assert_eq!(catalog.describe_function(add), "public.add(a int4, b int4) -> int4");
}

#[test]
fn array_links_are_bijective() {
    let catalog = Catalog::build(sample()).unwrap();
    for a in catalog.types() {
        if let Some(b) = catalog.array_type(a) {
            assert_eq!(catalog.element_type(b).map(|t| t.oid), Some(a.oid), "{}", a.identifier);
        }
    }
}

#[test]
fn composite_round_trip() {
    let catalog = Catalog::build(sample()).unwrap();
    for r in catalog.relations() {
        let t = catalog.ty(r.ty());
        assert_eq!(t.kind(), TypeKind::Composite);
        assert_eq!(catalog.type_relation(t).map(|x| x.relation_id), Some(r.relation_id));
        assert_eq!(catalog.get_relation_by_type(t.oid).map(|x| &x.identifier), Some(&r.identifier));
    }
}

#[test]
fn function_types_resolve_totally() {
    let catalog = Catalog::build(sample()).unwrap();
    for f in catalog.functions() {
        assert_eq!(catalog.get_type(f.pg_return_type_oid), Some(catalog.ty(f.return_type())));
        for a in &f.arguments {
            assert_eq!(catalog.get_type(a.pg_type_oid), Some(catalog.ty(a.ty())));
        }
    }
}

#[test]
fn set_returning_function_over_rows() {
    let catalog = Catalog::build(sample()).unwrap();
    let f = catalog.get_functions(&SqlIdentifier::new("public", "all_users")).next().unwrap();
    assert!(!f.returns_single_row());
    let rel = catalog.get_relation_by_type(f.pg_return_type_oid).unwrap();
    assert_eq!(rel.identifier.name, "users");
    assert_eq!(catalog.describe_function(f), "public.all_users() -> SETOF public.users");
}

#[test]
fn one_dangling_reference_means_no_catalog() {
    let mut snap = sample();
    snap.relations[0].columns.push(RawColumn::new("avatar", 4, 17));
    let err = Catalog::build(snap).unwrap_err();
    assert!(matches!(err, CatalogError::UnresolvedReference { oid: 17, field: RefField::Column(_), .. }));

    let mut snap = sample();
    snap.types.push(RawType::new(1016, "pg_catalog", "_int8").with_element(20));
    assert_eq!(Catalog::build(snap).unwrap_err().unresolved_oid(), Some(20));
}

#[test]
fn build_is_independent_of_record_order() {
    let a = Catalog::build(sample()).unwrap();
    let mut snap = sample();
    snap.types.reverse();
    snap.functions.reverse();
    snap.relations.reverse();
    for r in snap.relations.iter_mut() { r.columns.reverse(); }
    let b = Catalog::build(snap).unwrap();
    assert_eq!(a, b);
}

#[test]
fn enumeration_is_in_schema_then_name_order() {
    let catalog = Catalog::build(sample()).unwrap();
    let idents: Vec<&SqlIdentifier> = catalog.types().map(|t| &t.identifier).collect();
    let mut sorted = idents.clone();
    sorted.sort();
    assert_eq!(idents, sorted);
    let rels: Vec<&str> = catalog.relations().map(|r| r.identifier.name.as_str()).collect();
    assert_eq!(rels, vec!["active_users", "users"]);
}

#[test]
fn lookups_miss_cleanly() {
    let catalog = Catalog::build(sample()).unwrap();
    assert!(catalog.get_type(4_000_000_000).is_none());
    assert!(catalog.get_relation(1).is_none());
    assert!(catalog.get_relation_by_type(99).is_none());
    assert!(catalog.get_relation_by_name(&SqlIdentifier::new("public", "ghosts")).is_none());
    assert_eq!(catalog.get_functions(&SqlIdentifier::new("public", "nothing")).count(), 0);
}

#[test]
fn domains_unwrap_and_render() {
    let catalog = Catalog::build(sample()).unwrap();
    let email = catalog.get_type_by_name(&SqlIdentifier::new("public", "email")).unwrap();
    assert!(email.is_domain());
    assert_eq!(catalog.underlying_type(email).identifier.name, "text");
    assert_eq!(catalog.type_name(email), "public.email");
    assert_eq!(catalog.type_name(catalog.get_type(1009).unwrap()), "text[]");
    assert_eq!(catalog.type_name(catalog.get_type(16401).unwrap()), "public.users[]");
}

#[test]
fn describe_relation_lists_columns() {
    let catalog = Catalog::build(sample()).unwrap();
    let users = catalog.get_relation(16400).unwrap();
    let text = catalog.describe_relation(users);
    assert!(text.starts_with("table public.users\n"));
    assert!(text.contains("  id int4 NOT NULL PRIMARY KEY DEFAULT nextval('users_id_seq'::regclass)\n"));
    assert!(text.contains("  email public.email\n"));
    assert!(text.contains("  tags text[]\n"));
    let view = catalog.get_relation(16410).unwrap();
    assert!(catalog.describe_relation(view).starts_with("view public.active_users"));
}

#[test]
fn summary_counts_kinds() {
    let s = Catalog::build(sample()).unwrap().summary();
    assert_eq!(s.types, 8);
    assert_eq!(s.arrays, 3);
    assert_eq!(s.domains, 1);
    assert_eq!(s.composites, 2);
    assert_eq!(s.functions, 2);
    assert_eq!(s.relations, 2);
    assert_eq!(s.views, 1);
}

#[test]
fn catalog_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Catalog>();
    assert_send_sync::<CatalogHandle>();
}

#[test]
fn kind_follows_links() {
    let catalog = Catalog::build(sample()).unwrap();
    let users = catalog.get_relation(16400).unwrap();
    assert_eq!(catalog.kind(users.ty()), TypeKind::Composite);
    assert_eq!(catalog.kind(users.column("tags").unwrap().ty()), TypeKind::Array);
    assert_eq!(catalog.kind(users.column("email").unwrap().ty()), TypeKind::Domain);
    assert_eq!(catalog.kind(users.column("id").unwrap().ty()), TypeKind::Scalar);
}

#[test]
fn element_cycle_renders_without_recursing_forever() {
    let snap = RawSnapshot {
        types: vec![
            RawType::new(100, "public", "a").with_element(101),
            RawType::new(101, "public", "b").with_element(100),
        ],
        functions: vec![RawFunction::new("public", "f", 100).with_argument(Some("x"), ArgMode::In, 101)],
        relations: vec![],
    };
    let catalog = Catalog::build(snap).unwrap();
    assert_eq!(catalog.type_name(catalog.get_type(100).unwrap()), "public.b[]");
    assert_eq!(catalog.type_name(catalog.get_type(101).unwrap()), "public.a[]");
    let f = catalog.functions().next().unwrap();
    assert_eq!(catalog.describe_function(f), "public.f(x public.a[]) -> public.b[]");
}
