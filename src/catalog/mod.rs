//! Resolved schema catalog
//! -----------------------
//! `Catalog::build` turns a [`RawSnapshot`] into one fully linked, read-only
//! model. Types resolve first; functions and relations then resolve against the
//! finished type table. Any failure aborts the whole build, so a `Catalog`
//! value is always complete.

pub mod raw;
pub mod types;
pub mod functions;
pub mod relations;
pub mod handle;

use std::fmt::{Display, Formatter};

use tracing::info;

pub use self::functions::{Function, FunctionArgument, FunctionId, FunctionTable};
pub use self::handle::CatalogHandle;
pub use self::raw::{ArgMode, Oid, RawSnapshot, Volatility};
pub use self::relations::{Column, Relation, RelationId, RelationTable};
pub use self::types::{Type, TypeId, TypeKind, TypeTable};

use crate::error::CatalogResult;
use crate::ident::SqlIdentifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    types: TypeTable,
    functions: FunctionTable,
    relations: RelationTable,
}

impl Catalog {
    pub fn build(snapshot: RawSnapshot) -> CatalogResult<Self> {
        let RawSnapshot { types, functions, relations } = snapshot;
        let types = TypeTable::build(types)?;
        let functions = FunctionTable::build(functions, &types)?;
        let relations = RelationTable::build(relations, &types)?;
        let catalog = Catalog { types, functions, relations };
        info!(target: "pgrel::catalog", "catalog built: {}", catalog.summary());
        Ok(catalog)
    }

    pub fn get_type(&self, oid: Oid) -> Option<&Type> { self.types.by_oid(oid) }

    pub fn get_relation(&self, relid: Oid) -> Option<&Relation> { self.relations.by_relid(relid) }

    /// The relation whose row type is `type_oid`; `None` for non-composite types.
    pub fn get_relation_by_type(&self, type_oid: Oid) -> Option<&Relation> {
        let relid = self.get_type(type_oid)?.relation_id()?;
        self.get_relation(relid)
    }

    pub fn get_type_by_name(&self, ident: &SqlIdentifier) -> Option<&Type> { self.types.by_name(ident) }

    pub fn get_relation_by_name(&self, ident: &SqlIdentifier) -> Option<&Relation> { self.relations.by_name(ident) }

    pub fn get_functions<'a>(&'a self, ident: &SqlIdentifier) -> impl Iterator<Item = &'a Function> + 'a {
        self.functions.by_name(ident)
    }

    pub fn ty(&self, id: TypeId) -> &Type { self.types.get(id) }

    pub fn relation(&self, id: RelationId) -> &Relation { self.relations.get(id) }

    pub fn function(&self, id: FunctionId) -> &Function { self.functions.get(id) }

    pub fn element_type(&self, t: &Type) -> Option<&Type> { t.element_type().map(|id| self.ty(id)) }

    pub fn array_type(&self, t: &Type) -> Option<&Type> { t.array_type().map(|id| self.ty(id)) }

    pub fn base_type(&self, t: &Type) -> Option<&Type> { t.base_type().map(|id| self.ty(id)) }

    pub fn kind(&self, id: TypeId) -> TypeKind { self.ty(id).kind() }

    /// The relation a composite type backs, when that relation was fetched.
    pub fn type_relation(&self, t: &Type) -> Option<&Relation> { t.relation_id().and_then(|relid| self.get_relation(relid)) }

    /// Domains unwrapped down to the type they constrain.
    pub fn underlying_type<'a>(&'a self, mut t: &'a Type) -> &'a Type {
        let mut hops = 0;
        while let Some(base) = self.base_type(t) {
            if base.oid == t.oid || hops > self.types.len() { break; }
            t = base;
            hops += 1;
        }
        t
    }

    /// SQL spelling of a type: `int4`, `public.email`, `text[]`.
    /// Element cycles stop at the first type that leads back to `t`.
    pub fn type_name(&self, t: &Type) -> String {
        let mut base = t;
        let mut dims = 0;
        while let Some(elem) = self.element_type(base) {
            if elem.oid == base.oid || elem.oid == t.oid || dims >= self.types.len() { break; }
            base = elem;
            dims += 1;
        }
        let name = if base.identifier.schema == "pg_catalog" {
            crate::ident::quote_ident(&base.identifier.name)
        } else {
            base.identifier.to_string()
        };
        format!("{}{}", name, "[]".repeat(dims))
    }

    pub fn types(&self) -> impl Iterator<Item = &Type> { self.types.iter() }

    pub fn functions(&self) -> impl Iterator<Item = &Function> { self.functions.iter() }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> { self.relations.iter() }

    pub fn summary(&self) -> CatalogSummary {
        let mut s = CatalogSummary { types: self.types.len(), functions: self.functions.len(), relations: self.relations.len(), ..Default::default() };
        for t in self.types.iter() {
            match t.kind() {
                TypeKind::Array => s.arrays += 1,
                TypeKind::Domain => s.domains += 1,
                TypeKind::Composite => s.composites += 1,
                TypeKind::Scalar => {}
            }
        }
        s.views = self.relations.iter().filter(|r| r.is_view || r.is_materialized_view).count();
        s
    }

    /// One-line signature: `public.add(a int4, b int4) -> int4`.
    pub fn describe_function(&self, f: &Function) -> String {
        let args: Vec<String> = f.arguments.iter().map(|a| {
            let mut s = String::new();
            match a.mode {
                ArgMode::In => {}
                ArgMode::Out => s.push_str("OUT "),
                ArgMode::InOut => s.push_str("INOUT "),
                ArgMode::Variadic => s.push_str("VARIADIC "),
            }
            if let Some(name) = &a.name { s.push_str(&crate::ident::quote_ident(name)); s.push(' '); }
            s.push_str(&self.type_name(self.ty(a.ty())));
            s
        }).collect();
        let setof = if f.returns_set { "SETOF " } else { "" };
        format!("{}({}) -> {}{}", f.identifier, args.join(", "), setof, self.type_name(self.ty(f.return_type())))
    }

    /// Multi-line listing of a relation and its columns.
    pub fn describe_relation(&self, r: &Relation) -> String {
        let kind = if r.is_materialized_view { "materialized view" } else if r.is_view { "view" } else { "table" };
        let mut out = format!("{} {}\n", kind, r.identifier);
        for c in &r.columns {
            out.push_str(&format!("  {} {}", crate::ident::quote_ident(&c.name), self.type_name(self.ty(c.ty()))));
            if !c.is_nullable { out.push_str(" NOT NULL"); }
            if c.is_primary_key { out.push_str(" PRIMARY KEY"); }
            if c.is_identity { out.push_str(" IDENTITY"); }
            if c.is_generated { out.push_str(" GENERATED"); }
            if let Some(def) = &c.default_expression { out.push_str(&format!(" DEFAULT {}", def)); }
            out.push('\n');
        }
        for u in &r.unique_constraints {
            out.push_str(&format!("  UNIQUE ({})\n", u.join(", ")));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    pub types: usize,
    pub arrays: usize,
    pub domains: usize,
    pub composites: usize,
    pub functions: usize,
    pub relations: usize,
    pub views: usize,
}

impl Display for CatalogSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} types ({} arrays, {} domains, {} composite), {} functions, {} relations ({} views)",
            self.types, self.arrays, self.domains, self.composites, self.functions, self.relations, self.views
        )
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod catalog_tests;
