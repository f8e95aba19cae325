//! Type table
//! ----------
//! Resolves raw `pg_type` records into an arena of [`Type`] nodes. Arrays and
//! their elements point at each other, so resolution runs in two passes: first
//! every record is allocated and indexed by oid, then each non-zero reference
//! is linked by looking it up in that index. Relationships are arena handles,
//! never references into the vector.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::raw::{Oid, RawType};
use crate::error::{CatalogError, CatalogResult, RecordKind, RefField};
use crate::ident::SqlIdentifier;

/// Handle to a [`Type`] inside its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    pub fn index(self) -> usize { self.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Scalar,
    Array,
    Domain,
    /// Row type of a relation. Decided by the relation id the type carries, so
    /// it holds even when that relation was not fetched; see
    /// `Catalog::type_relation` for the resolved link.
    Composite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub oid: Oid,
    pub identifier: SqlIdentifier,
    pub pg_element_oid: Oid,
    pub pg_array_oid: Oid,
    pub pg_base_type_oid: Oid,
    pub pg_relation_id: Oid,
    element_type: Option<TypeId>,
    array_type: Option<TypeId>,
    base_type: Option<TypeId>,
}

impl Type {
    fn from_raw(r: RawType) -> Self {
        Type {
            oid: r.oid,
            identifier: r.identifier,
            pg_element_oid: r.element_oid,
            pg_array_oid: r.array_oid,
            pg_base_type_oid: r.base_type_oid,
            pg_relation_id: r.relation_id,
            element_type: None,
            array_type: None,
            base_type: None,
        }
    }

    /// Set iff this is an array type.
    pub fn element_type(&self) -> Option<TypeId> { self.element_type }
    /// The array type whose element is this type.
    pub fn array_type(&self) -> Option<TypeId> { self.array_type }
    /// Set iff this is a domain.
    pub fn base_type(&self) -> Option<TypeId> { self.base_type }

    /// Id of the relation this row type backs, if it is a composite type.
    pub fn relation_id(&self) -> Option<Oid> {
        if self.pg_relation_id != 0 { Some(self.pg_relation_id) } else { None }
    }

    pub fn kind(&self) -> TypeKind {
        if self.element_type.is_some() {
            TypeKind::Array
        } else if self.base_type.is_some() {
            TypeKind::Domain
        } else if self.pg_relation_id != 0 {
            TypeKind::Composite
        } else {
            TypeKind::Scalar
        }
    }

    pub fn is_array(&self) -> bool { self.kind() == TypeKind::Array }
    pub fn is_domain(&self) -> bool { self.kind() == TypeKind::Domain }
    pub fn is_composite(&self) -> bool { self.kind() == TypeKind::Composite }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTable {
    types: Vec<Type>,
    by_oid: HashMap<Oid, TypeId>,
    by_relation: HashMap<Oid, TypeId>,
    by_name: HashMap<SqlIdentifier, TypeId>,
}

impl TypeTable {
    pub fn build(mut raw: Vec<RawType>) -> CatalogResult<Self> {
        if raw.is_empty() {
            return Err(CatalogError::EmptyResult(RecordKind::Types));
        }
        raw.sort_by(|a, b| a.identifier.cmp(&b.identifier).then(a.oid.cmp(&b.oid)));

        // Pass 1: allocate every node and index it.
        let mut types: Vec<Type> = Vec::with_capacity(raw.len());
        let mut by_oid: HashMap<Oid, TypeId> = HashMap::with_capacity(raw.len());
        let mut by_relation: HashMap<Oid, TypeId> = HashMap::new();
        let mut by_name: HashMap<SqlIdentifier, TypeId> = HashMap::with_capacity(raw.len());
        for r in raw {
            let referrer = format!("type {}", r.identifier);
            if r.oid == 0 {
                return Err(CatalogError::malformed(referrer, "oid", r.oid));
            }
            let id = TypeId(types.len());
            if by_oid.insert(r.oid, id).is_some() {
                return Err(CatalogError::malformed(referrer, "duplicate oid", r.oid));
            }
            if r.relation_id != 0 && by_relation.insert(r.relation_id, id).is_some() {
                return Err(CatalogError::malformed(referrer, "duplicate relation id", r.relation_id));
            }
            by_name.entry(r.identifier.clone()).or_insert(id);
            types.push(Type::from_raw(r));
        }

        // Pass 2: link references through the index.
        for t in types.iter_mut() {
            t.element_type = link(&by_oid, t, t.pg_element_oid, RefField::ElementType)?;
            t.array_type = link(&by_oid, t, t.pg_array_oid, RefField::ArrayType)?;
            t.base_type = link(&by_oid, t, t.pg_base_type_oid, RefField::BaseType)?;
        }

        let table = TypeTable { types, by_oid, by_relation, by_name };
        let mismatched = table.count_unpaired_arrays();
        if mismatched > 0 {
            warn!(target: "pgrel::catalog", "{} array types do not point back at their element type", mismatched);
        }
        debug!(target: "pgrel::catalog", "type table: {} types, {} composite", table.types.len(), table.by_relation.len());
        Ok(table)
    }

    pub fn get(&self, id: TypeId) -> &Type { &self.types[id.0] }

    pub fn lookup(&self, oid: Oid) -> Option<TypeId> { self.by_oid.get(&oid).copied() }

    pub fn by_oid(&self, oid: Oid) -> Option<&Type> { self.lookup(oid).map(|id| self.get(id)) }

    pub fn by_name(&self, ident: &SqlIdentifier) -> Option<&Type> {
        self.by_name.get(ident).map(|id| self.get(*id))
    }

    /// Composite type backing the relation `relid`.
    pub fn composite_for(&self, relid: Oid) -> Option<TypeId> { self.by_relation.get(&relid).copied() }

    /// Resolve an oid referenced by some other record, failing with context on a miss.
    pub fn resolve(&self, oid: Oid, referrer: impl FnOnce() -> String, field: RefField) -> CatalogResult<TypeId> {
        self.lookup(oid).ok_or_else(|| CatalogError::unresolved(oid, referrer(), field))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Type> { self.types.iter() }

    pub fn ids(&self) -> impl Iterator<Item = TypeId> { (0..self.types.len()).map(TypeId) }

    pub fn len(&self) -> usize { self.types.len() }

    pub fn is_empty(&self) -> bool { self.types.is_empty() }

    fn count_unpaired_arrays(&self) -> usize {
        self.ids()
            .filter(|&id| match self.get(id).array_type {
                Some(arr) => self.get(arr).element_type != Some(id),
                None => false,
            })
            .count()
    }
}

fn link(by_oid: &HashMap<Oid, TypeId>, t: &Type, oid: Oid, field: RefField) -> CatalogResult<Option<TypeId>> {
    if oid == 0 {
        return Ok(None);
    }
    match by_oid.get(&oid) {
        Some(id) => Ok(Some(*id)),
        None => Err(CatalogError::unresolved(oid, format!("type {} ({})", t.identifier, t.oid), field)),
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
