//! Relation table
//! --------------
//! Resolves raw relation records (tables, views, materialized views) against a
//! completed [`TypeTable`]. Every relation must be backed by a composite row
//! type found through the type table's relation index.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::raw::{Oid, RawRelation};
use super::types::{TypeId, TypeTable};
use crate::error::{CatalogError, CatalogResult, RefField};
use crate::ident::SqlIdentifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationId(pub(crate) usize);

impl RelationId {
    pub fn index(self) -> usize { self.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ordinal_position: u32,
    pub pg_type_oid: Oid,
    pub default_expression: Option<String>,
    pub is_nullable: bool,
    pub is_identity: bool,
    pub is_generated: bool,
    pub domain_identifier: Option<SqlIdentifier>,
    pub is_primary_key: bool,
    /// Part of the primary key or of a single-column unique constraint.
    pub is_unique: bool,
    type_id: TypeId,
}

impl Column {
    pub fn ty(&self) -> TypeId { self.type_id }

    pub fn has_default(&self) -> bool { self.default_expression.is_some() || self.is_identity || self.is_generated }
}

/// A table or view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub relation_id: Oid,
    pub identifier: SqlIdentifier,
    pub is_view: bool,
    pub is_materialized_view: bool,
    pub columns: Vec<Column>,
    pub primary_key: Vec<String>,
    pub unique_constraints: Vec<Vec<String>>,
    type_id: TypeId,
    columns_by_name: HashMap<String, usize>,
}

impl Relation {
    /// The composite row type of this relation.
    pub fn ty(&self) -> TypeId { self.type_id }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns_by_name.get(name).map(|&i| &self.columns[i])
    }

    pub fn is_table(&self) -> bool { !self.is_view && !self.is_materialized_view }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationTable {
    relations: Vec<Relation>,
    by_relid: HashMap<Oid, RelationId>,
    by_name: HashMap<SqlIdentifier, RelationId>,
}

impl RelationTable {
    pub fn build(mut raw: Vec<RawRelation>, types: &TypeTable) -> CatalogResult<Self> {
        raw.sort_by(|a, b| a.identifier.cmp(&b.identifier).then(a.relation_id.cmp(&b.relation_id)));

        let mut relations: Vec<Relation> = Vec::with_capacity(raw.len());
        let mut by_relid: HashMap<Oid, RelationId> = HashMap::with_capacity(raw.len());
        let mut by_name: HashMap<SqlIdentifier, RelationId> = HashMap::with_capacity(raw.len());
        for r in raw {
            let relation = resolve_relation(r, types)?;
            let id = RelationId(relations.len());
            if by_relid.insert(relation.relation_id, id).is_some() {
                return Err(CatalogError::malformed(format!("relation {}", relation.identifier), "duplicate relation id", relation.relation_id));
            }
            by_name.entry(relation.identifier.clone()).or_insert(id);
            relations.push(relation);
        }
        debug!(target: "pgrel::catalog", "relation table: {} relations", relations.len());
        Ok(RelationTable { relations, by_relid, by_name })
    }

    pub fn get(&self, id: RelationId) -> &Relation { &self.relations[id.0] }

    pub fn lookup(&self, relid: Oid) -> Option<RelationId> { self.by_relid.get(&relid).copied() }

    pub fn by_relid(&self, relid: Oid) -> Option<&Relation> { self.lookup(relid).map(|id| self.get(id)) }

    pub fn by_name(&self, ident: &SqlIdentifier) -> Option<&Relation> {
        self.by_name.get(ident).map(|id| self.get(*id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relation> { self.relations.iter() }

    pub fn len(&self) -> usize { self.relations.len() }

    pub fn is_empty(&self) -> bool { self.relations.is_empty() }
}

fn resolve_relation(mut r: RawRelation, types: &TypeTable) -> CatalogResult<Relation> {
    let referrer = format!("relation {}", r.identifier);
    let type_id = types
        .composite_for(r.relation_id)
        .ok_or_else(|| CatalogError::unresolved(r.relation_id, referrer.clone(), RefField::CompositeType))?;
    debug_assert_eq!(types.get(type_id).pg_relation_id, r.relation_id);

    for name in r.primary_key.iter().chain(r.unique_constraints.iter().flatten()) {
        if !r.columns.iter().any(|c| &c.name == name) {
            return Err(CatalogError::malformed(referrer, "constraint column", name));
        }
    }
    let pk: HashSet<&str> = r.primary_key.iter().map(String::as_str).collect();
    let single_unique: HashSet<&str> = r.unique_constraints.iter()
        .filter(|u| u.len() == 1)
        .map(|u| u[0].as_str())
        .collect();

    r.columns.sort_by_key(|c| c.ordinal_position);
    let mut columns: Vec<Column> = Vec::with_capacity(r.columns.len());
    let mut columns_by_name: HashMap<String, usize> = HashMap::with_capacity(r.columns.len());
    let mut last_position = 0u32;
    for c in &r.columns {
        if c.ordinal_position <= last_position {
            return Err(CatalogError::malformed(referrer, "column position", c.ordinal_position));
        }
        last_position = c.ordinal_position;
        let column_type = types.resolve(c.type_oid, || referrer.clone(), RefField::Column(c.name.clone()))?;
        if columns_by_name.insert(c.name.clone(), columns.len()).is_some() {
            return Err(CatalogError::malformed(referrer, "duplicate column", &c.name));
        }
        let is_primary_key = pk.contains(c.name.as_str());
        columns.push(Column {
            name: c.name.clone(),
            ordinal_position: c.ordinal_position,
            pg_type_oid: c.type_oid,
            default_expression: c.default_expression.clone(),
            is_nullable: c.is_nullable,
            is_identity: c.is_identity,
            is_generated: c.is_generated,
            domain_identifier: c.domain_identifier.clone(),
            is_primary_key,
            is_unique: single_unique.contains(c.name.as_str()) || (is_primary_key && pk.len() == 1),
            type_id: column_type,
        });
    }

    Ok(Relation {
        relation_id: r.relation_id,
        identifier: r.identifier,
        is_view: r.is_view,
        is_materialized_view: r.is_materialized_view,
        columns,
        primary_key: r.primary_key,
        unique_constraints: r.unique_constraints,
        type_id,
        columns_by_name,
    })
}
