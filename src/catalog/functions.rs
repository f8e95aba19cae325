//! Function table
//! --------------
//! Resolves raw `pg_proc` records against a completed [`TypeTable`]. Argument
//! order is positional call order and is preserved exactly. Overloads share an
//! identifier, so the name index maps to every function with that name.

use std::collections::HashMap;

use tracing::debug;

use super::raw::{ArgMode, Oid, RawFunction, Volatility};
use super::types::{TypeId, TypeTable};
use crate::error::{CatalogError, CatalogResult, RefField};
use crate::ident::SqlIdentifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub(crate) usize);

impl FunctionId {
    pub fn index(self) -> usize { self.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionArgument {
    pub index: u32,
    pub name: Option<String>,
    pub mode: ArgMode,
    pub pg_type_oid: Oid,
    type_id: TypeId,
}

impl FunctionArgument {
    pub fn ty(&self) -> TypeId { self.type_id }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub identifier: SqlIdentifier,
    pub arguments: Vec<FunctionArgument>,
    /// Whether this is a `SETOF`/`TABLE` function.
    pub returns_set: bool,
    pub pg_return_type_oid: Oid,
    pub volatility: Volatility,
    pub is_strict: bool,
    pub is_security_definer: bool,
    pub is_leakproof: bool,
    pub language: Option<String>,
    return_type: TypeId,
}

impl Function {
    pub fn return_type(&self) -> TypeId { self.return_type }

    pub fn returns_single_row(&self) -> bool { !self.returns_set }

    /// Arguments a caller supplies, in call order.
    pub fn input_arguments(&self) -> impl Iterator<Item = &FunctionArgument> {
        self.arguments.iter().filter(|a| a.mode.is_input())
    }

    /// `OUT`/`INOUT` arguments, which make up the result row.
    pub fn output_arguments(&self) -> impl Iterator<Item = &FunctionArgument> {
        self.arguments.iter().filter(|a| a.mode.is_output())
    }

    pub fn is_variadic(&self) -> bool { self.arguments.iter().any(|a| a.mode == ArgMode::Variadic) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionTable {
    functions: Vec<Function>,
    by_name: HashMap<SqlIdentifier, Vec<FunctionId>>,
}

impl FunctionTable {
    pub fn build(mut raw: Vec<RawFunction>, types: &TypeTable) -> CatalogResult<Self> {
        for f in raw.iter_mut() {
            f.arguments.sort_by_key(|a| a.index);
        }
        // Overloads are ordered by signature so the arena does not depend on fetch order.
        raw.sort_by(|a, b| {
            a.identifier.cmp(&b.identifier)
                .then_with(|| a.arguments.iter().map(|x| x.type_oid).cmp(b.arguments.iter().map(|x| x.type_oid)))
                .then_with(|| a.arguments.iter().map(|x| x.mode.code()).cmp(b.arguments.iter().map(|x| x.mode.code())))
                .then(a.return_type_oid.cmp(&b.return_type_oid))
        });

        let mut functions: Vec<Function> = Vec::with_capacity(raw.len());
        let mut by_name: HashMap<SqlIdentifier, Vec<FunctionId>> = HashMap::new();
        for f in raw {
            let function = resolve_function(f, types)?;
            let id = FunctionId(functions.len());
            by_name.entry(function.identifier.clone()).or_default().push(id);
            functions.push(function);
        }
        debug!(target: "pgrel::catalog", "function table: {} functions, {} distinct names", functions.len(), by_name.len());
        Ok(FunctionTable { functions, by_name })
    }

    pub fn get(&self, id: FunctionId) -> &Function { &self.functions[id.0] }

    /// Every overload named `ident`, in signature order.
    pub fn by_name<'a>(&'a self, ident: &SqlIdentifier) -> impl Iterator<Item = &'a Function> + 'a {
        let ids: &'a [FunctionId] = self.by_name.get(ident).map(Vec::as_slice).unwrap_or(&[]);
        ids.iter().map(move |id| self.get(*id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Function> { self.functions.iter() }

    pub fn len(&self) -> usize { self.functions.len() }

    pub fn is_empty(&self) -> bool { self.functions.is_empty() }
}

fn resolve_function(f: RawFunction, types: &TypeTable) -> CatalogResult<Function> {
    let referrer = || format!("function {}", f.identifier);
    let return_type = types.resolve(f.return_type_oid, referrer, RefField::ReturnType)?;

    let mut arguments: Vec<FunctionArgument> = Vec::with_capacity(f.arguments.len());
    let mut last_index = 0u32;
    for a in &f.arguments {
        if a.index <= last_index {
            return Err(CatalogError::malformed(referrer(), "argument index", a.index));
        }
        last_index = a.index;
        let type_id = types.resolve(a.type_oid, referrer, RefField::Argument(a.index))?;
        arguments.push(FunctionArgument {
            index: a.index,
            name: a.name.clone(),
            mode: a.mode,
            pg_type_oid: a.type_oid,
            type_id,
        });
    }

    Ok(Function {
        identifier: f.identifier,
        arguments,
        returns_set: f.returns_set,
        pg_return_type_oid: f.return_type_oid,
        volatility: f.volatility,
        is_strict: f.is_strict,
        is_security_definer: f.is_security_definer,
        is_leakproof: f.is_leakproof,
        language: f.language,
        return_type,
    })
}
