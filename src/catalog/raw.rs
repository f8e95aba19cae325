//! Raw catalog records
//! -------------------
//! Flat, oid-keyed records as they come out of the record fetcher. Nothing in
//! here is cross-linked: every reference to another object is a bare oid where
//! 0 means "absent". Closed-set codes (argument modes, volatility) are turned
//! into enums while decoding, so the resolver never sees bare characters.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};
use crate::ident::SqlIdentifier;

/// Postgres object identifier. 0 is never a valid object.
pub type Oid = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawType {
    pub oid: Oid,
    pub identifier: SqlIdentifier,
    #[serde(default)]
    pub element_oid: Oid,
    #[serde(default)]
    pub array_oid: Oid,
    #[serde(default)]
    pub base_type_oid: Oid,
    #[serde(default)]
    pub relation_id: Oid,
}

impl RawType {
    pub fn new(oid: Oid, schema: &str, name: &str) -> Self {
        Self {
            oid,
            identifier: SqlIdentifier::new(schema, name),
            element_oid: 0,
            array_oid: 0,
            base_type_oid: 0,
            relation_id: 0,
        }
    }

    pub fn with_element(mut self, oid: Oid) -> Self { self.element_oid = oid; self }
    pub fn with_array(mut self, oid: Oid) -> Self { self.array_oid = oid; self }
    pub fn with_base_type(mut self, oid: Oid) -> Self { self.base_type_oid = oid; self }
    pub fn with_relation(mut self, relid: Oid) -> Self { self.relation_id = relid; self }
}

/// Argument passing mode (`proargmodes`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgMode {
    In,
    Out,
    InOut,
    Variadic,
}

impl ArgMode {
    /// Accepts the single-character catalog codes and their spelled-out names.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "i" | "in" => Some(ArgMode::In),
            "o" | "out" => Some(ArgMode::Out),
            "b" | "inout" => Some(ArgMode::InOut),
            "v" | "variadic" => Some(ArgMode::Variadic),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ArgMode::In => "i",
            ArgMode::Out => "o",
            ArgMode::InOut => "b",
            ArgMode::Variadic => "v",
        }
    }

    pub fn is_input(self) -> bool { !matches!(self, ArgMode::Out) }
    pub fn is_output(self) -> bool { matches!(self, ArgMode::Out | ArgMode::InOut) }
}

/// Function volatility (`provolatile`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Volatility {
    Immutable,
    Stable,
    Volatile,
}

impl Volatility {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "i" | "immutable" => Some(Volatility::Immutable),
            "s" | "stable" => Some(Volatility::Stable),
            "v" | "volatile" => Some(Volatility::Volatile),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Volatility::Immutable => "i",
            Volatility::Stable => "s",
            Volatility::Volatile => "v",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFunctionArgument {
    /// 1-based position in the full argument list.
    pub index: u32,
    pub name: Option<String>,
    pub mode: ArgMode,
    pub type_oid: Oid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFunction {
    pub identifier: SqlIdentifier,
    pub return_type_oid: Oid,
    pub returns_set: bool,
    pub is_strict: bool,
    pub is_security_definer: bool,
    pub is_leakproof: bool,
    pub volatility: Volatility,
    pub language: Option<String>,
    pub arguments: Vec<RawFunctionArgument>,
}

impl RawFunction {
    pub fn new(schema: &str, name: &str, return_type_oid: Oid) -> Self {
        Self {
            identifier: SqlIdentifier::new(schema, name),
            return_type_oid,
            returns_set: false,
            is_strict: false,
            is_security_definer: false,
            is_leakproof: false,
            volatility: Volatility::Volatile,
            language: None,
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, name: Option<&str>, mode: ArgMode, type_oid: Oid) -> Self {
        let index = self.arguments.len() as u32 + 1;
        self.arguments.push(RawFunctionArgument { index, name: name.map(str::to_string), mode, type_oid });
        self
    }

    pub fn returning_set(mut self) -> Self { self.returns_set = true; self }
}

/// Wire form of a function argument: codes still as text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFunctionArgumentRow {
    pub index: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    pub type_oid: Oid,
}

/// Wire form of a function, as produced by the fetch query or a snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFunctionRow {
    pub identifier: SqlIdentifier,
    pub return_type_oid: Oid,
    #[serde(default)]
    pub returns_set: bool,
    #[serde(default)]
    pub is_strict: bool,
    #[serde(default)]
    pub is_security_definer: bool,
    #[serde(default)]
    pub is_leakproof: bool,
    pub volatility: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub arguments: Vec<RawFunctionArgumentRow>,
}

impl TryFrom<RawFunctionRow> for RawFunction {
    type Error = CatalogError;

    fn try_from(row: RawFunctionRow) -> CatalogResult<Self> {
        let referrer = || format!("function {}", row.identifier);
        let volatility = Volatility::from_code(&row.volatility)
            .ok_or_else(|| CatalogError::malformed(referrer(), "volatility", &row.volatility))?;
        let mut arguments = Vec::with_capacity(row.arguments.len());
        for a in &row.arguments {
            // NULL proargmodes means every argument is IN
            let mode = match a.mode.as_deref() {
                None => ArgMode::In,
                Some(code) => ArgMode::from_code(code)
                    .ok_or_else(|| CatalogError::malformed(format!("{}, argument {}", referrer(), a.index), "argument mode", code))?,
            };
            let name = a.name.clone().filter(|n| !n.is_empty());
            arguments.push(RawFunctionArgument { index: a.index, name, mode, type_oid: a.type_oid });
        }
        Ok(RawFunction {
            identifier: row.identifier,
            return_type_oid: row.return_type_oid,
            returns_set: row.returns_set,
            is_strict: row.is_strict,
            is_security_definer: row.is_security_definer,
            is_leakproof: row.is_leakproof,
            volatility,
            language: row.language,
            arguments,
        })
    }
}

impl From<&RawFunction> for RawFunctionRow {
    fn from(f: &RawFunction) -> Self {
        RawFunctionRow {
            identifier: f.identifier.clone(),
            return_type_oid: f.return_type_oid,
            returns_set: f.returns_set,
            is_strict: f.is_strict,
            is_security_definer: f.is_security_definer,
            is_leakproof: f.is_leakproof,
            volatility: f.volatility.code().to_string(),
            language: f.language.clone(),
            arguments: f.arguments.iter().map(|a| RawFunctionArgumentRow {
                index: a.index,
                name: a.name.clone(),
                mode: Some(a.mode.code().to_string()),
                type_oid: a.type_oid,
            }).collect(),
        }
    }
}

/// Decode wire rows, failing on the first out-of-set code.
pub fn decode_functions(rows: Vec<RawFunctionRow>) -> CatalogResult<Vec<RawFunction>> {
    rows.into_iter().map(RawFunction::try_from).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    pub ordinal_position: u32,
    #[serde(default)]
    pub default_expression: Option<String>,
    #[serde(default = "default_true")]
    pub is_nullable: bool,
    #[serde(default)]
    pub is_identity: bool,
    #[serde(default)]
    pub is_generated: bool,
    pub type_oid: Oid,
    #[serde(default)]
    pub domain_identifier: Option<SqlIdentifier>,
}

fn default_true() -> bool { true }

impl RawColumn {
    pub fn new(name: &str, ordinal_position: u32, type_oid: Oid) -> Self {
        Self {
            name: name.to_string(),
            ordinal_position,
            default_expression: None,
            is_nullable: true,
            is_identity: false,
            is_generated: false,
            type_oid,
            domain_identifier: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRelation {
    pub relation_id: Oid,
    pub identifier: SqlIdentifier,
    #[serde(default)]
    pub is_view: bool,
    #[serde(default)]
    pub is_materialized_view: bool,
    #[serde(default)]
    pub columns: Vec<RawColumn>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub unique_constraints: Vec<Vec<String>>,
}

impl RawRelation {
    pub fn new(relation_id: Oid, schema: &str, name: &str) -> Self {
        Self {
            relation_id,
            identifier: SqlIdentifier::new(schema, name),
            is_view: false,
            is_materialized_view: false,
            columns: Vec::new(),
            primary_key: Vec::new(),
            unique_constraints: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: RawColumn) -> Self { self.columns.push(column); self }
}

/// The three recordsets one catalog is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSnapshot {
    pub types: Vec<RawType>,
    pub functions: Vec<RawFunction>,
    pub relations: Vec<RawRelation>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    types: Vec<RawType>,
    #[serde(default)]
    functions: Vec<RawFunctionRow>,
    #[serde(default)]
    relations: Vec<RawRelation>,
}

impl RawSnapshot {
    pub fn from_json(text: &str) -> CatalogResult<Self> {
        let file: SnapshotFile = serde_json::from_str(text)
            .map_err(|e| CatalogError::fetch("decode snapshot", e))?;
        Ok(RawSnapshot {
            types: file.types,
            functions: decode_functions(file.functions)?,
            relations: file.relations,
        })
    }

    pub fn to_json(&self) -> CatalogResult<String> {
        let file = SnapshotFile {
            types: self.types.clone(),
            functions: self.functions.iter().map(RawFunctionRow::from).collect(),
            relations: self.relations.clone(),
        };
        serde_json::to_string_pretty(&file).map_err(|e| CatalogError::fetch("encode snapshot", e))
    }

    pub fn load(path: &Path) -> CatalogResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::fetch(format!("read snapshot {}", path.display()), e))?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: &Path) -> CatalogResult<()> {
        let text = self.to_json()?;
        std::fs::write(path, text)
            .map_err(|e| CatalogError::fetch(format!("write snapshot {}", path.display()), e))
    }
}
