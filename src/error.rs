//! Catalog error model
//! -------------------
//! A single error enum shared by the record fetcher and the catalog resolver.
//! Every failure aborts the whole build: callers never observe a partially
//! linked catalog, they get one of these instead.

use std::fmt::{Display, Formatter};

use crate::catalog::raw::Oid;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The three recordsets a catalog is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Types,
    Functions,
    Relations,
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Types => f.write_str("types"),
            RecordKind::Functions => f.write_str("functions"),
            RecordKind::Relations => f.write_str("relations"),
        }
    }
}

/// Which cross-reference of a record failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefField {
    ElementType,
    ArrayType,
    BaseType,
    CompositeType,
    ReturnType,
    /// 1-based declared argument index.
    Argument(u32),
    Column(String),
}

impl Display for RefField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RefField::ElementType => f.write_str("element type"),
            RefField::ArrayType => f.write_str("array type"),
            RefField::BaseType => f.write_str("base type"),
            RefField::CompositeType => f.write_str("composite type"),
            RefField::ReturnType => f.write_str("return type"),
            RefField::Argument(n) => write!(f, "argument {} type", n),
            RefField::Column(name) => write!(f, "column {} type", name),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to {context}: {source}")]
    FetchFailure {
        context: String,
        #[source]
        source: BoxError,
    },
    #[error("no {0} found")]
    EmptyResult(RecordKind),
    #[error("{referrer}: unresolved {field} reference to {oid}")]
    UnresolvedReference { oid: Oid, referrer: String, field: RefField },
    #[error("{referrer}: malformed {field} value {value:?}")]
    MalformedRecord { referrer: String, field: &'static str, value: String },
}

impl CatalogError {
    pub fn fetch<C: Into<String>, E: Into<BoxError>>(context: C, err: E) -> Self {
        CatalogError::FetchFailure { context: context.into(), source: err.into() }
    }

    pub fn unresolved<S: Into<String>>(oid: Oid, referrer: S, field: RefField) -> Self {
        CatalogError::UnresolvedReference { oid, referrer: referrer.into(), field }
    }

    pub fn malformed<S: Into<String>, V: ToString>(referrer: S, field: &'static str, value: V) -> Self {
        CatalogError::MalformedRecord { referrer: referrer.into(), field, value: value.to_string() }
    }

    /// Stable machine-readable code for the error class.
    pub fn code_str(&self) -> &'static str {
        match self {
            CatalogError::FetchFailure { .. } => "fetch_failure",
            CatalogError::EmptyResult(_) => "empty_result",
            CatalogError::UnresolvedReference { .. } => "unresolved_reference",
            CatalogError::MalformedRecord { .. } => "malformed_record",
        }
    }

    /// The dangling oid, when this is an unresolved reference.
    pub fn unresolved_oid(&self) -> Option<Oid> {
        match self {
            CatalogError::UnresolvedReference { oid, .. } => Some(*oid),
            _ => None,
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
