//! Record fetcher
//! --------------
//! Reads the three raw recordsets from a live Postgres catalog. Each query
//! aggregates its rows with `json_agg` so a single text value comes back and is
//! decoded with serde; the schema is only read once per refresh, so this is
//! simpler than mapping every column by hand.
//!
//! The three queries are independent and run concurrently on one connection.

use serde::de::DeserializeOwned;
use tokio_postgres::{Client, Config, NoTls};
use tracing::{debug, info, warn};

use crate::catalog::raw::{decode_functions, RawFunctionRow, RawRelation, RawSnapshot, RawType};
use crate::error::{CatalogError, CatalogResult, RecordKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Also fetch functions and relations from system schemas. Types are always
    /// fetched in full since user objects reference built-in types.
    pub include_system_schemas: bool,
}

/// Open a connection and drive it on a background task.
pub async fn connect(url: &str) -> CatalogResult<Client> {
    let cfg: Config = url.parse().map_err(|e| CatalogError::fetch("parse database url", e))?;
    let (client, conn) = cfg.connect(NoTls).await.map_err(|e| CatalogError::fetch("connect to database", e))?;
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            warn!(target: "pgrel::fetch", "connection closed with error: {}", e);
        }
    });
    Ok(client)
}

pub async fn fetch_snapshot(client: &Client, opts: &FetchOptions) -> CatalogResult<RawSnapshot> {
    let types_sql = types_query();
    let functions_sql = functions_query(opts);
    let relations_sql = relations_query(opts);
    let (types, functions, relations) = futures_util::try_join!(
        fetch_json::<RawType>(client, RecordKind::Types, &types_sql),
        fetch_json::<RawFunctionRow>(client, RecordKind::Functions, &functions_sql),
        fetch_json::<RawRelation>(client, RecordKind::Relations, &relations_sql),
    )?;
    if types.is_empty() {
        return Err(CatalogError::EmptyResult(RecordKind::Types));
    }
    let functions = decode_functions(functions)?;
    info!(
        target: "pgrel::fetch",
        "fetched {} types, {} functions, {} relations (system schemas: {})",
        types.len(), functions.len(), relations.len(), opts.include_system_schemas
    );
    Ok(RawSnapshot { types, functions, relations })
}

async fn fetch_json<T: DeserializeOwned>(client: &Client, kind: RecordKind, sql: &str) -> CatalogResult<Vec<T>> {
    debug!(target: "pgrel::fetch", "querying {}", kind);
    let row = client.query_one(sql, &[]).await.map_err(|e| CatalogError::fetch(format!("query {}", kind), e))?;
    // json_agg over zero rows yields NULL
    let text: Option<String> = row.try_get(0).map_err(|e| CatalogError::fetch(format!("read {}", kind), e))?;
    match text {
        None => Ok(Vec::new()),
        Some(t) => serde_json::from_str(&t).map_err(|e| CatalogError::fetch(format!("decode {}", kind), e)),
    }
}

fn schema_filter(column: &str, opts: &FetchOptions) -> String {
    if opts.include_system_schemas {
        "TRUE".to_string()
    } else {
        format!("{c} NOT IN ('pg_catalog', 'information_schema') AND {c} NOT LIKE 'pg\\_toast%'", c = column)
    }
}

/// Only true arrays report an element: fixed-length vector types such as `name`
/// also set `typelem`, but their element's `typarray` points elsewhere.
pub fn types_query() -> String {
    r#"
SELECT json_agg(T)::text FROM (
  SELECT
    t.oid::int8 AS oid,
    json_build_object('schema', n.nspname, 'name', t.typname) AS identifier,
    CASE WHEN e.typarray = t.oid THEN t.typelem::int8 ELSE 0 END AS element_oid,
    t.typarray::int8 AS array_oid,
    t.typbasetype::int8 AS base_type_oid,
    t.typrelid::int8 AS relation_id
  FROM pg_type t
  INNER JOIN pg_namespace n ON n.oid = t.typnamespace
  LEFT JOIN pg_type e ON e.oid = t.typelem
  ORDER BY n.nspname, t.typname
) T"#
        .to_string()
}

/// `RETURNS TABLE` columns are stored with mode `t`; they are reported as OUT.
pub fn functions_query(opts: &FetchOptions) -> String {
    format!(
        r#"
SELECT json_agg(F)::text FROM (
  SELECT
    json_build_object('schema', n.nspname, 'name', p.proname) AS identifier,
    p.prorettype::int8 AS return_type_oid,
    l.lanname AS language,
    p.proretset AS returns_set,
    p.proisstrict AS is_strict,
    p.prosecdef AS is_security_definer,
    p.proleakproof AS is_leakproof,
    p.provolatile::text AS volatility,
    COALESCE((
      SELECT json_agg(json_build_object(
        'index', a.ord,
        'name', p.proargnames[a.ord],
        'mode', CASE p.proargmodes[a.ord] WHEN 't' THEN 'o' ELSE p.proargmodes[a.ord]::text END,
        'type_oid', a.type_oid::int8
      ) ORDER BY a.ord)
      FROM unnest(COALESCE(p.proallargtypes, p.proargtypes::oid[])) WITH ORDINALITY AS a(type_oid, ord)
    ), '[]'::json) AS arguments
  FROM pg_proc p
  INNER JOIN pg_namespace n ON n.oid = p.pronamespace
  LEFT JOIN pg_language l ON l.oid = p.prolang
  WHERE {filter}
  ORDER BY n.nspname, p.proname
) F"#,
        filter = schema_filter("n.nspname", opts)
    )
}

pub fn relations_query(opts: &FetchOptions) -> String {
    format!(
        r#"
SELECT json_agg(R)::text FROM (
  SELECT
    c.oid::int8 AS relation_id,
    json_build_object('schema', n.nspname, 'name', c.relname) AS identifier,
    c.relkind = 'v' AS is_view,
    c.relkind = 'm' AS is_materialized_view,
    COALESCE((
      SELECT json_agg(json_build_object(
        'name', a.attname,
        'ordinal_position', a.attnum,
        'default_expression', pg_get_expr(d.adbin, d.adrelid),
        'is_nullable', NOT a.attnotnull,
        'is_identity', a.attidentity <> '',
        'is_generated', a.attgenerated <> '',
        'type_oid', a.atttypid::int8,
        'domain_identifier', CASE WHEN t.typtype = 'd'
          THEN json_build_object('schema', tn.nspname, 'name', t.typname) END
      ) ORDER BY a.attnum)
      FROM pg_attribute a
      INNER JOIN pg_type t ON t.oid = a.atttypid
      INNER JOIN pg_namespace tn ON tn.oid = t.typnamespace
      LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
      WHERE a.attrelid = c.oid AND a.attnum > 0 AND NOT a.attisdropped
    ), '[]'::json) AS columns,
    COALESCE((
      SELECT json_agg(a.attname ORDER BY k.ord)
      FROM pg_constraint pk
      CROSS JOIN LATERAL unnest(pk.conkey) WITH ORDINALITY AS k(attnum, ord)
      INNER JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = k.attnum
      WHERE pk.conrelid = c.oid AND pk.contype = 'p'
    ), '[]'::json) AS primary_key,
    COALESCE((
      SELECT json_agg(u.cols ORDER BY u.conname)
      FROM (
        SELECT uc.conname, json_agg(a.attname ORDER BY k.ord) AS cols
        FROM pg_constraint uc
        CROSS JOIN LATERAL unnest(uc.conkey) WITH ORDINALITY AS k(attnum, ord)
        INNER JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = k.attnum
        WHERE uc.conrelid = c.oid AND uc.contype = 'u'
        GROUP BY uc.conname
      ) u
    ), '[]'::json) AS unique_constraints
  FROM pg_class c
  INNER JOIN pg_namespace n ON n.oid = c.relnamespace
  WHERE c.relkind IN ('r', 'p', 'v', 'm', 'f') AND {filter}
  ORDER BY n.nspname, c.relname
) R"#,
        filter = schema_filter("n.nspname", opts)
    )
}
