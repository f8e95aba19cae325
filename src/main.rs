//!
//! pgrel
//! -----
//! Introspects a Postgres database (or a saved JSON snapshot of its catalog),
//! resolves types, functions and relations into one linked model and prints
//! it. Mostly useful to check that a schema resolves cleanly.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use pgrel::catalog::{Catalog, RawSnapshot};
use pgrel::config::Config;
use pgrel::fetch;
use pgrel::SqlIdentifier;

fn usage(program: &str) -> String {
    format!(
        "Usage:\n  {program} [--url <postgres-url>] [--include-system] [--save-snapshot <file>] [--describe <name>]...\n  {program} --snapshot <file> [--describe <name>]...\n\nFlags:\n  --url <url>              Connection string (env PGREL_DATABASE_URL, default postgres://localhost/postgres)\n  --snapshot <file>        Resolve a saved JSON snapshot instead of connecting (env PGREL_SNAPSHOT)\n  --save-snapshot <file>   Write the fetched raw records to <file>\n  --include-system         Also list pg_catalog / information_schema objects (env PGREL_INCLUDE_SYSTEM)\n  --describe <name>        Print only the relation or functions named [schema.]name (schema defaults to public); repeatable\n  -h, --help               Show this help"
    )
}

fn print_usage(program: &str) {
    eprintln!("{}", usage(program));
}

struct Args {
    save_snapshot: Option<PathBuf>,
    describe: Vec<SqlIdentifier>,
}

fn parse_args(cfg: &mut Config, program: &str, args: &[String]) -> Result<Args> {
    let mut out = Args { save_snapshot: None, describe: Vec::new() };
    let mut i = 0;
    while i < args.len() {
        let next = args.get(i + 1).cloned();
        let value = |name: &str| -> Result<String> {
            next.clone().with_context(|| format!("{name} requires a value"))
        };
        match args[i].as_str() {
            "--url" => { cfg.database_url = value("--url")?; i += 2; }
            "--snapshot" => { cfg.snapshot = Some(PathBuf::from(value("--snapshot")?)); i += 2; }
            "--save-snapshot" => { out.save_snapshot = Some(PathBuf::from(value("--save-snapshot")?)); i += 2; }
            "--include-system" => { cfg.include_system_schemas = true; i += 1; }
            "--describe" => {
                let raw = value("--describe")?;
                let ident = SqlIdentifier::parse(&raw).with_context(|| format!("invalid identifier '{raw}'"))?;
                out.describe.push(ident);
                i += 2;
            }
            "-h" | "--help" => { print_usage(program); std::process::exit(0); }
            other => { print_usage(program); bail!("unknown argument '{other}'"); }
        }
    }
    Ok(out)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("log filter")?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut argv: Vec<String> = std::env::args().collect();
    let program = if argv.is_empty() { "pgrel".to_string() } else { argv.remove(0) };
    let mut cfg = Config::from_env();
    let args = parse_args(&mut cfg, &program, &argv)?;

    let snapshot = match &cfg.snapshot {
        Some(path) => {
            info!(target: "pgrel", "loading snapshot {}", path.display());
            RawSnapshot::load(path)?
        }
        None => {
            info!(target: "pgrel", "connecting to {}", redact(&cfg.database_url));
            let client = fetch::connect(&cfg.database_url).await?;
            fetch::fetch_snapshot(&client, &cfg.fetch_options()).await?
        }
    };
    if let Some(path) = &args.save_snapshot {
        snapshot.save(path)?;
        info!(target: "pgrel", "snapshot written to {}", path.display());
    }

    let catalog = Catalog::build(snapshot).context("catalog did not resolve")?;
    if args.describe.is_empty() {
        print_listing(&catalog, cfg.include_system_schemas);
    } else {
        for ident in &args.describe {
            if !print_object(&catalog, ident) {
                bail!("no relation or function named {ident}");
            }
        }
    }
    Ok(())
}

fn print_listing(catalog: &Catalog, include_system: bool) {
    println!("{}", catalog.summary());
    for r in catalog.relations().filter(|r| include_system || !r.identifier.is_system()) {
        println!();
        print!("{}", catalog.describe_relation(r));
    }
    println!();
    for f in catalog.functions().filter(|f| include_system || !f.identifier.is_system()) {
        println!("function {}", catalog.describe_function(f));
    }
}

fn print_object(catalog: &Catalog, ident: &SqlIdentifier) -> bool {
    let mut found = false;
    if let Some(r) = catalog.get_relation_by_name(ident) {
        print!("{}", catalog.describe_relation(r));
        found = true;
    }
    for f in catalog.get_functions(ident) {
        println!("function {}", catalog.describe_function(f));
        found = true;
    }
    found
}

// Hide the password part of a URL-style connection string.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            let creds = &url[scheme + 3..at];
            match creds.find(':') {
                Some(colon) => format!("{}{}:***{}", &url[..scheme + 3], &creds[..colon], &url[at..]),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}
