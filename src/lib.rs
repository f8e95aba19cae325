pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod ident;

pub use catalog::{Catalog, CatalogHandle, RawSnapshot};
pub use error::{CatalogError, CatalogResult};
pub use ident::SqlIdentifier;

/// Fetch a snapshot over `client` and resolve it in one step.
pub async fn introspect(client: &tokio_postgres::Client, opts: &fetch::FetchOptions) -> CatalogResult<Catalog> {
    let snapshot = fetch::fetch_snapshot(client, opts).await?;
    Catalog::build(snapshot)
}
