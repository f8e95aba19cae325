//! Shared catalog holder. A refresh builds a complete new catalog off-lock and
//! swaps it in; readers keep whatever `Arc` they already cloned.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use super::raw::RawSnapshot;
use super::Catalog;
use crate::error::CatalogResult;

struct Current {
    catalog: Arc<Catalog>,
    generation: u64,
}

#[derive(Clone)]
pub struct CatalogHandle(Arc<RwLock<Current>>);

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        CatalogHandle(Arc::new(RwLock::new(Current { catalog: Arc::new(catalog), generation: 1 })))
    }

    pub fn build(snapshot: RawSnapshot) -> CatalogResult<Self> {
        Ok(Self::new(Catalog::build(snapshot)?))
    }

    pub fn current(&self) -> Arc<Catalog> { Arc::clone(&self.0.read().catalog) }

    /// Incremented on every successful swap.
    pub fn generation(&self) -> u64 { self.0.read().generation }

    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        let catalog = Arc::new(catalog);
        let mut cur = self.0.write();
        cur.catalog = Arc::clone(&catalog);
        cur.generation += 1;
        info!(target: "pgrel::catalog", "catalog swapped in, generation {}", cur.generation);
        catalog
    }

    /// Build from `snapshot` and swap on success. On failure the previous
    /// catalog stays current and the error is returned.
    pub fn refresh_from(&self, snapshot: RawSnapshot) -> CatalogResult<Arc<Catalog>> {
        match Catalog::build(snapshot) {
            Ok(catalog) => Ok(self.replace(catalog)),
            Err(e) => {
                warn!(target: "pgrel::catalog", "catalog refresh failed, keeping generation {}: {}", self.generation(), e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::raw::RawType;

    fn snapshot(extra: Option<RawType>) -> RawSnapshot {
        let mut types = vec![RawType::new(23, "pg_catalog", "int4")];
        types.extend(extra);
        RawSnapshot { types, ..Default::default() }
    }

    #[test]
    fn refresh_swaps_on_success() {
        let handle = CatalogHandle::build(snapshot(None)).unwrap();
        let before = handle.current();
        let after = handle.refresh_from(snapshot(Some(RawType::new(25, "pg_catalog", "text")))).unwrap();
        assert_eq!(handle.generation(), 2);
        assert!(before.get_type(25).is_none());
        assert!(after.get_type(25).is_some());
        assert!(handle.current().get_type(25).is_some());
    }

    #[test]
    fn failed_refresh_keeps_previous_catalog() {
        let handle = CatalogHandle::build(snapshot(None)).unwrap();
        let broken = snapshot(Some(RawType::new(1007, "pg_catalog", "_int8").with_element(20)));
        assert!(handle.refresh_from(broken).is_err());
        assert_eq!(handle.generation(), 1);
        assert!(handle.current().get_type(23).is_some());
        assert!(handle.current().get_type(1007).is_none());
    }

    #[test]
    fn readers_on_other_threads_see_a_complete_catalog() {
        let handle = CatalogHandle::build(snapshot(None)).unwrap();
        let readers: Vec<_> = (0..4).map(|_| {
            let h = handle.clone();
            std::thread::spawn(move || h.current().get_type(23).map(|t| t.identifier.name.clone()))
        }).collect();
        handle.refresh_from(snapshot(Some(RawType::new(25, "pg_catalog", "text")))).unwrap();
        for r in readers {
            assert_eq!(r.join().unwrap().as_deref(), Some("int4"));
        }
    }
}
