use crate::reconcile::snapshot::{ConfigSnapshot, Route};
use arc_swap::ArcSwap;
use std::sync::Arc;

/// A `Route` compiled into its matchable path prefix.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pub route_id: String,
    pub cluster_id: String,
    pub protocol: String,
    prefix: String,
}

impl CompiledRoute {
    fn compile(route: &Route) -> Self {
        let prefix = route
            .path_match
            .strip_suffix("/{**catch-all}")
            .unwrap_or(&route.path_match)
            .to_string();
        Self {
            route_id: route.route_id.clone(),
            cluster_id: route.cluster_id.clone(),
            protocol: route.protocol.clone(),
            prefix,
        }
    }

    fn matches(&self, path: &str) -> bool {
        if self.prefix.is_empty() {
            return true;
        }
        path == self.prefix || path.starts_with(&format!("{}/", self.prefix))
    }
}

/// Flat set of compiled routes, matched by longest path-prefix (spec §3:
/// no host, method, or header concept — a single path-prefix pattern per
/// route).
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<CompiledRoute>>,
}

impl RouteTable {
    pub fn build(routes: &[Route]) -> Self {
        let mut compiled: Vec<Arc<CompiledRoute>> =
            routes.iter().map(|r| Arc::new(CompiledRoute::compile(r))).collect();
        compiled.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { routes: compiled }
    }

    /// Longest-prefix match; `None` if nothing matches.
    pub fn match_path(&self, path: &str) -> Option<Arc<CompiledRoute>> {
        self.routes.iter().find(|r| r.matches(path)).cloned()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Caches a compiled `RouteTable` derived from the current `ConfigSnapshot`,
/// rebuilding only when the snapshot pointer changes (mirrors
/// `ClusterStore::sync` in the upstream module).
pub struct RouteTableCache {
    table: ArcSwap<RouteTable>,
    last_synced: ArcSwap<Option<Arc<ConfigSnapshot>>>,
}

impl RouteTableCache {
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(RouteTable::default()),
            last_synced: ArcSwap::from_pointee(None),
        }
    }

    pub fn sync(&self, snapshot: &Arc<ConfigSnapshot>) {
        let last = self.last_synced.load_full();
        if let Some(prev) = &*last {
            if Arc::ptr_eq(prev, snapshot) {
                return;
            }
        }
        self.table.store(Arc::new(RouteTable::build(&snapshot.routes)));
        self.last_synced.store(Arc::new(Some(snapshot.clone())));
    }

    pub fn table(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }
}

impl Default for RouteTableCache {
    fn default() -> Self {
        Self::new()
    }
}
