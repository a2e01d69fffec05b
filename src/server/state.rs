use crate::config::GatewayConfig;
use crate::metrics::Metrics;
use crate::routing::RouteTableCache;
use crate::store::SnapshotStore;
use crate::upstream::ClusterStore;
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared gateway state, cheaply cloneable — every field is `Arc`-backed.
/// Composed of the control-plane snapshot store and the minimal data-plane
/// caches derived from it.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub metrics: Metrics,
    pub store: Arc<SnapshotStore>,
    pub routing: Arc<RouteTableCache>,
    pub clusters: Arc<ClusterStore>,
    /// Signals the reconciler and registration agent to stop at their next
    /// suspension point (spec §5).
    pub shutdown: Arc<Notify>,
}

impl GatewayState {
    pub fn new(config: GatewayConfig) -> Self {
        let metrics = Metrics::install();

        Self {
            config: Arc::new(config),
            metrics,
            store: Arc::new(SnapshotStore::new()),
            routing: Arc::new(RouteTableCache::new()),
            clusters: Arc::new(ClusterStore::new()),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Current route/cluster counts, for the admin `/ready` and `/snapshot`
    /// endpoints.
    pub fn snapshot_counts(&self) -> (usize, usize) {
        let snap = self.store.get();
        (snap.routes.len(), snap.clusters.len())
    }
}
