use crate::proxy::context::BoxBody;
use crate::reconcile::snapshot::ConfigSnapshot;
use crate::upstream::loadbalance::LoadBalancer;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Runtime per-cluster state: a round-robin balancer over the cluster's
/// current destinations (spec §3, §4.E).
pub struct Cluster {
    pub cluster_id: String,
    pub lb: LoadBalancer,
}

/// Caches `Cluster` runtimes derived from the current `ConfigSnapshot`, and
/// the shared HTTPS client used to reach upstream destinations. The
/// reverse-proxy data plane itself is out of scope (spec §1); this is a
/// minimal stand-in so the crate runs end-to-end.
pub struct ClusterStore {
    clusters: DashMap<String, Arc<Cluster>>,
    last_synced: ArcSwap<Option<Arc<ConfigSnapshot>>>,
    http_client: Client<HttpsConnector<HttpConnector>, BoxBody>,
}

impl ClusterStore {
    pub fn new() -> Self {
        Self {
            clusters: DashMap::new(),
            last_synced: ArcSwap::from_pointee(None),
            http_client: build_http_client(),
        }
    }

    pub fn http_client(&self) -> &Client<HttpsConnector<HttpConnector>, BoxBody> {
        &self.http_client
    }

    /// Rebuilds cluster runtimes from `snapshot` if it differs (by pointer
    /// identity) from the last snapshot synced. No-op otherwise, so calling
    /// this on every request is cheap in the steady state.
    pub fn sync(&self, snapshot: &Arc<ConfigSnapshot>) {
        let last = self.last_synced.load_full();
        if let Some(prev) = &*last {
            if Arc::ptr_eq(prev, snapshot) {
                return;
            }
        }

        let seen: HashSet<String> = snapshot
            .clusters
            .iter()
            .map(|c| c.cluster_id.clone())
            .collect();

        for cluster in &snapshot.clusters {
            self.clusters
                .entry(cluster.cluster_id.clone())
                .and_modify(|existing| existing.lb.update(cluster))
                .or_insert_with(|| {
                    Arc::new(Cluster {
                        cluster_id: cluster.cluster_id.clone(),
                        lb: LoadBalancer::from_cluster(cluster),
                    })
                });
        }
        self.clusters.retain(|id, _| seen.contains(id));

        self.last_synced.store(Arc::new(Some(snapshot.clone())));
    }

    pub fn get(&self, cluster_id: &str) -> Option<Arc<Cluster>> {
        self.clusters.get(cluster_id).map(|e| e.value().clone())
    }
}

impl Default for ClusterStore {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTPS-capable client pooled across all clusters. HTTP/2 negotiated via
/// ALPN for TLS upstreams; plain `http://` stays on HTTP/1.1.
fn build_http_client() -> Client<HttpsConnector<HttpConnector>, BoxBody> {
    let mut http = HttpConnector::new();
    http.set_nodelay(true);
    http.enforce_http(false);

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(http);

    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(90))
        .build(https)
}
