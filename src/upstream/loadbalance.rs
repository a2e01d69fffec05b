pub mod round_robin;

use crate::reconcile::snapshot::Cluster;
use round_robin::RoundRobinBalancer;

/// A resolved destination ready for selection. Cheap to clone.
#[derive(Debug, Clone)]
pub struct UpstreamInstance {
    pub destination_id: String,
    pub address: String,
    pub weight: u32,
    pub protocol: String,
}

/// Wraps the single load-balancing policy supported in core (spec §3).
/// Kept as a thin struct rather than an enum since there is exactly one
/// policy to dispatch to.
pub struct LoadBalancer {
    inner: RoundRobinBalancer,
}

impl Default for LoadBalancer {
    fn default() -> Self {
        Self {
            inner: RoundRobinBalancer::new(),
        }
    }
}

impl LoadBalancer {
    pub fn from_cluster(cluster: &Cluster) -> Self {
        let lb = Self::default();
        lb.update(cluster);
        lb
    }

    pub fn update(&self, cluster: &Cluster) {
        let instances = cluster
            .destinations
            .iter()
            .map(|(id, dest)| UpstreamInstance {
                destination_id: id.clone(),
                address: dest.address.clone(),
                weight: dest.weight,
                protocol: dest.protocol.clone(),
            })
            .collect();
        self.inner.update_instances(instances);
    }

    pub fn select(&self) -> Option<UpstreamInstance> {
        self.inner.do_select()
    }

    pub fn instances(&self) -> Vec<UpstreamInstance> {
        self.inner.get_instances()
    }
}
