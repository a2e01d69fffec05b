use crate::discovery::builder::ServiceMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-shot "became stale" flag attached to a `ConfigSnapshot` (spec §4.F,
/// §9). No back-reference to the snapshot it belongs to — consumers that
/// want the newer snapshot call `SnapshotStore::get()` after the token
/// fires, which breaks what would otherwise be a cycle.
#[derive(Debug, Default)]
pub struct ChangeToken {
    stale: AtomicBool,
}

impl ChangeToken {
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub address: String,
    pub weight: u32,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub cluster_id: String,
    pub service_name: String,
    pub load_balancing_policy: String,
    /// `destinationId -> Destination`, ordered for deterministic iteration.
    pub destinations: BTreeMap<String, Destination>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub route_id: String,
    pub cluster_id: String,
    pub path_match: String,
    pub protocol: String,
}

/// Immutable `(Routes, Clusters)` pair plus its `ChangeToken` (spec §3).
/// Once published, never mutated.
pub struct ConfigSnapshot {
    pub routes: Vec<Route>,
    pub clusters: Vec<Cluster>,
    pub token: Arc<ChangeToken>,
}

impl ConfigSnapshot {
    pub fn empty() -> Self {
        Self {
            routes: Vec::new(),
            clusters: Vec::new(),
            token: Arc::new(ChangeToken::default()),
        }
    }

    /// Marks this snapshot's token stale — called by the store exactly once,
    /// at the moment a newer snapshot replaces this one.
    pub(crate) fn invalidate(&self) {
        self.token.mark_stale();
    }
}

fn route_path(
    service_name: &str,
    instances: &[crate::discovery::builder::ServiceInstance],
    override_path: Option<&str>,
) -> String {
    if let Some(p) = override_path {
        return p.to_string();
    }
    if let Some(first) = instances.first() {
        if !first.path_prefix.is_empty() {
            return format!("{}/{{**catch-all}}", first.path_prefix);
        }
    }
    format!("/api/{}/{{**catch-all}}", service_name)
}

/// Builds the route table from a `ServiceMap` (spec §3 Route resolution).
pub fn build_routes(
    map: &ServiceMap,
    service_route_mappings: &std::collections::HashMap<String, String>,
) -> Vec<Route> {
    map.iter()
        .map(|(name, instances)| {
            let protocol = instances
                .first()
                .map(|i| i.protocol.clone())
                .unwrap_or_else(|| "http".to_string());
            Route {
                route_id: format!("route-{}", name),
                cluster_id: format!("cluster-{}", name),
                path_match: route_path(name, instances, service_route_mappings.get(name).map(|s| s.as_str())),
                protocol,
            }
        })
        .collect()
}

/// Builds upstream clusters from a `ServiceMap` (spec §3 Cluster).
pub fn build_clusters(map: &ServiceMap) -> Vec<Cluster> {
    map.iter()
        .map(|(name, instances)| {
            let mut destinations = BTreeMap::new();
            for inst in instances {
                let destination_id =
                    format!("{}-{}-{}-{}", name, inst.address, inst.port, inst.service_id);
                let address = format!("{}://{}:{}", inst.scheme, inst.address, inst.port);
                destinations.insert(
                    destination_id,
                    Destination {
                        address,
                        weight: inst.weight,
                        protocol: inst.protocol.clone(),
                    },
                );
            }
            Cluster {
                cluster_id: format!("cluster-{}", name),
                service_name: name.clone(),
                load_balancing_policy: "RoundRobin".to_string(),
                destinations,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::builder::ServiceInstance;

    fn instance(id: &str, addr: &str, port: u16, path_prefix: &str) -> ServiceInstance {
        ServiceInstance {
            service_id: id.to_string(),
            service_name: "weather".to_string(),
            address: addr.to_string(),
            port,
            tags: vec![],
            path_prefix: path_prefix.to_string(),
            weight: 1,
            scheme: "https".to_string(),
            protocol: "http".to_string(),
        }
    }

    #[test]
    fn test_build_routes_default_path() {
        let mut map = ServiceMap::new();
        map.insert("weather".to_string(), vec![instance("w1", "10.0.0.5", 8080, "")]);
        let routes = build_routes(&map, &Default::default());
        assert_eq!(routes[0].route_id, "route-weather");
        assert_eq!(routes[0].cluster_id, "cluster-weather");
        assert_eq!(routes[0].path_match, "/api/weather/{**catch-all}");
    }

    #[test]
    fn test_build_routes_path_prefix_override_via_meta() {
        let mut map = ServiceMap::new();
        map.insert(
            "weather".to_string(),
            vec![instance("w1", "10.0.0.5", 8080, "/v2/weather")],
        );
        let routes = build_routes(&map, &Default::default());
        assert_eq!(routes[0].path_match, "/v2/weather/{**catch-all}");
    }

    #[test]
    fn test_build_routes_explicit_mapping_wins() {
        let mut map = ServiceMap::new();
        map.insert(
            "weather".to_string(),
            vec![instance("w1", "10.0.0.5", 8080, "/v2/weather")],
        );
        let mut mappings = std::collections::HashMap::new();
        mappings.insert("weather".to_string(), "/custom/weather".to_string());
        let routes = build_routes(&map, &mappings);
        assert_eq!(routes[0].path_match, "/custom/weather");
    }

    #[test]
    fn test_build_clusters_destination_id_and_address() {
        let mut map = ServiceMap::new();
        map.insert("weather".to_string(), vec![instance("w1", "10.0.0.5", 8080, "")]);
        let clusters = build_clusters(&map);
        let cluster = &clusters[0];
        assert_eq!(cluster.cluster_id, "cluster-weather");
        assert_eq!(cluster.load_balancing_policy, "RoundRobin");
        let dest = &cluster.destinations["weather-10.0.0.5-8080-w1"];
        assert_eq!(dest.address, "https://10.0.0.5:8080");
    }

    #[test]
    fn test_destination_ids_unique_within_cluster() {
        let mut map = ServiceMap::new();
        map.insert(
            "weather".to_string(),
            vec![
                instance("w1", "10.0.0.5", 8080, ""),
                instance("w2", "10.0.0.6", 8080, ""),
            ],
        );
        let clusters = build_clusters(&map);
        assert_eq!(clusters[0].destinations.len(), 2);
    }

    #[test]
    fn test_route_cluster_ids_unique_across_snapshot() {
        let mut map = ServiceMap::new();
        map.insert("weather".to_string(), vec![instance("w1", "10.0.0.5", 8080, "")]);
        map.insert("billing".to_string(), vec![instance("b1", "10.0.0.6", 8080, "")]);
        let routes = build_routes(&map, &Default::default());
        let clusters = build_clusters(&map);
        let mut route_ids: Vec<_> = routes.iter().map(|r| r.route_id.clone()).collect();
        route_ids.sort();
        route_ids.dedup();
        assert_eq!(route_ids.len(), routes.len());

        for r in &routes {
            assert!(clusters.iter().any(|c| c.cluster_id == r.cluster_id));
        }
    }
}
