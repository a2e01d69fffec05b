use crate::discovery::builder::{build_service_map, ServiceMap};
use crate::discovery::client::RegistryClient;
use crate::reconcile::snapshot::{build_clusters, build_routes, ConfigSnapshot};
use crate::store::SnapshotStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// `lastMap != newMap` iff the set of service names differs, or any
/// service's instance count differs, or any service's sorted `serviceId`
/// list differs (spec §4.E). Metadata changes (weight, scheme, ...) within
/// an unchanged `serviceId` set do not trigger a rebuild.
fn maps_differ(last: &ServiceMap, new: &ServiceMap) -> bool {
    if last.len() != new.len() {
        return true;
    }
    for (name, new_instances) in new {
        match last.get(name) {
            None => return true,
            Some(last_instances) => {
                if last_instances.len() != new_instances.len() {
                    return true;
                }
                let last_ids: Vec<&str> = last_instances.iter().map(|i| i.service_id.as_str()).collect();
                let new_ids: Vec<&str> = new_instances.iter().map(|i| i.service_id.as_str()).collect();
                if last_ids != new_ids {
                    return true;
                }
            }
        }
    }
    false
}

/// Periodically rebuilds the `ServiceMap`, diffs against the previous tick,
/// and publishes a new `ConfigSnapshot` when it changed (spec §4.E). A
/// strictly sequential loop: overlapping ticks are impossible.
pub async fn run(
    client: Arc<dyn RegistryClient>,
    allow_list: Vec<String>,
    service_route_mappings: HashMap<String, String>,
    store: Arc<SnapshotStore>,
    refresh_interval: Duration,
    shutdown: Arc<Notify>,
) {
    let mut last_map: ServiceMap = ServiceMap::new();

    loop {
        tick(&client, &allow_list, &service_route_mappings, &store, &mut last_map).await;

        tokio::select! {
            _ = tokio::time::sleep(refresh_interval) => {}
            _ = shutdown.notified() => {
                tracing::info!("reconciler shutting down");
                return;
            }
        }
    }
}

pub async fn tick(
    client: &Arc<dyn RegistryClient>,
    allow_list: &[String],
    service_route_mappings: &HashMap<String, String>,
    store: &Arc<SnapshotStore>,
    last_map: &mut ServiceMap,
) {
    let new_map = match build_service_map(client, allow_list).await {
        Ok(m) => m,
        Err(e) => {
            metrics::counter!("gateway_reconcile_tick_total", "result" => "error").increment(1);
            tracing::warn!(error = %e, "reconcile tick failed, keeping previous snapshot");
            return;
        }
    };
    metrics::counter!("gateway_reconcile_tick_total", "result" => "ok").increment(1);

    if !maps_differ(last_map, &new_map) {
        return;
    }

    let routes = build_routes(&new_map, service_route_mappings);
    let clusters = build_clusters(&new_map);
    let route_count = routes.len();
    let cluster_count = clusters.len();
    let token = Default::default();
    store.publish(ConfigSnapshot {
        routes,
        clusters,
        token,
    });

    metrics::counter!("gateway_snapshot_publish_total").increment(1);
    metrics::gauge!("gateway_snapshot_routes").set(route_count as f64);
    metrics::gauge!("gateway_snapshot_clusters").set(cluster_count as f64);

    tracing::info!(services = new_map.len(), "published new config snapshot");
    *last_map = new_map;
}
