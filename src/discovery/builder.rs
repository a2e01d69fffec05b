use crate::discovery::client::{ConsulServiceEntry, RegistryClient};
use crate::error::GatewayError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One healthy backend, normalized from registry metadata (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    pub service_id: String,
    pub service_name: String,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
    pub path_prefix: String,
    pub weight: u32,
    pub scheme: String,
    pub protocol: String,
}

/// Snapshot of the registry at one instant: `serviceName -> instances`,
/// each list ordered by `serviceId` ascending so diffs are deterministic.
pub type ServiceMap = BTreeMap<String, Vec<ServiceInstance>>;

fn derive_weight(meta: &std::collections::HashMap<String, String>) -> u32 {
    meta.get("weight")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(1)
}

fn derive_scheme(meta: &std::collections::HashMap<String, String>) -> String {
    match meta.get("scheme").map(|s| s.as_str()) {
        Some("http") => "http".to_string(),
        Some("https") => "https".to_string(),
        _ => "https".to_string(),
    }
}

fn derive_protocol(meta: &std::collections::HashMap<String, String>) -> String {
    match meta.get("protocol").map(|s| s.as_str()) {
        Some("grpc") => "grpc".to_string(),
        Some("websocket") => "websocket".to_string(),
        Some("tcp") => "tcp".to_string(),
        Some("udp") => "udp".to_string(),
        Some("http") => "http".to_string(),
        _ => "http".to_string(),
    }
}

fn to_instance(name: &str, entry: ConsulServiceEntry) -> ServiceInstance {
    let path_prefix = entry
        .meta
        .get("pathPrefix")
        .cloned()
        .unwrap_or_default();
    let weight = derive_weight(&entry.meta);
    let scheme = derive_scheme(&entry.meta);
    let protocol = derive_protocol(&entry.meta);

    ServiceInstance {
        service_id: entry.id,
        service_name: name.to_string(),
        address: entry.address,
        port: entry.port,
        tags: entry.tags,
        path_prefix,
        weight,
        scheme,
        protocol,
    }
}

/// Pure transformation from registry responses into a normalized
/// `ServiceMap` (spec §4.D). No caching, no side effects: every call fetches
/// fresh state from `client`.
pub async fn build_service_map(
    client: &Arc<dyn RegistryClient>,
    allow_list: &[String],
) -> Result<ServiceMap, GatewayError> {
    let names = client.list_service_names().await?;

    let mut map = ServiceMap::new();
    for name in names {
        if name.eq_ignore_ascii_case("consul") {
            continue;
        }
        if !allow_list.is_empty() && !allow_list.iter().any(|n| n == &name) {
            continue;
        }

        let entries = client.list_healthy_instances(&name).await?;
        if entries.is_empty() {
            continue;
        }

        let mut instances: Vec<ServiceInstance> = entries
            .into_iter()
            .map(|e| to_instance(&name, e))
            .collect();
        instances.sort_by(|a, b| a.service_id.cmp(&b.service_id));

        map.insert(name, instances);
    }

    Ok(map)
}
