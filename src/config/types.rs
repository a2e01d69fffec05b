use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Deserialize a `T` that implements `Default` — treats JSON/TOML `null`
/// (or a missing key) the same as `T::default()`. Use with:
///   `#[serde(default, deserialize_with = "deserialize_null_default")]`
fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Top-level gateway configuration. Only infrastructure settings live here —
/// the routing table itself is never configured locally, it is derived
/// entirely from the registry by the reconciler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub consul: ConsulConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsulConfig {
    /// Base URL of the registry, e.g. `http://localhost:8500`.
    #[serde(default = "default_consul_address")]
    pub address: String,

    /// Defaults to the process name (`CARGO_PKG_NAME`) when empty.
    #[serde(default)]
    pub service_name: String,

    /// Explicit `(address, port)` override for the Address Resolver
    /// (spec §4.B step 1). When unset, the resolver enumerates interfaces.
    #[serde(default)]
    pub service_address: Option<String>,
    #[serde(default)]
    pub service_port: Option<u16>,

    /// Prefixes or regexes used to choose among multiple non-loopback IPv4
    /// interfaces when `service_address` is unset.
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub preferred_networks: Vec<String>,

    #[serde(default)]
    pub path_prefix: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Scheme used when *registering* this process (spec §3: default
    /// `http` on the registration side, `https` on the discovery side).
    #[serde(default = "default_registration_scheme")]
    pub http_scheme: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub environment: String,

    #[serde(default = "default_health_check_path")]
    pub health_check_path: String,
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval_seconds: u64,
    #[serde(default = "default_health_check_timeout")]
    pub health_check_timeout_seconds: u64,
    #[serde(default = "default_deregister_after")]
    pub deregister_critical_service_after_seconds: u64,

    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub meta: HashMap<String, String>,

    /// Reconciler cadence (spec §4.E).
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,

    /// When non-empty, only these service names are discovered (spec §3).
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub service_names: Vec<String>,

    /// Explicit `serviceName -> routePath` overrides (spec §3, Route
    /// resolution rule 1).
    #[serde(default)]
    pub service_route_mappings: HashMap<String, String>,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: default_consul_address(),
            service_name: String::new(),
            service_address: None,
            service_port: None,
            preferred_networks: Vec::new(),
            path_prefix: String::new(),
            weight: default_weight(),
            http_scheme: default_registration_scheme(),
            protocol: default_protocol(),
            environment: String::new(),
            health_check_path: default_health_check_path(),
            health_check_interval_seconds: default_health_check_interval(),
            health_check_timeout_seconds: default_health_check_timeout(),
            deregister_critical_service_after_seconds: default_deregister_after(),
            tags: Vec::new(),
            meta: HashMap::new(),
            refresh_interval_seconds: default_refresh_interval(),
            service_names: Vec::new(),
            service_route_mappings: HashMap::new(),
        }
    }
}

fn default_consul_address() -> String {
    "http://localhost:8500".to_string()
}

fn default_weight() -> u32 {
    1
}

fn default_registration_scheme() -> String {
    "http".to_string()
}

fn default_protocol() -> String {
    "http".to_string()
}

fn default_health_check_path() -> String {
    "/health".to_string()
}

fn default_health_check_interval() -> u64 {
    10
}

fn default_health_check_timeout() -> u64 {
    5
}

fn default_deregister_after() -> u64 {
    30
}

fn default_refresh_interval() -> u64 {
    10
}

impl GatewayConfig {
    /// Effective service name: configured value, or the binary's own name.
    pub fn service_name(&self) -> String {
        if self.consul.service_name.is_empty() {
            env!("CARGO_PKG_NAME").to_string()
        } else {
            self.consul.service_name.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_config_defaults() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.consul.address, "http://localhost:8500");
        assert_eq!(cfg.consul.weight, 1);
        assert_eq!(cfg.consul.http_scheme, "http");
        assert_eq!(cfg.consul.protocol, "http");
        assert_eq!(cfg.consul.health_check_path, "/health");
        assert_eq!(cfg.consul.health_check_interval_seconds, 10);
        assert_eq!(cfg.consul.health_check_timeout_seconds, 5);
        assert_eq!(cfg.consul.deregister_critical_service_after_seconds, 30);
        assert_eq!(cfg.consul.refresh_interval_seconds, 10);
        assert!(cfg.consul.service_names.is_empty());
        assert!(cfg.consul.service_route_mappings.is_empty());
    }

    #[test]
    fn test_service_name_falls_back_to_package_name() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.service_name(), env!("CARGO_PKG_NAME"));
    }

    #[test]
    fn test_consul_config_full_toml() {
        let toml_str = r#"
            [consul]
            address = "http://consul.internal:8500"
            service_name = "weather"
            service_address = "10.0.0.5"
            service_port = 9000
            preferred_networks = ["10.0.", "^192\\.168\\."]
            path_prefix = "/v2/weather"
            weight = 5
            http_scheme = "https"
            protocol = "grpc"
            environment = "prod"
            health_check_path = "/healthz"
            health_check_interval_seconds = 5
            health_check_timeout_seconds = 2
            deregister_critical_service_after_seconds = 60
            tags = ["canary"]
            refresh_interval_seconds = 15
            service_names = ["weather", "forecast"]

            [consul.meta]
            region = "us-east-1"

            [consul.service_route_mappings]
            weather = "/custom/weather"
        "#;

        let cfg: GatewayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.consul.address, "http://consul.internal:8500");
        assert_eq!(cfg.consul.service_name, "weather");
        assert_eq!(cfg.consul.service_address, Some("10.0.0.5".to_string()));
        assert_eq!(cfg.consul.service_port, Some(9000));
        assert_eq!(cfg.consul.preferred_networks.len(), 2);
        assert_eq!(cfg.consul.path_prefix, "/v2/weather");
        assert_eq!(cfg.consul.weight, 5);
        assert_eq!(cfg.consul.http_scheme, "https");
        assert_eq!(cfg.consul.protocol, "grpc");
        assert_eq!(cfg.consul.meta["region"], "us-east-1");
        assert_eq!(
            cfg.consul.service_route_mappings["weather"],
            "/custom/weather"
        );
        assert_eq!(cfg.consul.service_names, vec!["weather", "forecast"]);
    }

    #[test]
    fn test_null_preferred_networks_defaults_to_empty() {
        let json = r#"{"consul": {"preferred_networks": null}}"#;
        let cfg: GatewayConfig = serde_json::from_str(json).unwrap();
        assert!(cfg.consul.preferred_networks.is_empty());
    }
}
