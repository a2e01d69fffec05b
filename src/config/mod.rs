pub mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use crate::error::GatewayError;
use std::path::Path;

impl GatewayConfig {
    /// Load configuration from a file (if it exists), apply environment
    /// variable overrides (spec §6), then validate. A missing file is not
    /// an error — the gateway starts with built-in defaults.
    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        let mut config: GatewayConfig = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| GatewayError::Config(format!("reading {}: {}", path.display(), e)))?;
            match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => toml::from_str(&content)
                    .map_err(|e| GatewayError::Config(format!("parsing toml: {}", e)))?,
                Some("json") => serde_json::from_str(&content)
                    .map_err(|e| GatewayError::Config(format!("parsing json: {}", e)))?,
                Some(ext) => {
                    return Err(GatewayError::Config(format!(
                        "unsupported config format: .{ext}, use .toml or .json"
                    )))
                }
                None => {
                    return Err(GatewayError::Config(
                        "config file has no extension, use .toml or .json".to_string(),
                    ))
                }
            }
        } else {
            tracing::info!(
                "config file not found at {}, using defaults",
                path.display()
            );
            GatewayConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        tracing::info!("loaded gateway configuration");
        Ok(config)
    }

    /// Apply `CONSUL_*` environment variable overrides (spec §6).
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CONSUL_ADDRESS") {
            self.consul.address = v;
        }
        if let Ok(v) = std::env::var("CONSUL_SERVICE_NAME") {
            self.consul.service_name = v;
        }
        if let Ok(v) = std::env::var("CONSUL_SERVICE_ADDRESS") {
            self.consul.service_address = Some(v);
        }
        if let Ok(v) = std::env::var("CONSUL_SERVICE_PORT") {
            if let Ok(n) = v.parse::<u16>() {
                self.consul.service_port = Some(n);
            }
        }
        if let Ok(v) = std::env::var("CONSUL_PREFERRED_NETWORKS") {
            self.consul.preferred_networks = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = std::env::var("CONSUL_PATH_PREFIX") {
            self.consul.path_prefix = v;
        }
        if let Ok(v) = std::env::var("CONSUL_WEIGHT") {
            if let Ok(n) = v.parse::<u32>() {
                self.consul.weight = n;
            }
        }
        if let Ok(v) = std::env::var("CONSUL_HTTP_SCHEME") {
            self.consul.http_scheme = v;
        }
        if let Ok(v) = std::env::var("CONSUL_PROTOCOL") {
            self.consul.protocol = v;
        }
        if let Ok(v) = std::env::var("CONSUL_HEALTH_CHECK_PATH") {
            self.consul.health_check_path = v;
        }
        if let Ok(v) = std::env::var("CONSUL_REFRESH_INTERVAL_SECONDS") {
            if let Ok(n) = v.parse::<u64>() {
                self.consul.refresh_interval_seconds = n;
            }
        }
        if let Ok(v) = std::env::var("CONSUL_SERVICE_NAMES") {
            self.consul.service_names = v.split(',').map(|s| s.trim().to_string()).collect();
        }
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if let Some(port) = self.consul.service_port {
            if port == 0 {
                return Err(GatewayError::Config(
                    "Consul.ServicePort must be in 1..65535".to_string(),
                ));
            }
        }
        if self.consul.address.is_empty()
            || !(self.consul.address.starts_with("http://")
                || self.consul.address.starts_with("https://"))
        {
            return Err(GatewayError::Config(format!(
                "invalid Consul.Address: {}",
                self.consul.address
            )));
        }
        match self.consul.http_scheme.as_str() {
            "http" | "https" => {}
            other => {
                return Err(GatewayError::Config(format!(
                    "unknown Consul.HttpScheme: {}",
                    other
                )))
            }
        }
        match self.consul.protocol.as_str() {
            "http" | "grpc" | "websocket" | "tcp" | "udp" => {}
            other => {
                return Err(GatewayError::Config(format!(
                    "unknown Consul.Protocol: {}",
                    other
                )))
            }
        }
        Ok(())
    }
}
