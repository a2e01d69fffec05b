use crate::config::ConsulConfig;
use regex::Regex;
use std::net::Ipv4Addr;

/// Externally reachable address this process should register under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub host: String,
    pub port: u16,
    pub scheme: String,
}

/// Determines the externally reachable `(host, port, scheme)` for the local
/// process (spec §4.B). `bound_port` is the port the HTTP listener actually
/// bound to (used when `Consul.ServicePort` is unset).
pub fn resolve(config: &ConsulConfig, bound_port: u16) -> ResolvedAddress {
    let scheme = config.http_scheme.clone();

    if let Some(addr) = &config.service_address {
        let host = if is_wildcard_host(addr) {
            pick_local_ip(&config.preferred_networks)
        } else {
            addr.clone()
        };
        let port = config.service_port.unwrap_or(bound_port);
        return ResolvedAddress { host, port, scheme };
    }

    let host = pick_local_ip(&config.preferred_networks);
    let port = config.service_port.unwrap_or(bound_port);
    ResolvedAddress { host, port, scheme }
}

fn is_wildcard_host(host: &str) -> bool {
    matches!(host, "*" | "+" | "0.0.0.0" | "localhost" | "127.0.0.1" | "::")
}

/// Enumerate operational IPv4 interfaces, skip loopbacks, and apply
/// `preferredNetworks` prefix/regex matching (spec §4.B step 2).
fn pick_local_ip(preferred_networks: &[String]) -> String {
    let candidates = non_loopback_ipv4_addrs();

    if candidates.is_empty() {
        tracing::warn!("no non-loopback IPv4 interface found, falling back to 127.0.0.1");
        return "127.0.0.1".to_string();
    }

    if preferred_networks.is_empty() {
        return candidates[0].to_string();
    }

    for candidate in &candidates {
        let s = candidate.to_string();
        for pattern in preferred_networks {
            if s.starts_with(pattern.as_str()) {
                return s;
            }
            if let Ok(re) = Regex::new(pattern) {
                if re.is_match(&s) {
                    return s;
                }
            }
        }
    }

    tracing::debug!("no interface matched preferredNetworks, falling back to first non-loopback IPv4");
    candidates[0].to_string()
}

fn non_loopback_ipv4_addrs() -> Vec<Ipv4Addr> {
    if let Ok(v) = std::env::var("MY_POD_IP").or_else(|_| std::env::var("POD_IP")).or_else(|_| std::env::var("HOST_IP")) {
        if let Ok(ip) = v.parse::<Ipv4Addr>() {
            if !ip.is_loopback() {
                return vec![ip];
            }
        }
    }

    let mut out = Vec::new();
    for iface in pnet_datalink::interfaces() {
        if !iface.is_up() || iface.is_loopback() {
            continue;
        }
        for ip_network in &iface.ips {
            if let ipnetwork::IpNetwork::V4(v4) = ip_network {
                let addr = v4.ip();
                if !addr.is_loopback() {
                    out.push(addr);
                }
            }
        }
    }
    out
}
