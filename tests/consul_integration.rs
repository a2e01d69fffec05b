//! Integration tests for the Consul discovery client.
//!
//! These tests require Docker (via testcontainers) and start a real
//! Consul agent in dev mode.
//!
//! Run with: `cargo test --test consul_integration -- --ignored`

use std::time::Duration;
use warden_gateway::discovery::client::{CheckDefinition, ConsulClient, RegistrationRecord, RegistryClient};

use testcontainers::core::IntoContainerPort;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

async fn start_consul() -> (ConsulClient, ContainerAsync<GenericImage>) {
    let container = GenericImage::new("hashicorp/consul", "1.19")
        .with_exposed_port(8500_u16.tcp())
        .with_env_var("CONSUL_BIND_INTERFACE", "eth0")
        .with_cmd(vec!["agent", "-dev", "-client=0.0.0.0"])
        .start()
        .await
        .expect("failed to start consul container");

    let host = container.get_host().await.expect("get host");
    let port = container.get_host_port_ipv4(8500).await.expect("get port");
    let base_url = format!("http://{}:{}", host, port);

    let http = reqwest::Client::new();
    for _ in 0..30 {
        if let Ok(resp) = http.get(format!("{}/v1/status/leader", base_url)).send().await {
            if resp.status().is_success() {
                if resp.text().await.unwrap_or_default().len() > 2 {
                    break;
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    let client = ConsulClient::new(&base_url, Duration::from_secs(5));
    (client, container)
}

/// No TTL to pass in the HTTP-check model: Consul's own periodic poll of
/// `Check.HTTP` determines passing state. These registrations point the
/// check at a loopback port nothing is listening on, so the service is
/// registered but stays in `critical` for the passing-filtered query tests.
fn sample_registration(id: &str, name: &str, port: u16, meta: &[(&str, &str)]) -> RegistrationRecord {
    RegistrationRecord {
        id: id.to_string(),
        name: name.to_string(),
        address: "127.0.0.1".to_string(),
        port,
        tags: vec![],
        meta: meta.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        check: CheckDefinition {
            http: format!("http://127.0.0.1:{}/health", port),
            interval: "5s".to_string(),
            timeout: "2s".to_string(),
            deregister_after: "60s".to_string(),
            tls_skip_verify: true,
        },
    }
}

#[tokio::test]
#[ignore]
async fn test_consul_register_then_deregister() {
    let (client, _container) = start_consul().await;

    let reg = sample_registration("svc-1", "my-service", 8080, &[("version", "1.0")]);
    client.register(&reg).await.expect("register service");

    let names = client.list_service_names().await.expect("list service names");
    assert!(names.contains(&"my-service".to_string()));

    client.deregister("svc-1").await.expect("deregister");

    let names = client.list_service_names().await.expect("list service names after deregister");
    assert!(!names.contains(&"my-service".to_string()));
}

#[tokio::test]
#[ignore]
async fn test_consul_query_nonexistent_service_returns_empty() {
    let (client, _container) = start_consul().await;

    let nodes = client
        .list_healthy_instances("nonexistent-service")
        .await
        .expect("query nonexistent");
    assert_eq!(nodes.len(), 0);
}

#[tokio::test]
#[ignore]
async fn test_consul_unregistered_check_excludes_from_passing_query() {
    let (client, _container) = start_consul().await;

    let reg = sample_registration("unhealthy-svc", "unhealthy-service", 7070, &[]);
    client.register(&reg).await.unwrap();

    // The health check's HTTP target is unreachable, so the check stays
    // critical and the service never appears in the `?passing=true` query.
    let nodes = client
        .list_healthy_instances("unhealthy-service")
        .await
        .unwrap();
    assert_eq!(nodes.len(), 0, "unhealthy service should not be returned");

    client.deregister("unhealthy-svc").await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_consul_deregister_nonexistent_id_is_not_an_error() {
    let (client, _container) = start_consul().await;

    // Consul's deregister endpoint is idempotent: deregistering an unknown
    // ID returns 200, matching the gateway's non-blocking shutdown path.
    let result = client.deregister("never-registered").await;
    assert!(result.is_ok());
}
