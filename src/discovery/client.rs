use crate::error::GatewayError;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::time::Duration;

fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Raw instance as returned by `/v1/health/service/{name}?passing=true`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsulServiceEntry {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Service")]
    pub service: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "Tags", default, deserialize_with = "deserialize_null_default")]
    pub tags: Vec<String>,
    #[serde(
        rename = "Meta",
        default,
        deserialize_with = "deserialize_null_default"
    )]
    pub meta: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct HealthServiceEntry {
    #[serde(rename = "Service")]
    service: ConsulServiceEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckDefinition {
    #[serde(rename = "HTTP")]
    pub http: String,
    #[serde(rename = "Interval")]
    pub interval: String,
    #[serde(rename = "Timeout")]
    pub timeout: String,
    #[serde(rename = "DeregisterCriticalServiceAfter")]
    pub deregister_after: String,
    #[serde(rename = "TLSSkipVerify")]
    pub tls_skip_verify: bool,
}

/// Registration record published by the agent (spec.md §3).
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationRecord {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "Tags")]
    pub tags: Vec<String>,
    #[serde(rename = "Meta")]
    pub meta: HashMap<String, String>,
    #[serde(rename = "Check")]
    pub check: CheckDefinition,
}

/// Capability set exposed by the registry (spec.md §4.A, §9). Object-safe so
/// a `FakeRegistry` test double can stand in for `ConsulClient` in tests.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn register(&self, record: &RegistrationRecord) -> Result<(), GatewayError>;
    async fn deregister(&self, id: &str) -> Result<(), GatewayError>;
    async fn list_service_names(&self) -> Result<Vec<String>, GatewayError>;
    async fn list_healthy_instances(
        &self,
        name: &str,
    ) -> Result<Vec<ConsulServiceEntry>, GatewayError>;
}

/// Thin typed HTTP client over Consul's agent/catalog/health APIs.
/// Performs no retries — the caller decides (spec.md §4.A).
#[derive(Clone)]
pub struct ConsulClient {
    base_url: String,
    client: reqwest::Client,
}

impl ConsulClient {
    pub fn new(address: &str, timeout: Duration) -> Self {
        let base_url = address.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .expect("failed to build consul HTTP client");

        Self { base_url, client }
    }

    fn status_to_error(status: reqwest::StatusCode, body: String) -> GatewayError {
        GatewayError::Registry {
            status: status.as_u16(),
            body,
        }
    }
}

#[async_trait]
impl RegistryClient for ConsulClient {
    async fn register(&self, record: &RegistrationRecord) -> Result<(), GatewayError> {
        let url = format!("{}/v1/agent/service/register", self.base_url);
        let resp = self.client.put(&url).json(record).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::status_to_error(status, body));
        }
        Ok(())
    }

    async fn deregister(&self, id: &str) -> Result<(), GatewayError> {
        let url = format!("{}/v1/agent/service/deregister/{}", self.base_url, id);
        let resp = self.client.put(&url).send().await?;
        if !resp.status().is_success() && resp.status().as_u16() != 404 {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::status_to_error(status, body));
        }
        Ok(())
    }

    async fn list_service_names(&self) -> Result<Vec<String>, GatewayError> {
        let url = format!("{}/v1/catalog/services", self.base_url);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::status_to_error(status, body));
        }
        let services: HashMap<String, Vec<String>> = resp.json().await?;
        Ok(services.into_keys().collect())
    }

    async fn list_healthy_instances(
        &self,
        name: &str,
    ) -> Result<Vec<ConsulServiceEntry>, GatewayError> {
        let url = format!("{}/v1/health/service/{}?passing=true", self.base_url, name);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::status_to_error(status, body));
        }
        let raw: Vec<serde_json::Value> = resp.json().await?;

        let mut entries = Vec::with_capacity(raw.len());
        let mut dropped = 0usize;
        for value in raw {
            match serde_json::from_value::<HealthServiceEntry>(value) {
                Ok(entry) => entries.push(entry.service),
                Err(e) => {
                    dropped += 1;
                    tracing::debug!(service = %name, error = %e, "dropping malformed instance entry");
                }
            }
        }
        if dropped > 0 {
            let err = GatewayError::Data(format!(
                "dropped {} malformed instance(s) for service {}",
                dropped, name
            ));
            tracing::warn!(error = %err, "discovery: consul: malformed health entries");
        }
        Ok(entries)
    }
}
