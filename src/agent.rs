use crate::config::ConsulConfig;
use crate::discovery::client::{CheckDefinition, RegistrationRecord, RegistryClient};
use crate::error::GatewayError;
use crate::resolver::ResolvedAddress;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use uuid::Uuid;

const IDLE: u8 = 0;
const REGISTERED: u8 = 1;
const DEREGISTERING: u8 = 2;
const TERMINAL: u8 = 3;

/// Publishes this process's identity into the registry on startup and
/// retracts it on shutdown (spec §4.C). State machine:
/// `Idle -> Registered -> Deregistering -> Terminal`.
pub struct RegistrationAgent {
    client: Arc<dyn RegistryClient>,
    record: RegistrationRecord,
    state: AtomicU8,
}

impl RegistrationAgent {
    pub fn with_client(
        client: Arc<dyn RegistryClient>,
        config: &ConsulConfig,
        service_name: &str,
        resolved: &ResolvedAddress,
    ) -> Self {
        let record = build_record(config, service_name, resolved);
        Self {
            client,
            record,
            state: AtomicU8::new(IDLE),
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// `Idle -> Registered`. Must be called only after the HTTP listener is
    /// already accepting requests, so the registry's first health probe can
    /// succeed. On error, logs and stays `Idle` — no automatic retry.
    pub async fn start(&self) {
        match self.client.register(&self.record).await {
            Ok(()) => {
                self.state.store(REGISTERED, Ordering::SeqCst);
                metrics::counter!("gateway_registration_total", "result" => "ok").increment(1);
                tracing::info!(id = %self.record.id, name = %self.record.name, "registered with registry");
            }
            Err(e) => {
                metrics::counter!("gateway_registration_total", "result" => "error").increment(1);
                tracing::warn!(error = %e, "registration failed, service will not appear in the registry until a subsequent restart or manual re-register");
            }
        }
    }

    /// `Registered -> Deregistering -> Terminal`. Errors are logged but
    /// never block shutdown.
    pub async fn stop(&self) {
        if self.state.load(Ordering::SeqCst) != REGISTERED {
            self.state.store(TERMINAL, Ordering::SeqCst);
            return;
        }
        self.state.store(DEREGISTERING, Ordering::SeqCst);
        match self.client.deregister(&self.record.id).await {
            Ok(()) => {
                metrics::counter!("gateway_deregistration_total", "result" => "ok").increment(1);
            }
            Err(e) => {
                metrics::counter!("gateway_deregistration_total", "result" => "error").increment(1);
                tracing::warn!(error = %e, id = %self.record.id, "deregistration failed");
            }
        }
        self.state.store(TERMINAL, Ordering::SeqCst);
    }
}

fn build_record(
    config: &ConsulConfig,
    service_name: &str,
    resolved: &ResolvedAddress,
) -> RegistrationRecord {
    let id = format!(
        "{}-{}-{}-{:032x}",
        service_name,
        resolved.host,
        resolved.port,
        Uuid::new_v4().as_u128()
    );

    let mut meta: HashMap<String, String> = config.meta.clone();
    meta.insert("pathPrefix".to_string(), config.path_prefix.clone());
    meta.insert("weight".to_string(), config.weight.to_string());
    meta.insert("scheme".to_string(), resolved.scheme.clone());
    meta.insert("protocol".to_string(), config.protocol.clone());
    meta.insert("environment".to_string(), config.environment.clone());

    let check = CheckDefinition {
        http: format!(
            "{}://{}:{}{}",
            resolved.scheme, resolved.host, resolved.port, config.health_check_path
        ),
        interval: format!("{}s", config.health_check_interval_seconds),
        timeout: format!("{}s", config.health_check_timeout_seconds),
        deregister_after: format!("{}s", config.deregister_critical_service_after_seconds),
        tls_skip_verify: true,
    };

    RegistrationRecord {
        id,
        name: service_name.to_string(),
        address: resolved.host.clone(),
        port: resolved.port,
        tags: config.tags.clone(),
        meta,
        check,
    }
}
