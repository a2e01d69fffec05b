use crate::agent::RegistrationAgent;
use crate::config::GatewayConfig;
use crate::discovery::{ConsulClient, RegistryClient};
use crate::reconcile::reconciler;
use crate::resolver;
use crate::server;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// CLI arguments forwarded from `main()`.
pub struct BootstrapArgs {
    pub config_path: std::path::PathBuf,
    pub listen: String,
    pub admin_listen: String,
}

/// Gateway lifecycle: init → resolve → reconcile → serve → shutdown.
///
/// Shutdown ordering (spec §5): stop accepting new requests → deregister →
/// cancel reconciler → drain in-flight requests → exit.
pub async fn run(args: BootstrapArgs) -> Result<()> {
    init_tracing();

    let gateway_config = GatewayConfig::load(&args.config_path)?;
    let state = server::GatewayState::new(gateway_config);
    let shutdown = state.shutdown.clone();

    let client: Arc<dyn RegistryClient> = Arc::new(ConsulClient::new(
        &state.config.consul.address,
        Duration::from_secs(state.config.consul.health_check_timeout_seconds),
    ));
    let service_name = state.config.service_name();

    tracing::info!("server: starting gateway, listen={}", args.listen);
    let proxy_handle = tokio::spawn({
        let listen = args.listen.clone();
        let state = state.clone();
        let shutdown = shutdown.clone();
        async move { server::run_proxy_server(&listen, state, shutdown).await }
    });

    start_admin_server(&state, &args);

    // Registration happens only after the listener above is accepting, so
    // the registry's first health probe can succeed (spec §4.C). There is
    // no reliable "listener bound" signal from the spawned task without
    // extra plumbing, so a short settle delay stands in for it.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let bound_port: u16 = args
        .listen
        .rsplit(':')
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);
    let resolved = resolver::resolve(&state.config.consul, bound_port);
    let agent = Arc::new(RegistrationAgent::with_client(
        client.clone(),
        &state.config.consul,
        &service_name,
        &resolved,
    ));
    agent.start().await;

    let reconciler_handle = tokio::spawn({
        let client = client.clone();
        let allow_list = state.config.consul.service_names.clone();
        let mappings = state.config.consul.service_route_mappings.clone();
        let store = state.store.clone();
        let refresh_interval = Duration::from_secs(state.config.consul.refresh_interval_seconds);
        let shutdown = shutdown.clone();
        async move {
            reconciler::run(client, allow_list, mappings, store, refresh_interval, shutdown).await
        }
    });

    wait_for_shutdown(&shutdown).await;

    agent.stop().await;

    if let Err(e) = reconciler_handle.await {
        tracing::error!("reconciler task error: {}", e);
    }

    if let Err(e) = proxy_handle.await {
        tracing::error!("server: proxy task error: {}", e);
    }

    tracing::info!("server: shutdown complete");
    Ok(())
}

fn init_tracing() {
    let (non_blocking, _guard) = tracing_appender::non_blocking::NonBlockingBuilder::default()
        .buffered_lines_limit(128_000)
        .lossy(true)
        .finish(std::io::stdout());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .json(),
        )
        .init();

    std::mem::forget(_guard);
}

fn start_admin_server(state: &server::GatewayState, args: &BootstrapArgs) {
    let listen = args.admin_listen.clone();
    let state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = server::run_admin_server(&listen, state).await {
            tracing::error!("server: admin server error: {}", e);
        }
    });
}

async fn wait_for_shutdown(shutdown: &Arc<Notify>) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("server: received SIGINT, shutting down"),
        _ = terminate => tracing::info!("server: received SIGTERM, shutting down"),
    }

    shutdown.notify_waiters();
}
