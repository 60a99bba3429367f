use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier_api::background::event_consumer::{self, ConsumerConfig};
use courier_api::config::ServerConfig;
use courier_api::router::build_app_router;
use courier_api::state::AppState;
use courier_events::{AnyEventBus, BusSession};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "courier_api=debug,courier_events=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        environment = %config.events.environment,
        event_bus = %config.events.backend,
        "Loaded server configuration"
    );

    // --- Event bus ---
    // The session exits the bus on every return path below.
    let session = BusSession::enter(Arc::new(AnyEventBus::from_config(&config.events))).await?;
    let event_bus = Arc::clone(session.bus());
    tracing::info!("Event bus entered");

    // Spawn the event consumer (logs and acks every event).
    let consumer_cancel = CancellationToken::new();
    let consumer_config = ConsumerConfig {
        environment: config.events.environment,
        delivery: config.events.delivery(),
        restart_delay: Duration::from_secs(config.consumer_restart_delay_secs),
    };
    let consumer_handle = {
        let bus = Arc::clone(&event_bus);
        let cancel = consumer_cancel.clone();
        tokio::spawn(async move {
            event_consumer::run(bus.as_ref(), consumer_config, event_consumer::log_event, cancel)
                .await
        })
    };
    tracing::info!("Event consumer started");

    // --- App state ---
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let addr = SocketAddr::new(config.host.parse()?, config.port);
    let state = AppState {
        config: Arc::new(config),
        event_bus,
    };
    let app = build_app_router(state);

    // --- Start server ---
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    consumer_cancel.cancel();
    match tokio::time::timeout(shutdown_timeout, consumer_handle).await {
        Ok(Ok(failures)) => tracing::info!(failures, "Event consumer stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Event consumer task panicked"),
        Err(_) => tracing::warn!("Event consumer did not stop in time"),
    }

    session.close();
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
