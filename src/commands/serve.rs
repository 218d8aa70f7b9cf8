//! Serve command - Starts the HTTP server.
//!
//! In outbox mode the relay runs as a background task in the same process
//! unless `--no-relay` is given; both stop on the same shutdown signal.

use std::sync::Arc;

use tokio::sync::watch;

use crate::api::{create_router, AppState};
use crate::cli::args::ServeArgs;
use crate::config::{Config, DeliveryMode};
use crate::errors::{AppError, AppResult};
use crate::infra::{Database, KafkaPublisher, MessagePublisher, Persistence};
use crate::jobs::OutboxRelay;

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: Config) -> AppResult<()> {
    let config = apply_overrides(config, &args);
    tracing::info!(mode = %config.delivery_mode, "Starting server...");

    // Store is required at startup; the broker connects lazily
    let db = Arc::new(Database::connect(&config).await.map_err(|e| {
        AppError::internal(format!("Failed to connect to database: {}", e))
    })?);

    let publisher: Arc<dyn MessagePublisher> = Arc::new(KafkaPublisher::new(&config));

    let app_state = AppState::from_config(db.clone(), publisher.clone(), &config);
    let app = create_router(app_state);

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let relay = if config.delivery_mode == DeliveryMode::Outbox && !args.no_relay {
        let relay = OutboxRelay::from_config(
            Arc::new(Persistence::new(db.get_connection())),
            publisher,
            &config,
        );
        Some(tokio::spawn(async move {
            relay
                .run(async move {
                    let _ = stop_rx.changed().await;
                })
                .await;
        }))
    } else {
        if config.delivery_mode == DeliveryMode::Outbox {
            tracing::warn!("Relay disabled; pending outbox entries wait for a `relay` process");
        }
        None
    };

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("Server running on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(super::shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)));

    let _ = stop_tx.send(true);
    if let Some(handle) = relay {
        if let Err(e) = handle.await {
            tracing::error!("Relay task failed: {}", e);
        }
    }

    tracing::info!("Server stopped");
    served
}

fn apply_overrides(mut config: Config, args: &ServeArgs) -> Config {
    if let Some(host) = &args.host {
        config.server_host = host.clone();
    }
    if let Some(port) = args.port {
        config.server_port = port;
    }
    if let Some(mode) = args.mode {
        config.delivery_mode = mode;
    }
    config
}
