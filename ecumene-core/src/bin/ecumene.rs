//! Registry service binary
//!
//! Wires up the three service loops against one shared store and runs them
//! until interrupted. Startup is fail-fast: if any service cannot connect,
//! compile its script, or bind its socket, the process exits before
//! anything starts serving.

use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ecumene_core::service::{
    AssignmentConfig, AssignmentService, ExpirationConfig, ExpirationService, HeartbeatConfig,
    HeartbeatService,
};
use ecumene_core::{
    ShutdownSignal, DEFAULT_ASSIGNMENT_ADDR, DEFAULT_HEARTBEAT_ADDR, DEFAULT_STORE_URL,
    DEFAULT_SWEEP_PERIOD_SECS, DEFAULT_TTL_SECS,
};

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn env_secs(name: &str, default: u64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store_url = env_or("ECUMENE_STORE_URL", DEFAULT_STORE_URL);
    let assignment_addr = env_or("ECUMENE_ASSIGNMENT_ADDR", DEFAULT_ASSIGNMENT_ADDR);
    let heartbeat_addr = env_or("ECUMENE_HEARTBEAT_ADDR", DEFAULT_HEARTBEAT_ADDR);
    let ttl = env_secs("ECUMENE_TTL_SECS", DEFAULT_TTL_SECS);
    let period = env_secs("ECUMENE_SWEEP_PERIOD_SECS", DEFAULT_SWEEP_PERIOD_SECS);

    info!(store = %store_url, "starting ecumene registry");

    let expiration = ExpirationService::new(ExpirationConfig {
        store_url: store_url.clone(),
        ttl,
        period,
    })
    .await?;

    let heartbeat = HeartbeatService::new(HeartbeatConfig {
        store_url: store_url.clone(),
        listen_addr: heartbeat_addr,
    })
    .await?;

    let assignment = AssignmentService::new(AssignmentConfig {
        store_url,
        listen_addr: assignment_addr,
        ttl,
    })
    .await?;

    let shutdown = ShutdownSignal::new();
    let mut services = tokio::task::JoinSet::new();
    services.spawn(expiration.run(shutdown.subscribe()));
    services.spawn(heartbeat.run(shutdown.subscribe()));
    services.spawn(assignment.run(shutdown.subscribe()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
            shutdown.shutdown();
        }
        Some(result) = services.join_next() => {
            // A loop ended before shutdown was requested; only a fatal
            // store or socket failure does that.
            shutdown.shutdown();
            match result {
                Ok(Err(e)) => {
                    error!("service failed: {e}");
                    drain(&mut services).await;
                    return Err(e.into());
                }
                Err(e) => {
                    error!("service task panicked: {e}");
                    drain(&mut services).await;
                    return Err(e.into());
                }
                Ok(Ok(())) => {}
            }
        }
    }

    drain(&mut services).await;
    info!("all services stopped");
    Ok(())
}

async fn drain(
    services: &mut tokio::task::JoinSet<ecumene_core::error::Result<()>>,
) {
    while let Some(result) = services.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("service failed during shutdown: {e}"),
            Err(e) => error!("service task panicked: {e}"),
        }
    }
}
