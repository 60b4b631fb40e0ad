//! Aquanode device node.
//!
//! Runs the connectivity and registration handshake, then serves the
//! resource of the configured profile over HTTP.
//!
//! # Environment
//!
//! - `DEVICE_PROFILE`: `co2_dispenser` (default), `co2_dispenser_scaled` or
//!   `osmotic_water_tank`
//! - `CONTROLLER_URL`: base URL of the registration controller. Without it the
//!   node registers with itself (local-only mode).
//! - `BORDER_ROUTER_ADDR`: `host:port` probed for reachability. Without it the
//!   network is assumed up.
//! - `LISTEN_ADDR`: bind address for the resource binding
//! - `REFILL_HOLD_SECONDS`, `TICK_INTERVAL_SECONDS`: profile overrides

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aquanode_device::{
    AlwaysReachable, DeviceConfig, DeviceProfile, DeviceRuntime, HttpRegistrationClient,
    IndicatorSink, LifecycleController, NoopRegistrationClient, Reachability, RegistrationClient,
    TcpReachability, TracingIndicators,
};
use aquanode_gateway::{create_router, GatewayConfig, GatewayState};

/// Read an optional numeric override from the environment.
fn env_seconds(name: &str) -> Result<Option<u64>, Box<dyn std::error::Error>> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(
            value
                .parse()
                .map_err(|e| format!("{name} must be a whole number of seconds: {e}"))?,
        )),
        Err(_) => Ok(None),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aquanode=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Aquanode device");

    // Load configuration from environment
    let profile: DeviceProfile = std::env::var("DEVICE_PROFILE")
        .unwrap_or_else(|_| DeviceProfile::Co2Dispenser.as_str().into())
        .parse()?;
    let controller_url = std::env::var("CONTROLLER_URL").ok();
    let border_router = std::env::var("BORDER_ROUTER_ADDR").ok();

    let mut gateway_config = GatewayConfig::default();
    if let Ok(addr) = std::env::var("LISTEN_ADDR") {
        gateway_config.listen_addr = addr;
    }

    let mut config = DeviceConfig::for_profile(profile);
    if let Some(secs) = env_seconds("REFILL_HOLD_SECONDS")? {
        config.resource.refill_hold_seconds = secs;
    }
    if let Some(secs) = env_seconds("TICK_INTERVAL_SECONDS")? {
        config.resource.tick_interval_seconds = secs;
    }
    config.resource.validate()?;

    tracing::info!(
        profile = %profile,
        device = %config.identity,
        resource = %config.resource.path,
        listen_addr = %gateway_config.listen_addr,
        controller_url = ?controller_url,
        border_router = ?border_router,
        refill_hold_seconds = config.resource.refill_hold_seconds,
        tick_interval_seconds = config.resource.tick_interval_seconds,
        "Device configuration loaded"
    );

    let indicators: Arc<dyn IndicatorSink> = Arc::new(TracingIndicators);

    let reachability: Box<dyn Reachability> = if let Some(addr) = border_router {
        Box::new(TcpReachability::new(
            addr,
            config.lifecycle.registration_timeout(),
        ))
    } else {
        tracing::warn!("No BORDER_ROUTER_ADDR set - assuming the network is reachable");
        Box::new(AlwaysReachable)
    };

    let registration: Box<dyn RegistrationClient> = if let Some(url) = controller_url {
        tracing::info!(controller_url = %url, "Controller registration enabled");
        Box::new(HttpRegistrationClient::new(
            url,
            config.lifecycle.registration_timeout(),
        )?)
    } else {
        tracing::warn!("No CONTROLLER_URL set - running without a controller");
        Box::new(NoopRegistrationClient::new())
    };

    // Handshake: connectivity, then registration
    let mut controller = LifecycleController::new(
        config.identity.clone(),
        config.lifecycle.clone(),
        reachability,
        registration,
        Arc::clone(&indicators),
    );
    let report = controller.run().await?;
    tracing::info!(
        device = %report.device.identity,
        connectivity_polls = report.connectivity_polls,
        registration_attempts = report.registration_attempts,
        "Device operational"
    );

    // Resource runtime and its network binding
    let (handle, _runtime) = DeviceRuntime::spawn(config.resource, indicators);
    let listen_addr = gateway_config.listen_addr.clone();
    let state = GatewayState::new(handle, report.device, gateway_config);
    let app = create_router(state);

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
