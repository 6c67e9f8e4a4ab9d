mod api;
mod config;
mod discovery;
mod error;
mod govee;
mod mqtt;
mod relay;
#[cfg(test)]
mod testing;
mod topics;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use api::AppState;
use config::BridgeConfig;
use govee::GoveeClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,govee_mqtt_bridge=debug")),
        )
        .init();

    tracing::info!("Starting govee-mqtt-bridge v{}", env!("CARGO_PKG_VERSION"));

    let config_path = BridgeConfig::path_from_env();
    let config = match BridgeConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Error loading {}: {}", config_path.display(), e);
            std::process::exit(1);
        }
    };

    let govee = Arc::new(GoveeClient::new(
        config.govee_api_base.clone(),
        config.govee_api_key.clone(),
    )?);

    tracing::info!(
        "Connecting to MQTT broker at {}:{}",
        config.broker.host,
        config.broker.port
    );
    let (client, eventloop) = mqtt::connect(&config);

    let app_state = Arc::new(AppState::new(config, govee, Arc::new(client)));

    tokio::spawn(mqtt::run_event_loop(app_state.clone(), eventloop));

    let port = app_state.config.http_port;
    let app = api::router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Govee bridge status page at http://localhost:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
