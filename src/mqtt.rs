use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;

use crate::api::AppState;
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::{discovery, relay};

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const REQUEST_CAPACITY: usize = 100;

/// The part of an MQTT client the bridge uses.
#[async_trait]
pub trait MqttSink: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<()>;
    async fn subscribe(&self, topic: &str) -> Result<()>;
}

#[async_trait]
impl MqttSink for AsyncClient {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<()> {
        AsyncClient::publish(self, topic, QoS::AtMostOnce, retain, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<()> {
        AsyncClient::subscribe(self, topic, QoS::AtMostOnce).await?;
        Ok(())
    }
}

/// Connection options for the configured broker. Credentials are only set
/// when a user name is configured.
pub fn mqtt_options(config: &BridgeConfig) -> MqttOptions {
    let client_id = format!("govee-bridge-{}", uuid::Uuid::new_v4().simple());

    let mut opts = MqttOptions::new(client_id, config.broker.host.clone(), config.broker.port);
    opts.set_keep_alive(KEEP_ALIVE);
    if let Some(user) = &config.mqtt_user {
        opts.set_credentials(user.clone(), config.mqtt_pass.clone().unwrap_or_default());
    }
    opts
}

/// Create the client handle and its (not yet polled) event loop.
pub fn connect(config: &BridgeConfig) -> (AsyncClient, EventLoop) {
    AsyncClient::new(mqtt_options(config), REQUEST_CAPACITY)
}

/// Drive the broker connection forever.
///
/// Every CONNACK (first connect and each reconnect) re-runs discovery and
/// the command subscriptions; each inbound publish goes to [`dispatch`].
pub async fn run_event_loop(app: Arc<AppState>, mut eventloop: EventLoop) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                tracing::info!("Connected to MQTT broker ({:?})", ack.code);
                // Sync runs on its own task: the subscribe/publish requests it
                // queues only complete while this loop keeps polling.
                let app = app.clone();
                tokio::spawn(async move {
                    sync_devices(&app).await;
                });
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                dispatch(&app, &publish.topic, publish.payload.to_vec());
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(
                    "MQTT connection error: {}, reconnecting in {}s",
                    e,
                    RECONNECT_DELAY.as_secs()
                );
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// Announce devices to Home Assistant, then listen for their commands.
pub async fn sync_devices(app: &AppState) {
    discovery::publish_discovery(app).await;
    relay::subscribe_commands(app).await;
}

/// Route one inbound message. Command topics get their own relay task;
/// anything else is ignored.
pub fn dispatch(app: &Arc<AppState>, topic: &str, payload: Vec<u8>) -> Option<JoinHandle<()>> {
    tracing::debug!(
        "Received message on {}: {}",
        topic,
        String::from_utf8_lossy(&payload)
    );

    let sanitized_id = app.topics.parse_command(topic)?.to_string();
    let app = app.clone();
    Some(tokio::spawn(async move {
        relay::handle_command(&app, &sanitized_id, &payload).await;
    }))
}
