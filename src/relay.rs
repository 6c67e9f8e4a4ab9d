//! Command relay: `govee/{id}/set` → Govee power switch → `govee/{id}/state`
//!
//! The state topic gets the raw command back once the control call returns,
//! whatever the vendor said. The echo is optimistic: there is no read-back
//! of the physical state.

use crate::api::AppState;
use crate::discovery::PAYLOAD_ON;
use crate::govee::{self, ControlRequest};

/// Subscribe to the command topic of every eligible device.
/// Returns the number of successful subscriptions.
pub async fn subscribe_commands(app: &AppState) -> usize {
    let devices = match app.govee.list_devices().await {
        Ok(devices) => devices,
        Err(e) => {
            tracing::error!("Error subscribing to device commands: {}", e);
            return 0;
        }
    };

    let mut subscribed = 0;
    for device in govee::eligible(devices) {
        let topic = app.topics.command(&device.sanitized_id());
        match app.mqtt.subscribe(&topic).await {
            Ok(()) => {
                tracing::info!("Subscribed to {}", topic);
                subscribed += 1;
            }
            Err(e) => tracing::error!("Failed to subscribe to {}: {}", topic, e),
        }
    }
    subscribed
}

/// Relay one inbound command for the device with the given sanitized id.
pub async fn handle_command(app: &AppState, sanitized_id: &str, payload: &[u8]) {
    let address = govee::restore_address(sanitized_id);
    let command = String::from_utf8_lossy(payload);
    let turn_on = command == PAYLOAD_ON;

    let sku = lookup_sku(app, &address).await;
    let request = ControlRequest::power(&address, sku, turn_on);

    tracing::info!("Sending command to Govee API: {} for device {}", command, address);
    match app.govee.control(&request).await {
        Ok(resp) => tracing::debug!(device = %address, "Govee API response: {}", resp),
        Err(e) => tracing::error!("Error controlling device {}: {}", address, e),
    }

    let state_topic = app.topics.state(sanitized_id);
    if let Err(e) = app.mqtt.publish(&state_topic, payload.to_vec(), true).await {
        tracing::error!("Failed to publish state to {}: {}", state_topic, e);
    }
}

/// The control endpoint wants the SKU, which the command topic doesn't carry.
/// A failed lookup still lets the command through with `sku: null`.
async fn lookup_sku(app: &AppState, address: &str) -> Option<String> {
    match app.govee.list_devices().await {
        Ok(devices) => {
            let sku = devices
                .into_iter()
                .find(|d| d.device == address)
                .map(|d| d.sku);
            if sku.is_none() {
                tracing::warn!("Device {} not in Govee device list, sending without SKU", address);
            }
            sku
        }
        Err(e) => {
            tracing::warn!("SKU lookup for {} failed, sending without SKU: {}", address, e);
            None
        }
    }
}
