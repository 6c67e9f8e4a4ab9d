//! Home Assistant MQTT discovery announcements
//!
//! Publishes one retained `light` config per eligible Govee device to
//! `{discovery_prefix}/light/{topic_prefix}_{id}/config`, by default
//! `homeassistant/light/govee_{id}/config`. Entries are never withdrawn:
//! a device that disappears from the Govee account keeps its retained
//! config until someone clears it on the broker.

use serde::Serialize;

use crate::api::AppState;
use crate::govee::Device;
use crate::topics::Topics;

pub const PAYLOAD_ON: &str = "ON";
pub const PAYLOAD_OFF: &str = "OFF";
const MANUFACTURER: &str = "Govee";

/// Discovery payload for a `light` component.
#[derive(Debug, Serialize, PartialEq)]
pub struct LightConfig {
    pub name: String,
    pub unique_id: String,
    pub state_topic: String,
    pub command_topic: String,
    pub payload_on: &'static str,
    pub payload_off: &'static str,
    pub device: DeviceInfo,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DeviceInfo {
    pub identifiers: Vec<String>,
    pub name: String,
    pub model: String,
    pub manufacturer: &'static str,
}

impl LightConfig {
    pub fn for_device(device: &Device, topics: &Topics) -> Self {
        let id = device.sanitized_id();
        Self {
            name: device.device_name.clone(),
            unique_id: topics.unique_id(&id),
            state_topic: topics.state(&id),
            command_topic: topics.command(&id),
            payload_on: PAYLOAD_ON,
            payload_off: PAYLOAD_OFF,
            device: DeviceInfo {
                identifiers: vec![id],
                name: device.device_name.clone(),
                model: device.sku.clone(),
                manufacturer: MANUFACTURER,
            },
        }
    }
}

/// Fetch the device list and announce every eligible device.
/// Returns the number of discovery configs published.
pub async fn publish_discovery(app: &AppState) -> usize {
    let devices = match app.govee.list_devices().await {
        Ok(devices) => devices,
        Err(e) => {
            tracing::error!("Error publishing to Home Assistant: {}", e);
            return 0;
        }
    };

    let mut published = 0;
    for device in devices.iter().filter(|d| !d.is_excluded()) {
        let config = LightConfig::for_device(device, &app.topics);
        let topic = app.topics.discovery(&device.sanitized_id());

        let payload = match serde_json::to_vec(&config) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("Discovery: failed to encode config for {}: {}", device.device, e);
                continue;
            }
        };

        match app.mqtt.publish(&topic, payload, true).await {
            Ok(()) => {
                tracing::debug!("Discovery: announced {} ({}) on {}", config.name, device.sku, topic);
                published += 1;
            }
            Err(e) => tracing::warn!("Discovery: publish to {} failed: {}", topic, e),
        }
    }

    tracing::info!("Discovery: announced {} Govee device(s)", published);
    published
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{device, make_app, FakeGovee, RecordingMqtt};
    use serde_json::{json, Value};

    #[test]
    fn test_light_config_payload() {
        let topics = Topics::new("homeassistant", "govee");
        let lamp = device("AA:BB:CC:DD:EE:FF", "H6008", "Desk Lamp");

        let payload = serde_json::to_value(LightConfig::for_device(&lamp, &topics)).unwrap();
        assert_eq!(
            payload,
            json!({
                "name": "Desk Lamp",
                "unique_id": "govee_AABBCCDDEEFF",
                "state_topic": "govee/AABBCCDDEEFF/state",
                "command_topic": "govee/AABBCCDDEEFF/set",
                "payload_on": "ON",
                "payload_off": "OFF",
                "device": {
                    "identifiers": ["AABBCCDDEEFF"],
                    "name": "Desk Lamp",
                    "model": "H6008",
                    "manufacturer": "Govee"
                }
            })
        );
    }

    #[test]
    fn test_light_config_follows_topic_prefix() {
        let topics = Topics::new("discovery", "vendor");
        let lamp = device("AA:BB:CC:DD:EE:FF", "H6008", "Desk Lamp");

        let config = LightConfig::for_device(&lamp, &topics);
        assert_eq!(config.unique_id, "vendor_AABBCCDDEEFF");
        assert_eq!(config.command_topic, "vendor/AABBCCDDEEFF/set");
        assert_eq!(config.state_topic, "vendor/AABBCCDDEEFF/state");
        assert_eq!(topics.discovery("AABBCCDDEEFF"), "discovery/light/vendor_AABBCCDDEEFF/config");
    }

    #[tokio::test]
    async fn test_publish_skips_excluded() {
        let govee = FakeGovee::with_devices(vec![
            device("AA:BB:CC:DD:EE:01", "H6008", "Desk"),
            device("AA:BB:CC:DD:EE:02", "DreamViewScenic", "Scene"),
            device("AA:BB:CC:DD:EE:03", "BaseGroup", "Group"),
        ]);
        let (app, _, mqtt) = make_app(govee, RecordingMqtt::new());

        assert_eq!(publish_discovery(&app).await, 1);

        let published = mqtt.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "homeassistant/light/govee_AABBCCDDEE01/config");
        assert!(published[0].retain);

        let body: Value = serde_json::from_slice(&published[0].payload).unwrap();
        assert_eq!(body["name"], "Desk");
        assert_eq!(body["device"]["model"], "H6008");
    }

    #[tokio::test]
    async fn test_api_failure_publishes_nothing() {
        let (app, govee, mqtt) = make_app(FakeGovee::failing(), RecordingMqtt::new());

        assert_eq!(publish_discovery(&app).await, 0);
        assert!(mqtt.published().is_empty());
        assert_eq!(*govee.list_calls.lock().unwrap(), 1);
    }
}
