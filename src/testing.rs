//! Recording fakes for the Govee API and the MQTT client.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::AppState;
use crate::config::test_config;
use crate::error::{Error, Result};
use crate::govee::{ControlRequest, Device, GoveeApi};
use crate::mqtt::MqttSink;

pub fn device(address: &str, sku: &str, name: &str) -> Device {
    Device {
        device: address.to_string(),
        sku: sku.to_string(),
        device_name: name.to_string(),
        device_type: Some("devices.types.light".to_string()),
        controllable: None,
        retrievable: None,
        capabilities: json!([{"type": "devices.capabilities.on_off", "instance": "powerSwitch"}]),
    }
}

pub struct FakeGovee {
    devices: Option<Vec<Device>>,
    fail_control: bool,
    pub list_calls: Mutex<usize>,
    pub controls: Mutex<Vec<ControlRequest>>,
}

impl FakeGovee {
    pub fn with_devices(devices: Vec<Device>) -> Self {
        Self {
            devices: Some(devices),
            fail_control: false,
            list_calls: Mutex::new(0),
            controls: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails as if the API returned HTTP 502.
    pub fn failing() -> Self {
        Self {
            devices: None,
            fail_control: true,
            ..Self::with_devices(Vec::new())
        }
    }

    pub fn failing_control(devices: Vec<Device>) -> Self {
        Self {
            fail_control: true,
            ..Self::with_devices(devices)
        }
    }

    pub fn controls(&self) -> Vec<ControlRequest> {
        self.controls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GoveeApi for FakeGovee {
    async fn list_devices(&self) -> Result<Vec<Device>> {
        *self.list_calls.lock().unwrap() += 1;
        self.devices.clone().ok_or(Error::Status(502))
    }

    async fn control(&self, request: &ControlRequest) -> Result<Value> {
        self.controls.lock().unwrap().push(request.clone());
        if self.fail_control {
            Err(Error::Status(502))
        } else {
            Ok(json!({"code": 200, "msg": "success"}))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

#[derive(Default)]
pub struct RecordingMqtt {
    fail_subscribe: HashSet<String>,
    pub published: Mutex<Vec<Published>>,
    pub subscribed: Mutex<Vec<String>>,
}

impl RecordingMqtt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscriptions to these topics are rejected.
    pub fn rejecting(topics: &[&str]) -> Self {
        Self {
            fail_subscribe: topics.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn subscribed(&self) -> Vec<String> {
        self.subscribed.lock().unwrap().clone()
    }
}

#[async_trait]
impl MqttSink for RecordingMqtt {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<()> {
        self.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            payload,
            retain,
        });
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<()> {
        if self.fail_subscribe.contains(topic) {
            return Err(Error::Mqtt(rumqttc::ClientError::Request(
                rumqttc::Request::Subscribe(rumqttc::Subscribe::new(topic, rumqttc::QoS::AtMostOnce)),
            )));
        }
        self.subscribed.lock().unwrap().push(topic.to_string());
        Ok(())
    }
}

pub fn make_app(
    govee: FakeGovee,
    mqtt: RecordingMqtt,
) -> (Arc<AppState>, Arc<FakeGovee>, Arc<RecordingMqtt>) {
    let govee = Arc::new(govee);
    let mqtt = Arc::new(mqtt);
    let app = Arc::new(AppState::new(test_config(), govee.clone(), mqtt.clone()));
    (app, govee, mqtt)
}
