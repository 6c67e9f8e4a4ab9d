use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::BridgeConfig;
use crate::govee::{self, Device, GoveeApi};
use crate::mqtt::MqttSink;
use crate::topics::Topics;

/// Shared application state, handed to every component.
pub struct AppState {
    pub config: BridgeConfig,
    pub topics: Topics,
    pub govee: Arc<dyn GoveeApi>,
    pub mqtt: Arc<dyn MqttSink>,
}

impl AppState {
    pub fn new(config: BridgeConfig, govee: Arc<dyn GoveeApi>, mqtt: Arc<dyn MqttSink>) -> Self {
        let topics = Topics::from_config(&config);
        Self {
            config,
            topics,
            govee,
            mqtt,
        }
    }
}

/// GET / response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListing {
    pub total_devices: usize,
    pub devices: Vec<DeviceSummary>,
}

#[derive(Debug, Serialize)]
pub struct DeviceSummary {
    pub name: String,
    pub model: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controllable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrievable: Option<bool>,
    pub capabilities: Value,
}

impl From<Device> for DeviceSummary {
    fn from(device: Device) -> Self {
        Self {
            name: device.device_name,
            model: device.sku,
            id: device.device,
            controllable: device.controllable,
            retrievable: device.retrievable,
            capabilities: device.capabilities,
        }
    }
}

impl DeviceListing {
    fn from_devices(devices: Vec<Device>) -> Self {
        let devices: Vec<DeviceSummary> = govee::eligible(devices)
            .into_iter()
            .map(DeviceSummary::from)
            .collect();
        Self {
            total_devices: devices.len(),
            devices,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(device_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET / returns the live device list straight from the Govee API
async fn device_status(
    State(app): State<Arc<AppState>>,
) -> Result<Json<DeviceListing>, (StatusCode, &'static str)> {
    match app.govee.list_devices().await {
        Ok(devices) => Ok(Json(DeviceListing::from_devices(devices))),
        Err(e) => {
            tracing::error!("Error fetching Govee devices: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error fetching Govee devices",
            ))
        }
    }
}
