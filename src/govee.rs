//! Govee cloud API client
//!
//! Two endpoints of the Govee OpenAPI router are used:
//! - `GET  /user/devices`: device list wrapped in `{code, message, data}`
//! - `POST /device/control`: capability control (only `powerSwitch` here)
//!
//! Both carry the static `Govee-API-Key` header. Nothing is cached; every
//! caller re-fetches what it needs.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Group and scene pseudo-devices that are never exposed.
pub const EXCLUDED_SKUS: [&str; 2] = ["BaseGroup", "DreamViewScenic"];

const API_KEY_HEADER: &str = "Govee-API-Key";
const ON_OFF_CAPABILITY: &str = "devices.capabilities.on_off";
const POWER_SWITCH_INSTANCE: &str = "powerSwitch";

/// A device as reported by `GET /user/devices`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Hardware address, e.g. `AA:BB:CC:DD:EE:FF:00:11`.
    pub device: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sku: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub device_name: String,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub controllable: Option<bool>,
    #[serde(default)]
    pub retrievable: Option<bool>,
    #[serde(default)]
    pub capabilities: Value,
}

/// The device list sometimes carries `null` names; treat them as empty.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Device {
    pub fn is_excluded(&self) -> bool {
        EXCLUDED_SKUS.contains(&self.sku.as_str())
    }

    /// Address with the colons removed, used in topics and unique ids.
    pub fn sanitized_id(&self) -> String {
        sanitize_id(&self.device)
    }
}

#[derive(Debug, Deserialize)]
struct DeviceListResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Vec<Device>>,
}

/// Body of `POST /device/control`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    pub request_id: String,
    pub payload: ControlPayload,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ControlPayload {
    pub sku: Option<String>,
    pub device: String,
    pub capability: Capability,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Capability {
    #[serde(rename = "type")]
    pub capability_type: String,
    pub instance: String,
    pub value: u8,
}

impl ControlRequest {
    /// Power switch command for one device. `requestId` is `mqtt-<unix ms>`.
    pub fn power(device: &str, sku: Option<String>, on: bool) -> Self {
        Self {
            request_id: format!("mqtt-{}", chrono::Utc::now().timestamp_millis()),
            payload: ControlPayload {
                sku,
                device: device.to_string(),
                capability: Capability {
                    capability_type: ON_OFF_CAPABILITY.to_string(),
                    instance: POWER_SWITCH_INSTANCE.to_string(),
                    value: u8::from(on),
                },
            },
        }
    }
}

/// Strip the colon separators from a hardware address.
pub fn sanitize_id(address: &str) -> String {
    address.replace(':', "")
}

/// Rebuild a hardware address from its sanitized form by joining
/// two-character chunks with colons. A trailing odd character is its own chunk.
pub fn restore_address(sanitized: &str) -> String {
    let chars: Vec<char> = sanitized.chars().collect();
    chars
        .chunks(2)
        .map(|pair| pair.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(":")
}

/// Drop the group/scene pseudo-devices.
pub fn eligible(devices: Vec<Device>) -> Vec<Device> {
    devices.into_iter().filter(|d| !d.is_excluded()).collect()
}

/// The two vendor calls the bridge makes.
#[async_trait]
pub trait GoveeApi: Send + Sync {
    /// Full device list, excluded SKUs included.
    async fn list_devices(&self) -> Result<Vec<Device>>;

    /// Send a control request and return the raw vendor response.
    async fn control(&self, request: &ControlRequest) -> Result<Value>;
}

/// `reqwest`-backed implementation against the Govee OpenAPI.
pub struct GoveeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoveeClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("govee-mqtt-bridge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    async fn read_json(resp: reqwest::Response) -> Result<Value> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status(status.as_u16()));
        }
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl GoveeApi for GoveeClient {
    async fn list_devices(&self) -> Result<Vec<Device>> {
        let url = format!("{}/user/devices", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let body = Self::read_json(resp).await?;
        parse_device_list(body)
    }

    async fn control(&self, request: &ControlRequest) -> Result<Value> {
        let url = format!("{}/device/control", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await?;

        Self::read_json(resp).await
    }
}

/// Unwrap the `{code, message, data}` envelope. A missing `data` array
/// means no devices.
fn parse_device_list(body: Value) -> Result<Vec<Device>> {
    let parsed: DeviceListResponse = serde_json::from_value(body)?;
    if parsed.data.is_none() {
        tracing::warn!(
            "Govee device list had no data (code {:?}: {})",
            parsed.code,
            parsed.message.as_deref().unwrap_or("no message")
        );
    }
    Ok(parsed.data.unwrap_or_default())
}
