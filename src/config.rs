//! Bridge configuration
//!
//! Read once at startup from a YAML file laid out like a Home Assistant
//! add-on options file:
//!
//! ```yaml
//! options:
//!   govee_api_key: "xxxxxxxx-xxxx"
//!   mqtt_broker: "mqtt://192.168.1.10:1883"
//!   mqtt_user: "hass"
//!   mqtt_pass: "secret"
//! ```
//!
//! The file path comes from `GOVEE_BRIDGE_CONFIG` (default `./config.yaml`).
//! Any problem here is fatal: `main` exits non-zero.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_PATH: &str = "./config.yaml";
pub const DEFAULT_BROKER: &str = "mqtt://localhost:1883";
pub const DEFAULT_HTTP_PORT: u16 = 30120;
pub const DEFAULT_DISCOVERY_PREFIX: &str = "homeassistant";
pub const DEFAULT_TOPIC_PREFIX: &str = "govee";
pub const DEFAULT_API_BASE: &str = "https://openapi.api.govee.com/router/api/v1";

const DEFAULT_MQTT_PORT: u16 = 1883;

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    options: Option<RawOptions>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOptions {
    #[serde(default)]
    govee_api_key: Option<String>,
    #[serde(default)]
    mqtt_broker: Option<String>,
    #[serde(default)]
    mqtt_user: Option<String>,
    #[serde(default)]
    mqtt_pass: Option<String>,
    #[serde(default)]
    http_port: Option<u16>,
    #[serde(default)]
    discovery_prefix: Option<String>,
    #[serde(default)]
    topic_prefix: Option<String>,
    #[serde(default)]
    govee_api_base: Option<String>,
}

/// Host and port of the MQTT broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddr {
    pub host: String,
    pub port: u16,
}

impl BrokerAddr {
    /// Parse `mqtt://host:port`, `tcp://host:port` or a bare `host[:port]`.
    /// IPv6 hosts must be bracketed: `mqtt://[::1]:1883`.
    pub fn parse(url: &str) -> Result<Self> {
        let rest = match url.split_once("://") {
            Some(("mqtt", rest)) | Some(("tcp", rest)) => rest,
            Some((scheme, _)) => {
                return Err(Error::Config(format!(
                    "unsupported MQTT broker scheme '{}' in {}",
                    scheme, url
                )))
            }
            None => url,
        };
        let rest = rest.trim_end_matches('/');

        let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
            // [v6-address] or [v6-address]:port
            let (host, tail) = bracketed.split_once(']').ok_or_else(|| {
                Error::Config(format!("unterminated IPv6 broker address in {}", url))
            })?;
            let port = match tail {
                "" => DEFAULT_MQTT_PORT,
                _ => match tail.strip_prefix(':') {
                    Some(port) => parse_port(port, url)?,
                    None => {
                        return Err(Error::Config(format!(
                            "unexpected '{}' after IPv6 broker address in {}",
                            tail, url
                        )))
                    }
                },
            };
            (host, port)
        } else {
            match rest.split_once(':') {
                Some((_, port)) if port.contains(':') => {
                    return Err(Error::Config(format!(
                        "IPv6 broker address must be bracketed, e.g. mqtt://[::1]:1883, got {}",
                        url
                    )))
                }
                Some((host, port)) => (host, parse_port(port, url)?),
                None => (rest, DEFAULT_MQTT_PORT),
            }
        };

        if host.is_empty() {
            return Err(Error::Config(format!("missing MQTT broker host in {}", url)));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

fn parse_port(port: &str, url: &str) -> Result<u16> {
    port.parse::<u16>()
        .map_err(|_| Error::Config(format!("invalid MQTT broker port '{}' in {}", port, url)))
}

/// Everything the bridge needs, validated.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub govee_api_key: String,
    pub broker: BrokerAddr,
    pub mqtt_user: Option<String>,
    pub mqtt_pass: Option<String>,
    pub http_port: u16,
    /// Root of the Home Assistant discovery namespace.
    pub discovery_prefix: String,
    /// Root of the per-device `set`/`state` topics.
    pub topic_prefix: String,
    pub govee_api_base: String,
}

impl BridgeConfig {
    /// Config file location, overridable via `GOVEE_BRIDGE_CONFIG`.
    pub fn path_from_env() -> PathBuf {
        std::env::var("GOVEE_BRIDGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents, path)
    }

    fn from_yaml(contents: &str, path: &Path) -> Result<Self> {
        let file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(contents).map_err(|source| Error::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?
        };
        Self::from_options(file.options.unwrap_or_default())
    }

    fn from_options(opts: RawOptions) -> Result<Self> {
        let govee_api_key = opts
            .govee_api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("govee_api_key is required".to_string()))?;

        let broker_url = opts.mqtt_broker.unwrap_or_else(|| DEFAULT_BROKER.to_string());
        let broker = BrokerAddr::parse(&broker_url)?;

        Ok(Self {
            govee_api_key,
            broker,
            mqtt_user: opts.mqtt_user,
            mqtt_pass: opts.mqtt_pass,
            http_port: opts.http_port.unwrap_or(DEFAULT_HTTP_PORT),
            discovery_prefix: opts
                .discovery_prefix
                .unwrap_or_else(|| DEFAULT_DISCOVERY_PREFIX.to_string()),
            topic_prefix: opts
                .topic_prefix
                .unwrap_or_else(|| DEFAULT_TOPIC_PREFIX.to_string()),
            govee_api_base: opts
                .govee_api_base
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        })
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> BridgeConfig {
    BridgeConfig {
        govee_api_key: "test-key".to_string(),
        broker: BrokerAddr {
            host: "localhost".to_string(),
            port: DEFAULT_MQTT_PORT,
        },
        mqtt_user: None,
        mqtt_pass: None,
        http_port: DEFAULT_HTTP_PORT,
        discovery_prefix: DEFAULT_DISCOVERY_PREFIX.to_string(),
        topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
        govee_api_base: DEFAULT_API_BASE.to_string(),
    }
}
