//! MQTT topic layout
//!
//!   {discovery_prefix}/light/{topic_prefix}_{id}/config: retained discovery config
//!   {topic_prefix}/{id}/set: inbound ON/OFF commands
//!   {topic_prefix}/{id}/state: retained echoed state
//!
//! `{id}` is always the sanitized (colon-free) device address.

use crate::config::BridgeConfig;

#[derive(Debug, Clone)]
pub struct Topics {
    discovery_prefix: String,
    topic_prefix: String,
}

impl Topics {
    pub fn new(discovery_prefix: impl Into<String>, topic_prefix: impl Into<String>) -> Self {
        Self {
            discovery_prefix: discovery_prefix.into(),
            topic_prefix: topic_prefix.into(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(&config.discovery_prefix, &config.topic_prefix)
    }

    /// Discovery object id and `unique_id`, e.g. `govee_AABBCCDDEEFF`.
    pub fn unique_id(&self, sanitized_id: &str) -> String {
        format!("{}_{}", self.topic_prefix, sanitized_id)
    }

    pub fn discovery(&self, sanitized_id: &str) -> String {
        format!(
            "{}/light/{}/config",
            self.discovery_prefix,
            self.unique_id(sanitized_id)
        )
    }

    pub fn command(&self, sanitized_id: &str) -> String {
        format!("{}/{}/set", self.topic_prefix, sanitized_id)
    }

    pub fn state(&self, sanitized_id: &str) -> String {
        format!("{}/{}/state", self.topic_prefix, sanitized_id)
    }

    /// Extract the sanitized id from a `{topic_prefix}/{id}/set` topic.
    pub fn parse_command<'a>(&self, topic: &'a str) -> Option<&'a str> {
        let id = topic
            .strip_prefix(self.topic_prefix.as_str())?
            .strip_prefix('/')?
            .strip_suffix("/set")?;

        if id.is_empty() || id.contains('/') {
            None
        } else {
            Some(id)
        }
    }
}
