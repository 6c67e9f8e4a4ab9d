use std::path::PathBuf;

/// Errors raised below `main`. Configuration variants are fatal at startup;
/// everything else is logged by the operation that hit it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("Govee API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Govee API returned HTTP {0}")]
    Status(u16),

    #[error("malformed Govee API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("MQTT client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),
}

pub type Result<T> = std::result::Result<T, Error>;
