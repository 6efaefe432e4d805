use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for one backend node.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NodeConfig {
    #[serde(default = "default_identifier")]
    pub identifier: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default)]
    pub secure: bool,
    /// Connection attempts before the node gives up for good.
    #[serde(default = "default_retry_amount")]
    pub retry_amount: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// `0` disables the heartbeat.
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            identifier: default_identifier(),
            host: default_host(),
            port: default_port(),
            password: default_password(),
            secure: false,
            retry_amount: default_retry_amount(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            ping_interval_ms: default_ping_interval_ms(),
        }
    }
}

impl NodeConfig {
    pub fn ws_url(&self) -> String {
        format!(
            "ws{}://{}:{}/",
            if self.secure { "s" } else { "" },
            self.host,
            self.port
        )
    }

    pub fn rest_url(&self, path: &str) -> String {
        format!(
            "http{}://{}:{}/{}",
            if self.secure { "s" } else { "" },
            self.host,
            self.port,
            path.trim_start_matches('/')
        )
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_ms > 0).then(|| Duration::from_millis(self.ping_interval_ms))
    }
}

fn default_identifier() -> String {
    "default".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_password() -> String {
    "SwagLordNitroUser12345".to_string()
}

fn default_retry_amount() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    30_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_ping_interval_ms() -> u64 {
    10_000
}
