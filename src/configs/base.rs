use serde::{Deserialize, Serialize};

use crate::{
    common::{NexlinkError, Result},
    configs::*,
};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_nodes")]
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub player: PlayerConfig,
    pub logging: Option<LoggingConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            player: PlayerConfig::default(),
            logging: None,
        }
    }
}

fn default_nodes() -> Vec<NodeConfig> {
    vec![NodeConfig::default()]
}

impl Config {
    /// Reads `config.toml`, falling back to `config.default.toml`.
    pub fn load() -> Result<Self> {
        let config_path = if std::path::Path::new("config.toml").exists() {
            "config.toml"
        } else if std::path::Path::new("config.default.toml").exists() {
            "config.default.toml"
        } else {
            return Err(NexlinkError::Config(
                "config.toml or config.default.toml not found".into(),
            ));
        };

        let config_str = std::fs::read_to_string(config_path)
            .map_err(|e| NexlinkError::Config(format!("{}: {}", config_path, e)))?;
        if config_str.trim().is_empty() {
            return Err(NexlinkError::Config(format!("{} is empty", config_path)));
        }

        Self::from_toml(&config_str)
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| NexlinkError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_one_default_node() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.nodes.len(), 1);

        let node = &config.nodes[0];
        assert_eq!(node.identifier, "default");
        assert_eq!(node.host, "localhost");
        assert_eq!(node.port, 3000);
        assert_eq!(node.retry_amount, 5);
        assert_eq!(node.retry_delay_ms, 30_000);
        assert_eq!(config.player.default_volume, 100);
        assert!(config.logging.is_none());
    }

    #[test]
    fn parses_multiple_nodes_and_logging() {
        let config = Config::from_toml(
            r#"
            [[nodes]]
            identifier = "eu"
            host = "eu.nexus.local"
            port = 4957
            password = "hunter2"
            secure = true
            retry_amount = 3
            retry_delay_ms = 500

            [[nodes]]
            identifier = "us"
            host = "us.nexus.local"

            [player]
            default_volume = 80

            [logging]
            level = "debug"
            filters = "nexlink::node=trace"
            "#,
        )
        .unwrap();

        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.nodes[0].identifier, "eu");
        assert!(config.nodes[0].secure);
        assert_eq!(config.nodes[0].retry_amount, 3);
        assert_eq!(config.nodes[0].ws_url(), "wss://eu.nexus.local:4957/");
        assert_eq!(config.nodes[1].port, 3000);
        assert_eq!(config.nodes[1].rest_url("api/player/1"), "http://us.nexus.local:3000/api/player/1");
        assert_eq!(config.player.default_volume, 80);
        assert_eq!(
            config.logging.unwrap().level.as_deref(),
            Some("debug")
        );
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        let err = Config::from_toml("nodes = 3").unwrap_err();
        assert!(err.is_configuration());
    }
}
