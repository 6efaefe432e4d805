use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlayerConfig {
    /// Volume given to players created without an explicit one.
    #[serde(default = "default_volume")]
    pub default_volume: u16,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
        }
    }
}

fn default_volume() -> u16 {
    100
}
