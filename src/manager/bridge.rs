use async_trait::async_trait;
use serde_json::Value;

use crate::common::types::GuildId;

/// Outbound seam to the host's chat gateway. Voice state payloads requested
/// by a node are handed over here, unmodified.
#[async_trait]
pub trait VoiceBridge: Send + Sync {
    async fn on_data(&self, guild_id: GuildId, payload: Value);
}

#[async_trait]
impl<F> VoiceBridge for F
where
    F: Fn(GuildId, Value) + Send + Sync,
{
    async fn on_data(&self, guild_id: GuildId, payload: Value) {
        self(guild_id, payload)
    }
}
