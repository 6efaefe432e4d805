use std::{sync::Weak, time::Duration};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::Node;
use crate::{common::types::now_ms, protocol::opcodes};

/// Sends a PING every `interval` until `cancel` fires or the node is gone.
pub(crate) fn spawn(node: Weak<Node>, interval: Duration, cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(node) = node.upgrade() else { break };
            match node.send(&opcodes::ping(now_ms())).await {
                Ok(true) => debug!("[{}] Heartbeat sent", node.identifier()),
                Ok(false) => break,
                Err(e) => warn!("[{}] Heartbeat failed: {}", node.identifier(), e),
            }
        }
    });
}
