use std::time::Duration;

use crate::configs::NodeConfig;

/// Close code reported when the socket dropped without a close frame.
pub const ABNORMAL_CLOSE: u16 = 1006;

/// Close code and reason a node sends when it is torn down on purpose.
pub const DESTROY_CODE: u16 = 1000;
pub const DESTROY_REASON: &str = "destroy";

/// A `(1000, "destroy")` close never schedules a reconnect.
pub fn is_deliberate_close(code: u16, reason: &str) -> bool {
    code == DESTROY_CODE && reason == DESTROY_REASON
}

/// What the reconnect timer should do once `retry_delay` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectStep {
    /// Try again; carries the attempt number about to be made.
    Retry(u32),
    /// Attempts are used up.
    GiveUp,
}

/// Fixed-delay reconnect policy with a bounded number of attempts.
///
/// `attempts` counts connection attempts already made for the current
/// outage, starting at 1 for the initial connect.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub retry_amount: u32,
    pub retry_delay: Duration,
}

impl ReconnectPolicy {
    pub fn from_config(config: &NodeConfig) -> Self {
        Self {
            retry_amount: config.retry_amount,
            retry_delay: config.retry_delay(),
        }
    }

    pub fn next(&self, attempts: u32) -> ReconnectStep {
        if attempts >= self.retry_amount {
            ReconnectStep::GiveUp
        } else {
            ReconnectStep::Retry(attempts + 1)
        }
    }
}
