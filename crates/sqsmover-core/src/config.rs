use std::time::Duration;

use crate::error::MoveError;

/// Most messages a single receive or send-batch call may carry.
///
/// <https://docs.aws.amazon.com/AWSSimpleQueueService/latest/APIReference/API_ReceiveMessage.html>
pub const MAX_MESSAGES_PER_REQUEST: usize = 10;

/// Hard size limit of a send-batch request.
pub const MAX_PAYLOAD_SIZE: usize = 256 * 1024;

/// Room left in every batch for attributes and request metadata.
pub const ATTRIBUTE_OVERHEAD: usize = 10 * 1024;

/// Longest long poll the service accepts.
pub const MAX_WAIT_TIME: Duration = Duration::from_secs(20);

/// Longest visibility timeout the service accepts.
pub const MAX_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);

/// Settings of a migration run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoverConfig {
    /// Most messages to move, 0 moves everything
    pub limit: usize,
    /// Number of concurrent move loops, capped by the amount of work
    pub parallelism: usize,
    pub max_per_read: usize,
    /// Must cover a full receive, send and delete round trip; too short lets
    /// messages reappear in the source before they are deleted
    pub visibility_timeout: Duration,
    pub wait_time: Duration,
    /// Most body bytes per send-batch request
    pub byte_budget: usize,
    /// Group id given to messages that arrive without one
    pub default_group_id: Option<String>,
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            limit: 0,
            parallelism: 10,
            max_per_read: MAX_MESSAGES_PER_REQUEST,
            visibility_timeout: Duration::from_secs(60),
            wait_time: Duration::from_secs(10),
            byte_budget: MAX_PAYLOAD_SIZE - ATTRIBUTE_OVERHEAD,
            default_group_id: None,
        }
    }
}

impl MoverConfig {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn validate(&self) -> Result<(), MoveError> {
        if self.max_per_read == 0 || self.max_per_read > MAX_MESSAGES_PER_REQUEST {
            return Err(MoveError::InvalidConfig(format!(
                "max_per_read must be between 1 and {MAX_MESSAGES_PER_REQUEST}, got {}",
                self.max_per_read
            )));
        }
        if self.wait_time > MAX_WAIT_TIME {
            return Err(MoveError::InvalidConfig(format!(
                "wait_time must not exceed {}s, got {}s",
                MAX_WAIT_TIME.as_secs(),
                self.wait_time.as_secs()
            )));
        }
        if self.visibility_timeout > MAX_VISIBILITY_TIMEOUT {
            return Err(MoveError::InvalidConfig(format!(
                "visibility_timeout must not exceed {}s, got {}s",
                MAX_VISIBILITY_TIMEOUT.as_secs(),
                self.visibility_timeout.as_secs()
            )));
        }
        if self.byte_budget == 0 {
            return Err(MoveError::InvalidConfig(
                "byte_budget must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Workers worth spawning for `budget` messages: never more than there
    /// are reads to make, never zero.
    pub fn effective_parallelism(&self, budget: usize) -> usize {
        crate::distribute::effective_parallelism(budget, self.parallelism, self.max_per_read)
    }
}
