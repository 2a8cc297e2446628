//! Size-bounded packing of received messages into send-batch requests.

use crate::config::MoverConfig;
use crate::message::{Message, OutboundEntry};

/// Splits received messages into send-batch requests that stay under a byte
/// budget and the per-request entry limit.
#[derive(Clone, Debug)]
pub struct BatchPacker {
    byte_budget: usize,
    max_entries: usize,
    default_group_id: Option<String>,
}

impl BatchPacker {
    pub fn new(byte_budget: usize, max_entries: usize) -> Self {
        Self {
            byte_budget,
            max_entries: max_entries.max(1),
            default_group_id: None,
        }
    }

    pub fn from_config(config: &MoverConfig) -> Self {
        Self {
            default_group_id: config.default_group_id.clone(),
            ..Self::new(config.byte_budget, config.max_per_read)
        }
    }

    /// Takes the longest prefix of `messages` that fits the budget and returns
    /// it as outbound entries, together with the messages left over.
    ///
    /// The first message is always taken, even when its body alone is over
    /// budget, so an oversized message cannot stall the caller; the service
    /// gets to reject it instead. Given a non-empty slice the batch is never
    /// empty.
    pub fn pack<'a>(&self, messages: &'a [Message]) -> (Vec<OutboundEntry>, &'a [Message]) {
        let mut used = 0;
        let mut taken = 0;

        for message in messages {
            if taken == self.max_entries {
                break;
            }

            used += message.body.len();
            if used > self.byte_budget && taken > 0 {
                break;
            }

            taken += 1;
        }

        let (batch, rest) = messages.split_at(taken);
        let entries = batch.iter().map(|m| self.entry(m)).collect();
        (entries, rest)
    }

    fn entry(&self, message: &Message) -> OutboundEntry {
        let group_id = message
            .group_id()
            .map(str::to_string)
            .or_else(|| self.default_group_id.clone());

        OutboundEntry {
            id: message.id.clone(),
            body: message.body.clone(),
            message_attributes: message.message_attributes.clone(),
            group_id,
            dedup_id: message.dedup_id().map(str::to_string),
        }
    }
}
