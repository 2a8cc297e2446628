//! Queue-agnostic message and batch types shared by the mover and every
//! [`QueueService`](crate::QueueService) implementation.

use std::collections::HashMap;

/// System attribute carrying the FIFO message group.
pub const GROUP_ID: &str = "MessageGroupId";

/// System attribute carrying the FIFO deduplication id.
pub const DEDUP_ID: &str = "MessageDeduplicationId";

/// Attribute name understood by the service as "every attribute".
pub const ALL_ATTRIBUTES: &str = "All";

/// Queue attribute holding the approximate number of visible messages.
pub const APPROXIMATE_NUMBER_OF_MESSAGES: &str = "ApproximateNumberOfMessages";

/// A user-defined message attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeValue {
    /// `String`, `Number`, `Binary`, optionally with a custom suffix
    pub data_type: String,
    pub string_value: Option<String>,
    pub binary_value: Option<Vec<u8>>,
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            data_type: "String".to_string(),
            string_value: Some(value.into()),
            binary_value: None,
        }
    }
}

/// A message as handed out by a receive call.
///
/// The receipt handle is only valid until the visibility timeout of the
/// receive that produced it runs out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Unique identifier assigned by the service
    pub id: String,
    pub body: String,
    /// Token needed to delete the message from the queue it was received from
    pub receipt_handle: String,
    /// System attributes, e.g. [`GROUP_ID`] and [`DEDUP_ID`]
    pub attributes: HashMap<String, String>,
    /// User attributes
    pub message_attributes: HashMap<String, AttributeValue>,
}

impl Message {
    pub fn group_id(&self) -> Option<&str> {
        self.attributes.get(GROUP_ID).map(String::as_str)
    }

    pub fn dedup_id(&self) -> Option<&str> {
        self.attributes.get(DEDUP_ID).map(String::as_str)
    }

    pub fn delete_entry(&self) -> DeleteEntry {
        DeleteEntry {
            id: self.id.clone(),
            receipt_handle: self.receipt_handle.clone(),
        }
    }
}

/// One entry of a send-batch request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundEntry {
    /// Batch-local id, the id of the source message
    pub id: String,
    pub body: String,
    pub message_attributes: HashMap<String, AttributeValue>,
    pub group_id: Option<String>,
    pub dedup_id: Option<String>,
}

/// One entry of a delete-batch request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteEntry {
    pub id: String,
    pub receipt_handle: String,
}

/// Per-entry failure reported by a batch operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedEntry {
    pub id: String,
    pub code: String,
    pub message: Option<String>,
    /// Whether the service blames the request rather than itself
    pub sender_fault: bool,
}

/// Reply of a send-batch or delete-batch call that reached the service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchResult {
    /// Ids of the entries the service accepted
    pub successful: Vec<String>,
    pub failed: Vec<FailedEntry>,
}

impl BatchResult {
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.id.as_str()).collect()
    }
}

/// Parameters of a single receive call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiveRequest {
    pub max_messages: usize,
    /// Seconds a received message stays hidden from other receivers
    pub visibility_timeout: u32,
    /// Long poll, in seconds
    pub wait_time: u32,
    /// System attributes to return with every message
    pub attribute_names: Vec<String>,
}
