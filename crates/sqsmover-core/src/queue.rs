use std::collections::HashMap;

use crate::message::{BatchResult, DeleteEntry, Message, OutboundEntry, ReceiveRequest};

/// The five queue operations the mover relies on.
///
/// [`SqsQueue`](crate::SqsQueue) talks to AWS SQS,
/// [`MemoryQueueService`](crate::memory::MemoryQueueService) keeps everything
/// in process for tests.
#[async_trait::async_trait]
pub trait QueueService: Send + Sync {
    /// Maps a queue name to its URL.
    async fn resolve_queue_url(&self, name: &str) -> anyhow::Result<String>;

    /// Returns every attribute of the queue, keyed by attribute name.
    async fn queue_attributes(&self, url: &str) -> anyhow::Result<HashMap<String, String>>;

    /// Receives up to `request.max_messages` messages, hiding them from other
    /// receivers for the visibility timeout.
    async fn receive_messages(
        &self,
        url: &str,
        request: &ReceiveRequest,
    ) -> anyhow::Result<Vec<Message>>;

    /// Sends a batch. An `Err` means the call as a whole failed; rejected
    /// entries are reported in [`BatchResult::failed`].
    async fn send_message_batch(
        &self,
        url: &str,
        entries: Vec<OutboundEntry>,
    ) -> anyhow::Result<BatchResult>;

    /// Deletes a batch by receipt handle, same error split as
    /// [`send_message_batch`](Self::send_message_batch).
    async fn delete_message_batch(
        &self,
        url: &str,
        entries: Vec<DeleteEntry>,
    ) -> anyhow::Result<BatchResult>;
}
