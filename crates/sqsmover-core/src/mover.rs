//! One receive → send → delete cycle.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::MoverConfig;
use crate::error::MoveError;
use crate::message::{Message, ReceiveRequest, DEDUP_ID, GROUP_ID};
use crate::pack::BatchPacker;
use crate::queue::QueueService;

/// Outcome of a move cycle: how many messages were both sent to the
/// destination and deleted from the source, and the hard error that ended
/// the cycle early, if any.
#[derive(Debug, Default)]
pub struct MoveResult {
    pub moved: usize,
    pub error: Option<MoveError>,
}

impl MoveResult {
    fn done(moved: usize) -> Self {
        Self { moved, error: None }
    }

    fn failed(moved: usize, error: MoveError) -> Self {
        Self {
            moved,
            error: Some(error),
        }
    }
}

/// Moves messages from one queue URL to another, one receive at a time.
#[derive(Clone)]
pub struct BatchMover {
    service: Arc<dyn QueueService>,
    source_url: String,
    destination_url: String,
    packer: BatchPacker,
    receive: ReceiveRequest,
}

impl BatchMover {
    pub fn new(
        service: Arc<dyn QueueService>,
        source_url: impl Into<String>,
        destination_url: impl Into<String>,
        config: &MoverConfig,
    ) -> Self {
        Self {
            service,
            source_url: source_url.into(),
            destination_url: destination_url.into(),
            packer: BatchPacker::from_config(config),
            receive: ReceiveRequest {
                max_messages: config.max_per_read,
                visibility_timeout: seconds(config.visibility_timeout),
                wait_time: seconds(config.wait_time),
                attribute_names: vec![GROUP_ID.to_string(), DEDUP_ID.to_string()],
            },
        }
    }

    /// Receives up to `max_to_read` messages and moves them.
    ///
    /// `moved == 0` without an error means the receive came back empty.
    /// Entries the destination rejects stay in the source. A batch in which
    /// nothing was sent ends the cycle without an error.
    pub async fn move_batch(&self, max_to_read: usize) -> MoveResult {
        let request = ReceiveRequest {
            max_messages: max_to_read.min(self.receive.max_messages),
            ..self.receive.clone()
        };

        let messages = match self
            .service
            .receive_messages(&self.source_url, &request)
            .await
        {
            Ok(messages) => messages,
            Err(e) => return MoveResult::failed(0, MoveError::Receive(e)),
        };

        log::info!("received {} messages", messages.len());
        if messages.is_empty() {
            return MoveResult::done(0);
        }

        self.forward(&messages).await
    }

    async fn forward(&self, messages: &[Message]) -> MoveResult {
        let mut moved = 0;
        let mut pending = messages;

        while !pending.is_empty() {
            let (entries, rest) = self.packer.pack(pending);
            let batch = &pending[..entries.len()];
            let attempted = entries.len();

            let sent = match self
                .service
                .send_message_batch(&self.destination_url, entries)
                .await
            {
                Ok(result) => result,
                Err(e) => return MoveResult::failed(moved, MoveError::Send(e)),
            };

            let sent_messages = matched(batch, &sent.successful);
            if sent_messages.is_empty() {
                log::warn!(
                    "none of {attempted} messages were sent: {:?}",
                    sent.failed_ids()
                );
                break;
            }

            if !sent.failed.is_empty() {
                log::warn!(
                    "{}/{} messages failed to send: {:?}",
                    sent.failed.len(),
                    attempted,
                    sent.failed_ids()
                );
            }

            let deletes = sent_messages.iter().map(|m| m.delete_entry()).collect();
            let deleted = match self
                .service
                .delete_message_batch(&self.source_url, deletes)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    log::error!(
                        "{} messages were sent but not deleted from the source",
                        sent_messages.len()
                    );
                    return MoveResult::failed(
                        moved,
                        MoveError::Delete {
                            undeleted: sent_messages.len(),
                            source: e,
                        },
                    );
                }
            };

            if !deleted.failed.is_empty() {
                log::error!("{:?} messages not deleted", deleted.failed);
                let confirmed: HashSet<&str> =
                    deleted.successful.iter().map(String::as_str).collect();
                moved += sent_messages
                    .iter()
                    .filter(|m| confirmed.contains(m.id.as_str()))
                    .count();
                return MoveResult::failed(
                    moved,
                    MoveError::PartialDelete {
                        failed: deleted.failed,
                    },
                );
            }

            moved += sent_messages.len();
            pending = rest;
        }

        MoveResult::done(moved)
    }
}

/// Messages of `batch` whose id appears in `ids`, in batch order.
fn matched<'a>(batch: &'a [Message], ids: &[String]) -> Vec<&'a Message> {
    let ids: HashSet<&str> = ids.iter().map(String::as_str).collect();
    batch
        .iter()
        .filter(|m| ids.contains(m.id.as_str()))
        .collect()
}

fn seconds(duration: Duration) -> u32 {
    u32::try_from(duration.as_secs()).unwrap_or(u32::MAX)
}
