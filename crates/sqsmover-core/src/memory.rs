//! In-process [`QueueService`] for tests and dry runs.
//!
//! Queues live in memory; received messages move to an in-flight set until
//! they are deleted or [`expire_in_flight`](MemoryQueueService::expire_in_flight)
//! makes them visible again. Faults can be injected per operation, and every
//! sent and deleted entry id is recorded so callers can check that each
//! message moved exactly once.

use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::{anyhow, bail};
use tokio::sync::Mutex;

use crate::message::{
    BatchResult, DeleteEntry, FailedEntry, Message, OutboundEntry, ReceiveRequest,
    ALL_ATTRIBUTES, APPROXIMATE_NUMBER_OF_MESSAGES, DEDUP_ID, GROUP_ID,
};
use crate::queue::QueueService;

const URL_PREFIX: &str = "memory://";

/// Counters and id logs of the calls made so far.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub resolve_calls: usize,
    pub attribute_calls: usize,
    pub receive_calls: usize,
    pub send_calls: usize,
    pub delete_calls: usize,
    /// Entry ids accepted by send calls, in order
    pub sent: Vec<String>,
    /// Entry ids confirmed by delete calls, in order
    pub deleted: Vec<String>,
}

#[derive(Debug, Default)]
struct Faults {
    /// 1-based receive call that fails
    receive_call: Option<usize>,
    fail_sends: bool,
    rejected_sends: HashSet<String>,
    fail_deletes: bool,
    rejected_deletes: HashSet<String>,
}

#[derive(Debug, Default)]
struct Queue {
    visible: VecDeque<Message>,
    in_flight: HashMap<String, Message>,
    /// Replaces the computed depth in attribute replies; `Some(None)` drops it
    reported_depth: Option<Option<String>>,
}

#[derive(Debug, Default)]
struct State {
    queues: HashMap<String, Queue>,
    faults: Faults,
    stats: Stats,
    next_id: usize,
    next_receipt: usize,
}

impl State {
    fn queue(&mut self, url: &str) -> anyhow::Result<&mut Queue> {
        self.queues
            .get_mut(url)
            .ok_or_else(|| anyhow!("queue {url} does not exist"))
    }

    fn message_id(&mut self) -> String {
        let id = format!("msg-{}", self.next_id);
        self.next_id += 1;
        id
    }
}

#[derive(Debug, Default)]
pub struct MemoryQueueService {
    state: Mutex<State>,
}

impl MemoryQueueService {
    pub fn new() -> Self {
        Self::default()
    }

    /// URL a queue named `name` gets from [`create_queue`](Self::create_queue).
    pub fn url(&self, name: &str) -> String {
        format!("{URL_PREFIX}{name}")
    }

    /// Creates an empty queue, or returns the URL of the existing one.
    pub async fn create_queue(&self, name: &str) -> String {
        let url = self.url(name);
        self.state
            .lock()
            .await
            .queues
            .entry(url.clone())
            .or_default();
        url
    }

    /// Adds `count` messages with ids `msg-<n>` and a small body.
    pub async fn seed(&self, url: &str, count: usize) {
        for _ in 0..count {
            let mut state = self.state.lock().await;
            let id = state.message_id();
            let body = format!("body of {id}");
            if let Ok(queue) = state.queue(url) {
                queue.visible.push_back(plain_message(id, body));
            }
        }
    }

    /// Adds one message with the given id and body.
    pub async fn push(&self, url: &str, id: &str, body: String) {
        self.push_message(url, plain_message(id.to_string(), body))
            .await;
    }

    pub async fn push_message(&self, url: &str, message: Message) {
        if let Ok(queue) = self.state.lock().await.queue(url) {
            queue.visible.push_back(message);
        }
    }

    /// Messages currently visible in the queue.
    pub async fn messages(&self, url: &str) -> Vec<Message> {
        self.state
            .lock()
            .await
            .queues
            .get(url)
            .map(|q| q.visible.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn depth(&self, url: &str) -> usize {
        self.state
            .lock()
            .await
            .queues
            .get(url)
            .map_or(0, |q| q.visible.len())
    }

    pub async fn in_flight(&self, url: &str) -> usize {
        self.state
            .lock()
            .await
            .queues
            .get(url)
            .map_or(0, |q| q.in_flight.len())
    }

    /// Makes every received but undeleted message visible again, as if its
    /// visibility timeout ran out.
    pub async fn expire_in_flight(&self, url: &str) {
        if let Ok(queue) = self.state.lock().await.queue(url) {
            let expired: Vec<_> = queue.in_flight.drain().map(|(_, m)| m).collect();
            queue.visible.extend(expired);
        }
    }

    /// Overrides the depth reported by attribute calls; `None` leaves the
    /// attribute out.
    pub async fn report_depth(&self, url: &str, depth: Option<&str>) {
        if let Ok(queue) = self.state.lock().await.queue(url) {
            queue.reported_depth = Some(depth.map(str::to_string));
        }
    }

    pub async fn fail_receive_on_call(&self, call: usize) {
        self.state.lock().await.faults.receive_call = Some(call);
    }

    pub async fn fail_sends(&self) {
        self.state.lock().await.faults.fail_sends = true;
    }

    pub async fn reject_sends<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock().await;
        state
            .faults
            .rejected_sends
            .extend(ids.into_iter().map(Into::into));
    }

    pub async fn fail_deletes(&self) {
        self.state.lock().await.faults.fail_deletes = true;
    }

    pub async fn reject_deletes<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock().await;
        state
            .faults
            .rejected_deletes
            .extend(ids.into_iter().map(Into::into));
    }

    pub async fn stats(&self) -> Stats {
        self.state.lock().await.stats.clone()
    }
}

#[async_trait::async_trait]
impl QueueService for MemoryQueueService {
    async fn resolve_queue_url(&self, name: &str) -> anyhow::Result<String> {
        let mut state = self.state.lock().await;
        state.stats.resolve_calls += 1;

        let url = self.url(name);
        if !state.queues.contains_key(&url) {
            bail!("queue {name} does not exist");
        }
        Ok(url)
    }

    async fn queue_attributes(&self, url: &str) -> anyhow::Result<HashMap<String, String>> {
        let mut state = self.state.lock().await;
        state.stats.attribute_calls += 1;

        let queue = state.queue(url)?;
        let depth = match &queue.reported_depth {
            Some(reported) => reported.clone(),
            None => Some(queue.visible.len().to_string()),
        };

        let mut attributes = HashMap::from([(
            "ApproximateNumberOfMessagesNotVisible".to_string(),
            queue.in_flight.len().to_string(),
        )]);
        if let Some(depth) = depth {
            attributes.insert(APPROXIMATE_NUMBER_OF_MESSAGES.to_string(), depth);
        }
        Ok(attributes)
    }

    async fn receive_messages(
        &self,
        url: &str,
        request: &ReceiveRequest,
    ) -> anyhow::Result<Vec<Message>> {
        let mut state = self.state.lock().await;
        state.stats.receive_calls += 1;

        if state.faults.receive_call == Some(state.stats.receive_calls) {
            bail!("injected receive failure");
        }

        let first_receipt = state.next_receipt;
        let queue = state.queue(url)?;
        let mut received = Vec::new();
        while received.len() < request.max_messages {
            let Some(mut message) = queue.visible.pop_front() else {
                break;
            };
            message.receipt_handle = format!("rh-{}", first_receipt + received.len());
            queue
                .in_flight
                .insert(message.receipt_handle.clone(), message.clone());
            received.push(with_requested_attributes(message, &request.attribute_names));
        }
        state.next_receipt += received.len();

        Ok(received)
    }

    async fn send_message_batch(
        &self,
        url: &str,
        entries: Vec<OutboundEntry>,
    ) -> anyhow::Result<BatchResult> {
        let mut state = self.state.lock().await;
        state.stats.send_calls += 1;

        if state.faults.fail_sends {
            bail!("injected send failure");
        }
        state.queue(url)?;

        let mut result = BatchResult::default();
        for entry in entries {
            if state.faults.rejected_sends.contains(&entry.id) {
                result.failed.push(FailedEntry {
                    id: entry.id,
                    code: "InvalidMessageContents".to_string(),
                    message: Some("rejected by test".to_string()),
                    sender_fault: true,
                });
                continue;
            }

            let mut attributes = HashMap::new();
            if let Some(group_id) = entry.group_id {
                attributes.insert(GROUP_ID.to_string(), group_id);
            }
            if let Some(dedup_id) = entry.dedup_id {
                attributes.insert(DEDUP_ID.to_string(), dedup_id);
            }
            let message = Message {
                id: state.message_id(),
                body: entry.body,
                receipt_handle: String::new(),
                attributes,
                message_attributes: entry.message_attributes,
            };

            state.queue(url)?.visible.push_back(message);
            state.stats.sent.push(entry.id.clone());
            result.successful.push(entry.id);
        }

        Ok(result)
    }

    async fn delete_message_batch(
        &self,
        url: &str,
        entries: Vec<DeleteEntry>,
    ) -> anyhow::Result<BatchResult> {
        let mut state = self.state.lock().await;
        state.stats.delete_calls += 1;

        if state.faults.fail_deletes {
            bail!("injected delete failure");
        }

        let mut result = BatchResult::default();
        for entry in entries {
            let rejected = state.faults.rejected_deletes.contains(&entry.id);
            let removed = !rejected
                && state
                    .queue(url)?
                    .in_flight
                    .remove(&entry.receipt_handle)
                    .is_some();

            if removed {
                state.stats.deleted.push(entry.id.clone());
                result.successful.push(entry.id);
            } else {
                result.failed.push(FailedEntry {
                    id: entry.id,
                    code: "ReceiptHandleIsInvalid".to_string(),
                    message: None,
                    sender_fault: true,
                });
            }
        }

        Ok(result)
    }
}

fn plain_message(id: String, body: String) -> Message {
    Message {
        id,
        body,
        receipt_handle: String::new(),
        attributes: HashMap::new(),
        message_attributes: HashMap::new(),
    }
}

fn with_requested_attributes(mut message: Message, names: &[String]) -> Message {
    if !names.iter().any(|n| n == ALL_ATTRIBUTES) {
        message.attributes.retain(|k, _| names.contains(k));
    }
    message
}
