//! [`QueueService`] backed by AWS SQS.

use std::collections::HashMap;

use anyhow::Context;
use aws_config::SdkConfig;
use aws_sdk_sqs as sqs;
use sqs::primitives::Blob;
use sqs::types::{
    BatchResultErrorEntry, DeleteMessageBatchRequestEntry, MessageAttributeValue,
    MessageSystemAttributeName, QueueAttributeName, SendMessageBatchRequestEntry,
};

use crate::message::{
    AttributeValue, BatchResult, DeleteEntry, FailedEntry, Message, OutboundEntry,
    ReceiveRequest, ALL_ATTRIBUTES,
};
use crate::queue::QueueService;

/// Client for moving messages between AWS SQS queues.
///
/// # Example
///
/// ```no_run
/// use sqsmover::{QueueService, SqsQueue};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = aws_config::from_env().load().await;
/// let queue = SqsQueue::from_config(config);
///
/// let url = queue.resolve_queue_url("my-dlq").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SqsQueue {
    /// The AWS SDK configuration used for SQS operations
    pub config: SdkConfig,
    /// The SQS client instance
    pub client: sqs::Client,
}

impl SqsQueue {
    /// Creates an SqsQueue from a pre-built AWS SDK config.
    ///
    /// The caller decides on credentials, region and endpoint (e.g. an
    /// `--endpoint` override for LocalStack).
    pub fn from_config(config: SdkConfig) -> Self {
        let client = sqs::Client::new(&config);
        Self { config, client }
    }
}

#[async_trait::async_trait]
impl QueueService for SqsQueue {
    async fn resolve_queue_url(&self, name: &str) -> anyhow::Result<String> {
        let output = self
            .client
            .get_queue_url()
            .queue_name(name)
            .send()
            .await
            .with_context(|| format!("failed to get the url of queue {name}"))?;

        output
            .queue_url
            .with_context(|| format!("no url returned for queue {name}"))
    }

    async fn queue_attributes(&self, url: &str) -> anyhow::Result<HashMap<String, String>> {
        let output = self
            .client
            .get_queue_attributes()
            .queue_url(url)
            .attribute_names(QueueAttributeName::All)
            .send()
            .await
            .context("failed to get queue attributes")?;

        Ok(output
            .attributes
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name.as_str().to_string(), value))
            .collect())
    }

    async fn receive_messages(
        &self,
        url: &str,
        request: &ReceiveRequest,
    ) -> anyhow::Result<Vec<Message>> {
        let output = self
            .client
            .receive_message()
            .queue_url(url)
            .max_number_of_messages(i32::try_from(request.max_messages)?)
            .visibility_timeout(i32::try_from(request.visibility_timeout)?)
            .wait_time_seconds(i32::try_from(request.wait_time)?)
            .message_attribute_names(ALL_ATTRIBUTES)
            .set_message_system_attribute_names(Some(
                request
                    .attribute_names
                    .iter()
                    .map(|name| MessageSystemAttributeName::from(name.as_str()))
                    .collect(),
            ))
            .send()
            .await
            .context("failed to receive messages")?;

        output
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(from_aws_message)
            .collect()
    }

    async fn send_message_batch(
        &self,
        url: &str,
        entries: Vec<OutboundEntry>,
    ) -> anyhow::Result<BatchResult> {
        let entries = entries
            .into_iter()
            .map(to_send_entry)
            .collect::<anyhow::Result<Vec<_>>>()?;

        let output = self
            .client
            .send_message_batch()
            .queue_url(url)
            .set_entries(Some(entries))
            .send()
            .await
            .context("failed to send message batch")?;

        Ok(BatchResult {
            successful: output.successful.into_iter().map(|e| e.id).collect(),
            failed: output.failed.into_iter().map(from_aws_failure).collect(),
        })
    }

    async fn delete_message_batch(
        &self,
        url: &str,
        entries: Vec<DeleteEntry>,
    ) -> anyhow::Result<BatchResult> {
        let entries = entries
            .into_iter()
            .map(|entry| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(entry.id)
                    .receipt_handle(entry.receipt_handle)
                    .build()
                    .context("failed to build delete entry")
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let output = self
            .client
            .delete_message_batch()
            .queue_url(url)
            .set_entries(Some(entries))
            .send()
            .await
            .context("failed to delete message batch")?;

        Ok(BatchResult {
            successful: output.successful.into_iter().map(|e| e.id).collect(),
            failed: output.failed.into_iter().map(from_aws_failure).collect(),
        })
    }
}

/// Converts an AWS SDK message, failing on the fields a move cannot do
/// without.
///
/// See the [AWS SQS Message API Reference](https://docs.aws.amazon.com/AWSSimpleQueueService/latest/APIReference/API_Message.html).
fn from_aws_message(message: sqs::types::Message) -> anyhow::Result<Message> {
    let id = message.message_id.context("missing message_id")?;
    let receipt_handle = message
        .receipt_handle
        .with_context(|| format!("missing receipt_handle on message {id}"))?;

    Ok(Message {
        body: message.body.unwrap_or_default(),
        receipt_handle,
        attributes: message
            .attributes
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name.as_str().to_string(), value))
            .collect(),
        message_attributes: message
            .message_attributes
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name, from_aws_attribute(value)))
            .collect(),
        id,
    })
}

fn from_aws_attribute(value: MessageAttributeValue) -> AttributeValue {
    AttributeValue {
        data_type: value.data_type,
        string_value: value.string_value,
        binary_value: value.binary_value.map(Blob::into_inner),
    }
}

fn to_aws_attribute(value: AttributeValue) -> anyhow::Result<MessageAttributeValue> {
    MessageAttributeValue::builder()
        .data_type(value.data_type)
        .set_string_value(value.string_value)
        .set_binary_value(value.binary_value.map(Blob::new))
        .build()
        .context("failed to build message attribute")
}

fn to_send_entry(entry: OutboundEntry) -> anyhow::Result<SendMessageBatchRequestEntry> {
    let attributes = entry
        .message_attributes
        .into_iter()
        .map(|(name, value)| Ok::<_, anyhow::Error>((name, to_aws_attribute(value)?)))
        .collect::<anyhow::Result<HashMap<_, _>>>()?;

    SendMessageBatchRequestEntry::builder()
        .id(entry.id)
        .message_body(entry.body)
        .set_message_attributes((!attributes.is_empty()).then_some(attributes))
        .set_message_group_id(entry.group_id)
        .set_message_deduplication_id(entry.dedup_id)
        .build()
        .context("failed to build message entry")
}

fn from_aws_failure(entry: BatchResultErrorEntry) -> FailedEntry {
    FailedEntry {
        id: entry.id,
        code: entry.code,
        message: entry.message,
        sender_fault: entry.sender_fault,
    }
}
