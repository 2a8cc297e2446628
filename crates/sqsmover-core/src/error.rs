use crate::message::FailedEntry;
use crate::migrate::Stage;

/// A hard failure of one step of a migration. None of these are retried in
/// place; re-running the migration picks up whatever is left in the source.
#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("resolving the url of queue {queue}")]
    Resolve {
        queue: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("source and destination are the same queue {url}")]
    SameQueue { url: String },

    #[error("getting all attributes from queue {url}")]
    Attributes {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("queue {url} reported an unusable message count {value:?}")]
    InvalidDepth { url: String, value: Option<String> },

    #[error("receiving messages")]
    Receive(#[source] anyhow::Error),

    #[error("sending message batch")]
    Send(#[source] anyhow::Error),

    /// The messages were already sent, so they now exist in both queues.
    #[error("deleting messages from source queue, {undeleted} sent messages remain in the source")]
    Delete {
        undeleted: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("deleting all moved messages, {} not deleted: {:?}", failed.len(), failed_ids(failed))]
    PartialDelete { failed: Vec<FailedEntry> },

    #[error("move worker stopped unexpectedly: {0}")]
    Worker(String),
}

fn failed_ids(failed: &[FailedEntry]) -> Vec<&str> {
    failed.iter().map(|f| f.id.as_str()).collect()
}

/// Terminal error of a migration, with the number of messages that were
/// confirmed moved before it happened.
#[derive(Debug, thiserror::Error)]
#[error("migration failed while {stage} after moving {moved} messages")]
pub struct MigrationError {
    pub stage: Stage,
    pub moved: usize,
    #[source]
    pub source: MoveError,
}

impl MigrationError {
    pub(crate) fn new(stage: Stage, moved: usize, source: MoveError) -> Self {
        Self {
            stage,
            moved,
            source,
        }
    }
}
