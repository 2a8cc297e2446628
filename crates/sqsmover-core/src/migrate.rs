use std::fmt;
use std::sync::Arc;

use crate::config::MoverConfig;
use crate::distribute::WorkDistributor;
use crate::error::{MigrationError, MoveError};
use crate::message::APPROXIMATE_NUMBER_OF_MESSAGES;
use crate::mover::BatchMover;
use crate::queue::QueueService;

/// Where a migration is, or where it stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Resolving,
    Estimating,
    Distributing,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Resolving => "resolving queues",
            Stage::Estimating => "estimating queue depth",
            Stage::Distributing => "moving messages",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Summary of a migration that finished without a hard error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Approximate depth of the source when the run started
    pub estimated: usize,
    /// Messages the run set out to move, after applying the limit
    pub budget: usize,
    pub moved: usize,
    pub workers: usize,
}

/// Moves messages from a source queue to a destination queue.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use sqsmover::{Migrator, MoverConfig, SqsQueue};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = aws_config::from_env().load().await;
/// let queue = Arc::new(SqsQueue::from_config(config));
///
/// let report = Migrator::new(queue, MoverConfig::default().with_limit(500))
///     .migrate("orders-dlq", "orders")
///     .await?;
/// println!("moved {} messages", report.moved);
/// # Ok(())
/// # }
/// ```
pub struct Migrator {
    service: Arc<dyn QueueService>,
    config: MoverConfig,
}

impl Migrator {
    pub fn new(service: Arc<dyn QueueService>, config: MoverConfig) -> Self {
        Self { service, config }
    }

    /// Resolves both queue names, then moves messages between them.
    ///
    /// No step is retried. After a failure the source still holds every
    /// message that was not confirmed moved, so running again picks up the
    /// rest; messages whose delete failed outright may be copied twice.
    pub async fn migrate(
        &self,
        source: &str,
        destination: &str,
    ) -> Result<MigrationReport, MigrationError> {
        self.config
            .validate()
            .map_err(|e| MigrationError::new(Stage::Idle, 0, e))?;

        log::info!("{}", Stage::Resolving);
        let source_url = self.resolve(source).await?;
        let destination_url = self.resolve(destination).await?;

        log::info!("moving messages from {source_url} to {destination_url}");
        self.move_messages(&source_url, &destination_url).await
    }

    /// Same as [`migrate`](Self::migrate) for queues already resolved to URLs.
    pub async fn move_messages(
        &self,
        source_url: &str,
        destination_url: &str,
    ) -> Result<MigrationReport, MigrationError> {
        self.config
            .validate()
            .map_err(|e| MigrationError::new(Stage::Idle, 0, e))?;

        if source_url == destination_url {
            return Err(MigrationError::new(
                Stage::Resolving,
                0,
                MoveError::SameQueue {
                    url: source_url.to_string(),
                },
            ));
        }

        log::info!("{}", Stage::Estimating);
        let estimated = self
            .depth(source_url)
            .await
            .map_err(|e| MigrationError::new(Stage::Estimating, 0, e))?;
        log::info!("{APPROXIMATE_NUMBER_OF_MESSAGES}: {estimated}");

        if estimated == 0 {
            log::info!("looks like nothing to move");
            return Ok(MigrationReport::default());
        }

        let budget = match self.config.limit {
            limit if limit > 0 && limit < estimated => limit,
            _ => estimated,
        };

        log::info!("{}", Stage::Distributing);
        let mover = BatchMover::new(
            self.service.clone(),
            source_url,
            destination_url,
            &self.config,
        );
        let distribution = WorkDistributor::new(mover, self.config.max_per_read)
            .distribute(budget, self.config.parallelism)
            .await;

        if let Some(error) = distribution.error {
            log::error!("{}: {error}", Stage::Failed);
            return Err(MigrationError::new(
                Stage::Distributing,
                distribution.moved,
                error,
            ));
        }

        log::info!("{}: moved {} messages", Stage::Done, distribution.moved);
        Ok(MigrationReport {
            estimated,
            budget,
            moved: distribution.moved,
            workers: distribution.workers,
        })
    }

    async fn resolve(&self, name: &str) -> Result<String, MigrationError> {
        self.service
            .resolve_queue_url(name)
            .await
            .map_err(|source| {
                MigrationError::new(
                    Stage::Resolving,
                    0,
                    MoveError::Resolve {
                        queue: name.to_string(),
                        source,
                    },
                )
            })
    }

    async fn depth(&self, url: &str) -> Result<usize, MoveError> {
        let attributes = self
            .service
            .queue_attributes(url)
            .await
            .map_err(|source| MoveError::Attributes {
                url: url.to_string(),
                source,
            })?;

        let value = attributes.get(APPROXIMATE_NUMBER_OF_MESSAGES);
        value
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| MoveError::InvalidDepth {
                url: url.to_string(),
                value: value.cloned(),
            })
    }
}
