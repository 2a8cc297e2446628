//! # sqsmover-core
//!
//! Core library for moving messages in bulk from one AWS SQS queue to another.
//!
//! Messages are received in batches, packed into size-limited send batches,
//! sent to the destination and then deleted from the source. Only messages
//! confirmed on both legs count as moved. Several workers share one message
//! budget so large queues drain in parallel.
//!
//! ## Features
//!
//! - **FIFO aware**: group and deduplication ids travel with every message
//! - **Partial failures**: rejected entries stay in the source queue
//! - **Pluggable queues**: anything implementing [`QueueService`], with an
//!   in-memory [`memory::MemoryQueueService`] for tests
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sqsmover::{Migrator, MoverConfig, SqsQueue};
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Load AWS configuration
//! let config = aws_config::from_env().load().await;
//! let queue = Arc::new(SqsQueue::from_config(config));
//!
//! // Move everything from the DLQ back to the work queue
//! let report = Migrator::new(queue, MoverConfig::default())
//!     .migrate("orders-dlq", "orders")
//!     .await?;
//! println!("moved {} messages", report.moved);
//! # Ok(())
//! # }
//! ```

mod config;
mod distribute;
mod error;
mod message;
mod migrate;
mod mover;
mod pack;
mod queue;
mod sqs;

pub mod memory;

pub use config::*;
pub use distribute::{effective_parallelism, Distribution, WorkDistributor};
pub use error::{MigrationError, MoveError};
pub use message::*;
pub use migrate::{MigrationReport, Migrator, Stage};
pub use mover::{BatchMover, MoveResult};
pub use pack::BatchPacker;
pub use queue::QueueService;
pub use sqs::SqsQueue;
