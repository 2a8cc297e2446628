use std::sync::Arc;
use std::time::Duration;

use sqsmover::memory::MemoryQueueService;
use sqsmover::{Migrator, MoverConfig};

pub const SOURCE: &str = "orders-dlq";
pub const DESTINATION: &str = "orders";

/// A memory service holding a source queue with `depth` messages and an
/// empty destination queue.
pub async fn queues(depth: usize) -> Arc<MemoryQueueService> {
    let service = Arc::new(MemoryQueueService::new());
    let source = service.create_queue(SOURCE).await;
    service.create_queue(DESTINATION).await;
    service.seed(&source, depth).await;
    service
}

/// Config that does not long poll, so drained queues return at once.
pub fn config(limit: usize, parallelism: usize) -> MoverConfig {
    MoverConfig {
        wait_time: Duration::ZERO,
        ..MoverConfig::default()
            .with_limit(limit)
            .with_parallelism(parallelism)
    }
}

pub fn migrator(service: &Arc<MemoryQueueService>, config: MoverConfig) -> Migrator {
    Migrator::new(service.clone(), config)
}

/// Asserts no id appears twice and returns how many there are.
pub fn assert_unique(ids: &[String]) -> usize {
    let mut seen = std::collections::HashSet::new();
    for id in ids {
        assert!(seen.insert(id), "duplicate found: {id}");
    }
    seen.len()
}
